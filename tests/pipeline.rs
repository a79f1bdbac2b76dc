use std::io::Write;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use strand::http::header::{HeaderName, HeaderValue};
use strand::http::{Method, StatusCode, Uri};
use strand::middleware::{Event, Logger, Recovery, Sink};
use strand::{Context, Pipeline, Request, Response, ResponseWriter};

#[derive(Default)]
struct Recorded(Mutex<Vec<String>>);

impl Sink for Recorded {
    fn event(&self, event: &Event<'_>) {
        let line = match event {
            Event::Started { method, path, .. } => format!("started {method} {path}"),
            Event::Completed { method, status, .. } => format!("completed {method} {}", status.as_u16()),
            Event::Panicked { message, .. } => format!("panicked {message}"),
        };
        self.0.lock().unwrap().push(line);
    }
}

impl Recorded {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[test]
fn onion_order_holds_for_any_length() {
    for n in 0..6 {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Pipeline::new();
        for i in 0..n {
            let log = Arc::clone(&log);
            app.push_fn(move |ctx, rw, req, next| {
                log.lock().unwrap().push(i as i64);
                next.run(ctx, rw, req);
                log.lock().unwrap().push(-(i as i64) - 1);
            });
        }

        app.dispatch(&mut Response::new(), &Request::get("/"));

        let expected: Vec<i64> = (0..n as i64).chain((0..n as i64).rev().map(|i| -i - 1)).collect();
        assert_eq!(*log.lock().unwrap(), expected, "chain of {n}");
    }
}

#[test]
fn logger_recovery_echo() {
    let sink = Arc::new(Recorded::default());
    let app = Pipeline::new()
        .handler(Logger::with_sink(Arc::clone(&sink)))
        .handler(Recovery::new().sink(Arc::clone(&sink)))
        .plain_fn(|rw, _req| {
            rw.write_header(StatusCode::OK);
            let _ = rw.write_all(b"hi");
        });

    let mut res = Response::new();
    app.dispatch(&mut res, &Request::get("/hello"));

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), b"hi");
    assert_eq!(sink.lines(), ["started GET /hello", "completed GET 200"]);
}

#[test]
fn recovery_absorbs_downstream_fault() {
    let sink = Arc::new(Recorded::default());
    let app = Pipeline::new()
        .handler(Recovery::new().print_stack(false).sink(Arc::clone(&sink)))
        .plain_fn(|_rw, _req| panic!("boom"));

    let mut res = Response::new();
    app.dispatch(&mut res, &Request::get("/"));

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.lines(), ["panicked boom"]);
    assert!(app.store().is_empty());
}

#[test]
fn logger_outside_recovery_sees_the_500() {
    let sink = Arc::new(Recorded::default());
    let app = Pipeline::new()
        .handler(Logger::with_sink(Arc::clone(&sink)))
        .handler(Recovery::new().print_stack(false).sink(Arc::clone(&sink)))
        .plain_fn(|_rw, _req| panic!("late"));

    app.dispatch(&mut Response::new(), &Request::new(Method::DELETE, Uri::from_static("/x")));

    assert_eq!(sink.lines(), ["started DELETE /x", "panicked late", "completed DELETE 500"]);
}

#[derive(Debug, PartialEq)]
struct Layer(&'static str);

#[test]
fn nested_pipeline_resumes_outer_context_and_restores_it() {
    let outer_base = Pipeline::new();
    let store = outer_base.store();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));

    let inner = {
        let seen = Arc::clone(&seen);
        let store = Arc::clone(&store);
        Pipeline::new()
            .with_store(Arc::clone(&store))
            .handler_fn(move |ctx, rw, req, next| {
                seen.lock().unwrap().push(format!(
                    "inner sees {:?} at depth {}",
                    ctx.value::<Layer>().map(|l| l.0),
                    store.depth(req.id())
                ));
                next.run(ctx.with_value(Layer("inner")), rw, req);
            })
            .plain_fn(|rw, _req| {
                let _ = rw.write_all(b"inner;");
            })
    };

    let app = {
        let seen = Arc::clone(&seen);
        let store = Arc::clone(&store);
        outer_base
            .handler_fn(|ctx, rw, req, next| next.run(ctx.with_value(Layer("outer")), rw, req))
            .plain(inner)
            .handler_fn(move |ctx, rw, req, next| {
                seen.lock().unwrap().push(format!(
                    "outer sees {:?} at depth {}",
                    ctx.value::<Layer>().map(|l| l.0),
                    store.depth(req.id())
                ));
                let _ = rw.write_all(b"outer");
                next.run(ctx, rw, req);
            })
    };

    let mut res = Response::new();
    let req = Request::get("/");
    app.dispatch(&mut res, &req);

    assert_eq!(
        *seen.lock().unwrap(),
        [
            "inner sees Some(\"outer\") at depth 2",
            "outer sees Some(\"outer\") at depth 1",
        ]
    );
    assert_eq!(res.body(), b"inner;outer");
    assert!(store.get(req.id()).is_none());
}

#[test]
fn nested_logger_reports_the_status_the_outer_chain_sent() {
    let sink = Arc::new(Recorded::default());
    let outer = Pipeline::new();
    let inner = Pipeline::new()
        .with_store(outer.store())
        .handler(Logger::with_sink(Arc::clone(&sink)))
        .plain_fn(|rw, _req| {
            let _ = rw.write_all(b"gone");
        });
    let app = outer
        .handler_fn(|ctx, rw, req, next| {
            rw.write_header(StatusCode::GONE);
            next.run(ctx, rw, req);
        })
        .plain(inner);

    let mut res = Response::new();
    app.dispatch(&mut res, &Request::get("/old"));

    assert_eq!(res.status(), StatusCode::GONE);
    assert_eq!(res.body(), b"gone");
    assert_eq!(sink.lines(), ["started GET /old", "completed GET 410"]);
}

#[test]
fn nested_pipeline_with_its_own_store_starts_fresh() {
    let seen = Arc::new(Mutex::new(None));
    let inner = {
        let seen = Arc::clone(&seen);
        Pipeline::new().handler_fn(move |ctx, rw, req, next| {
            *seen.lock().unwrap() = Some(ctx.value::<Layer>().is_some());
            next.run(ctx, rw, req);
        })
    };
    let app = Pipeline::with_context(Context::background().with_value(Layer("outer"))).plain(inner);

    app.dispatch(&mut Response::new(), &Request::get("/"));

    assert_eq!(*seen.lock().unwrap(), Some(false));
}

#[test]
fn concurrent_requests_never_see_each_others_context() {
    const N: usize = 64;
    let fingerprint = HeaderName::from_static("x-fingerprint");
    let barrier = Arc::new(Barrier::new(N));
    let app = Pipeline::new();
    let store = app.store();

    let app = {
        let barrier = Arc::clone(&barrier);
        let fingerprint = fingerprint.clone();
        app.handler_fn(move |ctx, rw, req, next| {
            let mine = req.header(fingerprint.as_str()).unwrap_or_default().to_owned();
            next.run(ctx.with_value(mine), rw, req)
        })
        .plain_fn(move |rw, req| {
            // Every request is parked before any of them checks.
            barrier.wait();
            let parked = store.get(req.id()).expect("context parked for this request");
            let _ = rw.write_all(parked.value::<String>().map_or("", String::as_str).as_bytes());
        })
    };
    let app = Arc::new(app);

    let workers: Vec<_> = (0..N)
        .map(|i| {
            let app = Arc::clone(&app);
            let fingerprint = fingerprint.clone();
            thread::spawn(move || {
                let tag = format!("req-{i}");
                let req = Request::get("/").with_header(fingerprint, HeaderValue::from_str(&tag).unwrap());
                let mut res = Response::new();
                app.dispatch(&mut res, &req);
                assert_eq!(res.body(), tag.as_bytes());
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }
    assert!(app.store().is_empty());
}

#[test]
fn classic_stack_has_three_handlers() {
    assert_eq!(Pipeline::classic().handlers().len(), 3);
}
