//! Minimal strand example: the classic stack in front of a hand-rolled mux,
//! plus a request-scoped value set by middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/panic
//!   curl http://localhost:3000/index.html   (served from ./public if present)

use std::io::Write;

use strand::http::StatusCode;
use strand::{ContentType, Context, Next, Pipeline, Request, ResponseRecorder, ResponseWriter};

/// Set by `tag_request`, read by `users`.
struct Caller(String);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut app = Pipeline::classic();
    app.push_fn(tag_request);

    // A nested pipeline sharing the outer store resumes the outer context.
    let api = Pipeline::new()
        .with_store(app.store())
        .handler_fn(users)
        .plain_fn(fallback);
    app.push_plain(api);

    if let Err(e) = app.run("0.0.0.0:3000").await {
        eprintln!("server error: {e}");
    }
}

// Stores the caller's user agent in the context for everything downstream.
fn tag_request(ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
    let caller = req.header("user-agent").unwrap_or("unknown").to_owned();
    next.run(ctx.with_value(Caller(caller)), rw, req);
}

// GET /users/:id
fn users(ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
    let Some(id) = req.path().strip_prefix("/users/") else {
        return next.run(ctx, rw, req);
    };
    let caller = ctx.value::<Caller>().map_or("unknown", |c| c.0.as_str());
    rw.content_type(ContentType::Json);
    let _ = write!(rw, r#"{{"id":"{id}","requested_by":"{caller}"}}"#);
}

fn fallback(rw: &mut dyn ResponseWriter, req: &Request) {
    match req.path() {
        "/" => {
            let _ = rw.write_all(b"Welcome to the home page!");
        }
        "/panic" => panic!("this panic is caught by Recovery"),
        _ => rw.write_header(StatusCode::NOT_FOUND),
    }
}
