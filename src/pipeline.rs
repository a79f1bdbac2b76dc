//! The request entry point.
//!
//! A [`Pipeline`] owns an ordered list of handlers, the [`Chain`] built from
//! it, and the [`ContextStore`] its adapters park contexts in.
//!
//! # Context lifecycle
//!
//! On [`dispatch`](Pipeline::dispatch) the pipeline first asks its store
//! whether the request already has a context:
//!
//! - **yes**: this pipeline is nested inside another one (through a wrapped
//!   plain handler). It runs its chain with that context and leaves its
//!   lifetime to the outer pipeline.
//! - **no**: it derives a cancellable context from its base context, parks it
//!   in the store for the duration of the call, runs the chain, then pops it
//!   and cancels it. Both happen on every exit path, including a panic
//!   unwinding out of the chain.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::adapter::wrap;
use crate::chain::{Chain, Next};
use crate::context::Context;
use crate::handler::{handler_fn, plain_fn, BoxedHandler, Handler, PlainHandler};
use crate::middleware::{Logger, Recovery, Static};
use crate::request::Request;
use crate::response::{ResponseRecorder, ResponseWriter};
use crate::store::ContextStore;

/// An ordered stack of handlers, invoked as a single [`PlainHandler`].
///
/// Handlers run in the order they were added.
///
/// ```rust
/// use std::io::Write;
/// use strand::{Pipeline, Request, Response, middleware::Recovery};
///
/// let app = Pipeline::new()
///     .handler(Recovery::new())
///     .plain_fn(|rw, _req| {
///         let _ = rw.write_all(b"hi");
///     });
///
/// let mut res = Response::new();
/// app.dispatch(&mut res, &Request::get("/hello"));
/// assert_eq!(res.body(), b"hi");
/// ```
pub struct Pipeline {
    base: Option<Context>,
    handlers: Vec<BoxedHandler>,
    chain: Chain,
    store: Arc<ContextStore>,
}

impl Pipeline {
    /// An empty pipeline with its own store and no base context.
    pub fn new() -> Self {
        Self {
            base: None,
            handlers: Vec::new(),
            chain: Chain::default(),
            store: Arc::new(ContextStore::new()),
        }
    }

    /// An empty pipeline whose request contexts derive from `ctx`.
    ///
    /// Values in `ctx` are visible to every request, and cancelling `ctx`
    /// cancels every request context derived from it.
    pub fn with_context(ctx: Context) -> Self {
        Self { base: Some(ctx), ..Self::new() }
    }

    /// Replaces the store. A pipeline mounted inside another must share the
    /// outer pipeline's store to resume its context:
    ///
    /// ```rust
    /// use strand::Pipeline;
    ///
    /// let outer = Pipeline::new();
    /// let inner = Pipeline::new().with_store(outer.store());
    /// let outer = outer.plain(inner);
    /// ```
    ///
    /// Handlers added with `push_plain` before this call keep the store they
    /// were created with.
    pub fn with_store(mut self, store: Arc<ContextStore>) -> Self {
        self.store = store;
        self
    }

    /// Recovery, logging and static files from `./public`, in that order.
    pub fn classic() -> Self {
        Self::new()
            .handler(Recovery::new())
            .handler(Logger::new())
            .handler(Static::new("public"))
    }

    // ── Appending ─────────────────────────────────────────────────────────────

    /// Appends a handler and rebuilds the chain.
    pub fn push(&mut self, handler: impl Handler) {
        self.push_boxed(Arc::new(handler));
    }

    pub fn push_boxed(&mut self, handler: BoxedHandler) {
        self.handlers.push(handler);
        self.chain = Chain::build(&self.handlers);
    }

    /// Appends a closure as a handler.
    pub fn push_fn<F>(&mut self, f: F)
    where
        F: Fn(Context, &mut ResponseRecorder<'_>, &Request, Next<'_>) + Send + Sync + 'static,
    {
        self.push(handler_fn(f));
    }

    /// Appends a context-unaware handler. The chain continues after it
    /// returns.
    pub fn push_plain(&mut self, handler: impl PlainHandler) {
        self.push(wrap(handler, Arc::clone(&self.store)));
    }

    /// Appends a context-unaware closure. The chain continues after it
    /// returns.
    pub fn push_plain_fn<F>(&mut self, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
    {
        self.push_plain(plain_fn(f));
    }

    /// Chaining form of [`push`](Self::push).
    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.push(handler);
        self
    }

    /// Chaining form of [`push_fn`](Self::push_fn).
    pub fn handler_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Context, &mut ResponseRecorder<'_>, &Request, Next<'_>) + Send + Sync + 'static,
    {
        self.push_fn(f);
        self
    }

    /// Chaining form of [`push_plain`](Self::push_plain).
    pub fn plain(mut self, handler: impl PlainHandler) -> Self {
        self.push_plain(handler);
        self
    }

    /// Chaining form of [`push_plain_fn`](Self::push_plain_fn).
    pub fn plain_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
    {
        self.push_plain_fn(f);
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// The handlers in chain order.
    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.handlers
    }

    pub fn store(&self) -> Arc<ContextStore> {
        Arc::clone(&self.store)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Runs `req` through the chain, writing to `rw`.
    pub fn dispatch(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        let mut rw = ResponseRecorder::new(rw);

        if let Some(ctx) = self.store.get(req.id()) {
            trace!(request = %req.id(), "resuming parked context");
            self.chain.run(ctx, &mut rw, req);
            return;
        }

        let base = self.base.clone().unwrap_or_default();
        let (ctx, _cancel) = base.with_cancel();
        let _parked = self.store.enter(req.id(), ctx.clone());
        trace!(request = %req.id(), "context created");

        self.chain.run(ctx, &mut rw, req);
    }
}

impl PlainHandler for Pipeline {
    fn handle(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        self.dispatch(rw, req);
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.handlers.len())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;
    use crate::response::Response;

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    type Slot = Arc<Mutex<Option<Context>>>;

    fn capture(slot: Slot) -> impl Fn(Context, &mut ResponseRecorder<'_>, &Request, Next<'_>) + Send + Sync + 'static {
        move |ctx, rw, req, next| {
            *slot.lock().unwrap() = Some(ctx.clone());
            next.run(ctx, rw, req);
        }
    }

    #[test]
    fn empty_pipeline_leaves_response_untouched() {
        let app = Pipeline::new();
        let mut res = Response::new();
        app.dispatch(&mut res, &Request::get("/"));
        assert!(!res.written());
        assert!(res.body().is_empty());
        assert!(app.handlers().is_empty());
    }

    #[test]
    fn request_context_is_cancelled_and_unparked_on_return() {
        let slot = Slot::default();
        let app = Pipeline::new().handler_fn(capture(Arc::clone(&slot)));

        let mut res = Response::new();
        app.dispatch(&mut res, &Request::get("/"));

        let ctx = slot.lock().unwrap().take().unwrap();
        assert!(ctx.is_cancelled());
        assert!(app.store().is_empty());
    }

    #[test]
    fn context_is_live_while_the_chain_runs() {
        let app = Pipeline::new().handler_fn(|ctx, rw, req, next| {
            assert!(!ctx.is_cancelled());
            next.run(ctx, rw, req);
        });
        app.dispatch(&mut Response::new(), &Request::get("/"));
    }

    #[test]
    fn base_context_values_reach_handlers() {
        let slot = Slot::default();
        let base = Context::background().with_value(Tenant("acme"));
        let app = Pipeline::with_context(base.clone()).handler_fn(capture(Arc::clone(&slot)));

        app.dispatch(&mut Response::new(), &Request::get("/"));

        let ctx = slot.lock().unwrap().take().unwrap();
        assert_eq!(ctx.value::<Tenant>(), Some(&Tenant("acme")));
        assert!(!base.is_cancelled());
    }

    #[test]
    fn handlers_may_forward_a_derived_context() {
        let slot = Slot::default();
        let app = Pipeline::new()
            .handler_fn(|ctx, rw, req, next| next.run(ctx.with_value(Tenant("derived")), rw, req))
            .handler_fn(capture(Arc::clone(&slot)));

        app.dispatch(&mut Response::new(), &Request::get("/"));

        let ctx = slot.lock().unwrap().take().unwrap();
        assert_eq!(ctx.value::<Tenant>(), Some(&Tenant("derived")));
    }

    #[test]
    fn panic_without_recovery_still_cleans_up() {
        let slot = Slot::default();
        let app = Pipeline::new()
            .handler_fn(capture(Arc::clone(&slot)))
            .plain_fn(|_rw, _req| panic!("unhandled"));

        let result = catch_unwind(AssertUnwindSafe(|| {
            app.dispatch(&mut Response::new(), &Request::get("/"));
        }));

        assert!(result.is_err());
        assert!(app.store().is_empty());
        assert!(slot.lock().unwrap().take().unwrap().is_cancelled());
    }

    #[test]
    fn appending_rebuilds_the_chain() {
        let mut app = Pipeline::new();
        app.push_plain_fn(|rw, _req| {
            let _ = rw.write_all(b"a");
        });
        app.push_fn(|ctx, rw, req, next| {
            let _ = rw.write_all(b"b");
            next.run(ctx, rw, req);
        });
        assert_eq!(app.handlers().len(), 2);

        let mut res = Response::new();
        app.dispatch(&mut res, &Request::get("/"));
        assert_eq!(res.body(), b"ab");
        assert_eq!(res.status(), StatusCode::OK);
    }
}
