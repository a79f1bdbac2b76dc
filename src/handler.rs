//! Handler traits and type erasure.
//!
//! Two calling conventions meet in a pipeline:
//!
//! ```text
//! Handler::serve(ctx, rw, req, next)     ← context-aware, decides whether to call next
//! PlainHandler::handle(rw, req)          ← context-unaware, e.g. a router or a whole Pipeline
//! ```
//!
//! A pipeline stores every handler as a [`BoxedHandler`] (`Arc<dyn Handler>`),
//! so handlers of different concrete types sit in one slice. Plain handlers
//! enter the chain through the [`Wrap`](crate::Wrap) adapter.
//!
//! Closures do not implement the traits directly. Wrap them with
//! [`handler_fn`] / [`plain_fn`] (or use the `*_fn` methods on
//! [`Pipeline`](crate::Pipeline)) so the compiler can infer the
//! higher-ranked signature.

use std::sync::Arc;

use crate::chain::Next;
use crate::context::Context;
use crate::request::Request;
use crate::response::{ResponseRecorder, ResponseWriter};

/// A shared, type-erased chain handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// A chain component.
///
/// `serve` runs the component's before-phase, may call `next.run(ctx, rw, req)`
/// to hand the request downstream, then runs its after-phase. [`Next`] is
/// consumed by `run`, so a handler delegates at most once. A handler that
/// does not call `next` ends the chain.
///
/// The context passed on may be `ctx` itself or a context derived from it.
///
/// If a handler has written to `rw`, it should not call `next`.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>);
}

/// A request handler that knows nothing about contexts or chains.
///
/// This is the contract a host server or an external router calls. A
/// [`Pipeline`](crate::Pipeline) implements it, which is how one pipeline is
/// mounted inside another.
pub trait PlainHandler: Send + Sync + 'static {
    fn handle(&self, rw: &mut dyn ResponseWriter, req: &Request);
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        (**self).serve(ctx, rw, req, next)
    }
}

impl<H: PlainHandler + ?Sized> PlainHandler for Arc<H> {
    fn handle(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        (**self).handle(rw, req)
    }
}

// ── Function adapters ─────────────────────────────────────────────────────────

/// A [`Handler`] backed by a closure. Built with [`handler_fn`].
#[derive(Clone, Copy, Debug)]
pub struct HandlerFn<F>(F);

/// Turns a closure into a [`Handler`].
///
/// ```rust
/// use std::io::Write;
/// use strand::{handler_fn, Pipeline};
///
/// let greet = handler_fn(|ctx, rw, req, next| {
///     let _ = write!(rw, "hello ");
///     next.run(ctx, rw, req);
/// });
/// let app = Pipeline::new().handler(greet);
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Context, &mut ResponseRecorder<'_>, &Request, Next<'_>) + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Context, &mut ResponseRecorder<'_>, &Request, Next<'_>) + Send + Sync + 'static,
{
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        (self.0)(ctx, rw, req, next)
    }
}

/// A [`PlainHandler`] backed by a closure. Built with [`plain_fn`].
#[derive(Clone, Copy, Debug)]
pub struct PlainFn<F>(F);

/// Turns a closure into a [`PlainHandler`].
pub fn plain_fn<F>(f: F) -> PlainFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    PlainFn(f)
}

impl<F> PlainHandler for PlainFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn handle(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        (self.0)(rw, req)
    }
}
