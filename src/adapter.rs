//! Bridging plain handlers into a chain.

use std::fmt;
use std::sync::Arc;

use crate::chain::Next;
use crate::context::Context;
use crate::handler::{Handler, PlainHandler};
use crate::request::Request;
use crate::response::ResponseRecorder;
use crate::store::ContextStore;

/// A [`Handler`] that runs a [`PlainHandler`] and then always calls `next`.
///
/// While the plain handler runs, the current context is parked in the
/// [`ContextStore`] under the request's id, so a [`Pipeline`](crate::Pipeline)
/// sharing that store picks it up instead of starting a new one. The entry is
/// popped again before `next` runs, and also if the plain handler panics.
pub struct Wrap<H> {
    inner: H,
    store: Arc<ContextStore>,
}

/// Adapts `handler` to the chain, parking contexts in `store`.
///
/// [`Pipeline::push_plain`](crate::Pipeline::push_plain) calls this with the
/// pipeline's own store.
pub fn wrap<H: PlainHandler>(handler: H, store: Arc<ContextStore>) -> Wrap<H> {
    Wrap { inner: handler, store }
}

impl<H> Wrap<H> {
    pub fn get_ref(&self) -> &H {
        &self.inner
    }
}

impl<H: PlainHandler> Handler for Wrap<H> {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        let ctx = {
            let parked = self.store.enter(req.id(), ctx);
            self.inner.handle(rw, req);
            self.store.get(req.id()).unwrap_or_else(|| parked.context().clone())
        };
        next.run(ctx, rw, req);
    }
}

impl<H> fmt::Debug for Wrap<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrap")
            .field("handler", &std::any::type_name::<H>())
            .finish_non_exhaustive()
    }
}
