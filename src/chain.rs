//! The handler chain and its cursor.
//!
//! A [`Chain`] is an immutable slice of handlers. Running it creates a
//! [`Next`] over the whole slice; each handler receives a `Next` over the
//! handlers after it:
//!
//! ```text
//! handlers: [ logger, recovery, app ]
//!
//! Next[0..] ─run─▶ logger.serve(.., Next[1..])
//!                      └─run─▶ recovery.serve(.., Next[2..])
//!                                  └─run─▶ app.serve(.., Next[3..])
//!                                              └─run─▶ (empty: no-op)
//! ```
//!
//! Before-phases therefore execute in list order and after-phases in reverse,
//! as ordinary nested calls on the request's thread.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::ResponseRecorder;

/// An immutable, cheaply clonable sequence of handlers.
///
/// Appending to a pipeline builds a new `Chain`; existing chains are never
/// modified.
#[derive(Clone)]
pub struct Chain {
    handlers: Arc<[BoxedHandler]>,
}

impl Chain {
    /// Builds a chain whose first handler is the outermost.
    pub fn build(handlers: &[BoxedHandler]) -> Self {
        Self { handlers: handlers.iter().cloned().collect() }
    }

    /// Drives `req` through the chain. An empty chain does nothing.
    pub fn run(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request) {
        Next { rest: &self.handlers }.run(ctx, rw, req)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::build(&[])
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

/// The remainder of the chain after the current handler.
///
/// Not `Clone`: calling [`run`](Next::run) consumes it.
pub struct Next<'a> {
    rest: &'a [BoxedHandler],
}

impl Next<'_> {
    /// Hands the request to the next handler. At the end of the chain this
    /// is a no-op.
    pub fn run(self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request) {
        if let Some((first, rest)) = self.rest.split_first() {
            first.serve(ctx, rw, req, Next { rest });
        }
    }

    /// Handlers still ahead of the caller.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}
