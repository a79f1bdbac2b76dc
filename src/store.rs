//! Request-keyed side channel for contexts.
//!
//! [`PlainHandler`](crate::PlainHandler)s never see a [`Context`]. When a
//! pipeline calls one through the [`Wrap`](crate::Wrap) adapter, the current
//! context is parked here under the request's [`RequestId`] for the duration
//! of the call. A pipeline nested inside that plain handler finds it again
//! and resumes instead of starting a fresh one.
//!
//! Each request maps to a stack so nested wraps unwind in order. Push and pop
//! must balance; popping anything other than the top of the stack is a bug in
//! how the chain was composed and panics.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::context::Context;
use crate::request::RequestId;

/// Thread-safe map from in-flight request to its stack of contexts.
///
/// Shared between a [`Pipeline`](crate::Pipeline) and the adapters it
/// creates through an `Arc`.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<RequestId, Vec<Context>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context on top of `id`'s stack, or `None` if the request has no
    /// entry.
    pub fn get(&self, id: RequestId) -> Option<Context> {
        self.contexts.read().get(&id).and_then(|stack| stack.last().cloned())
    }

    pub fn push(&self, id: RequestId, ctx: Context) {
        self.contexts.write().entry(id).or_default().push(ctx);
    }

    /// Pops `ctx` off `id`'s stack. The entry disappears with its last
    /// context.
    ///
    /// # Panics
    ///
    /// If the stack is empty or its top is not `ctx` (by identity).
    pub fn pop(&self, id: RequestId, ctx: &Context) {
        let mut contexts = self.contexts.write();
        let Some(stack) = contexts.get_mut(&id) else {
            panic!("unbalanced push/pop: request {id} has no contexts");
        };
        match stack.last() {
            Some(top) if Context::ptr_eq(top, ctx) => {}
            _ => panic!("unbalanced push/pop: request {id} popped a context it did not push last"),
        }
        stack.pop();
        if stack.is_empty() {
            contexts.remove(&id);
        }
    }

    /// Pushes `ctx` and returns a guard that pops it when dropped, including
    /// during unwinding.
    pub fn enter(&self, id: RequestId, ctx: Context) -> StoreGuard<'_> {
        self.push(id, ctx.clone());
        StoreGuard { store: self, id, ctx }
    }

    /// Number of contexts stacked for `id`.
    pub fn depth(&self, id: RequestId) -> usize {
        self.contexts.read().get(&id).map_or(0, Vec::len)
    }

    /// Number of requests with at least one context.
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pops its context from the store on drop. See [`ContextStore::enter`].
#[must_use = "dropping the guard pops the context immediately"]
pub struct StoreGuard<'a> {
    store: &'a ContextStore,
    id: RequestId,
    ctx: Context,
}

impl StoreGuard<'_> {
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Drop for StoreGuard<'_> {
    fn drop(&mut self) {
        self.store.pop(self.id, &self.ctx);
    }
}
