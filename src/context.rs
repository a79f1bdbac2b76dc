//! Request-scoped context values and cancellation.
//!
//! A [`Context`] is immutable. New values are layered on by deriving a child
//! with [`Context::with_value`]; the parent is never modified, so a context can
//! be shared between threads without locking.
//!
//! Cancellation flows downwards only. Cancelling a context derived with
//! [`Context::with_cancel`] cancels every context derived from it, never its
//! parent.
//!
//! ```rust
//! use strand::Context;
//!
//! struct UserId(u64);
//!
//! let root = Context::background();
//! let (ctx, guard) = root.with_cancel();
//! let ctx = ctx.with_value(UserId(7));
//!
//! assert_eq!(ctx.value::<UserId>().map(|u| u.0), Some(7));
//! assert!(root.value::<UserId>().is_none());
//!
//! drop(guard);
//! assert!(ctx.is_cancelled());
//! assert!(!root.is_cancelled());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

pub use tokio_util::sync::DropGuard;

/// A cancellable, immutable key-value carrier scoped to one request.
///
/// Values are keyed by their type. Cloning is one atomic increment.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    parent: Option<Context>,
    value: Option<Box<dyn Any + Send + Sync>>,
    token: CancellationToken,
}

impl Context {
    /// An empty root context that is never cancelled by strand.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: None,
                value: None,
                token: CancellationToken::new(),
            }),
        }
    }

    /// Derives a child carrying `value`. The child shares this context's
    /// cancellation signal.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                value: Some(Box::new(value)),
                token: self.inner.token.clone(),
            }),
        }
    }

    /// Derives a child with its own cancellation signal.
    ///
    /// Dropping the returned guard cancels the child and everything derived
    /// from it. Call [`DropGuard::disarm`] to take manual control of the token.
    pub fn with_cancel(&self) -> (Self, DropGuard) {
        let token = self.inner.token.child_token();
        let guard = token.clone().drop_guard();
        let ctx = Self {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                value: None,
                token,
            }),
        };
        (ctx, guard)
    }

    /// Returns the innermost value of type `T`, walking towards the root.
    pub fn value<T: Any>(&self) -> Option<&T> {
        let mut cur = self;
        loop {
            if let Some(boxed) = &cur.inner.value {
                let any: &(dyn Any + Send + Sync) = &**boxed;
                if let Some(v) = any.downcast_ref::<T>() {
                    return Some(v);
                }
            }
            cur = cur.inner.parent.as_ref()?;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolves once this context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// A handle on this context's cancellation signal, for work that outlives
    /// a borrow of the context.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// `true` if both handles point at the same context (not merely equal
    /// contents).
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cur = self.inner.parent.as_ref();
        while let Some(parent) = cur {
            depth += 1;
            cur = parent.inner.parent.as_ref();
        }
        depth
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
