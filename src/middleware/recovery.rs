use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use http::StatusCode;

use super::sink::{Event, Sink, TracingSink};
use crate::chain::Next;
use crate::context::Context;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{ResponseRecorder, ResponseWriter};

/// Turns a panic anywhere downstream into a `500 Internal Server Error`.
///
/// The panic is logged through the sink and never propagates past this
/// handler. With [`print_stack`](Self::print_stack) on (the default) the
/// message and backtrace are also written into the response body, which is
/// convenient in development and should be turned off in production.
///
/// If downstream already sent a status before panicking, that status stands;
/// only the body is appended to.
#[derive(Clone)]
pub struct Recovery {
    sink: Arc<dyn Sink>,
    print_stack: bool,
    capture_backtrace: bool,
}

impl Recovery {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            print_stack: true,
            capture_backtrace: true,
        }
    }

    /// Echo the panic message and backtrace into the response body.
    pub fn print_stack(mut self, yes: bool) -> Self {
        self.print_stack = yes;
        self
    }

    /// Capture a backtrace at the panic site. Enabling this installs a
    /// process-wide panic hook (once) that chains to the previous hook.
    pub fn capture_backtrace(mut self, yes: bool) -> Self {
        self.capture_backtrace = yes;
        self
    }

    pub fn sink(mut self, sink: impl Sink) -> Self {
        self.sink = Arc::new(sink);
        self
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("print_stack", &self.print_stack)
            .field("capture_backtrace", &self.capture_backtrace)
            .finish_non_exhaustive()
    }
}

impl Handler for Recovery {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        if self.capture_backtrace {
            install_backtrace_hook();
            // Worker threads are reused, so drop whatever an earlier panic left.
            take_backtrace();
        }

        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| next.run(ctx, rw, req))) else {
            return;
        };

        let message = panic_message(&*payload);
        let backtrace = self
            .capture_backtrace
            .then(take_backtrace)
            .flatten()
            .map(|bt| bt.to_string());

        rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        self.sink.event(&Event::Panicked {
            request: req.id(),
            message: &message,
            backtrace: backtrace.as_deref(),
        });

        if self.print_stack {
            let _ = write!(rw, "PANIC: {message}\n{}", backtrace.as_deref().unwrap_or(""));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

// ── Backtrace capture ─────────────────────────────────────────────────────────
//
// By the time catch_unwind returns the stack has already unwound, so the
// backtrace has to be taken inside the panic hook and handed over through a
// thread-local.

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

fn install_backtrace_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            previous(info);
        }));
    });
}

fn take_backtrace() -> Option<Backtrace> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}
