use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;

use super::sink::{Event, Sink, TracingSink};
use crate::chain::Next;
use crate::context::Context;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::ResponseRecorder;

/// Logs each request on the way in and its status and latency on the way
/// out.
///
/// The status is read from the [`ResponseRecorder`] after `next` returns; a
/// request nothing wrote to is reported as `200 OK`, which is what the client
/// receives.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Sink>,
}

impl Logger {
    /// A logger reporting to [`TracingSink`].
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }

    pub fn with_sink(sink: impl Sink) -> Self {
        Self { sink: Arc::new(sink) }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Handler for Logger {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        let start = Instant::now();
        self.sink.event(&Event::Started {
            request: req.id(),
            method: req.method(),
            path: req.path(),
        });

        next.run(ctx, rw, req);

        self.sink.event(&Event::Completed {
            request: req.id(),
            method: req.method(),
            path: req.path(),
            status: rw.status().unwrap_or(StatusCode::OK),
            elapsed: start.elapsed(),
        });
    }
}
