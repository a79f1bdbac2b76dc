use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use tracing::{error, info};

use crate::request::RequestId;

/// Something a built-in middleware wants recorded.
#[derive(Debug)]
pub enum Event<'a> {
    /// A request entered the [`Logger`](super::Logger).
    Started {
        request: RequestId,
        method: &'a Method,
        path: &'a str,
    },
    /// The rest of the chain returned to the [`Logger`](super::Logger).
    Completed {
        request: RequestId,
        method: &'a Method,
        path: &'a str,
        status: StatusCode,
        elapsed: Duration,
    },
    /// [`Recovery`](super::Recovery) caught a panic.
    Panicked {
        request: RequestId,
        message: &'a str,
        backtrace: Option<&'a str>,
    },
}

/// Where middleware events go.
pub trait Sink: Send + Sync + 'static {
    fn event(&self, event: &Event<'_>);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn event(&self, event: &Event<'_>) {
        (**self).event(event)
    }
}

/// Emits each [`Event`] as a `tracing` event: `info` for request lines,
/// `error` for panics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn event(&self, event: &Event<'_>) {
        match *event {
            Event::Started { request, method, path } => {
                info!(%request, %method, path, "started {method} {path}");
            }
            Event::Completed { request, method, path, status, elapsed } => {
                info!(
                    %request,
                    %method,
                    path,
                    status = status.as_u16(),
                    ?elapsed,
                    "completed {} {} in {elapsed:?}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or(""),
                );
            }
            Event::Panicked { request, message, backtrace } => {
                error!(%request, "PANIC: {message}\n{}", backtrace.unwrap_or(""));
            }
        }
    }
}
