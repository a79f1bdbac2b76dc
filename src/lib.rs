//! # strand
//!
//! Middleware chains for HTTP services, with a request-scoped [`Context`]
//! threaded through every layer.
//!
//! ## The contract
//!
//! A pipeline is an ordered list of handlers. Each one sees the request
//! context, the response writer and the request, and decides whether to
//! pass them on:
//!
//! ```text
//! serve(ctx, rw, req, next)   →   next.run(ctx, rw, req)   →   …
//! ```
//!
//! Before-phases run in the order handlers were added; after-phases unwind in
//! reverse. A handler that does not call `next` ends the request there.
//!
//! What strand intentionally leaves to others:
//!
//! - **Routing**: mount a router as a [`PlainHandler`], or mount a pipeline
//!   inside a router. strand never matches paths.
//! - **TLS and connection handling**: hyper and whatever sits in front of it.
//! - **Sessions and auth**: write them as handlers.
//!
//! Handlers written without contexts in mind ([`PlainHandler`]) still fit:
//! [`Pipeline::push_plain`] wraps them so the chain continues after they
//! return, and parks the current context in the pipeline's [`ContextStore`]
//! while they run. A pipeline nested inside such a handler picks the context
//! up again instead of starting over.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::io::Write;
//! use strand::Pipeline;
//! use strand::middleware::{Logger, Recovery};
//!
//! struct RequestTag(&'static str);
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Pipeline::new()
//!         .handler(Recovery::new())
//!         .handler(Logger::new())
//!         .handler_fn(|ctx, rw, req, next| {
//!             next.run(ctx.with_value(RequestTag("web")), rw, req)
//!         })
//!         .plain_fn(|rw, req| {
//!             let _ = write!(rw, "hello from {}", req.path());
//!         });
//!
//!     app.run("0.0.0.0:3000").await.unwrap();
//! }
//! ```

mod adapter;
mod chain;
mod context;
mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod server;
mod store;

pub mod middleware;

pub use adapter::{wrap, Wrap};
pub use chain::{Chain, Next};
pub use context::{Context, DropGuard};
pub use error::Error;
pub use handler::{handler_fn, plain_fn, BoxedHandler, Handler, HandlerFn, PlainFn, PlainHandler};
pub use pipeline::Pipeline;
pub use request::{Request, RequestId};
pub use response::{ContentType, Response, ResponseRecorder, ResponseWriter};
pub use server::Server;
pub use store::{ContextStore, StoreGuard};

pub use http;
