//! Built-in middleware.
//!
//! Each component here is an ordinary [`Handler`](crate::Handler); nothing in
//! the core depends on them. [`Pipeline::classic`](crate::Pipeline::classic)
//! stacks the three of them in the usual order:
//!
//! | Component | Before `next` | After `next` |
//! |---|---|---|
//! | [`Recovery`] | arms a panic guard | turns a panic into `500` |
//! | [`Logger`] | logs method and path | logs status and latency |
//! | [`Static`] | serves a matching file, or delegates | nothing |
//!
//! Logger and Recovery report through a [`Sink`] rather than owning a logger,
//! so tests and applications can route their output anywhere. The default,
//! [`TracingSink`], emits `tracing` events.

mod logger;
mod recovery;
mod sink;
mod static_files;

pub use logger::Logger;
pub use recovery::Recovery;
pub use sink::{Event, Sink, TracingSink};
pub use static_files::Static;
