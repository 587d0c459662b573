//! GStreamer downstream for avfeed sessions.
//!
//! - [`appsrc`]: `SinkPort` over an `appsrc` element
//! - [`eos`]: End-of-stream watch on the pipeline bus
//! - [`pipeline`]: Default playback pipeline and custom launch descriptions
//! - [`runtime`]: GLib main loop thread driving the pipeline
//! - [`config`]: Config file loading

pub mod appsrc;
pub mod config;
pub mod eos;
pub mod pipeline;
pub mod runtime;

pub use appsrc::AppSrcPort;
pub use eos::BusEosWatch;
pub use pipeline::{FeedPipeline, PipelineError};
pub use runtime::PipelineRuntime;
