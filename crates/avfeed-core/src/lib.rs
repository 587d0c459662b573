//! # avfeed-core
//!
//! Turns device-captured sample units into the elementary streams a
//! real-time media pipeline consumes: an Annex-B H.264 byte stream with
//! in-band parameter sets, and a WAV-header-prefixed PCM stream.
//!
//! ## Crate structure
//!
//! - [`sample`]: Capture sample units and format descriptions
//! - [`annexb`]: Length-prefixed to Annex-B reframing
//! - [`nal`]: H.264 NAL header classification
//! - [`timestamp`]: Capture-source timestamp normalization
//! - [`wav`]: WAV header synthesis
//! - [`sink`]: Output port traits and channel-backed ports
//! - [`feeder`]: Ordered delivery to the video and audio ports
//! - [`session`]: Session lifecycle and per-unit sequencing
//! - [`config`]: Versioned TOML configuration
//! - [`stats`]: Session counters
//! - [`error`]: Error taxonomy

pub mod annexb;
pub mod config;
pub mod error;
pub mod feeder;
pub mod nal;
pub mod sample;
pub mod session;
pub mod sink;
pub mod stats;
pub mod timestamp;
pub mod wav;

pub use config::FeedConfig;
pub use error::FeedError;
pub use sample::{FormatDescription, MediaType, SampleUnit};
pub use session::{Session, SessionState};
pub use sink::{BufferKind, EosOutcome, EosWatch, Outputs, Port, SinkError, SinkPort, TimedBuffer};
