use std::time::Duration;

use thiserror::Error;

use crate::annexb::FramingError;
use crate::sink::{Port, SinkError};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FeedError {
    /// A declared NAL length does not fit the sample payload.
    #[error("malformed sample buffer: {0}")]
    MalformedBuffer(#[from] FramingError),

    /// The port rejected a buffer. The session keeps running.
    #[error("delivery to {port} port failed: {source}")]
    DeliveryFailed {
        port: Port,
        #[source]
        source: SinkError,
    },

    /// Consecutive delivery failures on one port reached the configured limit.
    #[error("{failures} consecutive delivery failures on {port} port: {source}")]
    DeliveryEscalated {
        port: Port,
        failures: u32,
        #[source]
        source: SinkError,
    },

    #[error("{port} port unavailable: {reason}")]
    SinkUnavailable { port: Port, reason: String },

    #[error("no end-of-stream acknowledgment within {waited:?}")]
    EndOfStreamTimeout { waited: Duration },

    #[error("downstream pipeline error while draining: {0}")]
    Downstream(String),

    #[error("session not started")]
    NotStarted,

    #[error("session closed")]
    SessionClosed,
}

impl FeedError {
    /// Whether this error closed the session that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FeedError::DeliveryEscalated { .. }
                | FeedError::SinkUnavailable { .. }
                | FeedError::EndOfStreamTimeout { .. }
                | FeedError::Downstream(_)
        )
    }
}
