//! Capture sample units as delivered by the device capture source.

use bytes::Bytes;

use crate::sink::Port;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
}

impl MediaType {
    /// Output port this media type is delivered to.
    pub fn port(self) -> Port {
        match self {
            MediaType::Video => Port::Video,
            MediaType::Audio => Port::Audio,
        }
    }
}

/// H.264 parameter sets signaled alongside a video sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    pub sps: Bytes,
    pub pps: Bytes,
}

/// One unit of captured media.
///
/// Video payloads are a concatenation of `[u32 BE length][NAL unit]` records.
/// Audio payloads are raw PCM in the session's audio format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleUnit {
    pub media_type: MediaType,
    pub payload: Bytes,
    /// Presentation timestamp in capture-source ticks.
    pub presentation_timestamp: u64,
    pub format_description: Option<FormatDescription>,
}

impl SampleUnit {
    pub fn video(payload: impl Into<Bytes>, presentation_timestamp: u64) -> Self {
        Self {
            media_type: MediaType::Video,
            payload: payload.into(),
            presentation_timestamp,
            format_description: None,
        }
    }

    pub fn audio(payload: impl Into<Bytes>, presentation_timestamp: u64) -> Self {
        Self {
            media_type: MediaType::Audio,
            payload: payload.into(),
            presentation_timestamp,
            format_description: None,
        }
    }

    /// Attaches a format description (SPS/PPS) to this unit.
    pub fn with_format_description(mut self, sps: impl Into<Bytes>, pps: impl Into<Bytes>) -> Self {
        self.format_description = Some(FormatDescription {
            sps: sps.into(),
            pps: pps.into(),
        });
        self
    }

    pub fn has_format_description(&self) -> bool {
        self.format_description.is_some()
    }
}
