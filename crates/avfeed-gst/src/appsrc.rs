//! Session ports backed by `appsrc`.
//!
//! The appsrc runs live in time format and blocks `push-buffer` while its
//! internal queue is full, so a slow pipeline stalls the session's capture
//! callback rather than dropping data.

use std::time::Duration;

use avfeed_core::sink::{BufferKind, SinkError, SinkPort, TimedBuffer};
use gst::prelude::*;
use gst_app::AppSrc;
use tracing::debug;

/// Annex-B H.264, one NAL unit per buffer.
pub fn video_caps() -> gst::Caps {
    gst::Caps::builder("video/x-h264")
        .field("stream-format", "byte-stream")
        .field("alignment", "nal")
        .build()
}

/// WAV stream: a RIFF header followed by raw PCM.
pub fn audio_caps() -> gst::Caps {
    gst::Caps::new_empty_simple("audio/x-wav")
}

/// Builds a live, time-format appsrc that blocks when full.
pub fn build_appsrc(name: &str, caps: &gst::Caps) -> AppSrc {
    AppSrc::builder()
        .name(name)
        .caps(caps)
        .is_live(true)
        .format(gst::Format::Time)
        .block(true)
        .build()
}

pub struct AppSrcPort {
    appsrc: AppSrc,
}

impl AppSrcPort {
    pub fn new(appsrc: AppSrc) -> Self {
        Self { appsrc }
    }

    pub fn appsrc(&self) -> &AppSrc {
        &self.appsrc
    }
}

fn buffer_flags(kind: BufferKind) -> gst::BufferFlags {
    if kind.is_header() {
        gst::BufferFlags::HEADER
    } else if kind == BufferKind::DeltaFrame {
        gst::BufferFlags::DELTA_UNIT
    } else {
        gst::BufferFlags::empty()
    }
}

/// Wraps a timed buffer without copying its payload. The timestamp is
/// carried as nanoseconds; DTS is left unset.
pub fn to_gst_buffer(buffer: TimedBuffer) -> gst::Buffer {
    let TimedBuffer { data, pts, kind } = buffer;
    let mut gst_buffer = gst::Buffer::from_slice(data);
    {
        let buffer_ref = gst_buffer.make_mut();
        // u64::MAX is GST_CLOCK_TIME_NONE
        if pts != u64::MAX {
            buffer_ref.set_pts(gst::ClockTime::from_nseconds(pts));
        }
        buffer_ref.set_flags(buffer_flags(kind));
    }
    gst_buffer
}

fn flow_error(err: gst::FlowError) -> SinkError {
    match err {
        gst::FlowError::Flushing | gst::FlowError::Eos => SinkError::Closed,
        other => SinkError::Rejected(format!("{other:?}")),
    }
}

impl SinkPort for AppSrcPort {
    fn push(&mut self, buffer: TimedBuffer) -> Result<(), SinkError> {
        self.appsrc
            .push_buffer(to_gst_buffer(buffer))
            .map(|_| ())
            .map_err(flow_error)
    }

    /// appsrc queues end-of-stream without waiting for queue space, so the
    /// timeout is never reached.
    fn end_of_stream(&mut self, _timeout: Duration) -> Result<(), SinkError> {
        debug!(appsrc = %self.appsrc.name(), "signalling end of stream");
        self.appsrc.end_of_stream().map(|_| ()).map_err(flow_error)
    }
}
