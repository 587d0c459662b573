//! # Output Ports
//!
//! A session delivers to two ports, video and audio. Each port is a
//! [`SinkPort`]: a blocking `push` that returns once the downstream accepted
//! the buffer, plus an end-of-stream signal. The downstream acknowledges the
//! end of stream for the whole pipeline through an [`EosWatch`].
//!
//! [`channel_port`] and [`eos_channel`] back both with bounded crossbeam
//! channels, for consumers that live in the same process (and for tests).

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    Video,
    Audio,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Video => f.write_str("video"),
            Port::Audio => f.write_str("audio"),
        }
    }
}

/// What a delivered buffer contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Annex-B SPS or PPS.
    ParameterSet,
    /// Annex-B IDR slice.
    KeyFrame,
    /// Any other Annex-B NAL unit.
    DeltaFrame,
    /// Synthesized WAV header.
    AudioHeader,
    /// Raw PCM.
    AudioData,
}

impl BufferKind {
    /// Stream headers the decoder needs before any dependent data.
    pub fn is_header(self) -> bool {
        matches!(self, BufferKind::ParameterSet | BufferKind::AudioHeader)
    }
}

/// One discrete timestamped buffer handed to a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedBuffer {
    pub data: Bytes,
    /// Normalized presentation timestamp.
    pub pts: u64,
    pub kind: BufferKind,
}

impl TimedBuffer {
    pub fn new(data: Bytes, pts: u64, kind: BufferKind) -> Self {
        Self { data, pts, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The consumer went away (channel dropped, pipeline torn down).
    #[error("sink closed")]
    Closed,
    #[error("sink rejected buffer: {0}")]
    Rejected(String),
    #[error("sink did not accept within {0:?}")]
    TimedOut(Duration),
}

/// One output port of the downstream pipeline.
pub trait SinkPort: Send {
    /// Blocks until the downstream accepted `buffer`.
    fn push(&mut self, buffer: TimedBuffer) -> Result<(), SinkError>;

    /// Signals that no further buffers follow on this port. Returns within
    /// `timeout` even if the downstream is stalled.
    fn end_of_stream(&mut self, timeout: Duration) -> Result<(), SinkError>;
}

/// How the downstream answered the end-of-stream signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EosOutcome {
    Acknowledged,
    TimedOut,
    Failed(String),
}

/// Waits for the downstream to finish after end-of-stream was signaled.
pub trait EosWatch: Send {
    fn wait(&mut self, timeout: Duration) -> EosOutcome;
}

/// The pair of ports and the EOS watch a session feeds.
///
/// A `None` port is delivered to as unavailable, which closes the session.
pub struct Outputs {
    pub video: Option<Box<dyn SinkPort>>,
    pub audio: Option<Box<dyn SinkPort>>,
    pub eos: Box<dyn EosWatch>,
}

impl Outputs {
    pub fn new(
        video: impl SinkPort + 'static,
        audio: impl SinkPort + 'static,
        eos: impl EosWatch + 'static,
    ) -> Self {
        Self {
            video: Some(Box::new(video)),
            audio: Some(Box::new(audio)),
            eos: Box::new(eos),
        }
    }
}

// ── Channel-backed ports ────────────────────────────────────────────

/// Item observed by the consumer of a channel-backed port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortItem {
    Buffer(TimedBuffer),
    EndOfStream,
}

/// [`SinkPort`] over a bounded crossbeam channel.
///
/// `push` blocks while the channel is full, so a slow consumer throttles the
/// session. A dropped receiver turns into [`SinkError::Closed`].
#[derive(Debug, Clone)]
pub struct ChannelPort {
    tx: Sender<PortItem>,
}

/// Creates a channel-backed port holding at most `capacity` items.
pub fn channel_port(capacity: usize) -> (ChannelPort, Receiver<PortItem>) {
    let (tx, rx) = bounded(capacity);
    (ChannelPort { tx }, rx)
}

impl SinkPort for ChannelPort {
    fn push(&mut self, buffer: TimedBuffer) -> Result<(), SinkError> {
        self.tx
            .send(PortItem::Buffer(buffer))
            .map_err(|_| SinkError::Closed)
    }

    fn end_of_stream(&mut self, timeout: Duration) -> Result<(), SinkError> {
        self.tx
            .send_timeout(PortItem::EndOfStream, timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SinkError::TimedOut(timeout),
                SendTimeoutError::Disconnected(_) => SinkError::Closed,
            })
    }
}

/// Consumer side of [`eos_channel`]: reports how draining went.
#[derive(Debug, Clone)]
pub struct EosAck {
    tx: Sender<EosOutcome>,
}

impl EosAck {
    pub fn acknowledge(&self) {
        let _ = self.tx.try_send(EosOutcome::Acknowledged);
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.tx.try_send(EosOutcome::Failed(reason.into()));
    }
}

/// [`EosWatch`] fed by an [`EosAck`].
#[derive(Debug)]
pub struct ChannelEosWatch {
    rx: Receiver<EosOutcome>,
}

pub fn eos_channel() -> (EosAck, ChannelEosWatch) {
    let (tx, rx) = bounded(1);
    (EosAck { tx }, ChannelEosWatch { rx })
}

impl EosWatch for ChannelEosWatch {
    fn wait(&mut self, timeout: Duration) -> EosOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => EosOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => {
                EosOutcome::Failed("downstream dropped before acknowledging end-of-stream".into())
            }
        }
    }
}
