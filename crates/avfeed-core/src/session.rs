//! # Session Controller
//!
//! Sequences every incoming [`SampleUnit`] onto the output ports and owns
//! the session lifecycle:
//!
//! ```text
//! Idle ──start()──▶ Active ──stop()──▶ Draining ──ack / timeout──▶ Closed
//!                     │  ▲
//!                     └──┘ consume(unit)
//! any state ──fatal sink error──▶ Closed
//! ```
//!
//! Video units are timestamp-normalized, optionally preceded by their PPS and
//! SPS, then reframed to Annex-B. The first audio unit of a session is
//! preceded by a synthesized WAV header. A malformed video payload drops the
//! rest of that unit and the session carries on; sink failures follow the
//! feeder's escalation policy.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, error, info, trace, warn};

use crate::annexb;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::feeder::StreamFeeder;
use crate::nal;
use crate::sample::{MediaType, SampleUnit};
use crate::sink::{BufferKind, EosOutcome, EosWatch, Outputs, Port, TimedBuffer};
use crate::stats::SessionStats;
use crate::timestamp;
use crate::wav;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Draining,
    Closed,
}

pub struct Session {
    state: SessionState,
    feeder: StreamFeeder,
    eos: Box<dyn EosWatch>,
    eos_timeout: Duration,
    wav_header: Bytes,
    first_audio_sample_seen: bool,
    stats: SessionStats,
}

impl Session {
    /// Creates an idle session over `outputs`.
    pub fn new(outputs: Outputs, config: &FeedConfig) -> Self {
        Self {
            state: SessionState::Idle,
            feeder: StreamFeeder::new(
                outputs.video,
                outputs.audio,
                config.session.max_delivery_failures,
            ),
            eos: outputs.eos,
            eos_timeout: config.session.eos_timeout,
            wav_header: wav::header(&config.audio),
            first_audio_sample_seen: false,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn first_audio_sample_seen(&self) -> bool {
        self.first_audio_sample_seen
    }

    /// `Idle → Active`. Starting an active session is a no-op.
    pub fn start(&mut self) -> Result<(), FeedError> {
        match self.state {
            SessionState::Idle => {
                self.first_audio_sample_seen = false;
                self.state = SessionState::Active;
                info!("session started");
                Ok(())
            }
            SessionState::Active => Ok(()),
            SessionState::Draining | SessionState::Closed => Err(FeedError::SessionClosed),
        }
    }

    /// Processes one sample unit.
    ///
    /// Non-fatal errors (malformed payload, a rejected buffer) leave the
    /// session active; fatal ones close it.
    pub fn consume(&mut self, unit: SampleUnit) -> Result<(), FeedError> {
        match self.state {
            SessionState::Active => {}
            SessionState::Idle => return Err(FeedError::NotStarted),
            SessionState::Draining | SessionState::Closed => return Err(FeedError::SessionClosed),
        }

        self.stats.units += 1;
        let result = match unit.media_type {
            MediaType::Video => self.consume_video(unit),
            MediaType::Audio => self.consume_audio(unit),
        };
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    fn consume_video(&mut self, unit: SampleUnit) -> Result<(), FeedError> {
        self.feeder.ensure_port(Port::Video)?;

        let pts = timestamp::normalize(unit.presentation_timestamp);
        if pts != unit.presentation_timestamp {
            debug!(
                raw = unit.presentation_timestamp,
                "sentinel video timestamp normalized to zero"
            );
        }
        debug!(
            pts,
            len = unit.payload.len(),
            format_change = unit.has_format_description(),
            "video unit"
        );

        if let Some(fd) = &unit.format_description {
            for parameter_set in [&fd.pps, &fd.sps] {
                self.deliver(
                    Port::Video,
                    TimedBuffer::new(
                        annexb::with_start_code(parameter_set),
                        pts,
                        BufferKind::ParameterSet,
                    ),
                )?;
            }
        }

        for record in annexb::records(&unit.payload) {
            let nal = record?;
            let kind = match nal::parse_h264_nal(nal) {
                Some(info) => {
                    trace!(nal_type = nal::nal_type_name(info.nal_type), len = nal.len(), "nal unit");
                    match info.class {
                        nal::NalClass::ParameterSet => BufferKind::ParameterSet,
                        nal::NalClass::Keyframe => BufferKind::KeyFrame,
                        _ => BufferKind::DeltaFrame,
                    }
                }
                None => BufferKind::DeltaFrame,
            };
            self.deliver(
                Port::Video,
                TimedBuffer::new(annexb::with_start_code(nal), pts, kind),
            )?;
        }
        Ok(())
    }

    fn consume_audio(&mut self, unit: SampleUnit) -> Result<(), FeedError> {
        self.feeder.ensure_port(Port::Audio)?;

        if !self.first_audio_sample_seen {
            self.deliver(
                Port::Audio,
                TimedBuffer::new(self.wav_header.clone(), 0, BufferKind::AudioHeader),
            )?;
            self.first_audio_sample_seen = true;
            info!(len = self.wav_header.len(), "wav header sent");
        }

        // Audio timestamps are delivered as captured.
        let pts = unit.presentation_timestamp;
        debug!(pts, len = unit.payload.len(), "audio unit");
        self.deliver(
            Port::Audio,
            TimedBuffer::new(unit.payload, pts, BufferKind::AudioData),
        )
    }

    fn deliver(&mut self, port: Port, buffer: TimedBuffer) -> Result<(), FeedError> {
        let kind = buffer.kind;
        let len = buffer.data.len();
        self.feeder.deliver(port, buffer)?;
        self.stats.record_delivery(kind, len);
        Ok(())
    }

    fn record_failure(&mut self, err: &FeedError) {
        match err {
            FeedError::MalformedBuffer(framing) => {
                self.stats.malformed_units += 1;
                warn!(error = %framing, "malformed video unit, remaining frames dropped");
            }
            FeedError::DeliveryFailed { port, source } => {
                self.stats.delivery_failures += 1;
                warn!(%port, error = %source, "buffer delivery failed");
            }
            fatal => {
                if matches!(fatal, FeedError::DeliveryEscalated { .. }) {
                    self.stats.delivery_failures += 1;
                }
                error!(error = %fatal, "closing session");
                self.state = SessionState::Closed;
            }
        }
    }

    /// Drains and closes the session.
    ///
    /// Sends end-of-stream on both ports, then waits for the downstream to
    /// acknowledge. Sending and waiting share the configured timeout, so a
    /// stalled port cannot hold `stop` past it. The session is `Closed` when
    /// this returns, whatever the outcome.
    pub fn stop(&mut self) -> Result<(), FeedError> {
        match self.state {
            SessionState::Closed => return Ok(()),
            SessionState::Idle => {
                self.state = SessionState::Closed;
                info!("idle session closed");
                return Ok(());
            }
            SessionState::Active | SessionState::Draining => {}
        }

        info!("stopping session");
        self.state = SessionState::Draining;
        let deadline = Instant::now() + self.eos_timeout;
        self.send_end_of_stream(deadline);

        let outcome = self
            .eos
            .wait(deadline.saturating_duration_since(Instant::now()));
        self.state = SessionState::Closed;
        match outcome {
            EosOutcome::Acknowledged => {
                info!(stats = ?self.stats, "end-of-stream acknowledged, session closed");
                Ok(())
            }
            EosOutcome::TimedOut => {
                warn!(
                    timeout_ms = self.eos_timeout.as_millis() as u64,
                    "no end-of-stream received, output might be incomplete"
                );
                Err(FeedError::EndOfStreamTimeout {
                    waited: self.eos_timeout,
                })
            }
            EosOutcome::Failed(reason) => {
                warn!(error = %reason, "downstream error while draining, output might be incomplete");
                Err(FeedError::Downstream(reason))
            }
        }
    }

    fn send_end_of_stream(&mut self, deadline: Instant) {
        for port in [Port::Audio, Port::Video] {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(e) = self.feeder.end_of_stream(port, remaining) {
                warn!(%port, error = %e, "failed sending end-of-stream");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            warn!("active session dropped without stop, sending end-of-stream");
            self.send_end_of_stream(Instant::now() + self.eos_timeout);
        }
    }
}
