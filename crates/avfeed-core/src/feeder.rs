//! # Stream Feeder
//!
//! Owns the video and audio ports and hands them fully framed buffers, one
//! at a time, in call order. Delivery blocks for as long as the port takes
//! to accept; that is the only backpressure in the system.
//!
//! Each port keeps a streak of consecutive failed deliveries. A success
//! resets it; reaching the configured limit escalates the failure to
//! [`FeedError::DeliveryEscalated`].

use std::time::Duration;

use tracing::trace;

use crate::error::FeedError;
use crate::sink::{Port, SinkPort, TimedBuffer};

struct PortSlot {
    sink: Option<Box<dyn SinkPort>>,
    failure_streak: u32,
}

impl PortSlot {
    fn new(sink: Option<Box<dyn SinkPort>>) -> Self {
        Self {
            sink,
            failure_streak: 0,
        }
    }
}

pub struct StreamFeeder {
    video: PortSlot,
    audio: PortSlot,
    max_failures: u32,
}

impl StreamFeeder {
    /// `max_failures == 0` never escalates.
    pub fn new(
        video: Option<Box<dyn SinkPort>>,
        audio: Option<Box<dyn SinkPort>>,
        max_failures: u32,
    ) -> Self {
        Self {
            video: PortSlot::new(video),
            audio: PortSlot::new(audio),
            max_failures,
        }
    }

    fn slot(&self, port: Port) -> &PortSlot {
        match port {
            Port::Video => &self.video,
            Port::Audio => &self.audio,
        }
    }

    fn slot_mut(&mut self, port: Port) -> &mut PortSlot {
        match port {
            Port::Video => &mut self.video,
            Port::Audio => &mut self.audio,
        }
    }

    /// Fails with `SinkUnavailable` if `port` has no sink attached.
    pub fn ensure_port(&self, port: Port) -> Result<(), FeedError> {
        if self.slot(port).sink.is_some() {
            Ok(())
        } else {
            Err(FeedError::SinkUnavailable {
                port,
                reason: "no sink attached".into(),
            })
        }
    }

    pub fn failure_streak(&self, port: Port) -> u32 {
        self.slot(port).failure_streak
    }

    /// Delivers one buffer, blocking until the port accepted it.
    pub fn deliver(&mut self, port: Port, buffer: TimedBuffer) -> Result<(), FeedError> {
        let max_failures = self.max_failures;
        let slot = self.slot_mut(port);
        let Some(sink) = slot.sink.as_mut() else {
            return Err(FeedError::SinkUnavailable {
                port,
                reason: "no sink attached".into(),
            });
        };

        let pts = buffer.pts;
        let len = buffer.data.len();
        let kind = buffer.kind;
        match sink.push(buffer) {
            Ok(()) => {
                slot.failure_streak = 0;
                trace!(%port, pts, len, ?kind, "buffer delivered");
                Ok(())
            }
            Err(source) => {
                slot.failure_streak += 1;
                if max_failures > 0 && slot.failure_streak >= max_failures {
                    Err(FeedError::DeliveryEscalated {
                        port,
                        failures: slot.failure_streak,
                        source,
                    })
                } else {
                    Err(FeedError::DeliveryFailed { port, source })
                }
            }
        }
    }

    /// Signals end-of-stream on `port`, giving up after `timeout`.
    pub fn end_of_stream(&mut self, port: Port, timeout: Duration) -> Result<(), FeedError> {
        let Some(sink) = self.slot_mut(port).sink.as_mut() else {
            return Err(FeedError::SinkUnavailable {
                port,
                reason: "no sink attached".into(),
            });
        };
        sink.end_of_stream(timeout)
            .map_err(|source| FeedError::DeliveryFailed { port, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{channel_port, BufferKind, PortItem, SinkError};
    use bytes::Bytes;

    /// Port that rejects every push after the first `accept` ones.
    struct FlakyPort {
        accept: usize,
    }

    impl SinkPort for FlakyPort {
        fn push(&mut self, _buffer: TimedBuffer) -> Result<(), SinkError> {
            if self.accept == 0 {
                return Err(SinkError::Rejected("flushing".into()));
            }
            self.accept -= 1;
            Ok(())
        }

        fn end_of_stream(&mut self, _timeout: Duration) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn frame(pts: u64) -> TimedBuffer {
        TimedBuffer::new(Bytes::from_static(&[0, 0, 0, 1, 0x41]), pts, BufferKind::DeltaFrame)
    }

    #[test]
    fn delivers_to_the_requested_port() {
        let (video, video_rx) = channel_port(4);
        let (audio, audio_rx) = channel_port(4);
        let mut feeder = StreamFeeder::new(Some(Box::new(video)), Some(Box::new(audio)), 0);

        feeder.deliver(Port::Video, frame(1)).unwrap();
        feeder.deliver(Port::Audio, frame(2)).unwrap();

        assert_eq!(video_rx.try_recv().unwrap(), PortItem::Buffer(frame(1)));
        assert_eq!(audio_rx.try_recv().unwrap(), PortItem::Buffer(frame(2)));
        assert!(video_rx.try_recv().is_err());
    }

    #[test]
    fn missing_port_is_unavailable() {
        let mut feeder = StreamFeeder::new(None, None, 0);
        assert!(matches!(
            feeder.ensure_port(Port::Audio),
            Err(FeedError::SinkUnavailable { port: Port::Audio, .. })
        ));
        assert!(matches!(
            feeder.deliver(Port::Video, frame(0)),
            Err(FeedError::SinkUnavailable { port: Port::Video, .. })
        ));
        assert!(matches!(
            feeder.end_of_stream(Port::Video, Duration::ZERO),
            Err(FeedError::SinkUnavailable { .. })
        ));
    }

    #[test]
    fn failure_streak_escalates_at_threshold() {
        let mut feeder = StreamFeeder::new(Some(Box::new(FlakyPort { accept: 1 })), None, 3);

        feeder.deliver(Port::Video, frame(0)).unwrap();
        assert!(matches!(
            feeder.deliver(Port::Video, frame(1)),
            Err(FeedError::DeliveryFailed { .. })
        ));
        assert!(matches!(
            feeder.deliver(Port::Video, frame(2)),
            Err(FeedError::DeliveryFailed { .. })
        ));
        assert_eq!(feeder.failure_streak(Port::Video), 2);
        assert!(matches!(
            feeder.deliver(Port::Video, frame(3)),
            Err(FeedError::DeliveryEscalated { failures: 3, .. })
        ));
    }

    #[test]
    fn success_resets_streak() {
        let (video, video_rx) = channel_port(1);
        let mut feeder = StreamFeeder::new(Some(Box::new(video)), None, 2);

        drop(video_rx);
        assert!(matches!(
            feeder.deliver(Port::Video, frame(0)),
            Err(FeedError::DeliveryFailed { source: SinkError::Closed, .. })
        ));
        assert_eq!(feeder.failure_streak(Port::Video), 1);

        let (video, _video_rx) = channel_port(1);
        feeder.video.sink = Some(Box::new(video));
        feeder.deliver(Port::Video, frame(1)).unwrap();
        assert_eq!(feeder.failure_streak(Port::Video), 0);
    }

    #[test]
    fn zero_threshold_never_escalates() {
        let mut feeder = StreamFeeder::new(Some(Box::new(FlakyPort { accept: 0 })), None, 0);
        for pts in 0..50 {
            assert!(matches!(
                feeder.deliver(Port::Video, frame(pts)),
                Err(FeedError::DeliveryFailed { .. })
            ));
        }
        assert_eq!(feeder.failure_streak(Port::Video), 50);
    }
}
