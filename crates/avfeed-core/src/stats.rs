//! Per-session delivery counters.

use crate::sink::BufferKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Sample units accepted by `consume`, including ones that later failed.
    pub units: u64,
    pub parameter_sets: u64,
    pub video_frames: u64,
    pub keyframes: u64,
    pub wav_headers: u64,
    pub audio_buffers: u64,
    pub bytes_delivered: u64,
    pub malformed_units: u64,
    pub delivery_failures: u64,
}

impl SessionStats {
    pub(crate) fn record_delivery(&mut self, kind: BufferKind, len: usize) {
        self.bytes_delivered += len as u64;
        match kind {
            BufferKind::ParameterSet => self.parameter_sets += 1,
            BufferKind::KeyFrame => {
                self.video_frames += 1;
                self.keyframes += 1;
            }
            BufferKind::DeltaFrame => self.video_frames += 1,
            BufferKind::AudioHeader => self.wav_headers += 1,
            BufferKind::AudioData => self.audio_buffers += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_delivery_by_kind() {
        let mut stats = SessionStats::default();
        stats.record_delivery(BufferKind::ParameterSet, 5);
        stats.record_delivery(BufferKind::KeyFrame, 100);
        stats.record_delivery(BufferKind::DeltaFrame, 20);
        stats.record_delivery(BufferKind::AudioHeader, 44);
        stats.record_delivery(BufferKind::AudioData, 3840);

        assert_eq!(stats.parameter_sets, 1);
        assert_eq!(stats.video_frames, 2);
        assert_eq!(stats.keyframes, 1);
        assert_eq!(stats.wav_headers, 1);
        assert_eq!(stats.audio_buffers, 1);
        assert_eq!(stats.bytes_delivered, 5 + 100 + 20 + 44 + 3840);
    }
}
