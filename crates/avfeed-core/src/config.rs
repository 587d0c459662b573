use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

// ── Raw input (all optional) ────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedConfigInput {
    pub version: u32,
    pub audio: AudioConfigInput,
    pub session: SessionConfigInput,
    pub pipeline: PipelineConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfigInput {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bits_per_sample: Option<u16>,
    pub header_duration_secs: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfigInput {
    pub eos_timeout_ms: Option<u64>,
    pub max_delivery_failures: Option<u32>,
    pub port_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfigInput {
    pub video_decoder: Option<String>,
    pub video_target: Option<String>,
    pub audio_target: Option<String>,
    pub launch: Option<String>,
}

// ── Resolved config ─────────────────────────────────────────────────

/// PCM format announced by the synthesized WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Duration the placeholder data chunk claims to cover.
    pub header_duration_secs: u32,
}

impl AudioFormat {
    /// Bytes per frame, saturating at `u16::MAX`.
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second, saturating at `u32::MAX`.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// Size of the placeholder data chunk, `None` if it overflows the RIFF size field.
    pub fn placeholder_data_len(&self) -> Option<u32> {
        let block_align = self.channels.checked_mul(self.bits_per_sample / 8)?;
        self.sample_rate
            .checked_mul(u32::from(block_align))?
            .checked_mul(self.header_duration_secs)
            .filter(|len| len.checked_add(36).is_some())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 16,
            header_duration_secs: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound on the wait for the downstream end-of-stream acknowledgment.
    pub eos_timeout: Duration,
    /// Consecutive failures on one port before the session closes. 0 disables.
    pub max_delivery_failures: u32,
    /// Queue depth of channel-backed ports.
    pub port_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            eos_timeout: Duration::from_secs(60),
            max_delivery_failures: 16,
            port_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub video_decoder: String,
    /// Element the video source links to in a custom pipeline.
    pub video_target: String,
    /// Element the audio source links to in a custom pipeline.
    pub audio_target: String,
    /// Custom pipeline description; the default playback pipeline when `None`.
    pub launch: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_decoder: "avdec_h264".to_string(),
            video_target: "video_target".to_string(),
            audio_target: "audio_target".to_string(),
            launch: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub version: u32,
    pub audio: AudioFormat,
    pub session: SessionConfig,
    pub pipeline: PipelineConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            audio: AudioFormat::default(),
            session: SessionConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl FeedConfigInput {
    pub fn resolve(self) -> Result<FeedConfig, ConfigError> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(version));
        }

        let defaults = FeedConfig::default();

        let audio = AudioFormat {
            sample_rate: self.audio.sample_rate.unwrap_or(defaults.audio.sample_rate),
            channels: self.audio.channels.unwrap_or(defaults.audio.channels),
            bits_per_sample: self
                .audio
                .bits_per_sample
                .unwrap_or(defaults.audio.bits_per_sample),
            header_duration_secs: self
                .audio
                .header_duration_secs
                .unwrap_or(defaults.audio.header_duration_secs),
        };
        if audio.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "audio.sample_rate",
                reason: "must be positive".into(),
            });
        }
        if audio.channels == 0 {
            return Err(ConfigError::Invalid {
                field: "audio.channels",
                reason: "must be positive".into(),
            });
        }
        if !matches!(audio.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(ConfigError::Invalid {
                field: "audio.bits_per_sample",
                reason: format!("{} is not one of 8, 16, 24, 32", audio.bits_per_sample),
            });
        }
        if audio.placeholder_data_len().is_none() {
            return Err(ConfigError::Invalid {
                field: "audio.header_duration_secs",
                reason: "placeholder data chunk does not fit a WAV header".into(),
            });
        }

        let session = SessionConfig {
            eos_timeout: self
                .session
                .eos_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.session.eos_timeout),
            max_delivery_failures: self
                .session
                .max_delivery_failures
                .unwrap_or(defaults.session.max_delivery_failures),
            port_capacity: self
                .session
                .port_capacity
                .unwrap_or(defaults.session.port_capacity)
                .max(1),
        };

        let pipeline = PipelineConfig {
            video_decoder: non_empty(self.pipeline.video_decoder)
                .unwrap_or(defaults.pipeline.video_decoder),
            video_target: non_empty(self.pipeline.video_target)
                .unwrap_or(defaults.pipeline.video_target),
            audio_target: non_empty(self.pipeline.audio_target)
                .unwrap_or(defaults.pipeline.audio_target),
            launch: non_empty(self.pipeline.launch),
        };

        Ok(FeedConfig {
            version,
            audio,
            session,
            pipeline,
        })
    }
}

impl FeedConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(FeedConfig::default());
        }
        let parsed: FeedConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}
