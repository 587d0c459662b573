//! Feeds a generated test tone through the configured pipeline.
//!
//! Exercises the audio path end to end: WAV header synthesis, appsrc
//! delivery with backpressure, and the end-of-stream handshake.
//!
//! ```text
//! avfeed-check --seconds 5 --config avfeed.toml
//! ```

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use avfeed_core::config::AudioFormat;
use avfeed_core::{SampleUnit, Session};
use avfeed_gst::{config, FeedPipeline, PipelineRuntime};
use bytes::{BufMut, Bytes, BytesMut};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Audio chunk duration, matching a typical capture callback.
const CHUNK: Duration = Duration::from_millis(20);

/// Upper bound for `--seconds`: one day.
const MAX_SECONDS: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "avfeed-check", about = "Feed a test tone through an avfeed pipeline")]
struct Cli {
    /// TOML config file. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds of audio to feed.
    #[arg(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..=MAX_SECONDS)
    )]
    seconds: u64,

    /// Tone frequency in Hz.
    #[arg(long, default_value_t = 440.0)]
    frequency: f64,
}

struct Tone {
    format: AudioFormat,
    frequency: f64,
    frame: u64,
}

impl Tone {
    fn new(format: AudioFormat, frequency: f64) -> Self {
        Self {
            format,
            frequency,
            frame: 0,
        }
    }

    fn next_chunk(&mut self, duration: Duration) -> Bytes {
        let frames = u64::from(self.format.sample_rate) * duration.as_millis() as u64 / 1000;
        let mut buf =
            BytesMut::with_capacity(frames as usize * usize::from(self.format.block_align()));
        for _ in 0..frames {
            let t = self.frame as f64 / f64::from(self.format.sample_rate);
            let value = (t * self.frequency * TAU).sin() * 0.2;
            for _ in 0..self.format.channels {
                put_sample(&mut buf, self.format.bits_per_sample, value);
            }
            self.frame += 1;
        }
        buf.freeze()
    }
}

/// `value` in [-1, 1], written in WAV sample encoding.
fn put_sample(buf: &mut BytesMut, bits_per_sample: u16, value: f64) {
    match bits_per_sample {
        8 => buf.put_u8((value * 127.0 + 128.0) as u8),
        16 => buf.put_i16_le((value * f64::from(i16::MAX)) as i16),
        24 => buf.put_int_le((value * 8_388_607.0) as i64, 3),
        _ => buf.put_i32_le((value * f64::from(i32::MAX)) as i32),
    }
}

fn chunk_count(seconds: u64) -> u64 {
    seconds.saturating_mul(1000) / CHUNK.as_millis() as u64
}

/// Start of chunk `index`, relative to the first chunk.
fn chunk_offset(index: u64) -> Duration {
    Duration::from_millis(index.saturating_mul(CHUNK.as_millis() as u64))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref())?;
    gst::init().context("failed to initialize GStreamer")?;

    let pipeline = FeedPipeline::from_config(&config)?;
    let mut runtime = PipelineRuntime::new();
    runtime.start().context("failed to start the glib main loop")?;
    pipeline.play()?;

    let mut session = Session::new(pipeline.outputs(), &config);
    session.start()?;

    let mut tone = Tone::new(config.audio, cli.frequency);
    let chunks = chunk_count(cli.seconds);
    info!(seconds = cli.seconds, chunks, "feeding test tone");

    let started = Instant::now();
    let mut fatal = None;
    for i in 0..chunks {
        let pts = chunk_offset(i).as_nanos() as u64;
        let unit = SampleUnit::audio(tone.next_chunk(CHUNK), pts);
        if let Err(e) = session.consume(unit) {
            if e.is_fatal() {
                fatal = Some(e);
                break;
            }
            warn!("chunk {i} dropped: {e}");
        }
        // Pace like a live capture source.
        let due = started + chunk_offset(i + 1);
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    let stopped = session.stop();
    // A session closed by a fatal error skips the drain, which is what
    // normally takes the pipeline down.
    if let Err(e) = pipeline.shutdown() {
        warn!("failed to shut the pipeline down: {e}");
    }
    runtime.stop();

    let stats = session.stats();
    info!(
        wav_headers = stats.wav_headers,
        audio_buffers = stats.audio_buffers,
        bytes = stats.bytes_delivered,
        failures = stats.delivery_failures,
        "session finished"
    );

    if let Some(e) = fatal {
        return Err(e).context("session closed while feeding");
    }
    stopped.context("end of stream was not acknowledged")?;
    Ok(())
}
