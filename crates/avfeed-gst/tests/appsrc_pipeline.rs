//! Sessions feeding real GStreamer pipelines built from `fakesink`.
//!
//! Skipped when GStreamer cannot be initialized or the core elements are
//! not installed.

use std::time::Duration;

use avfeed_core::config::PipelineConfig;
use avfeed_core::sink::{BufferKind, EosOutcome, EosWatch, SinkError, SinkPort, TimedBuffer};
use avfeed_core::{FeedConfig, FeedError, Port, SampleUnit, Session, SessionState};
use avfeed_gst::appsrc::{build_appsrc, video_caps};
use avfeed_gst::{AppSrcPort, BusEosWatch, FeedPipeline, PipelineError};
use bytes::Bytes;
use gst::prelude::*;

const TWO_SINKS: &str = "fakesink name=video_target sync=false \
                         fakesink name=audio_target sync=false";

fn gst_available() -> bool {
    gst::init().is_ok() && gst::ElementFactory::find("fakesink").is_some()
}

fn avcc(nals: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&(nal.len() as u32).to_be_bytes());
        out.extend_from_slice(nal);
    }
    out
}

fn short_eos_timeout() -> FeedConfig {
    let mut config = FeedConfig::default();
    config.session.eos_timeout = Duration::from_secs(5);
    config
}

#[test]
fn custom_pipeline_links_to_named_targets() {
    if !gst_available() {
        return;
    }
    let feed = FeedPipeline::custom(TWO_SINKS, &PipelineConfig::default()).unwrap();
    let pipeline = feed.pipeline();

    for (src, target) in [
        ("avfeed_video_src", "video_target"),
        ("avfeed_audio_src", "audio_target"),
    ] {
        let src = pipeline.by_name(src).unwrap();
        let peer = src.static_pad("src").unwrap().peer().unwrap();
        assert_eq!(peer.parent_element().unwrap().name().as_str(), target);
    }
}

#[test]
fn missing_target_is_reported_not_fatal() {
    if !gst_available() {
        return;
    }
    let err = FeedPipeline::custom(
        "fakesink name=video_target fakesink name=speakers",
        &PipelineConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        PipelineError::TargetMissing { port: Port::Audio, ref name } if name == "audio_target"
    ));
}

#[test]
fn unknown_element_in_description_is_a_launch_error() {
    if !gst_available() {
        return;
    }
    let err = FeedPipeline::custom("no_such_element_avfeed ! fakesink", &PipelineConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::Launch(_)));
}

#[test]
fn missing_decoder_is_element_missing() {
    if !gst_available() {
        return;
    }
    let config = PipelineConfig {
        video_decoder: "no_such_decoder_avfeed".into(),
        ..PipelineConfig::default()
    };
    match FeedPipeline::default_playback(&config) {
        Err(PipelineError::ElementMissing { port, factory, .. }) => {
            assert_eq!(port, Port::Video);
            // h264parse comes before the decoder and may be missing too
            assert!(factory == "no_such_decoder_avfeed" || factory == "h264parse");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("pipeline built with a nonexistent decoder"),
    }
}

#[test]
fn appsrc_port_push_then_eos_is_acknowledged() {
    if !gst_available() {
        return;
    }
    let pipeline = gst::Pipeline::new();
    let appsrc = build_appsrc("src", &video_caps());
    let sink = gst::ElementFactory::make("fakesink")
        .property("sync", false)
        .build()
        .unwrap();
    pipeline.add(&appsrc).unwrap();
    pipeline.add(&sink).unwrap();
    appsrc.link(&sink).unwrap();
    pipeline.set_state(gst::State::Playing).unwrap();

    let mut port = AppSrcPort::new(appsrc);
    for (i, kind) in [BufferKind::ParameterSet, BufferKind::KeyFrame, BufferKind::DeltaFrame]
        .into_iter()
        .enumerate()
    {
        port.push(TimedBuffer::new(
            Bytes::from_static(&[0, 0, 0, 1, 0x65, 0x88]),
            i as u64 * 33_000_000,
            kind,
        ))
        .unwrap();
    }
    port.end_of_stream(Duration::from_secs(1)).unwrap();

    let mut watch = BusEosWatch::new(pipeline.clone());
    assert_eq!(watch.wait(Duration::from_secs(5)), EosOutcome::Acknowledged);
    assert_eq!(pipeline.current_state(), gst::State::Null);
}

#[test]
fn eos_wait_times_out_without_end_of_stream() {
    if !gst_available() {
        return;
    }
    let pipeline = gst::Pipeline::new();
    let appsrc = build_appsrc("src", &video_caps());
    let sink = gst::ElementFactory::make("fakesink").build().unwrap();
    pipeline.add(&appsrc).unwrap();
    pipeline.add(&sink).unwrap();
    appsrc.link(&sink).unwrap();
    pipeline.set_state(gst::State::Playing).unwrap();

    let mut watch = BusEosWatch::new(pipeline.clone());
    assert_eq!(watch.wait(Duration::from_millis(50)), EosOutcome::TimedOut);
    assert_eq!(pipeline.current_state(), gst::State::Null);
}

#[test]
fn session_feeds_custom_pipeline_and_stops_cleanly() {
    if !gst_available() {
        return;
    }
    let config = short_eos_timeout();
    let feed = FeedPipeline::custom(TWO_SINKS, &config.pipeline).unwrap();
    feed.play().unwrap();

    let mut session = Session::new(feed.outputs(), &config);
    session.start().unwrap();

    let video = SampleUnit::video(avcc(&[&[0x65, 0x88, 0x84], &[0x06, 0x05]]), 1_000)
        .with_format_description(vec![0x67u8, 0x42, 0x00, 0x1F], vec![0x68u8, 0xCE]);
    session.consume(video).unwrap();
    session.consume(SampleUnit::audio(vec![0u8; 3840], 2_000)).unwrap();
    session.consume(SampleUnit::audio(vec![0u8; 3840], 22_000_000)).unwrap();

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    let stats = session.stats();
    assert_eq!(stats.parameter_sets, 2);
    assert_eq!(stats.video_frames, 2);
    assert_eq!(stats.keyframes, 1);
    assert_eq!(stats.wav_headers, 1);
    assert_eq!(stats.audio_buffers, 2);
    assert_eq!(feed.pipeline().current_state(), gst::State::Null);
}

#[test]
fn shutdown_after_fatal_close_stops_the_pipeline() {
    if !gst_available() {
        return;
    }
    let config = short_eos_timeout();
    let feed = FeedPipeline::custom(TWO_SINKS, &config.pipeline).unwrap();
    feed.play().unwrap();

    let mut outputs = feed.outputs();
    outputs.video = None;
    let mut session = Session::new(outputs, &config);
    session.start().unwrap();

    let err = session.consume(SampleUnit::video(avcc(&[&[0x65, 0x88]]), 0)).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Closed);

    // The closed session has nothing to drain, so the pipeline is still up.
    session.stop().unwrap();
    assert_ne!(feed.pipeline().current_state(), gst::State::Null);

    feed.shutdown().unwrap();
    assert_eq!(feed.pipeline().current_state(), gst::State::Null);
    feed.shutdown().unwrap();
}

#[test]
fn pushing_into_a_stopped_pipeline_fails_delivery() {
    if !gst_available() {
        return;
    }
    let config = short_eos_timeout();
    let feed = FeedPipeline::custom(TWO_SINKS, &config.pipeline).unwrap();
    feed.play().unwrap();
    // Back to Null: the appsrcs flush and refuse buffers.
    feed.pipeline().set_state(gst::State::Null).unwrap();

    let mut session = Session::new(feed.outputs(), &config);
    session.start().unwrap();

    let err = session.consume(SampleUnit::audio(vec![0u8; 64], 0)).unwrap_err();
    assert!(matches!(
        err,
        FeedError::DeliveryFailed { port: Port::Audio, source: SinkError::Closed }
    ));
    assert_eq!(session.state(), SessionState::Active);
    assert!(!session.first_audio_sample_seen());
}
