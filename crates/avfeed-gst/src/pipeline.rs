//! # Feed Pipelines
//!
//! A [`FeedPipeline`] owns a GStreamer pipeline and the two appsrcs a
//! session feeds. It is either the built-in playback pipeline:
//!
//! ```text
//! video: appsrc ! queue ! h264parse ! <decoder> ! queue ! videoconvert ! queue ! autovideosink
//! audio: appsrc ! queue ! wavparse ! audioconvert ! queue ! autoaudiosink
//! ```
//!
//! or a caller-supplied launch description in which the appsrcs are linked
//! to two elements found by name.

use avfeed_core::config::{FeedConfig, PipelineConfig};
use avfeed_core::sink::{Outputs, Port};
use gst::glib;
use gst::prelude::*;
use gst_app::AppSrc;
use thiserror::Error;
use tracing::info;

use crate::appsrc::{audio_caps, build_appsrc, video_caps, AppSrcPort};
use crate::eos::BusEosWatch;

pub const VIDEO_SRC_NAME: &str = "avfeed_video_src";
pub const AUDIO_SRC_NAME: &str = "avfeed_audio_src";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot create '{factory}' element for the {port} branch: {source}")]
    ElementMissing {
        port: Port,
        factory: String,
        #[source]
        source: glib::BoolError,
    },

    #[error("invalid pipeline description: {0}")]
    Launch(#[source] glib::Error),

    #[error("pipeline description does not produce a pipeline")]
    NotAPipeline,

    #[error("no element named '{name}' to link the {port} source to")]
    TargetMissing { port: Port, name: String },

    #[error("cannot link the {port} branch: {source}")]
    Link {
        port: Port,
        #[source]
        source: glib::BoolError,
    },

    #[error("pipeline state change failed: {0}")]
    State(#[from] gst::StateChangeError),
}

pub struct FeedPipeline {
    pipeline: gst::Pipeline,
    video: AppSrc,
    audio: AppSrc,
}

fn make(port: Port, factory: &str, name: &str) -> Result<gst::Element, PipelineError> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|source| PipelineError::ElementMissing {
            port,
            factory: factory.to_string(),
            source,
        })
}

fn set_if_present(element: &gst::Element, property: &str, value: bool) {
    if element.find_property(property).is_some() {
        element.set_property(property, value);
    }
}

/// Adds `src` and `elements` to `pipeline` and links them in order.
fn add_branch(
    pipeline: &gst::Pipeline,
    port: Port,
    src: &AppSrc,
    elements: &[gst::Element],
) -> Result<(), PipelineError> {
    let link_err = |source| PipelineError::Link { port, source };
    let chain: Vec<&gst::Element> = std::iter::once(src.upcast_ref::<gst::Element>())
        .chain(elements.iter())
        .collect();
    pipeline.add_many(chain.iter().copied()).map_err(link_err)?;
    gst::Element::link_many(chain.iter().copied()).map_err(link_err)?;
    Ok(())
}

fn video_branch(decoder: &str) -> Result<Vec<gst::Element>, PipelineError> {
    let port = Port::Video;
    let elements = vec![
        make(port, "queue", "video_queue_in")?,
        make(port, "h264parse", "video_parse")?,
        make(port, decoder, "video_decoder")?,
        make(port, "queue", "video_queue_decoded")?,
        make(port, "videoconvert", "video_convert")?,
        make(port, "queue", "video_queue_out")?,
        make(port, "autovideosink", "video_sink")?,
    ];
    if let Some(sink) = elements.last() {
        set_if_present(sink, "sync", false);
    }
    Ok(elements)
}

fn audio_branch() -> Result<Vec<gst::Element>, PipelineError> {
    let port = Port::Audio;
    let queue_in = make(port, "queue", "audio_queue_in")?;
    let parse = make(port, "wavparse", "audio_parse")?;
    // The header's data length is a placeholder.
    parse.set_property("ignore-length", true);
    let convert = make(port, "audioconvert", "audio_convert")?;
    let queue_out = make(port, "queue", "audio_queue_out")?;
    let sink = make(port, "autoaudiosink", "audio_sink")?;
    set_if_present(&sink, "sync", false);
    Ok(vec![queue_in, parse, convert, queue_out, sink])
}

impl FeedPipeline {
    /// Builds the desktop playback pipeline.
    pub fn default_playback(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let pipeline = gst::Pipeline::with_name("avfeed-playback");
        let video = build_appsrc(VIDEO_SRC_NAME, &video_caps());
        let audio = build_appsrc(AUDIO_SRC_NAME, &audio_caps());

        add_branch(&pipeline, Port::Video, &video, &video_branch(&config.video_decoder)?)?;
        add_branch(&pipeline, Port::Audio, &audio, &audio_branch()?)?;

        info!(decoder = %config.video_decoder, "built playback pipeline");
        Ok(Self {
            pipeline,
            video,
            audio,
        })
    }

    /// Parses `launch` and links the appsrcs to the elements named by
    /// `config.video_target` and `config.audio_target`.
    pub fn custom(launch: &str, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let pipeline = gst::parse::launch(launch)
            .map_err(PipelineError::Launch)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| PipelineError::NotAPipeline)?;

        let target = |port: Port, name: &str| {
            pipeline
                .by_name(name)
                .ok_or_else(|| PipelineError::TargetMissing {
                    port,
                    name: name.to_string(),
                })
        };
        let video_target = target(Port::Video, &config.video_target)?;
        let audio_target = target(Port::Audio, &config.audio_target)?;

        let video = build_appsrc(VIDEO_SRC_NAME, &video_caps());
        let audio = build_appsrc(AUDIO_SRC_NAME, &audio_caps());
        for (port, src, sink) in [
            (Port::Video, &video, &video_target),
            (Port::Audio, &audio, &audio_target),
        ] {
            let link_err = |source| PipelineError::Link { port, source };
            pipeline.add(src).map_err(link_err)?;
            src.link(sink).map_err(link_err)?;
        }

        info!(
            video_target = %config.video_target,
            audio_target = %config.audio_target,
            "built custom pipeline"
        );
        Ok(Self {
            pipeline,
            video,
            audio,
        })
    }

    /// Custom pipeline when the config carries a launch description,
    /// playback pipeline otherwise.
    pub fn from_config(config: &FeedConfig) -> Result<Self, PipelineError> {
        match &config.pipeline.launch {
            Some(launch) => Self::custom(launch, &config.pipeline),
            None => Self::default_playback(&config.pipeline),
        }
    }

    pub fn play(&self) -> Result<(), PipelineError> {
        self.pipeline.set_state(gst::State::Playing)?;
        Ok(())
    }

    /// Sets the pipeline to `Null`. Safe to call after a drain already did.
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        self.pipeline.set_state(gst::State::Null)?;
        Ok(())
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    /// Ports and EOS watch for a session feeding this pipeline.
    pub fn outputs(&self) -> Outputs {
        Outputs::new(
            AppSrcPort::new(self.video.clone()),
            AppSrcPort::new(self.audio.clone()),
            BusEosWatch::new(self.pipeline.clone()),
        )
    }
}
