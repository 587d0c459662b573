//! End-of-stream acknowledgment from the pipeline bus.

use std::time::Duration;

use avfeed_core::sink::{EosOutcome, EosWatch};
use gst::prelude::*;
use gst::MessageView;
use tracing::{debug, warn};

/// Waits for the pipeline's `Eos` (or first `Error`) message, then shuts
/// the pipeline down to `Null` whatever the outcome.
pub struct BusEosWatch {
    pipeline: gst::Pipeline,
}

impl BusEosWatch {
    pub fn new(pipeline: gst::Pipeline) -> Self {
        Self { pipeline }
    }

    fn pop(&self, timeout: Duration) -> EosOutcome {
        let Some(bus) = self.pipeline.bus() else {
            return EosOutcome::Failed("pipeline has no bus".into());
        };
        let timeout = gst::ClockTime::try_from(timeout).unwrap_or(gst::ClockTime::MAX);
        let Some(msg) =
            bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error])
        else {
            return EosOutcome::TimedOut;
        };
        match msg.view() {
            MessageView::Eos(..) => EosOutcome::Acknowledged,
            MessageView::Error(err) => {
                let src = err
                    .src()
                    .map(|s| s.path_string().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                EosOutcome::Failed(format!("{src}: {}", err.error()))
            }
            _ => EosOutcome::Failed("unexpected bus message".into()),
        }
    }
}

impl EosWatch for BusEosWatch {
    fn wait(&mut self, timeout: Duration) -> EosOutcome {
        let outcome = self.pop(timeout);
        debug!(?outcome, "end of stream wait finished");
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("failed to set pipeline to Null: {e}");
        }
        outcome
    }
}
