use crate::common::{Frame, HandLandmarks};
use crate::pipeline::context::metrics::FrameMetrics;
use crate::pipeline::context::state::{ClassifiedState, IngestedState, ProcessingState};
use crate::pipeline::domain::gesture::Classification;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the landmark source reported for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SensingOutcome {
    Hand(HandLandmarks),
    NoHand,
    /// The source failed or timed out; treated as no hand.
    Failed(String),
}

impl SensingOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SensingOutcome::Failed(_))
    }
}

// FrameContext with compile-time state tracking via the state marker
pub struct FrameContext<S> {
    frame: Arc<Frame>,
    metrics: FrameMetrics,
    processing_start: Instant,
    state: S,
}

impl<S> FrameContext<S> {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn shared_frame(&self) -> Arc<Frame> {
        self.frame.clone()
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }
}

impl<S: ProcessingState> FrameContext<S> {
    pub fn stage(&self) -> &'static str {
        S::state_name()
    }
}

impl FrameContext<IngestedState> {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame: Arc::new(frame),
            metrics: FrameMetrics::new(),
            processing_start: Instant::now(),
            state: IngestedState,
        }
    }

    pub fn record_sensing_duration(&mut self, duration: Duration) {
        self.metrics.record_sensing_duration(duration);
    }

    pub fn record_classification_duration(&mut self, duration: Duration) {
        self.metrics.record_classification_duration(duration);
    }

    pub fn into_classified(
        self,
        sensing: SensingOutcome,
        classification: Classification,
    ) -> FrameContext<ClassifiedState> {
        FrameContext::<ClassifiedState> {
            frame: self.frame,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: ClassifiedState {
                sensing,
                classification,
            },
        }
    }
}

impl FrameContext<ClassifiedState> {
    pub fn classification(&self) -> &Classification {
        &self.state.classification
    }

    pub fn sensing(&self) -> &SensingOutcome {
        &self.state.sensing
    }

    pub fn hand(&self) -> Option<&HandLandmarks> {
        self.state.hand()
    }
}
