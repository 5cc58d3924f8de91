use serde::Serialize;
use std::time::Duration;

/// Metrics collected during frame processing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameMetrics {
    sensing_duration: Option<Duration>,
    classification_duration: Option<Duration>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sensing_duration(&mut self, duration: Duration) {
        self.sensing_duration = Some(duration);
    }

    pub fn record_classification_duration(&mut self, duration: Duration) {
        self.classification_duration = Some(duration);
    }

    pub fn sensing_duration(&self) -> Option<Duration> {
        self.sensing_duration
    }

    pub fn classification_duration(&self) -> Option<Duration> {
        self.classification_duration
    }
}
