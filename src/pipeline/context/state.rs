use crate::common::HandLandmarks;
use crate::pipeline::context::frame_context::SensingOutcome;
use crate::pipeline::domain::gesture::Classification;

// Markers to track the state of the frame processing pipeline
pub struct IngestedState;
pub struct ClassifiedState {
    pub(super) sensing: SensingOutcome,
    pub(super) classification: Classification,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for IngestedState {
    fn state_name() -> &'static str {
        "Ingested"
    }
}

impl ProcessingState for ClassifiedState {
    fn state_name() -> &'static str {
        "Classified"
    }
}

impl ClassifiedState {
    pub fn hand(&self) -> Option<&HandLandmarks> {
        match &self.sensing {
            SensingOutcome::Hand(hand) => Some(hand),
            _ => None,
        }
    }
}
