//! Seams to the outside world that produce what the pipeline consumes: video
//! frames and hand landmarks. The landmark model itself is not part of this
//! crate; anything implementing [`LandmarkSource`] can drive the pipeline.

pub mod replay;
pub mod still;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{Frame, HandLandmarks};
use crate::error::SensingError;

pub use replay::ReplayLandmarkSource;
pub use still::StillFrameSource;

#[async_trait]
pub trait FrameSource: Send {
    async fn grab(&mut self) -> Result<Frame, SensingError>;
}

#[async_trait]
pub trait LandmarkSource: Send + Sync {
    /// Detects hands in `frame`. An empty vector means no hand is visible.
    async fn estimate(&self, frame: &Frame) -> Result<Vec<HandLandmarks>, SensingError>;

    fn name(&self) -> &'static str {
        "landmarks"
    }
}

/// Which hand drives the classifier when several are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSelection {
    /// The first hand in the model's output order.
    #[default]
    First,
    /// The hand with the largest bounding box.
    Largest,
}

impl HandSelection {
    pub fn select(self, hands: Vec<HandLandmarks>) -> Option<HandLandmarks> {
        match self {
            HandSelection::First => hands.into_iter().find(|hand| !hand.is_empty()),
            HandSelection::Largest => hands
                .into_iter()
                .filter(|hand| !hand.is_empty())
                .max_by(|a, b| a.bounding_area().total_cmp(&b.bounding_area())),
        }
    }
}
