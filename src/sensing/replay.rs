use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::common::{Frame, HandLandmarks};
use crate::error::SensingError;
use crate::sensing::LandmarkSource;

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayEntry {
    Hands(Vec<HandLandmarks>),
    Hand(HandLandmarks),
}

/// Plays back recorded model output, one entry per call, looping at the end.
///
/// The file is a JSON array; each entry is `null` (no hand), a single
/// prediction `{"landmarks": [[x, y, z], ...]}`, or an array of predictions.
pub struct ReplayLandmarkSource {
    script: Vec<Vec<HandLandmarks>>,
    cursor: AtomicUsize,
    latency: Option<Duration>,
}

impl ReplayLandmarkSource {
    pub fn new(script: Vec<Vec<HandLandmarks>>) -> Self {
        Self {
            script,
            cursor: AtomicUsize::new(0),
            latency: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SensingError> {
        let entries: Vec<Option<ReplayEntry>> =
            serde_json::from_str(json).map_err(|e| SensingError::Replay(e.to_string()))?;
        let script = entries
            .into_iter()
            .map(|entry| match entry {
                None => Vec::new(),
                Some(ReplayEntry::Hand(hand)) => vec![hand],
                Some(ReplayEntry::Hands(hands)) => hands,
            })
            .collect();
        Ok(Self::new(script))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SensingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SensingError::Replay(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Simulated inference time applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

#[async_trait]
impl LandmarkSource for ReplayLandmarkSource {
    async fn estimate(&self, frame: &Frame) -> Result<Vec<HandLandmarks>, SensingError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % self.script.len();
        debug!(frame = %frame.frame_id(), position, "Replaying landmarks");
        Ok(self.script[position].clone())
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}
