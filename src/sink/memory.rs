use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::catalog::{CatalogStore, ScreenshotStore};
use crate::error::SinkError;
use crate::sink::{CaptureReceipt, CaptureRequest, CaptureSink};

/// Keeps captures in process, using the same store rules as the backend.
///
/// With a target record the capture upserts it; without one the frame is
/// recorded as a screenshot.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<CatalogStore>>,
    screenshots: Arc<Mutex<ScreenshotStore>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Arc<Mutex<CatalogStore>> {
        self.records.clone()
    }

    pub fn screenshots(&self) -> Arc<Mutex<ScreenshotStore>> {
        self.screenshots.clone()
    }
}

#[async_trait]
impl CaptureSink for MemorySink {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, SinkError> {
        match request.target {
            Some(record) => {
                let stored = self.records.lock().await.upsert(record)?;
                info!(name = %stored.record.name, "Record stored in memory");
                Ok(CaptureReceipt::Record(stored))
            }
            None => {
                let url = format!("memory://screenshots/{}.png", request.frame.frame_id());
                let info = self.screenshots.lock().await.insert(url);
                info!(url = %info.image_url, "Screenshot stored in memory");
                Ok(CaptureReceipt::Screenshot(info))
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
