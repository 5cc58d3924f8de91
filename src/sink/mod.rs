//! Where a fired capture goes.
//!
//! Every sink is invoked at most once per capture and is never retried; the
//! controller reports the outcome and the cooldown applies either way.

pub mod http;
pub mod memory;
pub mod read_back;
pub mod record;
pub mod upload;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogRecord, ScreenshotInfo, StoredRecord};
use crate::common::Frame;
use crate::error::SinkError;

pub use http::HttpClient;
pub use memory::MemorySink;
pub use read_back::{LatestRecordSink, ReadBackClient};
pub use record::RecordSink;
pub use upload::ScreenshotUploadSink;

#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub frame: Arc<Frame>,
    /// The catalog entry in scope when the capture fired, if any.
    pub target: Option<CatalogRecord>,
    pub fired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureReceipt {
    Screenshot(ScreenshotInfo),
    Record(StoredRecord),
    /// Result of a read-back; `None` means nothing has been stored yet.
    Latest(Option<StoredRecord>),
}

impl CaptureReceipt {
    pub fn describe(&self) -> String {
        match self {
            CaptureReceipt::Screenshot(info) => format!("Screenshot saved to {}", info.image_url),
            CaptureReceipt::Record(stored) => format!("{} saved", stored.record.name),
            CaptureReceipt::Latest(Some(stored)) => format!("{} found", stored.record.name),
            CaptureReceipt::Latest(None) => "Nothing found".to_string(),
        }
    }
}

#[async_trait]
pub trait CaptureSink: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, SinkError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Multipart upload of the captured frame.
    #[default]
    Upload,
    /// JSON post of the selected catalog record.
    Record,
    /// Read back the most recent record.
    Latest,
    /// Keep everything in process.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            base_url: "http://localhost:5001/api".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl SinkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn from_config(config: &SinkConfig) -> Result<Arc<dyn CaptureSink>, SinkError> {
    if config.kind == SinkKind::Memory {
        return Ok(Arc::new(MemorySink::new()));
    }
    let client = HttpClient::new(&config.base_url, config.request_timeout())?;
    let sink: Arc<dyn CaptureSink> = match config.kind {
        SinkKind::Upload => Arc::new(ScreenshotUploadSink::new(client)),
        SinkKind::Record => Arc::new(RecordSink::new(client)),
        SinkKind::Latest => Arc::new(LatestRecordSink::new(ReadBackClient::new(client))),
        SinkKind::Memory => Arc::new(MemorySink::new()),
    };
    Ok(sink)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sensing::{FrameSource, StillFrameSource};

    pub(crate) async fn request(target: Option<CatalogRecord>) -> CaptureRequest {
        let frame = StillFrameSource::blank(8, 8).grab().await.unwrap();
        CaptureRequest {
            frame: Arc::new(frame),
            target,
            fired_at: Utc::now(),
        }
    }

    #[test]
    fn builds_sink_for_each_kind() {
        for (kind, name) in [
            (SinkKind::Upload, "upload"),
            (SinkKind::Record, "record"),
            (SinkKind::Latest, "latest"),
            (SinkKind::Memory, "memory"),
        ] {
            let config = SinkConfig {
                kind,
                ..SinkConfig::default()
            };
            assert_eq!(from_config(&config).unwrap().name(), name);
        }
    }

    #[test]
    fn receipt_descriptions() {
        assert_eq!(CaptureReceipt::Latest(None).describe(), "Nothing found");
        let shot = ScreenshotInfo {
            id: "1".to_string(),
            image_url: "http://host/uploads/1.png".to_string(),
            created_at: None,
        };
        assert_eq!(
            CaptureReceipt::Screenshot(shot).describe(),
            "Screenshot saved to http://host/uploads/1.png"
        );
    }
}
