use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{ScreenshotInfo, StoredRecord};
use crate::error::SinkError;
use crate::sink::{CaptureReceipt, CaptureRequest, CaptureSink, HttpClient};

const LATEST_RECORD_PATH: &str = "last";
const LATEST_SCREENSHOT_PATH: &str = "screenshots/latest";

#[derive(Deserialize)]
struct LatestRecordResponse {
    data: StoredRecord,
}

/// Queries for the most recently stored record or screenshot.
///
/// An empty store answers 404, which is reported as `Ok(None)`.
#[derive(Debug, Clone)]
pub struct ReadBackClient {
    http: HttpClient,
}

impl ReadBackClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn latest_record(&self) -> Result<Option<StoredRecord>, SinkError> {
        let response = self
            .http
            .client()
            .get(self.http.url(LATEST_RECORD_PATH))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No record stored yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(HttpClient::rejection(response).await);
        }
        let body: LatestRecordResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;
        Ok(Some(body.data))
    }

    pub async fn latest_screenshot(&self) -> Result<Option<ScreenshotInfo>, SinkError> {
        let response = self
            .http
            .client()
            .get(self.http.url(LATEST_SCREENSHOT_PATH))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No screenshot stored yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(HttpClient::rejection(response).await);
        }
        let info: ScreenshotInfo = response
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;
        Ok(Some(info))
    }
}

/// Release-to-view: a fired capture fetches and shows the latest record.
pub struct LatestRecordSink {
    read_back: ReadBackClient,
}

impl LatestRecordSink {
    pub fn new(read_back: ReadBackClient) -> Self {
        Self { read_back }
    }
}

#[async_trait]
impl CaptureSink for LatestRecordSink {
    async fn capture(&self, _request: CaptureRequest) -> Result<CaptureReceipt, SinkError> {
        let latest = self.read_back.latest_record().await?;
        match &latest {
            Some(stored) => info!(name = %stored.record.name, "Latest record fetched"),
            None => info!("Read-back found nothing"),
        }
        Ok(CaptureReceipt::Latest(latest))
    }

    fn name(&self) -> &'static str {
        "latest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::http::tests::serve_once;
    use crate::sink::tests::request;
    use std::time::Duration;

    fn client(base_url: &str) -> ReadBackClient {
        ReadBackClient::new(HttpClient::new(base_url, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn not_found_means_nothing_stored() {
        let (base_url, server) =
            serve_once(404, r#"{"success": false, "message": "No Pokémon found"}"#).await;
        assert_eq!(client(&base_url).latest_record().await.unwrap(), None);
        assert_eq!(server.await.unwrap().request_line(), "GET /api/last");
    }

    #[tokio::test]
    async fn fetches_latest_record() {
        let (base_url, server) = serve_once(
            200,
            r#"{"success": true, "data": {"id": 1, "name": "Bulbasaur", "slug": "bulbasaur",
                "types": ["Grass", "Poison"], "abilities": "Overgrow", "weekness": ["Fire"],
                "description": "A strange seed was planted on its back.", "category": "Seed",
                "sprite": "https://img.example.com/1.png", "createdAt": "2024-05-01T12:00:00Z"}}"#,
        )
        .await;
        let latest = client(&base_url).latest_record().await.unwrap().unwrap();
        assert_eq!(latest.record.name, "Bulbasaur");
        assert_eq!(latest.record.types.len(), 2);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetches_latest_screenshot() {
        let (base_url, server) = serve_once(
            200,
            r#"{"imageUrl": "http://host/uploads/9.png", "createdAt": "2024-05-01T12:00:00Z"}"#,
        )
        .await;
        let latest = client(&base_url).latest_screenshot().await.unwrap().unwrap();
        assert_eq!(latest.image_url, "http://host/uploads/9.png");
        assert!(latest.created_at.is_some());
        assert_eq!(
            server.await.unwrap().request_line(),
            "GET /api/screenshots/latest"
        );
    }

    #[tokio::test]
    async fn empty_screenshot_store_is_none() {
        let (base_url, server) = serve_once(404, r#"{"message": "No screenshots found"}"#).await;
        assert_eq!(client(&base_url).latest_screenshot().await.unwrap(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn latest_sink_reports_nothing_found() {
        let (base_url, server) = serve_once(404, r#"{"success": false}"#).await;
        let sink = LatestRecordSink::new(client(&base_url));
        let receipt = sink.capture(request(None).await).await.unwrap();
        assert_eq!(receipt, CaptureReceipt::Latest(None));
        assert_eq!(receipt.describe(), "Nothing found");
        server.await.unwrap();
    }
}
