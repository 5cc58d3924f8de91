use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::catalog::StoredRecord;
use crate::error::SinkError;
use crate::sink::{CaptureReceipt, CaptureRequest, CaptureSink, HttpClient};

const RECORD_PATH: &str = "pokemon";

#[derive(Deserialize)]
struct RecordResponse {
    data: StoredRecord,
}

/// Posts the selected catalog record as JSON. The backend upserts by id or name.
pub struct RecordSink {
    http: HttpClient,
}

impl RecordSink {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CaptureSink for RecordSink {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, SinkError> {
        let record = request.target.ok_or(SinkError::MissingTarget)?.normalized();
        record.validate()?;

        let response = self
            .http
            .client()
            .post(self.http.url(RECORD_PATH))
            .json(&record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HttpClient::rejection(response).await);
        }

        let body: RecordResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;
        info!(id = body.data.record.id, name = %body.data.record.name, "Record stored");
        Ok(CaptureReceipt::Record(body.data))
    }

    fn name(&self) -> &'static str {
        "record"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::tests::pikachu;
    use crate::catalog::CatalogRecord;
    use crate::sink::http::tests::serve_once;
    use crate::sink::tests::request;
    use std::time::Duration;

    const STORED: &str = r#"{"success": true, "message": "Pokemon saved successfully", "data": {
        "_id": "665f", "id": 25, "name": "Pikachu", "slug": "pikachu", "types": ["Electric"],
        "abilities": "Static", "weekness": ["Ground"], "description": "It stores electricity in its cheeks.",
        "category": "Mouse", "sprite": "https://img.example.com/sprites/25.png",
        "createdAt": "2024-05-01T12:00:00Z", "updatedAt": "2024-05-01T12:00:00Z", "__v": 0}}"#;

    fn sink(base_url: &str) -> RecordSink {
        RecordSink::new(HttpClient::new(base_url, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn posts_target_as_json() {
        let (base_url, server) = serve_once(201, STORED).await;
        let receipt = sink(&base_url).capture(request(Some(pikachu())).await).await.unwrap();
        match receipt {
            CaptureReceipt::Record(stored) => assert_eq!(stored.record, pikachu()),
            other => panic!("unexpected receipt {:?}", other),
        }

        let recorded = server.await.unwrap();
        assert_eq!(recorded.request_line(), "POST /api/pokemon");
        let sent: serde_json::Value = serde_json::from_slice(&recorded.body).unwrap();
        assert_eq!(sent["weekness"], serde_json::json!(["Ground"]));
        assert!(sent.get("weakness").is_none());
        assert_eq!(sent["slug"], "pikachu");
        let record: CatalogRecord = serde_json::from_value(sent).unwrap();
        assert_eq!(record, pikachu());
    }

    #[tokio::test]
    async fn missing_target_is_an_error() {
        let err = sink("http://127.0.0.1:9")
            .capture(request(None).await)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::MissingTarget));
    }

    #[tokio::test]
    async fn invalid_target_is_rejected_locally() {
        let bad = CatalogRecord {
            sprite: "not a url".to_string(),
            ..pikachu()
        };
        let err = sink("http://127.0.0.1:9")
            .capture(request(Some(bad)).await)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Catalog(_)));
    }

    #[tokio::test]
    async fn validation_failure_from_server_is_reported() {
        let (base_url, server) = serve_once(
            400,
            r#"{"error": "Missing required fields: id, name, slug, types, abilities, weekness, description, category, sprite"}"#,
        )
        .await;
        let err = sink(&base_url)
            .capture(request(Some(pikachu())).await)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected { status: 400, .. }));
        server.await.unwrap();
    }
}
