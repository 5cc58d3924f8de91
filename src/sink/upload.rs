use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::catalog::ScreenshotInfo;
use crate::error::SinkError;
use crate::sink::{CaptureReceipt, CaptureRequest, CaptureSink, HttpClient};

const UPLOAD_PATH: &str = "screenshots/upload";
const FIELD_NAME: &str = "screenshot";
const FILE_NAME: &str = "screenshot.png";

#[derive(Deserialize)]
struct UploadResponse {
    screenshot: ScreenshotInfo,
}

/// Uploads the captured frame as a PNG in a multipart form.
pub struct ScreenshotUploadSink {
    http: HttpClient,
}

impl ScreenshotUploadSink {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CaptureSink for ScreenshotUploadSink {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, SinkError> {
        let png = request.frame.encode_png()?;
        let size = png.len();
        let part = Part::bytes(png)
            .file_name(FILE_NAME)
            .mime_str("image/png")?;
        let form = Form::new().part(FIELD_NAME, part);

        let response = self
            .http
            .client()
            .post(self.http.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HttpClient::rejection(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;
        info!(bytes = size, url = %body.screenshot.image_url, "Screenshot uploaded");
        Ok(CaptureReceipt::Screenshot(body.screenshot))
    }

    fn name(&self) -> &'static str {
        "upload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::http::tests::serve_once;
    use crate::sink::tests::request;
    use std::time::Duration;

    #[tokio::test]
    async fn uploads_png_as_multipart() {
        let (base_url, server) = serve_once(
            201,
            r#"{"message": "Screenshot uploaded successfully", "screenshot": {"id": "abc123", "imageUrl": "http://host/uploads/1-screenshot.png"}}"#,
        )
        .await;
        let sink = ScreenshotUploadSink::new(HttpClient::new(&base_url, Duration::from_secs(5)).unwrap());

        let receipt = sink.capture(request(None).await).await.unwrap();
        assert_eq!(
            receipt,
            CaptureReceipt::Screenshot(ScreenshotInfo {
                id: "abc123".to_string(),
                image_url: "http://host/uploads/1-screenshot.png".to_string(),
                created_at: None,
            })
        );

        let recorded = server.await.unwrap();
        assert_eq!(recorded.request_line(), "POST /api/screenshots/upload");
        assert!(recorded.content_type().starts_with("multipart/form-data"));
        let body = recorded.body_text();
        assert!(body.contains(r#"name="screenshot""#));
        assert!(body.contains(r#"filename="screenshot.png""#));
        assert!(body.contains("image/png"));
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let (base_url, server) =
            serve_once(500, r#"{"message": "Server Error", "error": "disk full"}"#).await;
        let sink = ScreenshotUploadSink::new(HttpClient::new(&base_url, Duration::from_secs(5)).unwrap());
        let err = sink.capture(request(None).await).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected { status: 500, .. }));
        server.await.unwrap();
    }
}
