use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::SinkError;

/// Shared transport for the REST sinks: one connection pool, one base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turns a non-success response into [`SinkError::Rejected`], keeping the
    /// server's own explanation when it sent one.
    pub async fn rejection(response: Response) -> SinkError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or(text);
        warn!(status, "Capture endpoint rejected request: {}", message);
        SinkError::Rejected { status, message }
    }
}
