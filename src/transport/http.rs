//! HTTP transport: POSTs JSON payloads to the ingestion service.

use async_trait::async_trait;
use std::time::Duration;

use super::{Transport, TransportError};

/// `reqwest`-backed transport targeting `<base_url><endpoint>`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<u16, TransportError> {
        let resp = self
            .http
            .post(self.url_for(endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(resp.status().as_u16())
    }

    fn name(&self) -> &str {
        "http"
    }
}
