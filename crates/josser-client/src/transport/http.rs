use std::time::Duration;

use async_trait::async_trait;
use josser_protocol::TransportError;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::{timeout_error, Transport};

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, payload: &[u8]) -> Result<Response, TransportError> {
        self.client
            .post(&self.url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .timeout(self.timeout)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| self.request_error(e))
    }

    fn request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            timeout_error(self.timeout)
        } else {
            TransportError::Http(Box::new(err))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        debug!(url = %self.url, "Sending request over HTTP");
        let response = self.post(payload).await?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            // JSON-RPC error responses may arrive with a 4xx/5xx status.
            if carries_rpc_error(&body) {
                debug!(status = status.as_u16(), "Error status with JSON-RPC error body");
                return Ok(body.to_vec());
            }
            warn!(status = status.as_u16(), url = %self.url, "HTTP transport got error status");
            return Err(status_error(status, &body));
        }

        Ok(body.to_vec())
    }

    async fn notify(&self, payload: &[u8]) -> Result<(), TransportError> {
        debug!(url = %self.url, "Sending notification over HTTP");
        let response = self.post(payload).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            warn!(status = status.as_u16(), url = %self.url, "HTTP transport got error status");
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}

/// Whether `body` is a JSON object with a non-null `error` member.
fn carries_rpc_error(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").map(|error| !error.is_null()))
        .unwrap_or(false)
}

fn status_error(status: StatusCode, body: &[u8]) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
