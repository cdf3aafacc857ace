//! Transport seam and HTTP implementation.
//!
//! The client only needs three operations from the network: POST a JSON body,
//! GET a path, and poll a queued request until its result is ready. Retries,
//! auth headers and presigned uploads belong to the transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{AuditError, TransportError};

/// Raw JSON response with its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body.
    pub body: Value,
}

impl RawResponse {
    /// True when the service queued the request (HTTP 202).
    pub fn is_accepted(&self) -> bool {
        self.status == StatusCode::ACCEPTED.as_u16()
    }

    /// `request_id` from the response envelope, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.body.get("request_id").and_then(Value::as_str)
    }
}

/// Network capability consumed by the client.
///
/// Dropping a returned future cancels the call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as JSON to `path`, relative to the service base URL.
    async fn post_json(&self, path: &str, body: Value) -> Result<RawResponse, TransportError>;

    /// GETs `path`, relative to the service base URL.
    async fn get_json(&self, path: &str) -> Result<RawResponse, TransportError>;

    /// Polls a queued request until it completes or the poll budget runs out.
    ///
    /// On timeout the last (still accepted) response is returned.
    async fn poll_by_id(&self, request_id: &str) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Builds a transport from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, AuditError> {
        if config.base_url.trim().is_empty() {
            return Err(AuditError::Config("base URL must not be empty".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AuditError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, url: String, request: RequestBuilder) -> Result<RawResponse, TransportError> {
        let response = request
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "request failed");
                TransportError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status().as_u16();
        debug!(url = %url, status, "response received");

        let body = response.json::<Value>().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(RawResponse { status, body })
    }
}

/// Delay before poll attempt `attempt` (1-based): `attempt²` seconds, capped.
pub fn poll_delay(attempt: u32, max: Duration) -> Duration {
    let secs = u64::from(attempt).saturating_mul(u64::from(attempt));
    Duration::from_secs(secs).min(max)
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body))]
    async fn post_json(&self, path: &str, body: Value) -> Result<RawResponse, TransportError> {
        let url = self.url(path);
        let request = self.client.post(&url).json(&body);
        self.send(url, request).await
    }

    #[instrument(skip(self))]
    async fn get_json(&self, path: &str) -> Result<RawResponse, TransportError> {
        let url = self.url(path);
        let request = self.client.get(&url);
        self.send(url, request).await
    }

    #[instrument(skip(self))]
    async fn poll_by_id(&self, request_id: &str) -> Result<RawResponse, TransportError> {
        let started = Instant::now();
        let path = format!("request/{request_id}");
        let mut attempt = 1;

        loop {
            let response = self.get_json(&path).await?;
            if !response.is_accepted() {
                return Ok(response);
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.poll_result_timeout {
                warn!(request_id, attempt, "poll budget exhausted");
                return Ok(response);
            }

            let remaining = self.config.poll_result_timeout - elapsed;
            let delay = poll_delay(attempt, self.config.max_poll_interval).min(remaining);
            debug!(request_id, attempt, delay_ms = delay.as_millis() as u64, "request still queued");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_delay_grows_quadratically_and_clamps() {
        let max = Duration::from_secs(10);
        assert_eq!(poll_delay(1, max), Duration::from_secs(1));
        assert_eq!(poll_delay(2, max), Duration::from_secs(4));
        assert_eq!(poll_delay(3, max), Duration::from_secs(9));
        assert_eq!(poll_delay(4, max), max);
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let transport = HttpTransport::new(ClientConfig::new("https://audit.example.com/", "t")).unwrap();
        assert_eq!(transport.url("/v1/log"), "https://audit.example.com/v1/log");
        assert_eq!(transport.url("v1/search"), "https://audit.example.com/v1/search");
    }

    #[test]
    fn empty_base_url_is_config_error() {
        assert!(matches!(
            HttpTransport::new(ClientConfig::new("", "t")),
            Err(AuditError::Config(_))
        ));
    }
}
