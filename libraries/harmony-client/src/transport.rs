//! HTTP transport seam.

use crate::error::{PipelineError, Result};
use crate::types::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// Sends one request and buffers the whole response.
///
/// Any HTTP status is a successful send; only failures to get a response
/// at all are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` with the given receive timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Harmony/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PipelineError::Request)?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying client, shared with callers that bypass the pipeline.
    pub fn http(&self) -> &Client {
        &self.http
    }
}

/// Validate a base URL and strip trailing slashes.
pub fn normalize_base_url(url: &str) -> Result<String> {
    if url.is_empty() {
        return Err(PipelineError::InvalidUrl("URL cannot be empty".into()));
    }

    let url = url.trim_end_matches('/').to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(PipelineError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    url::Url::parse(&url).map_err(|e| PipelineError::InvalidUrl(e.to_string()))?;
    Ok(url)
}

/// Map reqwest send failures onto the pipeline taxonomy.
pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout(timeout)
    } else if e.is_connect() {
        PipelineError::Connection(e.to_string())
    } else {
        PipelineError::Request(e)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        trace!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| map_send_error(e, self.timeout))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        // Valid URLs
        assert!(normalize_base_url("https://example.com").is_ok());
        assert!(normalize_base_url("http://localhost:8080").is_ok());

        // Invalid URLs
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("not-a-url").is_err());
        assert!(normalize_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_url_normalization() {
        assert_eq!(
            normalize_base_url("https://example.com///").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn transport_keeps_normalized_base() {
        let transport =
            ReqwestTransport::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }
}
