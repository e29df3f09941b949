//! Error types for the Harmony request pipeline.

use crate::types::ApiResponse;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving a request through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No response within the configured bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server is offline or unreachable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// HTTP request could not be built or sent
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error ({status}): {message}")]
    Http {
        status: u16,
        code: ErrorCode,
        message: String,
    },

    /// A capability-gated endpoint was called and no capability token could be obtained
    #[error("Capability token required for {0}")]
    TokenRequired(String),

    /// The capability token was rejected even after a refresh
    #[error("Capability token expired or rejected: {0}")]
    TokenExpired(String),

    /// Refreshing the capability token failed
    #[error("Token refresh failed: {0}")]
    TokenRefresh(#[from] TokenError),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Secure credential store failure
    #[error("Credential store error: {0}")]
    Credentials(String),
}

/// Errors from a capability token refresh.
///
/// Cloneable because one refresh outcome is handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Nothing to refresh with
    #[error("No refresh credential available")]
    NoRefreshToken,

    /// Refresh endpoint answered with an error
    #[error("Refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Refresh request never got an answer
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// Refresh task ended without producing a result
    #[error("Refresh task aborted")]
    Aborted,
}

/// Stable error codes exposed to callers in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TokenRequired,
    TokenExpired,
    RateLimitExceeded,
    Timeout,
    ConnectionError,
    ClientError,
    ServerError,
    Cancelled,
    DecodeError,
    InvalidRequest,
}

impl ErrorCode {
    /// Default code for an HTTP status when the body does not name one.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::TokenRequired,
            408 => ErrorCode::Timeout,
            429 => ErrorCode::RateLimitExceeded,
            500..=599 => ErrorCode::ServerError,
            _ => ErrorCode::ClientError,
        }
    }

    /// Parse a code sent by the backend, e.g. `"TOKEN_EXPIRED"`.
    pub fn parse(code: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(code.to_string())).ok()
    }
}

/// Broad failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Timeouts, connection failures, 408; retried automatically
    Transient,
    /// Missing, expired or unrefreshable credentials
    Auth,
    /// Other 4xx, malformed responses, bad configuration; never retried
    Client,
    /// 5xx; retried automatically
    Server,
    Cancelled,
}

/// Failure envelope handed to presentation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error_code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

/// Loose shape of backend error bodies.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendErrorBody {
    error_code: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl PipelineError {
    /// Build an error from a non-success response.
    ///
    /// Keeps the backend's `errorCode` and `message` when the body carries
    /// them, otherwise falls back to the status code and raw body.
    pub fn from_response(response: &ApiResponse) -> Self {
        let status = response.status;
        let body = serde_json::from_slice::<BackendErrorBody>(&response.body).ok();

        let code = body
            .as_ref()
            .and_then(|b| b.error_code.as_deref())
            .and_then(ErrorCode::parse)
            .unwrap_or_else(|| ErrorCode::from_status(status));

        let message = body
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(&response.body).trim().to_string();
                if text.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    text
                }
            });

        PipelineError::Http {
            status,
            code,
            message,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::Http { status, .. } => Some(*status),
            PipelineError::TokenExpired(_) => Some(401),
            PipelineError::TokenRefresh(TokenError::Rejected { status, .. }) => Some(*status),
            PipelineError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::Timeout(_) => ErrorCode::Timeout,
            PipelineError::Connection(_) => ErrorCode::ConnectionError,
            PipelineError::Request(e) if e.is_timeout() => ErrorCode::Timeout,
            PipelineError::Request(e) if e.is_connect() => ErrorCode::ConnectionError,
            PipelineError::Request(_) => ErrorCode::InvalidRequest,
            PipelineError::Http { code, .. } => *code,
            PipelineError::TokenRequired(_) => ErrorCode::TokenRequired,
            PipelineError::TokenExpired(_) | PipelineError::TokenRefresh(_) => {
                ErrorCode::TokenExpired
            }
            PipelineError::Cancelled => ErrorCode::Cancelled,
            PipelineError::ParseError(_) => ErrorCode::DecodeError,
            PipelineError::InvalidUrl(_) | PipelineError::Credentials(_) => {
                ErrorCode::InvalidRequest
            }
        }
    }

    /// Whether the retry stage may resend the request.
    ///
    /// Timeouts, connection failures, 5xx and 408 are transient. Every other
    /// 4xx, including 401 and 429, is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Timeout(_) | PipelineError::Connection(_) => true,
            PipelineError::Request(e) => e.is_timeout() || e.is_connect(),
            PipelineError::Http { status, .. } => *status == 408 || (500..=599).contains(status),
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Cancelled => ErrorCategory::Cancelled,
            PipelineError::TokenRequired(_)
            | PipelineError::TokenExpired(_)
            | PipelineError::TokenRefresh(_) => ErrorCategory::Auth,
            PipelineError::Http { status: 401, .. } => ErrorCategory::Auth,
            PipelineError::Http { status, .. } if (500..=599).contains(status) => {
                ErrorCategory::Server
            }
            e if e.is_retryable() => ErrorCategory::Transient,
            _ => ErrorCategory::Client,
        }
    }

    /// Convert into the caller-facing failure envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            PipelineError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            error_code: self.error_code(),
            message,
            http_status: self.status_code(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
