//! Error types for the MEXC adapter.
//!
//! [`MexcError`] keeps the exchange-specific detail (envelope codes, parse
//! context) and collapses into the shared [`FetchError`] at the
//! `MarketDataSource` boundary.

use surge_watch_core::FetchError;
use thiserror::Error;

/// Retry-After fallback when a 429 carries no usable header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Errors that can occur when talking to MEXC.
#[derive(Debug, Error)]
pub enum MexcError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// HTTP 429.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Non-success HTTP status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// HTTP 200 whose envelope reported `success: false`.
    #[error("request rejected (code {code}): {message}")]
    Rejected {
        /// Exchange error code.
        code: i64,
        /// Exchange error message.
        message: String,
    },

    /// Body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Symbol failed local validation; no request was sent.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MexcError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<reqwest::Error> for MexcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MexcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<MexcError> for FetchError {
    fn from(err: MexcError) -> Self {
        match err {
            MexcError::Network(msg) | MexcError::Configuration(msg) => Self::Network(msg),
            MexcError::Timeout(msg) => Self::Timeout(msg),
            MexcError::RateLimit { retry_after_secs } => Self::rate_limit(retry_after_secs),
            MexcError::Api {
                status_code,
                message,
            } => Self::api(status_code, message),
            MexcError::Rejected { code, message } => {
                Self::api(0, format!("code {code}: {message}"))
            }
            MexcError::Malformed(msg) => Self::Malformed(msg),
            MexcError::InvalidSymbol(msg) => Self::InvalidSymbol(msg),
        }
    }
}

/// Result type alias for MEXC operations.
pub type Result<T> = std::result::Result<T, MexcError>;
