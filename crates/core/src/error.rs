//! Error types shared across the monitor.
//!
//! Configuration errors are fatal at startup. Fetch and ingest errors are
//! always scoped to a single symbol and never abort a tick.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or validating a [`MonitorConfig`](crate::MonitorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested mode profile does not exist.
    #[error("unknown mode '{name}', expected one of: {available}")]
    UnknownMode {
        /// The requested mode name.
        name: String,
        /// Comma-separated list of known modes.
        available: String,
    },

    /// Detector weights are negative or do not sum to 1.
    #[error("detector weights must be non-negative and sum to 1.0, got sum {sum:.6}")]
    InvalidWeights {
        /// The actual sum of all detector weights.
        sum: f64,
    },

    /// A duration, count, or threshold that must be strictly positive is not.
    #[error("{field} must be positive")]
    NonPositive {
        /// Dotted path of the offending field.
        field: String,
    },

    /// Any other out-of-range value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Layered configuration could not be read or extracted.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    /// Creates a non-positive field error.
    pub fn non_positive(field: impl Into<String>) -> Self {
        Self::NonPositive {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(err.to_string())
    }
}

/// Errors returned by a [`MarketDataSource`](crate::MarketDataSource).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Upstream asked us to slow down.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Upstream answered with an error status or an error envelope.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code (0 when the envelope reported the failure).
        status_code: u16,
        /// Error message from the API.
        message: String,
    },

    /// Response body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Symbol failed local validation.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}

impl FetchError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            Self::Malformed(_) | Self::InvalidSymbol(_) => false,
        }
    }

    /// Returns the delay upstream asked for, if any.
    ///
    /// Only rate limits carry an explicit delay; everything else falls back to
    /// the caller's backoff schedule.
    #[must_use]
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

/// Reasons a candle window is rejected at ingestion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The window contained no candles.
    #[error("empty candle window")]
    EmptyWindow,

    /// A candle carried a zero or negative price.
    #[error("non-positive price at index {index}")]
    NonPositivePrice {
        /// Position of the offending candle in the window.
        index: usize,
    },

    /// A candle carried negative volume.
    #[error("negative volume at index {index}")]
    NegativeVolume {
        /// Position of the offending candle in the window.
        index: usize,
    },

    /// Timestamps inside the window were not strictly increasing.
    #[error("non-monotonic timestamp at index {index}")]
    NonMonotonicTimestamp {
        /// Position of the offending candle in the window.
        index: usize,
    },
}
