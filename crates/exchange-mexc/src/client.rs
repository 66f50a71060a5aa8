//! MEXC contract REST client with optional rate limiting.
//!
//! Only the two public, unsigned market-data endpoints are used:
//!
//! - `GET /api/v1/contract/kline/{symbol}?interval=Min1&limit=N`
//! - `GET /api/v1/contract/depth/{symbol}?limit=N`
//!
//! # Example
//!
//! ```ignore
//! use surge_watch_mexc::{MexcClient, MexcClientConfig};
//!
//! let client = MexcClient::new(MexcClientConfig::default())?;
//! let candles = client.klines("BTC_USDT", 60).await?;
//! let book = client.depth("BTC_USDT", 20).await?;
//! ```

use crate::error::{MexcError, Result, DEFAULT_RETRY_AFTER_SECS};
use crate::types::{Envelope, RawDepth, RawKlines};
use async_trait::async_trait;
use chrono::Utc;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use surge_watch_core::{Candle, FetchError, MarketDataSource, OrderBookSnapshot};

// =============================================================================
// Constants
// =============================================================================

/// Public contract API base URL.
pub const MEXC_CONTRACT_URL: &str = "https://contract.mexc.com";

/// Largest kline/depth page the endpoints accept.
pub const MAX_LIMIT: usize = 1000;

const MAX_SYMBOL_LEN: usize = 32;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the MEXC client.
#[derive(Debug, Clone)]
pub struct MexcClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Client-side request budget. `None` leaves pacing to the caller, which
    /// is how the scheduler uses it since it owns the limiter for every symbol.
    pub requests_per_second: Option<NonZeroU32>,

    /// HTTP timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for MexcClientConfig {
    fn default() -> Self {
        Self {
            base_url: MEXC_CONTRACT_URL.to_string(),
            requests_per_second: None,
            timeout_ms: 5_000,
        }
    }
}

impl MexcClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Paces this client on its own.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = Some(requests_per_second);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

// =============================================================================
// MexcClient
// =============================================================================

/// Read-only MEXC contract market data client.
pub struct MexcClient {
    config: MexcClientConfig,
    http: Client,
    rate_limiter: Option<
        Arc<
            RateLimiter<
                governor::state::NotKeyed,
                governor::state::InMemoryState,
                governor::clock::DefaultClock,
            >,
        >,
    >,
}

impl std::fmt::Debug for MexcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MexcClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_second", &self.config.requests_per_second)
            .finish_non_exhaustive()
    }
}

impl MexcClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: MexcClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MexcError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let rate_limiter = config
            .requests_per_second
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Rejects symbols that could escape the URL path.
    ///
    /// Valid symbols are ASCII alphanumerics and underscores, e.g. `BTC_USDT`.
    fn validate_symbol(symbol: &str) -> Result<&str> {
        if symbol.is_empty() {
            return Err(MexcError::InvalidSymbol("symbol cannot be empty".to_string()));
        }
        if symbol.contains("..") || symbol.contains('/') || symbol.contains('\\') {
            return Err(MexcError::InvalidSymbol(format!(
                "contains forbidden characters: {symbol}"
            )));
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MexcError::InvalidSymbol(format!(
                "must contain only alphanumerics or underscore: {symbol}"
            )));
        }
        if symbol.len() > MAX_SYMBOL_LEN {
            return Err(MexcError::InvalidSymbol(format!(
                "exceeds maximum length of {MAX_SYMBOL_LEN}: {}",
                symbol.len()
            )));
        }
        Ok(symbol)
    }

    /// Waits for the rate limiter if any, then GETs and unwraps the envelope.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(MexcError::RateLimit {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MexcError::api(status.as_u16(), text));
        }

        let body = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_data()
    }

    /// Fetches the most recent `limit` one-minute bars, oldest first.
    ///
    /// # Errors
    /// Returns error on invalid symbol, transport failure, non-success
    /// status or envelope, or misaligned columns.
    pub async fn klines(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>> {
        let symbol = Self::validate_symbol(symbol)?;
        let limit = limit.clamp(1, MAX_LIMIT);
        let path = format!("/api/v1/contract/kline/{symbol}?interval=Min1&limit={limit}");

        let raw: RawKlines = self.get(&path).await?;
        raw.into_candles(limit)
    }

    /// Fetches the top `depth` levels of each side.
    ///
    /// # Errors
    /// Returns error on invalid symbol, transport failure, non-success
    /// status or envelope, or malformed levels.
    pub async fn depth(&self, symbol: &str, depth: usize) -> Result<OrderBookSnapshot> {
        let symbol = Self::validate_symbol(symbol)?;
        let depth = depth.clamp(1, MAX_LIMIT);
        let path = format!("/api/v1/contract/depth/{symbol}?limit={depth}");

        let raw: RawDepth = self.get(&path).await?;
        raw.into_snapshot(depth, Utc::now())
    }
}

#[async_trait]
impl MarketDataSource for MexcClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        window_minutes: usize,
    ) -> std::result::Result<Vec<Candle>, FetchError> {
        self.klines(symbol, window_minutes).await.map_err(Into::into)
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> std::result::Result<OrderBookSnapshot, FetchError> {
        self.depth(symbol, depth).await.map_err(Into::into)
    }

    fn name(&self) -> &str {
        "mexc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonzero_ext::nonzero;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MexcClient {
        MexcClient::new(
            MexcClientConfig::default()
                .with_base_url(server.uri())
                .with_rate_limit(nonzero!(1000u32)),
        )
        .unwrap()
    }

    fn kline_body() -> serde_json::Value {
        json!({
            "success": true,
            "code": 0,
            "data": {
                "time": [1700000000, 1700000060, 1700000120],
                "open": [100.0, 100.5, 101.0],
                "high": [100.8, 101.2, 103.0],
                "low": [99.9, 100.4, 100.9],
                "close": [100.5, 101.0, 102.8],
                "vol": [120.0, 90.0, 640.0],
                "amount": [12000.0, 9090.0, 65500.0]
            }
        })
    }

    // ==================== Configuration Tests ====================

    #[test]
    fn test_client_config_default() {
        let config = MexcClientConfig::default();
        assert_eq!(config.base_url, MEXC_CONTRACT_URL);
        assert!(config.requests_per_second.is_none());
    }

    #[test]
    fn test_client_config_builder() {
        let config = MexcClientConfig::default()
            .with_base_url("http://localhost:9999")
            .with_rate_limit(nonzero!(5u32))
            .with_timeout_ms(250);

        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.requests_per_second.map(NonZeroU32::get), Some(5));
        assert_eq!(config.timeout_ms, 250);
    }

    // ==================== Input Validation Tests ====================

    #[test]
    fn test_validate_symbol_valid() {
        assert!(MexcClient::validate_symbol("BTC_USDT").is_ok());
        assert!(MexcClient::validate_symbol("1000PEPE_USDT").is_ok());
    }

    #[test]
    fn test_validate_symbol_rejects_path_traversal() {
        assert!(MexcClient::validate_symbol("../etc/passwd").is_err());
        assert!(MexcClient::validate_symbol("..").is_err());
        assert!(MexcClient::validate_symbol("BTC/USDT").is_err());
        assert!(MexcClient::validate_symbol("BTC\\USDT").is_err());
    }

    #[test]
    fn test_validate_symbol_rejects_special_chars_and_length() {
        assert!(MexcClient::validate_symbol("").is_err());
        assert!(MexcClient::validate_symbol("BTC-USDT").is_err());
        assert!(MexcClient::validate_symbol("BTC?x=1").is_err());
        assert!(MexcClient::validate_symbol(&"A".repeat(33)).is_err());
    }

    // ==================== Kline Endpoint Tests ====================

    #[tokio::test]
    async fn test_klines_parses_columnar_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/contract/kline/BTC_USDT"))
            .and(query_param("interval", "Min1"))
            .and(query_param("limit", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kline_body()))
            .mount(&server)
            .await;

        let candles = client(&server).klines("BTC_USDT", 60).await.unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(candles[2].close, dec!(102.8));
        assert_eq!(candles[2].volume, dec!(640));
        assert_eq!(candles[2].quote_volume, dec!(65500));
    }

    #[tokio::test]
    async fn test_klines_column_mismatch_is_malformed() {
        let server = MockServer::start().await;
        let mut body = kline_body();
        body["data"]["vol"] = json!([1.0, 2.0]);
        Mock::given(method("GET"))
            .and(path("/api/v1/contract/kline/BTC_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_candles("BTC_USDT", 60)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_envelope_failure_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/contract/kline/NOPE_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "code": 1001,
                "message": "contract not exists"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_candles("NOPE_USDT", 60)
            .await
            .unwrap_err();
        match err {
            FetchError::Api {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 0);
                assert!(message.contains("contract not exists"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_candles("BTC_USDT", 60)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::rate_limit(7));
    }

    #[tokio::test]
    async fn test_rate_limit_without_header_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).klines("BTC_USDT", 60).await.unwrap_err();
        assert!(matches!(
            err,
            MexcError::RateLimit {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_candles("BTC_USDT", 60)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::api(503, "maintenance"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_symbol_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kline_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_candles("../secret", 60)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).klines("BTC_USDT", 60).await.unwrap_err();
        assert!(matches!(err, MexcError::Malformed(_)));
    }

    // ==================== Depth Endpoint Tests ====================

    #[tokio::test]
    async fn test_depth_parses_levels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/contract/depth/ETH_USDT"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "code": 0,
                "data": {
                    "bids": [[2500.5, 120, 4], [2500.0, 80, 2], [2499.5, 60, 1]],
                    "asks": [[2501.0, 90, 3], [2501.5, 40, 1]],
                    "version": 123456,
                    "timestamp": 1700000000000i64
                }
            })))
            .mount(&server)
            .await;

        let book = client(&server)
            .fetch_order_book("ETH_USDT", 2)
            .await
            .unwrap();

        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.best_bid(), Some(dec!(2500.5)));
        assert_eq!(book.best_ask(), Some(dec!(2501)));
        assert_eq!(book.bids[1].quantity, dec!(80));
        assert_eq!(book.timestamp.timestamp(), 1_700_000_000);
    }
}
