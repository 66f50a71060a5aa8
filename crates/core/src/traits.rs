use crate::error::FetchError;
use crate::features::FeatureSnapshot;
use crate::market::{Candle, OrderBookSnapshot};
use crate::signal::AlertRecord;
use anyhow::Result;
use async_trait::async_trait;

/// Upstream market data.
///
/// Implementations only translate requests; retry, pacing and concurrency
/// limits are applied by the caller.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Returns up to `window_minutes` one-minute candles, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        window_minutes: usize,
    ) -> std::result::Result<Vec<Candle>, FetchError>;

    /// Returns the top `depth` levels of each side of the book.
    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> std::result::Result<OrderBookSnapshot, FetchError>;

    fn name(&self) -> &str;
}

/// Append-only sink for snapshots and alert records, keyed by (symbol, timestamp).
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn record_features(&self, snapshot: &FeatureSnapshot) -> Result<()>;

    /// Receives both emitted and suppressed records.
    async fn record_alert(&self, alert: &AlertRecord) -> Result<()>;
}

/// Delivery channel for emitted alerts.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &AlertRecord) -> Result<()>;

    fn name(&self) -> &str;
}
