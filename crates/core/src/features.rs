//! Per-tick feature snapshot.
//!
//! A [`FeatureSnapshot`] is derived from a symbol's candle history (and cached
//! order book) at one instant and is never mutated afterwards. Every indicator
//! that needs more history than is available is `None`, which detectors treat
//! as "not enough data" rather than as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage price changes over fixed horizons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChanges {
    pub m1: Option<f64>,
    pub m5: Option<f64>,
    pub m15: Option<f64>,
    pub m60: Option<f64>,
}

/// Volume levels and ratios for the latest bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeFeatures {
    /// Base volume of the latest bar
    pub volume: f64,
    /// Quote volume of the latest bar
    pub quote_volume: f64,
    /// Mean volume of the 5 bars before the latest
    pub avg_5m: Option<f64>,
    /// Mean volume of up to 60 bars before the latest
    pub avg_60m: Option<f64>,
    /// volume / avg_5m
    pub ratio_5m: Option<f64>,
    /// volume / avg_60m
    pub ratio_60m: Option<f64>,
    /// ratio_5m exceeded the configured spike threshold
    pub is_spike: bool,
}

/// Metrics derived from a normalized order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub best_bid: f64,
    pub best_ask: f64,
    /// (ask - bid) / mid in basis points
    pub spread_bps: f64,
    /// Top-K depth normalized to the reference depth, in [0, 1]
    pub liquidity_score: f64,
    /// Outer-vs-near size concentration, in [0, 1]
    pub spoofing_score: f64,
    /// Sum of bid sizes / sum of ask sizes over top K
    pub imbalance: Option<f64>,
}

/// Immutable per-symbol feature set for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    /// Open time of the latest candle in history
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub price_change: PriceChanges,
    pub volume: VolumeFeatures,
    pub rsi_14: Option<f64>,
    /// Percentage form: positive means upward momentum
    pub momentum_10: Option<f64>,
    /// Std-dev of the last five 1-bar percent returns
    pub volatility_5m: Option<f64>,
    pub high_low_range_pct: f64,
    pub order_book: Option<OrderBookMetrics>,
    pub order_book_age_ms: Option<i64>,
    pub history_len: usize,
    /// Computed from history that could not be refreshed this tick
    pub stale: bool,
}

impl FeatureSnapshot {
    /// Creates a snapshot with no indicators available.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            close,
            price_change: PriceChanges::default(),
            volume: VolumeFeatures::default(),
            rsi_14: None,
            momentum_10: None,
            volatility_5m: None,
            high_low_range_pct: 0.0,
            order_book: None,
            order_book_age_ms: None,
            history_len: 0,
            stale: false,
        }
    }

    #[must_use]
    pub fn with_price_change(mut self, price_change: PriceChanges) -> Self {
        self.price_change = price_change;
        self
    }

    #[must_use]
    pub fn with_volume(mut self, volume: VolumeFeatures) -> Self {
        self.volume = volume;
        self
    }

    #[must_use]
    pub fn with_rsi(mut self, rsi: f64) -> Self {
        self.rsi_14 = Some(rsi);
        self
    }

    #[must_use]
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum_10 = Some(momentum);
        self
    }

    #[must_use]
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility_5m = Some(volatility);
        self
    }

    #[must_use]
    pub fn with_order_book(mut self, metrics: OrderBookMetrics) -> Self {
        self.order_book = Some(metrics);
        self
    }

    #[must_use]
    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// Marks this snapshot as computed from stale history.
    #[must_use]
    pub fn into_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}
