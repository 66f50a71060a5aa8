//! Raw market samples as delivered by a data source.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Length of one bar in seconds.
pub const CANDLE_INTERVAL_SECS: i64 = 60;

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Base-asset volume
    pub volume: Decimal,
    /// Quote-asset volume (turnover)
    pub quote_volume: Decimal,
}

impl Candle {
    /// Close price as `f64` for indicator math.
    #[must_use]
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    /// Volume as `f64` for indicator math.
    #[must_use]
    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(0.0)
    }

    /// Quote volume as `f64`.
    #[must_use]
    pub fn quote_volume_f64(&self) -> f64 {
        self.quote_volume.to_f64().unwrap_or(0.0)
    }

    /// High-low range as a percentage of the low.
    #[must_use]
    pub fn range_pct(&self) -> f64 {
        if self.low <= Decimal::ZERO {
            return 0.0;
        }
        ((self.high - self.low) / self.low * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    }

    /// True once the bar's minute has fully elapsed at `now`.
    ///
    /// Exchanges also return the bar still being traded; its volume and close
    /// keep changing until the minute ends.
    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.timestamp + Duration::seconds(CANDLE_INTERVAL_SECS) <= now
    }

    /// True when every price is strictly positive.
    #[must_use]
    pub fn has_positive_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| *p > Decimal::ZERO)
    }
}

/// A single price level in an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// Snapshot of an order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels (highest price first)
    pub bids: Vec<PriceLevel>,
    /// Ask levels (lowest price first)
    pub asks: Vec<PriceLevel>,
    /// Timestamp of snapshot
    pub timestamp: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Returns the best bid price (highest bid).
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Returns the best ask price (lowest ask).
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Calculates the mid price.
    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// True when both sides have at least one level.
    #[must_use]
    pub fn is_two_sided(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }
}
