//! Rolling per-symbol state.
//!
//! A [`SymbolState`] owns the candle history, the cached order book, the last
//! snapshot, and the cooldown for one symbol. History is append-only and
//! strictly timestamp-ordered: windows are validated as a whole, then only
//! candles newer than the latest known one are appended, so re-delivering a
//! bar is a no-op.

use crate::cooldown::CooldownTracker;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use surge_watch_core::{Candle, FeatureSnapshot, IngestError, OrderBookSnapshot};

/// What an ingest call did to the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// New candles appended
    pub appended: usize,
    /// Candles at or before the latest known timestamp
    pub ignored: usize,
    /// Oldest candles dropped to stay within capacity
    pub evicted: usize,
}

/// Mutable state for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolState {
    symbol: String,
    capacity: usize,
    history: VecDeque<Candle>,
    order_book: Option<OrderBookSnapshot>,
    order_book_fetched_at: Option<DateTime<Utc>>,
    last_snapshot: Option<FeatureSnapshot>,
    cooldown: CooldownTracker,
}

impl SymbolState {
    /// Creates empty state.
    ///
    /// # Arguments
    /// * `symbol` - Exchange symbol
    /// * `capacity` - Maximum candles retained
    /// * `cooldown` - Alert cooldown duration
    #[must_use]
    pub fn new(symbol: impl Into<String>, capacity: usize, cooldown: Duration) -> Self {
        Self {
            symbol: symbol.into(),
            capacity: capacity.max(1),
            history: VecDeque::with_capacity(capacity),
            order_book: None,
            order_book_fetched_at: None,
            last_snapshot: None,
            cooldown: CooldownTracker::new(cooldown),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of candles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Candles oldest first.
    pub fn candles(&self) -> impl Iterator<Item = &Candle> {
        self.history.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Candle> {
        self.history.back()
    }

    #[must_use]
    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(Candle::close_f64).collect()
    }

    #[must_use]
    pub fn volumes(&self) -> Vec<f64> {
        self.history.iter().map(Candle::volume_f64).collect()
    }

    /// Merges a fetched window into history.
    ///
    /// # Errors
    /// Returns an [`IngestError`] and leaves state untouched if the window is
    /// empty, contains a non-positive price or negative volume, or has
    /// timestamps that are not strictly increasing.
    pub fn ingest(&mut self, window: &[Candle]) -> Result<IngestSummary, IngestError> {
        validate_window(window)?;

        let mut summary = IngestSummary::default();
        let mut newest = self.history.back().map(|c| c.timestamp);

        for candle in window {
            if newest.is_some_and(|ts| candle.timestamp <= ts) {
                summary.ignored += 1;
                continue;
            }
            newest = Some(candle.timestamp);
            self.history.push_back(candle.clone());
            summary.appended += 1;
        }

        while self.history.len() > self.capacity {
            self.history.pop_front();
            summary.evicted += 1;
        }

        Ok(summary)
    }

    /// Stores a freshly fetched order book.
    pub fn store_order_book(&mut self, book: OrderBookSnapshot, fetched_at: DateTime<Utc>) {
        self.order_book = Some(book);
        self.order_book_fetched_at = Some(fetched_at);
    }

    /// True when the cached book is younger than `ttl` at `now`.
    #[must_use]
    pub fn order_book_is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.order_book_fetched_at
            .is_some_and(|at| now - at < ttl && self.order_book.is_some())
    }

    /// The cached book and its age in milliseconds, if still fresh.
    #[must_use]
    pub fn fresh_order_book(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<(&OrderBookSnapshot, i64)> {
        if !self.order_book_is_fresh(now, ttl) {
            return None;
        }
        let at = self.order_book_fetched_at?;
        self.order_book.as_ref().map(|b| (b, (now - at).num_milliseconds()))
    }

    #[must_use]
    pub fn last_snapshot(&self) -> Option<&FeatureSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn set_last_snapshot(&mut self, snapshot: FeatureSnapshot) {
        self.last_snapshot = Some(snapshot);
    }

    #[must_use]
    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn cooldown_mut(&mut self) -> &mut CooldownTracker {
        &mut self.cooldown
    }
}

/// Checks a window before any of it is merged.
fn validate_window(window: &[Candle]) -> Result<(), IngestError> {
    if window.is_empty() {
        return Err(IngestError::EmptyWindow);
    }
    for (index, candle) in window.iter().enumerate() {
        if !candle.has_positive_prices() {
            return Err(IngestError::NonPositivePrice { index });
        }
        if candle.volume < Decimal::ZERO || candle.quote_volume < Decimal::ZERO {
            return Err(IngestError::NegativeVolume { index });
        }
        if index > 0 && candle.timestamp <= window[index - 1].timestamp {
            return Err(IngestError::NonMonotonicTimestamp { index });
        }
    }
    Ok(())
}
