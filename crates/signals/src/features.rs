//! Builds a [`FeatureSnapshot`] from a symbol's rolling state.

use crate::indicators::{
    momentum_pct, price_change_pct, ratio_to, trailing_mean, volatility_pct, wilder_rsi,
    LONG_WINDOW, MOMENTUM_PERIOD, RSI_PERIOD, SHORT_WINDOW,
};
use crate::orderbook::compute_metrics;
use crate::state::SymbolState;
use chrono::{DateTime, Duration, Utc};
use surge_watch_core::{
    FeatureSnapshot, MonitorConfig, OrderBookConfig, PriceChanges, VolumeFeatures,
};

/// Stateless feature computation over a [`SymbolState`].
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    volume_spike_threshold: f64,
    order_book: OrderBookConfig,
    order_book_ttl: Duration,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new(volume_spike_threshold: f64, order_book: OrderBookConfig) -> Self {
        let ttl = Duration::seconds(i64::try_from(order_book.cache_ttl_secs).unwrap_or(i64::MAX));
        Self {
            volume_spike_threshold,
            order_book,
            order_book_ttl: ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.volume_spike_threshold, config.order_book.clone())
    }

    /// Computes a snapshot at `now`.
    ///
    /// Returns `None` only when the history is empty. Any indicator lacking
    /// history is left unset; an expired or missing order book leaves the
    /// order-book metrics unset.
    #[must_use]
    pub fn extract(&self, state: &SymbolState, now: DateTime<Utc>) -> Option<FeatureSnapshot> {
        let latest = state.latest()?;
        let closes = state.closes();
        let volumes = state.volumes();

        let price_change = PriceChanges {
            m1: price_change_pct(&closes, 1),
            m5: price_change_pct(&closes, 5),
            m15: price_change_pct(&closes, 15),
            m60: price_change_pct(&closes, 60),
        };

        let current_volume = latest.volume_f64();
        let avg_5m = trailing_mean(&volumes, SHORT_WINDOW, SHORT_WINDOW);
        let avg_60m = trailing_mean(&volumes, LONG_WINDOW, SHORT_WINDOW);
        let ratio_5m = ratio_to(current_volume, avg_5m);
        let volume = VolumeFeatures {
            volume: current_volume,
            quote_volume: latest.quote_volume_f64(),
            avg_5m,
            avg_60m,
            ratio_5m,
            ratio_60m: ratio_to(current_volume, avg_60m),
            is_spike: ratio_5m.is_some_and(|r| r > self.volume_spike_threshold),
        };

        let (order_book, order_book_age_ms) = if self.order_book.enabled {
            match state.fresh_order_book(now, self.order_book_ttl) {
                Some((book, age)) => (compute_metrics(book, &self.order_book), Some(age)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        Some(FeatureSnapshot {
            symbol: state.symbol().to_string(),
            timestamp: latest.timestamp,
            close: latest.close_f64(),
            price_change,
            volume,
            rsi_14: wilder_rsi(&closes, RSI_PERIOD),
            momentum_10: momentum_pct(&closes, MOMENTUM_PERIOD),
            volatility_5m: volatility_pct(&closes, SHORT_WINDOW),
            high_low_range_pct: latest.range_pct(),
            order_book,
            order_book_age_ms,
            history_len: state.len(),
            stale: false,
        })
    }
}
