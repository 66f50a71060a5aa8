//! Wire shapes of the public contract endpoints and their conversion into
//! core market types.

use crate::error::{MexcError, Result};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use surge_watch_core::{Candle, OrderBookSnapshot, PriceLevel};

/// `{success, code, data}` wrapper around every response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwraps the payload, turning `success: false` into [`MexcError::Rejected`].
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(MexcError::Rejected {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| MexcError::malformed("success envelope without data"))
    }
}

/// Kline payload: one array per field, index-aligned.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawKlines {
    /// Bar open time, unix seconds
    pub time: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    /// Contract volume
    pub vol: Vec<f64>,
    /// Quote turnover
    #[serde(default)]
    pub amount: Vec<f64>,
}

impl RawKlines {
    /// Zips the columns into candles, keeping the last `limit` bars.
    ///
    /// Every column must have the same length as `time`; `amount` may be
    /// absent entirely, in which case quote volume is zero.
    pub fn into_candles(self, limit: usize) -> Result<Vec<Candle>> {
        let n = self.time.len();
        let columns = [
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("close", self.close.len()),
            ("vol", self.vol.len()),
        ];
        if let Some((name, len)) = columns.iter().find(|(_, len)| *len != n) {
            return Err(MexcError::malformed(format!(
                "kline column '{name}' has {len} entries, expected {n}"
            )));
        }
        if !self.amount.is_empty() && self.amount.len() != n {
            return Err(MexcError::malformed(format!(
                "kline column 'amount' has {} entries, expected {n}",
                self.amount.len()
            )));
        }

        let start = n.saturating_sub(limit);
        (start..n)
            .map(|i| {
                Ok(Candle {
                    timestamp: from_unix_secs(self.time[i])?,
                    open: decimal(self.open[i], "open")?,
                    high: decimal(self.high[i], "high")?,
                    low: decimal(self.low[i], "low")?,
                    close: decimal(self.close[i], "close")?,
                    volume: decimal(self.vol[i], "vol")?,
                    quote_volume: match self.amount.get(i) {
                        Some(v) => decimal(*v, "amount")?,
                        None => Decimal::ZERO,
                    },
                })
            })
            .collect()
    }
}

/// Depth payload. Levels are `[price, size, order_count]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawDepth {
    #[serde(default)]
    pub bids: Vec<Vec<f64>>,
    #[serde(default)]
    pub asks: Vec<Vec<f64>>,
    /// Exchange time, unix millis
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RawDepth {
    /// Keeps the top `depth` levels per side.
    ///
    /// Snapshot time is the exchange timestamp when present, else `fallback`.
    pub fn into_snapshot(self, depth: usize, fallback: DateTime<Utc>) -> Result<OrderBookSnapshot> {
        let timestamp = match self.timestamp {
            Some(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| MexcError::malformed(format!("invalid depth timestamp {ms}")))?,
            None => fallback,
        };
        Ok(OrderBookSnapshot {
            bids: levels(self.bids, depth, "bids")?,
            asks: levels(self.asks, depth, "asks")?,
            timestamp,
        })
    }
}

fn levels(raw: Vec<Vec<f64>>, depth: usize, side: &str) -> Result<Vec<PriceLevel>> {
    raw.into_iter()
        .take(depth)
        .map(|level| match level.as_slice() {
            [price, size, ..] => Ok(PriceLevel::new(decimal(*price, side)?, decimal(*size, side)?)),
            _ => Err(MexcError::malformed(format!(
                "{side} level has {} fields, expected at least 2",
                level.len()
            ))),
        })
        .collect()
}

fn decimal(value: f64, field: &str) -> Result<Decimal> {
    Decimal::try_from(value)
        .map_err(|e| MexcError::malformed(format!("{field} value {value} not representable: {e}")))
}

fn from_unix_secs(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| MexcError::malformed(format!("invalid kline time {secs}")))
}
