//! Order-book heuristics as pure functions over a normalized snapshot.
//!
//! Bids are expected highest price first and asks lowest price first, as
//! [`OrderBookSnapshot`] documents. Nothing here touches the network, so every
//! metric is testable with synthetic books.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use surge_watch_core::{OrderBookConfig, OrderBookMetrics, OrderBookSnapshot, PriceLevel};

fn sizes(levels: &[PriceLevel], k: usize) -> Vec<f64> {
    levels
        .iter()
        .take(k)
        .map(|l| l.quantity.to_f64().unwrap_or(0.0).max(0.0))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Spread in basis points of the mid price.
///
/// Returns `None` for one-sided, crossed, or non-positive books.
pub fn spread_bps(book: &OrderBookSnapshot) -> Option<f64> {
    let bid = book.best_bid()?;
    let ask = book.best_ask()?;
    if bid <= Decimal::ZERO || ask < bid {
        return None;
    }
    let mid = book.mid_price()?;
    ((ask - bid) / mid).to_f64().map(|ratio| ratio * 10_000.0)
}

/// Combined top-K size of both sides relative to `reference_depth`, clamped to [0, 1].
pub fn liquidity_score(book: &OrderBookSnapshot, k: usize, reference_depth: f64) -> f64 {
    if reference_depth <= 0.0 {
        return 0.0;
    }
    let total: f64 = sizes(&book.bids, k).iter().sum::<f64>() + sizes(&book.asks, k).iter().sum::<f64>();
    (total / reference_depth).clamp(0.0, 1.0)
}

/// Sum of bid sizes divided by sum of ask sizes over the top K levels.
pub fn imbalance(book: &OrderBookSnapshot, k: usize) -> Option<f64> {
    let bid: f64 = sizes(&book.bids, k).iter().sum();
    let ask: f64 = sizes(&book.asks, k).iter().sum();
    if ask > 0.0 {
        Some(bid / ask)
    } else {
        None
    }
}

/// Outer-to-near size ratio for one side of the book.
fn side_concentration(levels: &[PriceLevel], k: usize, near: usize) -> Option<f64> {
    let sizes = sizes(levels, k);
    if sizes.len() <= near {
        return None;
    }
    let near_mean = mean(&sizes[..near])?;
    let outer_mean = mean(&sizes[near..])?;
    if near_mean > 0.0 {
        Some(outer_mean / near_mean)
    } else if outer_mean > 0.0 {
        Some(f64::INFINITY)
    } else {
        None
    }
}

/// Heuristic spoofing estimate in [0, 1].
///
/// Compares the mean size resting away from the touch (levels `near..k`) with
/// the mean size at the touch (levels `0..near`) on each side and keeps the
/// larger ratio. A ratio of 1 (uniform book) scores 0; `saturation` or more
/// scores 1.
pub fn spoofing_score(book: &OrderBookSnapshot, k: usize, near: usize, saturation: f64) -> f64 {
    if saturation <= 1.0 {
        return 0.0;
    }
    let ratio = [
        side_concentration(&book.bids, k, near),
        side_concentration(&book.asks, k, near),
    ]
    .into_iter()
    .flatten()
    .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))));

    match ratio {
        Some(r) => ((r - 1.0) / (saturation - 1.0)).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Computes every order-book metric, or `None` if the book is unusable.
pub fn compute_metrics(book: &OrderBookSnapshot, config: &OrderBookConfig) -> Option<OrderBookMetrics> {
    if !book.is_two_sided() {
        return None;
    }
    let spread = spread_bps(book)?;
    let best_bid = book.best_bid()?.to_f64()?;
    let best_ask = book.best_ask()?.to_f64()?;
    let k = config.top_levels;

    Some(OrderBookMetrics {
        best_bid,
        best_ask,
        spread_bps: spread,
        liquidity_score: liquidity_score(book, k, config.reference_depth),
        spoofing_score: spoofing_score(book, k, config.near_levels, config.spoof_saturation),
        imbalance: imbalance(book, k),
    })
}
