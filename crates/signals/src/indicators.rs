//! Technical indicators over close and volume series.
//!
//! All functions take series ordered oldest first and return `None` when the
//! series is too short, so callers never have to special-case cold starts.

/// RSI lookback.
pub const RSI_PERIOD: usize = 14;

/// Momentum lookback.
pub const MOMENTUM_PERIOD: usize = 10;

/// Bars used for the short volume average and short-term volatility.
pub const SHORT_WINDOW: usize = 5;

/// Bars used for the long volume average.
pub const LONG_WINDOW: usize = 60;

/// Relative Strength Index with Wilder smoothing.
///
/// The first average gain/loss is the simple mean over the first `period`
/// deltas; every later delta is folded in as `(prev * (period - 1) + x) / period`.
///
/// # Arguments
/// * `closes` - Close prices (oldest first)
/// * `period` - Smoothing period (14 for RSI(14))
///
/// # Returns
/// `Some(rsi)` in [0, 100], or `None` with fewer than `period + 1` closes.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let (seed_gain, seed_loss) = deltas[..period]
        .iter()
        .fold((0.0, 0.0), |(g, l), d| (g + d.max(0.0), l + (-d).max(0.0)));
    let mut avg_gain = seed_gain / p;
    let mut avg_loss = seed_loss / p;

    for d in &deltas[period..] {
        avg_gain = (avg_gain * (p - 1.0) + d.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-d).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Percentage change from the close `bars` periods ago to the latest close.
///
/// # Returns
/// `None` if fewer than `bars + 1` closes exist or the reference close is not positive.
pub fn price_change_pct(closes: &[f64], bars: usize) -> Option<f64> {
    if bars == 0 || closes.len() < bars + 1 {
        return None;
    }
    let current = *closes.last()?;
    let previous = closes[closes.len() - 1 - bars];
    if previous <= 0.0 {
        return None;
    }
    Some((current - previous) * 100.0 / previous)
}

/// Momentum in percentage form: positive means the latest close is above the
/// close `period` bars earlier.
pub fn momentum_pct(closes: &[f64], period: usize) -> Option<f64> {
    price_change_pct(closes, period)
}

/// Mean of up to `n` values immediately before the latest one.
///
/// # Arguments
/// * `values` - Series (oldest first); the last entry is the current bar
/// * `n` - Number of preceding bars to average
/// * `min_bars` - Minimum number of preceding bars required
pub fn trailing_mean(values: &[f64], n: usize, min_bars: usize) -> Option<f64> {
    let preceding = values.len().checked_sub(1)?;
    let take = preceding.min(n);
    if take == 0 || take < min_bars {
        return None;
    }
    let window = &values[preceding - take..preceding];
    Some(window.iter().sum::<f64>() / take as f64)
}

/// Ratio of the latest value to a reference average.
///
/// `None` when the average is zero (a flat, silent market has no meaningful ratio).
pub fn ratio_to(current: f64, average: Option<f64>) -> Option<f64> {
    match average {
        Some(avg) if avg > 0.0 => Some(current / avg),
        _ => None,
    }
}

/// Population standard deviation of the last `bars` one-bar percent returns.
pub fn volatility_pct(closes: &[f64], bars: usize) -> Option<f64> {
    if bars == 0 || closes.len() < bars + 1 {
        return None;
    }
    let tail = &closes[closes.len() - bars - 1..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) * 100.0 / w[0])
        .collect();
    if returns.len() < bars {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}
