//! Monitor configuration and named mode profiles.
//!
//! A mode is just a [`MonitorConfig`] value: `balanced`, `fast`, `thorough`
//! and `startup` are constructors, not code paths. Everything the pipeline
//! needs (tick cadence, fan-out width, detector thresholds and weights,
//! cooldown) is read from here, so alternate profiles are unit-testable on
//! their own.

use crate::error::ConfigError;
use crate::signal::DetectorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerance for the detector weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Smallest history that still yields a 60-minute price change.
pub const MIN_HISTORY_CAPACITY: usize = 61;

/// How composite confidence is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the full weight set (which sums to 1).
    #[default]
    FixedWeights,
    /// Divide by the weight sum of active detectors only.
    ActiveWeights,
}

/// Bounded exponential backoff for per-symbol fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

/// Order-book sampling and scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBookConfig {
    pub enabled: bool,
    /// Levels requested from the data source
    pub depth: usize,
    /// K: levels per side used for liquidity, imbalance and spoofing
    pub top_levels: usize,
    /// Levels per side considered "near the touch"
    pub near_levels: usize,
    /// Combined top-K size that maps to a liquidity score of 1.0
    pub reference_depth: f64,
    /// Outer/near size ratio that maps to a spoofing score of 1.0
    pub spoof_saturation: f64,
    /// Reuse a fetched book for this long
    pub cache_ttl_secs: u64,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth: 20,
            top_levels: 10,
            near_levels: 2,
            reference_depth: 10_000.0,
            spoof_saturation: 5.0,
            cache_ttl_secs: 10,
        }
    }
}

/// Volume Explosion thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeExplosionConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Minimum 5m volume ratio
    pub ratio_threshold: f64,
    /// Minimum absolute 5m price move in percent
    pub move_threshold_pct: f64,
    /// Confidence exactly at both thresholds
    pub base_confidence: f64,
    /// Confidence added per unit of relative excess
    pub excess_gain: f64,
}

impl Default for VolumeExplosionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.30,
            ratio_threshold: 5.0,
            move_threshold_pct: 3.0,
            base_confidence: 0.5,
            excess_gain: 1.0,
        }
    }
}

/// RSI Divergence thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiDivergenceConfig {
    pub enabled: bool,
    pub weight: f64,
    pub oversold: f64,
    pub overbought: f64,
    /// Opposing 5m move must exceed this (percent)
    pub min_move_pct: f64,
    pub base_confidence: f64,
    /// Confidence per RSI point beyond the boundary
    pub per_rsi_point: f64,
    /// Confidence per percent of opposing move
    pub per_move_pct: f64,
}

impl Default for RsiDivergenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.20,
            oversold: 30.0,
            overbought: 70.0,
            min_move_pct: 0.0,
            base_confidence: 0.4,
            per_rsi_point: 0.02,
            per_move_pct: 0.05,
        }
    }
}

/// Momentum Shift thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumShiftConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Minimum |1m change| for either pattern
    pub min_recent_move_pct: f64,
    /// Minimum |5m change| for acceleration
    pub min_base_move_pct: f64,
    /// |1m| / |5m - 1m| needed to call acceleration
    pub acceleration_ratio: f64,
    /// Volume confirmation for acceleration
    pub min_volume_ratio: f64,
    pub base_confidence: f64,
    pub excess_gain: f64,
}

impl Default for MomentumShiftConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.20,
            min_recent_move_pct: 1.0,
            min_base_move_pct: 2.0,
            acceleration_ratio: 2.0,
            min_volume_ratio: 2.0,
            base_confidence: 0.5,
            excess_gain: 0.5,
        }
    }
}

/// Liquidity Trap thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityTrapConfig {
    pub enabled: bool,
    pub weight: f64,
    pub spread_threshold_bps: f64,
    /// Thin book when liquidity_score is below this
    pub liquidity_threshold: f64,
    pub spoofing_threshold: f64,
    /// Imbalance beyond this (or its inverse) sets a direction
    pub imbalance_bias: f64,
    pub base_confidence: f64,
    pub spread_weight: f64,
    pub liquidity_weight: f64,
    pub spoofing_weight: f64,
}

impl Default for LiquidityTrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.15,
            spread_threshold_bps: 50.0,
            liquidity_threshold: 0.3,
            spoofing_threshold: 0.6,
            imbalance_bias: 1.5,
            base_confidence: 0.5,
            spread_weight: 0.2,
            liquidity_weight: 0.15,
            spoofing_weight: 0.35,
        }
    }
}

/// Accumulation/Distribution thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationConfig {
    pub enabled: bool,
    pub weight: f64,
    /// Accumulation requires RSI below this
    pub low_rsi: f64,
    /// Distribution requires RSI above this
    pub high_rsi: f64,
    /// Both patterns require at least this 5m volume ratio
    pub volume_ratio: f64,
    /// Accumulation requires 5m volatility at or below this (percent)
    pub max_volatility_pct: f64,
    /// Distribution requires a 5m decline of at least this (percent)
    pub min_decline_pct: f64,
    pub base_confidence: f64,
    pub gain: f64,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.15,
            low_rsi: 40.0,
            high_rsi: 70.0,
            volume_ratio: 2.0,
            max_volatility_pct: 0.5,
            min_decline_pct: 0.5,
            base_confidence: 0.5,
            gain: 0.5,
        }
    }
}

/// Thresholds and weights for all five detectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub volume_explosion: VolumeExplosionConfig,
    pub rsi_divergence: RsiDivergenceConfig,
    pub momentum_shift: MomentumShiftConfig,
    pub liquidity_trap: LiquidityTrapConfig,
    pub accumulation_distribution: AccumulationConfig,
}

impl DetectorSettings {
    /// Weight assigned to a detector.
    #[must_use]
    pub fn weight(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::VolumeExplosion => self.volume_explosion.weight,
            DetectorKind::RsiDivergence => self.rsi_divergence.weight,
            DetectorKind::MomentumShift => self.momentum_shift.weight,
            DetectorKind::LiquidityTrap => self.liquidity_trap.weight,
            DetectorKind::AccumulationDistribution => self.accumulation_distribution.weight,
        }
    }

    /// Whether a detector is enabled in this profile.
    #[must_use]
    pub fn is_enabled(&self, kind: DetectorKind) -> bool {
        match kind {
            DetectorKind::VolumeExplosion => self.volume_explosion.enabled,
            DetectorKind::RsiDivergence => self.rsi_divergence.enabled,
            DetectorKind::MomentumShift => self.momentum_shift.enabled,
            DetectorKind::LiquidityTrap => self.liquidity_trap.enabled,
            DetectorKind::AccumulationDistribution => self.accumulation_distribution.enabled,
        }
    }

    /// Sum of all weights, enabled or not.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        DetectorKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }
}

/// Complete monitor configuration for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Profile this config was built from
    pub mode: String,
    pub symbols: Vec<String>,
    pub tick_interval_secs: u64,
    /// Simultaneous in-flight symbol tasks
    pub max_concurrency: usize,
    /// Per-symbol budget for fetch + process
    pub request_timeout_ms: u64,
    /// Wall-clock budget for the whole fan-out
    pub tick_deadline_ms: u64,
    pub retry: RetryConfig,
    /// Outbound request budget shared by all symbols
    pub requests_per_second: u32,
    /// Candles requested per fetch
    pub candle_window: usize,
    /// Candles retained per symbol
    pub history_capacity: usize,
    pub volume_spike_threshold: f64,
    pub order_book: OrderBookConfig,
    pub cooldown_secs: u64,
    pub normalization: Normalization,
    pub detectors: DetectorSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl MonitorConfig {
    /// Names accepted by [`MonitorConfig::profile`].
    pub const MODES: [&'static str; 4] = ["balanced", "fast", "thorough", "startup"];

    /// Looks up a named profile.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownMode`] for names not in [`Self::MODES`].
    pub fn profile(name: &str) -> Result<Self, ConfigError> {
        match name {
            "balanced" => Ok(Self::balanced()),
            "fast" => Ok(Self::fast()),
            "thorough" => Ok(Self::thorough()),
            "startup" => Ok(Self::startup()),
            other => Err(ConfigError::UnknownMode {
                name: other.to_string(),
                available: Self::MODES.join(", "),
            }),
        }
    }

    /// 10s ticks, 10-wide fan-out, 5x volume / 3% move, 5 minute cooldown.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            mode: "balanced".to_string(),
            symbols: Vec::new(),
            tick_interval_secs: 10,
            max_concurrency: 10,
            request_timeout_ms: 5_000,
            tick_deadline_ms: 8_000,
            retry: RetryConfig::default(),
            requests_per_second: 20,
            candle_window: 60,
            history_capacity: 120,
            volume_spike_threshold: 5.0,
            order_book: OrderBookConfig::default(),
            cooldown_secs: 300,
            normalization: Normalization::FixedWeights,
            detectors: DetectorSettings::default(),
        }
    }

    /// Faster cadence with lower thresholds.
    #[must_use]
    pub fn fast() -> Self {
        let mut cfg = Self::balanced();
        cfg.mode = "fast".to_string();
        cfg.tick_interval_secs = 5;
        cfg.request_timeout_ms = 3_000;
        cfg.tick_deadline_ms = 4_500;
        cfg.retry = RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            multiplier: 2.0,
        };
        cfg.requests_per_second = 30;
        cfg.candle_window = 30;
        cfg.volume_spike_threshold = 3.0;
        cfg.order_book.depth = 10;
        cfg.order_book.top_levels = 5;
        cfg.order_book.cache_ttl_secs = 5;
        cfg.cooldown_secs = 120;

        let d = &mut cfg.detectors;
        d.volume_explosion.ratio_threshold = 3.0;
        d.volume_explosion.move_threshold_pct = 1.5;
        d.rsi_divergence.oversold = 35.0;
        d.rsi_divergence.overbought = 65.0;
        d.momentum_shift.min_recent_move_pct = 0.5;
        d.momentum_shift.min_base_move_pct = 1.0;
        d.liquidity_trap.spread_threshold_bps = 40.0;
        d.accumulation_distribution.low_rsi = 45.0;
        d.accumulation_distribution.high_rsi = 65.0;
        d.accumulation_distribution.volume_ratio = 1.5;
        cfg
    }

    /// Slower cadence, narrower fan-out, stricter thresholds.
    #[must_use]
    pub fn thorough() -> Self {
        let mut cfg = Self::balanced();
        cfg.mode = "thorough".to_string();
        cfg.tick_interval_secs = 15;
        cfg.max_concurrency = 5;
        cfg.request_timeout_ms = 10_000;
        cfg.tick_deadline_ms = 14_000;
        cfg.retry.max_attempts = 4;
        cfg.retry.max_backoff_ms = 4_000;
        cfg.requests_per_second = 10;
        cfg.candle_window = 100;
        cfg.history_capacity = 200;
        cfg.volume_spike_threshold = 6.0;
        cfg.order_book.cache_ttl_secs = 15;
        cfg.cooldown_secs = 600;

        let d = &mut cfg.detectors;
        d.volume_explosion.weight = 0.35;
        d.volume_explosion.ratio_threshold = 6.0;
        d.volume_explosion.move_threshold_pct = 4.0;
        d.rsi_divergence.weight = 0.15;
        d.rsi_divergence.oversold = 25.0;
        d.rsi_divergence.overbought = 75.0;
        d.momentum_shift.weight = 0.15;
        d.liquidity_trap.weight = 0.20;
        d.liquidity_trap.spread_threshold_bps = 60.0;
        d.accumulation_distribution.low_rsi = 35.0;
        d.accumulation_distribution.high_rsi = 75.0;
        cfg
    }

    /// Very sensitive thresholds for smoke-testing a deployment.
    #[must_use]
    pub fn startup() -> Self {
        let mut cfg = Self::balanced();
        cfg.mode = "startup".to_string();
        cfg.max_concurrency = 5;
        cfg.tick_deadline_ms = 9_000;
        cfg.volume_spike_threshold = 1.5;
        cfg.order_book.depth = 10;
        cfg.order_book.top_levels = 5;
        cfg.cooldown_secs = 60;
        cfg.normalization = Normalization::ActiveWeights;

        let d = &mut cfg.detectors;
        d.volume_explosion.ratio_threshold = 1.5;
        d.volume_explosion.move_threshold_pct = 0.5;
        d.rsi_divergence.oversold = 40.0;
        d.rsi_divergence.overbought = 60.0;
        d.momentum_shift.min_recent_move_pct = 0.3;
        d.momentum_shift.min_base_move_pct = 0.6;
        d.momentum_shift.min_volume_ratio = 1.2;
        d.accumulation_distribution.volume_ratio = 1.2;
        cfg
    }

    /// Sets the symbol list.
    #[must_use]
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn tick_deadline(&self) -> Duration {
        Duration::from_millis(self.tick_deadline_ms)
    }

    #[must_use]
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX))
    }

    #[must_use]
    pub fn order_book_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.order_book.cache_ttl_secs).unwrap_or(i64::MAX),
        )
    }

    /// Checks every invariant the pipeline relies on.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_u64("tick_interval_secs", self.tick_interval_secs)?;
        positive_u64("request_timeout_ms", self.request_timeout_ms)?;
        positive_u64("tick_deadline_ms", self.tick_deadline_ms)?;
        positive_u64("cooldown_secs", self.cooldown_secs)?;
        positive_u64("retry.initial_backoff_ms", self.retry.initial_backoff_ms)?;
        if self.max_concurrency == 0 {
            return Err(ConfigError::non_positive("max_concurrency"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::non_positive("retry.max_attempts"));
        }
        if self.requests_per_second == 0 {
            return Err(ConfigError::non_positive("requests_per_second"));
        }
        if self.candle_window == 0 {
            return Err(ConfigError::non_positive("candle_window"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::invalid("retry.multiplier", "must be >= 1.0"));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.max_backoff_ms",
                "must be >= retry.initial_backoff_ms",
            ));
        }
        if self.tick_deadline_ms > self.tick_interval_secs.saturating_mul(1_000) {
            return Err(ConfigError::invalid(
                "tick_deadline_ms",
                "must not exceed the tick interval",
            ));
        }
        if self.history_capacity < MIN_HISTORY_CAPACITY.max(self.candle_window) {
            return Err(ConfigError::invalid(
                "history_capacity",
                format!(
                    "must be at least {} and at least candle_window",
                    MIN_HISTORY_CAPACITY
                ),
            ));
        }
        positive_f64("volume_spike_threshold", self.volume_spike_threshold)?;

        if self.order_book.enabled {
            let ob = &self.order_book;
            if ob.depth == 0 {
                return Err(ConfigError::non_positive("order_book.depth"));
            }
            if ob.top_levels <= ob.near_levels || ob.near_levels == 0 {
                return Err(ConfigError::invalid(
                    "order_book.top_levels",
                    "need 0 < near_levels < top_levels",
                ));
            }
            positive_f64("order_book.reference_depth", ob.reference_depth)?;
            if ob.spoof_saturation <= 1.0 {
                return Err(ConfigError::invalid(
                    "order_book.spoof_saturation",
                    "must be greater than 1.0",
                ));
            }
            positive_u64("order_book.cache_ttl_secs", ob.cache_ttl_secs)?;
        }

        self.validate_detectors()
    }

    fn validate_detectors(&self) -> Result<(), ConfigError> {
        let d = &self.detectors;

        if DetectorKind::ALL.iter().any(|k| d.weight(*k) < 0.0) {
            return Err(ConfigError::InvalidWeights {
                sum: d.total_weight(),
            });
        }
        let sum = d.total_weight();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights { sum });
        }

        let ve = &d.volume_explosion;
        positive_f64("detectors.volume_explosion.ratio_threshold", ve.ratio_threshold)?;
        positive_f64("detectors.volume_explosion.move_threshold_pct", ve.move_threshold_pct)?;

        let rsi = &d.rsi_divergence;
        if !(0.0 < rsi.oversold && rsi.oversold < rsi.overbought && rsi.overbought < 100.0) {
            return Err(ConfigError::invalid(
                "detectors.rsi_divergence",
                "need 0 < oversold < overbought < 100",
            ));
        }

        let ms = &d.momentum_shift;
        positive_f64("detectors.momentum_shift.min_recent_move_pct", ms.min_recent_move_pct)?;
        positive_f64("detectors.momentum_shift.min_base_move_pct", ms.min_base_move_pct)?;
        positive_f64("detectors.momentum_shift.acceleration_ratio", ms.acceleration_ratio)?;

        let lt = &d.liquidity_trap;
        positive_f64("detectors.liquidity_trap.spread_threshold_bps", lt.spread_threshold_bps)?;
        positive_f64("detectors.liquidity_trap.liquidity_threshold", lt.liquidity_threshold)?;
        if !(0.0 < lt.spoofing_threshold && lt.spoofing_threshold < 1.0) {
            return Err(ConfigError::invalid(
                "detectors.liquidity_trap.spoofing_threshold",
                "must be in (0, 1)",
            ));
        }
        if lt.imbalance_bias < 1.0 {
            return Err(ConfigError::invalid(
                "detectors.liquidity_trap.imbalance_bias",
                "must be >= 1.0",
            ));
        }

        let ad = &d.accumulation_distribution;
        if !(0.0 < ad.low_rsi && ad.low_rsi < ad.high_rsi && ad.high_rsi < 100.0) {
            return Err(ConfigError::invalid(
                "detectors.accumulation_distribution",
                "need 0 < low_rsi < high_rsi < 100",
            ));
        }
        positive_f64("detectors.accumulation_distribution.volume_ratio", ad.volume_ratio)?;
        positive_f64(
            "detectors.accumulation_distribution.max_volatility_pct",
            ad.max_volatility_pct,
        )?;
        positive_f64(
            "detectors.accumulation_distribution.min_decline_pct",
            ad.min_decline_pct,
        )?;

        Ok(())
    }
}

fn positive_u64(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::non_positive(field))
    } else {
        Ok(())
    }
}

fn positive_f64(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::non_positive(field))
    }
}
