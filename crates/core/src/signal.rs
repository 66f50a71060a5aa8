//! Detection and verdict types.
//!
//! Detectors produce a [`DetectionResult`] per tick; the composite scorer folds
//! them into a [`CompositeSignal`]; the cooldown decides whether that verdict
//! becomes an emitted [`AlertRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional bias of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Expect price to go up
    Bullish,
    /// Expect price to go down
    Bearish,
    /// No directional bias
    Neutral,
}

impl Direction {
    /// Direction implied by the sign of a price move.
    #[must_use]
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Bullish
        } else if value < 0.0 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// Identifies one of the five detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    VolumeExplosion,
    RsiDivergence,
    MomentumShift,
    LiquidityTrap,
    AccumulationDistribution,
}

impl DetectorKind {
    /// Every detector, in evaluation order.
    pub const ALL: [Self; 5] = [
        Self::VolumeExplosion,
        Self::RsiDivergence,
        Self::MomentumShift,
        Self::LiquidityTrap,
        Self::AccumulationDistribution,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VolumeExplosion => "volume_explosion",
            Self::RsiDivergence => "rsi_divergence",
            Self::MomentumShift => "momentum_shift",
            Self::LiquidityTrap => "liquidity_trap",
            Self::AccumulationDistribution => "accumulation_distribution",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one detector for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detector: DetectorKind,
    pub active: bool,
    /// Always in [0, 1]; zero when inactive
    pub confidence: f64,
    pub direction: Direction,
    pub rationale: String,
}

impl DetectionResult {
    /// An active detection. Confidence is clamped to [0, 1]; NaN becomes 0.
    #[must_use]
    pub fn active(
        detector: DetectorKind,
        confidence: f64,
        direction: Direction,
        rationale: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            detector,
            active: true,
            confidence,
            direction,
            rationale: rationale.into(),
        }
    }

    /// An inactive detection with the reason it did not fire.
    #[must_use]
    pub fn inactive(detector: DetectorKind, rationale: impl Into<String>) -> Self {
        Self {
            detector,
            active: false,
            confidence: 0.0,
            direction: Direction::Neutral,
            rationale: rationale.into(),
        }
    }
}

/// Risk classification of a composite verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// HIGH and EXTREME verdicts may be dispatched.
    #[must_use]
    pub const fn is_alert_eligible(self) -> bool {
        matches!(self, Self::High | Self::Extreme)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        };
        f.write_str(s)
    }
}

/// Suggested action attached to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    None,
    Buy,
    StrongBuy,
    Sell,
    StrongSell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Buy => "BUY",
            Self::StrongBuy => "STRONG_BUY",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        };
        f.write_str(s)
    }
}

/// Combined verdict over all detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSignal {
    /// Always in [0, 1]
    pub confidence: f64,
    pub detections: Vec<DetectionResult>,
    pub active_count: usize,
    /// Mean confidence of active detectors (0 when none are active)
    pub average_active_confidence: f64,
    pub risk_level: RiskLevel,
    pub action: Action,
}

impl CompositeSignal {
    /// Iterates over the detections that fired.
    pub fn active_detections(&self) -> impl Iterator<Item = &DetectionResult> {
        self.detections.iter().filter(|d| d.active)
    }
}

/// A verdict that reached the cooldown stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub symbol: String,
    /// Tick time at which the verdict was evaluated
    pub timestamp: DateTime<Utc>,
    pub signal: CompositeSignal,
    /// False when the cooldown suppressed it
    pub emitted: bool,
    /// Verdict was computed from stale history
    pub stale: bool,
}

impl AlertRecord {
    /// Ordering key for dispatch: higher risk first, then higher confidence.
    #[must_use]
    pub fn priority(&self) -> (RiskLevel, f64) {
        (self.signal.risk_level, self.signal.confidence)
    }
}
