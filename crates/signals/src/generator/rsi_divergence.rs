//! RSI Divergence: an oversold/overbought RSI while price keeps pushing the same way.

use super::Detector;
use surge_watch_core::{
    DetectionResult, DetectorKind, Direction, FeatureSnapshot, RsiDivergenceConfig,
};

/// Bullish when oversold and still falling, bearish when overbought and still rising.
#[derive(Debug, Clone)]
pub struct RsiDivergence {
    config: RsiDivergenceConfig,
}

impl RsiDivergence {
    #[must_use]
    pub fn new(config: RsiDivergenceConfig) -> Self {
        Self { config }
    }

    fn confidence(&self, distance: f64, move_abs: f64) -> f64 {
        let c = &self.config;
        (c.base_confidence + c.per_rsi_point * distance + c.per_move_pct * move_abs).clamp(0.0, 1.0)
    }
}

impl Detector for RsiDivergence {
    fn kind(&self) -> DetectorKind {
        DetectorKind::RsiDivergence
    }

    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult {
        let kind = self.kind();
        let Some(rsi) = snapshot.rsi_14 else {
            return DetectionResult::inactive(kind, "RSI unavailable, history too short");
        };
        let Some(change) = snapshot.price_change.m5 else {
            return DetectionResult::inactive(kind, "5m price change unavailable");
        };

        let c = &self.config;
        if rsi < c.oversold && change < -c.min_move_pct {
            let distance = c.oversold - rsi;
            return DetectionResult::active(
                kind,
                self.confidence(distance, change.abs()),
                Direction::Bullish,
                format!("RSI {rsi:.1} oversold while price {change:+.2}% over 5m"),
            );
        }
        if rsi > c.overbought && change > c.min_move_pct {
            let distance = rsi - c.overbought;
            return DetectionResult::active(
                kind,
                self.confidence(distance, change.abs()),
                Direction::Bearish,
                format!("RSI {rsi:.1} overbought while price {change:+.2}% over 5m"),
            );
        }

        DetectionResult::inactive(kind, format!("RSI {rsi:.1} with {change:+.2}% move"))
    }
}
