//! Momentum Shift: the 1m and 5m horizons disagree, either because the last
//! minute is accelerating the 5m trend or because it reverses it.

use super::Detector;
use surge_watch_core::{
    DetectionResult, DetectorKind, Direction, FeatureSnapshot, MomentumShiftConfig,
};

/// Floor for the denominator of the acceleration ratio.
const MIN_RESIDUAL_MOVE: f64 = 0.1;

/// Acceleration or reversal between the 1m and 5m price changes.
#[derive(Debug, Clone)]
pub struct MomentumShift {
    config: MomentumShiftConfig,
}

impl MomentumShift {
    #[must_use]
    pub fn new(config: MomentumShiftConfig) -> Self {
        Self { config }
    }

    fn scaled(&self, excess: f64) -> f64 {
        (self.config.base_confidence + self.config.excess_gain * excess.max(0.0)).clamp(0.0, 1.0)
    }
}

/// How strongly the last bar dominates the 5m move: `|c1| / |c5 - c1|`.
#[must_use]
pub fn acceleration(change_1m: f64, change_5m: f64) -> f64 {
    change_1m.abs() / (change_5m - change_1m).abs().max(MIN_RESIDUAL_MOVE)
}

impl Detector for MomentumShift {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MomentumShift
    }

    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult {
        let kind = self.kind();
        if snapshot.momentum_10.is_none() {
            return DetectionResult::inactive(kind, "momentum unavailable, history too short");
        }
        let (Some(c1), Some(c5)) = (snapshot.price_change.m1, snapshot.price_change.m5) else {
            return DetectionResult::inactive(kind, "1m/5m price change unavailable");
        };

        let c = &self.config;
        if c1.abs() < c.min_recent_move_pct {
            return DetectionResult::inactive(kind, format!("1m move {c1:+.2}% too small"));
        }

        if c1 * c5 < 0.0 {
            let confidence = self.scaled(c1.abs() / c.min_recent_move_pct - 1.0);
            return DetectionResult::active(
                kind,
                confidence,
                Direction::from_sign(c1),
                format!("reversal: 1m {c1:+.2}% against 5m {c5:+.2}%"),
            );
        }

        let volume_confirmed = snapshot
            .volume
            .ratio_5m
            .is_some_and(|r| r >= c.min_volume_ratio);
        let accel = acceleration(c1, c5);
        if c5.abs() >= c.min_base_move_pct && accel >= c.acceleration_ratio && volume_confirmed {
            let confidence = self.scaled(accel / c.acceleration_ratio - 1.0);
            return DetectionResult::active(
                kind,
                confidence,
                Direction::from_sign(c1),
                format!("acceleration {accel:.2}x: 1m {c1:+.2}% on 5m {c5:+.2}%"),
            );
        }

        DetectionResult::inactive(
            kind,
            format!("no shift: 1m {c1:+.2}%, 5m {c5:+.2}%, accel {accel:.2}"),
        )
    }
}
