//! Volume Explosion: an abnormal volume burst accompanying a sharp price move.

use super::Detector;
use surge_watch_core::{
    DetectionResult, DetectorKind, Direction, FeatureSnapshot, VolumeExplosionConfig,
};

/// Fires when the 5m volume ratio and the 5m price move both clear their thresholds.
#[derive(Debug, Clone)]
pub struct VolumeExplosion {
    config: VolumeExplosionConfig,
}

impl VolumeExplosion {
    #[must_use]
    pub fn new(config: VolumeExplosionConfig) -> Self {
        Self { config }
    }
}

/// Confidence for a triggered explosion.
///
/// `base` at exactly both thresholds, rising by `gain` per unit of relative
/// excess on either axis.
///
/// # Arguments
/// * `ratio` - 5m volume ratio (already >= threshold)
/// * `move_abs` - Absolute 5m price change in percent (already >= threshold)
#[must_use]
pub fn explosion_confidence(ratio: f64, move_abs: f64, config: &VolumeExplosionConfig) -> f64 {
    let ratio_excess = ratio / config.ratio_threshold - 1.0;
    let move_excess = move_abs / config.move_threshold_pct - 1.0;
    (config.base_confidence + config.excess_gain * (ratio_excess + move_excess)).clamp(0.0, 1.0)
}

impl Detector for VolumeExplosion {
    fn kind(&self) -> DetectorKind {
        DetectorKind::VolumeExplosion
    }

    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult {
        let kind = self.kind();
        let Some(ratio) = snapshot.volume.ratio_5m else {
            return DetectionResult::inactive(kind, "5m volume ratio unavailable");
        };
        let Some(change) = snapshot.price_change.m5 else {
            return DetectionResult::inactive(kind, "5m price change unavailable");
        };

        if ratio < self.config.ratio_threshold || change.abs() < self.config.move_threshold_pct {
            return DetectionResult::inactive(
                kind,
                format!("volume {ratio:.2}x, move {change:+.2}% below thresholds"),
            );
        }

        let confidence = explosion_confidence(ratio, change.abs(), &self.config);
        DetectionResult::active(
            kind,
            confidence,
            Direction::from_sign(change),
            format!("volume {ratio:.1}x 5m average with {change:+.2}% move"),
        )
    }
}
