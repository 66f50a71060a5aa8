//! Accumulation/Distribution.
//!
//! Accumulation is quiet buying into weakness: low RSI, heavy volume, but a
//! calm tape. Distribution is selling into strength: high RSI, heavy volume,
//! and price already slipping.

use super::Detector;
use surge_watch_core::{
    AccumulationConfig, DetectionResult, DetectorKind, Direction, FeatureSnapshot,
};

#[derive(Debug, Clone)]
pub struct AccumulationDistribution {
    config: AccumulationConfig,
}

impl AccumulationDistribution {
    #[must_use]
    pub fn new(config: AccumulationConfig) -> Self {
        Self { config }
    }

    fn joint(&self, strengths: [f64; 3]) -> f64 {
        let mean = strengths.iter().map(|s| s.clamp(0.0, 1.0)).sum::<f64>() / 3.0;
        (self.config.base_confidence + self.config.gain * mean).clamp(0.0, 1.0)
    }

    fn volume_strength(&self, ratio: f64) -> f64 {
        (ratio / self.config.volume_ratio - 1.0).min(1.0)
    }
}

impl Detector for AccumulationDistribution {
    fn kind(&self) -> DetectorKind {
        DetectorKind::AccumulationDistribution
    }

    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult {
        let kind = self.kind();
        let Some(rsi) = snapshot.rsi_14 else {
            return DetectionResult::inactive(kind, "RSI unavailable, history too short");
        };
        let Some(ratio) = snapshot.volume.ratio_5m else {
            return DetectionResult::inactive(kind, "5m volume ratio unavailable");
        };

        let c = &self.config;
        if ratio < c.volume_ratio {
            return DetectionResult::inactive(kind, format!("volume {ratio:.2}x too low"));
        }

        if rsi < c.low_rsi {
            if let Some(vol) = snapshot.volatility_5m.filter(|v| *v <= c.max_volatility_pct) {
                let confidence = self.joint([
                    (c.low_rsi - rsi) / c.low_rsi,
                    self.volume_strength(ratio),
                    1.0 - vol / c.max_volatility_pct,
                ]);
                return DetectionResult::active(
                    kind,
                    confidence,
                    Direction::Bullish,
                    format!("accumulation: RSI {rsi:.1}, volume {ratio:.1}x, volatility {vol:.2}%"),
                );
            }
        }

        if rsi > c.high_rsi {
            if let Some(change) = snapshot.price_change.m5.filter(|m| *m <= -c.min_decline_pct) {
                let confidence = self.joint([
                    (rsi - c.high_rsi) / (100.0 - c.high_rsi),
                    self.volume_strength(ratio),
                    (change.abs() / c.min_decline_pct - 1.0).min(1.0),
                ]);
                return DetectionResult::active(
                    kind,
                    confidence,
                    Direction::Bearish,
                    format!("distribution: RSI {rsi:.1}, volume {ratio:.1}x, price {change:+.2}%"),
                );
            }
        }

        DetectionResult::inactive(kind, format!("RSI {rsi:.1}, volume {ratio:.1}x"))
    }
}
