//! Liquidity Trap: a thin, wide book or one padded with size away from the touch.

use super::Detector;
use surge_watch_core::{
    DetectionResult, DetectorKind, Direction, FeatureSnapshot, LiquidityTrapConfig,
    OrderBookMetrics,
};

#[derive(Debug, Clone)]
pub struct LiquidityTrap {
    config: LiquidityTrapConfig,
}

impl LiquidityTrap {
    #[must_use]
    pub fn new(config: LiquidityTrapConfig) -> Self {
        Self { config }
    }

    /// Heavy bids read as fake support (bearish), heavy asks as fake resistance.
    fn direction(&self, metrics: &OrderBookMetrics) -> Direction {
        match metrics.imbalance {
            Some(i) if i >= self.config.imbalance_bias => Direction::Bearish,
            Some(i) if i > 0.0 && i <= 1.0 / self.config.imbalance_bias => Direction::Bullish,
            _ => Direction::Neutral,
        }
    }
}

impl Detector for LiquidityTrap {
    fn kind(&self) -> DetectorKind {
        DetectorKind::LiquidityTrap
    }

    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult {
        let kind = self.kind();
        let Some(metrics) = snapshot.order_book.as_ref() else {
            return DetectionResult::inactive(kind, "order book unavailable");
        };

        let c = &self.config;
        let thin_book = metrics.spread_bps > c.spread_threshold_bps
            && metrics.liquidity_score < c.liquidity_threshold;
        let spoofed = metrics.spoofing_score > c.spoofing_threshold;

        if !thin_book && !spoofed {
            return DetectionResult::inactive(
                kind,
                format!(
                    "spread {:.1}bps, liquidity {:.2}, spoofing {:.2}",
                    metrics.spread_bps, metrics.liquidity_score, metrics.spoofing_score
                ),
            );
        }

        let mut confidence = c.base_confidence;
        let mut reasons = Vec::new();
        if thin_book {
            let spread_excess = (metrics.spread_bps / c.spread_threshold_bps - 1.0).min(1.0);
            let deficit = 1.0 - metrics.liquidity_score / c.liquidity_threshold;
            confidence += c.spread_weight * spread_excess + c.liquidity_weight * deficit;
            reasons.push(format!(
                "spread {:.1}bps with liquidity {:.2}",
                metrics.spread_bps, metrics.liquidity_score
            ));
        }
        if spoofed {
            let spoof_excess =
                (metrics.spoofing_score - c.spoofing_threshold) / (1.0 - c.spoofing_threshold);
            confidence += c.spoofing_weight * spoof_excess;
            reasons.push(format!("spoofing score {:.2}", metrics.spoofing_score));
        }

        DetectionResult::active(kind, confidence, self.direction(metrics), reasons.join("; "))
    }
}
