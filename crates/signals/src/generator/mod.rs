//! Pattern detectors and the composite scorer.
//!
//! Every detector is a pure function of one [`FeatureSnapshot`]; temporal
//! context already lives in the symbol's history, so detectors hold only
//! their thresholds.

mod accumulation;
mod composite;
mod liquidity_trap;
mod momentum_shift;
mod rsi_divergence;
mod volume_explosion;

pub use accumulation::AccumulationDistribution;
pub use composite::{classify_risk, decide_action, CompositeScorer};
pub use liquidity_trap::LiquidityTrap;
pub use momentum_shift::{acceleration, MomentumShift};
pub use rsi_divergence::RsiDivergence;
pub use volume_explosion::{explosion_confidence, VolumeExplosion};

use surge_watch_core::{DetectionResult, DetectorKind, FeatureSnapshot};

/// A stateless pattern detector.
pub trait Detector: Send + Sync {
    /// Which detector this is.
    fn kind(&self) -> DetectorKind;

    /// Evaluates the snapshot. Missing features must yield an inactive result.
    fn detect(&self, snapshot: &FeatureSnapshot) -> DetectionResult;
}
