//! The set of detectors a profile enables.
//!
//! Keyed by [`DetectorKind`] so that registering a detector twice replaces the
//! first one. [`DetectorSet::evaluate`] always returns one result per known
//! detector, in [`DetectorKind::ALL`] order; a detector that is not registered
//! reports inactive.

use std::collections::BTreeMap;

use crate::generator::{
    AccumulationDistribution, Detector, LiquidityTrap, MomentumShift, RsiDivergence,
    VolumeExplosion,
};
use surge_watch_core::{DetectionResult, DetectorKind, DetectorSettings, FeatureSnapshot};

/// Registry of enabled detectors.
pub struct DetectorSet {
    detectors: BTreeMap<DetectorKind, Box<dyn Detector>>,
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            detectors: BTreeMap::new(),
        }
    }

    /// Builds the five detectors from their settings, skipping disabled ones.
    #[must_use]
    pub fn from_settings(settings: &DetectorSettings) -> Self {
        let mut set = Self::new();
        let candidates: [Box<dyn Detector>; 5] = [
            Box::new(VolumeExplosion::new(settings.volume_explosion.clone())),
            Box::new(RsiDivergence::new(settings.rsi_divergence.clone())),
            Box::new(MomentumShift::new(settings.momentum_shift.clone())),
            Box::new(LiquidityTrap::new(settings.liquidity_trap.clone())),
            Box::new(AccumulationDistribution::new(
                settings.accumulation_distribution.clone(),
            )),
        ];
        for detector in candidates {
            if settings.is_enabled(detector.kind()) {
                set.register(detector);
            }
        }
        set
    }

    /// Registers a detector, replacing any existing one of the same kind.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.insert(detector.kind(), detector);
    }

    /// Removes a detector. Returns it if it was registered.
    pub fn remove(&mut self, kind: DetectorKind) -> Option<Box<dyn Detector>> {
        self.detectors.remove(&kind)
    }

    #[must_use]
    pub fn get(&self, kind: DetectorKind) -> Option<&dyn Detector> {
        self.detectors.get(&kind).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, kind: DetectorKind) -> bool {
        self.detectors.contains_key(&kind)
    }

    /// Registered kinds in detector order.
    #[must_use]
    pub fn kinds(&self) -> Vec<DetectorKind> {
        self.detectors.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Runs every detector against one snapshot.
    #[must_use]
    pub fn evaluate(&self, snapshot: &FeatureSnapshot) -> Vec<DetectionResult> {
        DetectorKind::ALL
            .iter()
            .map(|kind| match self.detectors.get(kind) {
                Some(detector) => detector.detect(snapshot),
                None => DetectionResult::inactive(*kind, "detector disabled"),
            })
            .collect()
    }
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSet")
            .field("detectors", &self.kinds())
            .finish()
    }
}
