//! Feature extraction, pattern detection and scoring for surge-watch.
//!
//! Everything in this crate is synchronous and free of I/O: indicators and
//! order-book metrics are pure functions, detectors are pure functions of a
//! [`surge_watch_core::FeatureSnapshot`], and the only mutable value is the
//! per-symbol [`SymbolState`].

pub mod cooldown;
pub mod features;
pub mod generator;
pub mod indicators;
pub mod orderbook;
pub mod pipeline;
pub mod registry;
pub mod state;

pub use cooldown::{CooldownDecision, CooldownState, CooldownTracker};
pub use features::FeatureExtractor;
pub use generator::{
    classify_risk, decide_action, AccumulationDistribution, CompositeScorer, Detector,
    LiquidityTrap, MomentumShift, RsiDivergence, VolumeExplosion,
};
pub use pipeline::{Evaluation, SignalPipeline};
pub use registry::DetectorSet;
pub use state::{IngestSummary, SymbolState};
