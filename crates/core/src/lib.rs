//! Core types, configuration and collaborator traits for surge-watch.
//!
//! Everything here is plain data or a trait seam; the pipeline itself lives in
//! `surge-watch-signals` (features, detectors, scoring, cooldown) and
//! `surge-watch-monitor` (scheduling).

pub mod config;
pub mod config_loader;
pub mod error;
pub mod features;
pub mod market;
pub mod signal;
pub mod traits;

pub use config::{
    AccumulationConfig, DetectorSettings, LiquidityTrapConfig, MomentumShiftConfig,
    MonitorConfig, Normalization, OrderBookConfig, RetryConfig, RsiDivergenceConfig,
    VolumeExplosionConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, FetchError, IngestError};
pub use features::{FeatureSnapshot, OrderBookMetrics, PriceChanges, VolumeFeatures};
pub use market::{Candle, OrderBookSnapshot, PriceLevel, CANDLE_INTERVAL_SECS};
pub use signal::{
    Action, AlertRecord, CompositeSignal, DetectionResult, DetectorKind, Direction, RiskLevel,
};
pub use traits::{AlertNotifier, MarketDataSource, SnapshotSink};
