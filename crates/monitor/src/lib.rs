//! Tick scheduling for surge-watch.
//!
//! [`FetchScheduler`] owns the symbol registry and drives one bounded fan-out
//! per tick; everything symbol-specific is delegated to
//! [`surge_watch_signals::SignalPipeline`].

pub mod error;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod stats;

pub use error::MonitorError;
pub use registry::SymbolRegistry;
pub use retry::{RetryOutcome, RetryPolicy};
pub use scheduler::{FetchScheduler, StopHandle};
pub use stats::{volume_leaders, MonitorStats, TickReport, VolumeLeader};
