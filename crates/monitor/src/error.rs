use surge_watch_core::ConfigError;
use thiserror::Error;

/// Errors that stop the scheduler from starting or running.
///
/// Per-symbol failures never surface here; they are logged and counted.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No symbols to monitor.
    #[error("at least one symbol is required")]
    NoSymbols,

    /// `run` was called after a stop was requested.
    #[error("scheduler already stopped")]
    AlreadyStopped,
}
