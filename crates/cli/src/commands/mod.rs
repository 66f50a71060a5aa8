//! CLI commands for the surge-watch monitor.

pub mod args;
pub mod check_config;
pub mod modes;
pub mod monitor;

pub use args::{ConfigArgs, MonitorArgs};
