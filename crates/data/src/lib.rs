//! Persistence and delivery for surge-watch.
//!
//! Every sink is append-only and keyed by `(symbol, timestamp)`:
//! - [`JsonlSink`] writes snapshots and alert records as JSON lines
//! - [`CsvAlertLog`] keeps a flat CSV of alert records
//! - [`MemorySink`] holds everything in memory for tests and one-shot runs
//! - [`FanoutSink`] combines several of the above
//!
//! [`LogNotifier`] delivers emitted alerts through `tracing`.

pub mod csv_log;
pub mod fanout;
pub mod jsonl;
pub mod memory;
pub mod notify;

pub use csv_log::CsvAlertLog;
pub use fanout::FanoutSink;
pub use jsonl::{JsonlSink, ALERTS_FILE, FEATURES_FILE};
pub use memory::MemorySink;
pub use notify::{format_alert, LogNotifier};
