//! MEXC contract market data for surge-watch.
//!
//! [`MexcClient`] implements [`surge_watch_core::MarketDataSource`] over the
//! public kline and depth endpoints. No credentials are needed.
//!
//! Errors are typed as [`MexcError`] inside the crate and converted into
//! [`surge_watch_core::FetchError`] at the trait boundary, so the scheduler
//! can decide what to retry:
//!
//! - HTTP 429 becomes a rate limit carrying the `Retry-After` delay
//! - HTTP 5xx becomes a retryable API error
//! - `success: false` envelopes and misaligned kline columns are not retried

pub mod client;
pub mod error;
mod types;

pub use client::{MexcClient, MexcClientConfig, MAX_LIMIT, MEXC_CONTRACT_URL};
pub use error::{MexcError, Result, DEFAULT_RETRY_AFTER_SECS};
