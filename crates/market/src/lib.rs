//! Market data gateway for the CoinSeer alert engine.
//!
//! Wraps the upstream price/volume API behind the [`MarketData`] trait:
//! - batched fetches over a de-duplicated set of asset ids
//! - per-logical-endpoint rate limiting
//! - retry with exponential backoff; exhaustion surfaces as
//!   [`MarketError::DataUnavailable`], never a panic

pub mod error;
pub mod gateway;
pub mod rate_limit;
pub mod retry;

pub use error::MarketError;
pub use gateway::{CoinGeckoClient, GatewayConfig, MarketData};
pub use rate_limit::RateLimiter;
pub use retry::{with_retry, RetryPolicy};
