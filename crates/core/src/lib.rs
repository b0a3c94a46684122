//! Core data types for the CoinSeer alert engine.

pub mod asset;
pub mod fiat;
pub mod observation;

pub use asset::*;
pub use fiat::*;
pub use observation::*;

/// Telegram-style numeric user identity.
pub type UserId = i64;
