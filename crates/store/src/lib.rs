//! Persisted per-user state for the CoinSeer alert engine.
//!
//! This crate owns the SQLite rows exclusively: alert definitions and
//! lifecycle flags, user preferences, watchlists. The evaluation engine
//! only ever holds transient read snapshots of them.

pub mod alert;
pub mod db;

pub use alert::{Direction, PriceAlert, VolumeAlert};
pub use db::{AlertStore, StoreError};
