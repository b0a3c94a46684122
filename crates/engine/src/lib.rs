//! Alert evaluation and delivery for the CoinSeer alert engine.
//!
//! The [`AlertEngine`] runs two scheduler-driven jobs: price-alert
//! evaluation and volume-alert evaluation. Each cycle loads active
//! alerts, batches one market-data request over the distinct referenced
//! assets, evaluates every alert independently, and delivers through a
//! [`NotificationSink`]. Failures are isolated per alert; a bad asset
//! or failed delivery never aborts a cycle.

pub mod baseline;
pub mod engine;
pub mod message;
pub mod scheduler;
pub mod sink;

pub use baseline::VolumeBaselines;
pub use engine::{AlertEngine, CycleSummary};
pub use scheduler::run_periodic;
pub use sink::{DeliveryError, NotificationSink};
