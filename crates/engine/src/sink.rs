//! Notification delivery boundary.

use coinseer_core::UserId;
use thiserror::Error;

/// Delivery failed; the alert's state is left unchanged so it is not
/// lost, and it will be re-evaluated (and re-notified) next cycle.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Delivers a pre-rendered triggered-alert message to a user.
///
/// Message composition beyond the plain text payload (currency symbols,
/// rich markup, keyboards) belongs to the presentation layer behind the
/// implementation.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, recipient: UserId, message: &str) -> Result<(), DeliveryError>;
}
