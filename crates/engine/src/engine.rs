//! Alert evaluation cycles.

use crate::baseline::VolumeBaselines;
use crate::message;
use crate::sink::NotificationSink;
use coinseer_core::{AssetId, Fiat, Observation};
use coinseer_market::MarketData;
use coinseer_store::{AlertStore, Direction, PriceAlert};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-cycle accounting. Every loaded alert ends the cycle in exactly
/// one bucket: triggered, skipped, or quietly not triggered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Active alerts loaded from the store.
    pub loaded: usize,
    /// Alerts whose condition held this cycle.
    pub triggered: usize,
    /// Notifications handed to the sink successfully.
    pub delivered: usize,
    /// One-time alerts turned inactive this cycle.
    pub deactivated: usize,
    /// Alerts skipped for missing data; they retry next cycle.
    pub skipped: usize,
}

enum Outcome {
    NotTriggered,
    Skipped,
    Delivered { deactivated: bool },
    DeliveryFailed,
}

/// Scheduler-driven evaluation engine.
///
/// Owns the volume baseline map explicitly (no ambient module state);
/// its lifecycle is the process lifecycle. All market and delivery I/O
/// goes through the injected trait objects.
pub struct AlertEngine {
    store: AlertStore,
    market: Arc<dyn MarketData>,
    sink: Arc<dyn NotificationSink>,
    baselines: VolumeBaselines,
    default_fiat: Fiat,
}

impl AlertEngine {
    pub fn new(
        store: AlertStore,
        market: Arc<dyn MarketData>,
        sink: Arc<dyn NotificationSink>,
        default_fiat: Fiat,
    ) -> Self {
        Self {
            store,
            market,
            sink,
            baselines: VolumeBaselines::new(),
            default_fiat,
        }
    }

    pub fn baselines(&self) -> &VolumeBaselines {
        &self.baselines
    }

    /// One price-alert evaluation cycle: load active alerts, fetch one
    /// batch over the distinct assets, evaluate each alert in isolation.
    pub async fn run_price_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        let alerts = match self.store.active_price_alerts().await {
            Ok(alerts) => alerts,
            Err(err) => {
                error!(error = %err, "failed to load active price alerts");
                return summary;
            }
        };
        if alerts.is_empty() {
            return summary;
        }
        summary.loaded = alerts.len();

        let assets = distinct_assets(alerts.iter().map(|a| &a.asset));
        let batch = match self.market.fetch(&assets, self.default_fiat).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "price batch unavailable, retrying next cycle");
                summary.skipped = alerts.len();
                return summary;
            }
        };

        for alert in &alerts {
            match self.evaluate_price_alert(alert, &batch).await {
                Outcome::NotTriggered => {}
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Delivered { deactivated } => {
                    summary.triggered += 1;
                    summary.delivered += 1;
                    if deactivated {
                        summary.deactivated += 1;
                    }
                }
                Outcome::DeliveryFailed => summary.triggered += 1,
            }
        }

        debug!(?summary, "price cycle complete");
        summary
    }

    async fn evaluate_price_alert(
        &self,
        alert: &PriceAlert,
        batch: &HashMap<AssetId, Observation>,
    ) -> Outcome {
        let Some(observation) = batch.get(&alert.asset) else {
            warn!(alert_id = alert.id, asset = %alert.asset, "no observation for asset, skipping");
            return Outcome::Skipped;
        };
        let Some(price) = observation.price_in(alert.fiat) else {
            warn!(
                alert_id = alert.id,
                asset = %alert.asset,
                fiat = alert.fiat.as_str(),
                "preferred quote currency not in observation, skipping"
            );
            return Outcome::Skipped;
        };

        // Strict inequality: a price exactly at target never triggers.
        let triggered = match alert.direction {
            Direction::Above => price > alert.target_price,
            Direction::Below => price < alert.target_price,
        };
        if !triggered {
            return Outcome::NotTriggered;
        }

        let text = message::price_alert_triggered(alert, price);
        if let Err(err) = self.sink.deliver(alert.owner, &text).await {
            // Leave the alert active so it is re-evaluated, and
            // re-notified, next cycle instead of being silently lost.
            error!(alert_id = alert.id, user_id = alert.owner, error = %err, "delivery failed");
            return Outcome::DeliveryFailed;
        }
        info!(
            alert_id = alert.id,
            user_id = alert.owner,
            asset = %alert.asset,
            price,
            "price alert fired"
        );

        if alert.recurring {
            // Stays active; may fire again next cycle.
            return Outcome::Delivered { deactivated: false };
        }
        match self.store.deactivate_price_alert(alert.id).await {
            Ok(()) => Outcome::Delivered { deactivated: true },
            Err(err) => {
                error!(alert_id = alert.id, error = %err, "failed to deactivate one-time alert");
                Outcome::Delivered { deactivated: false }
            }
        }
    }

    /// One volume-alert evaluation cycle. Each asset's current 24h
    /// volume is compared against the previous cycle's baseline, and
    /// the baseline is then overwritten regardless of the outcome.
    pub async fn run_volume_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        let alerts = match self.store.active_volume_alerts().await {
            Ok(alerts) => alerts,
            Err(err) => {
                error!(error = %err, "failed to load active volume alerts");
                return summary;
            }
        };
        if alerts.is_empty() {
            return summary;
        }
        summary.loaded = alerts.len();

        let assets = distinct_assets(alerts.iter().map(|a| &a.asset));
        let batch = match self.market.fetch(&assets, self.default_fiat).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "volume batch unavailable, retrying next cycle");
                summary.skipped = alerts.len();
                return summary;
            }
        };

        // Ratio against the previous baseline, per asset with a usable
        // comparison. Assets observed for the first time (or with a
        // zero baseline) only seed the next cycle.
        let mut observed: HashSet<AssetId> = HashSet::with_capacity(assets.len());
        let mut comparisons: HashMap<AssetId, (f64, f64)> = HashMap::new();
        for asset in &assets {
            let Some(volume) = batch.get(asset).and_then(|o| o.volume_in(self.default_fiat))
            else {
                warn!(asset = %asset, "no volume observation, skipping");
                continue;
            };
            observed.insert(asset.clone());

            match self.baselines.previous(asset) {
                Some(previous) if previous > 0.0 => {
                    comparisons.insert(asset.clone(), (volume / previous, volume));
                }
                Some(_) => debug!(asset = %asset, "zero baseline, skipping comparison"),
                None => debug!(asset = %asset, volume, "seeding volume baseline"),
            }
            self.baselines.record(asset, volume);
        }

        for alert in &alerts {
            if !observed.contains(&alert.asset) {
                summary.skipped += 1;
                continue;
            }
            let Some(&(ratio, volume)) = comparisons.get(&alert.asset) else {
                continue;
            };
            if ratio < alert.multiplier {
                continue;
            }

            summary.triggered += 1;
            let text = message::volume_alert_triggered(alert, ratio, volume);
            match self.sink.deliver(alert.owner, &text).await {
                Ok(()) => {
                    summary.delivered += 1;
                    info!(
                        alert_id = alert.id,
                        user_id = alert.owner,
                        asset = %alert.asset,
                        ratio,
                        "volume alert fired"
                    );
                }
                Err(err) => {
                    error!(alert_id = alert.id, user_id = alert.owner, error = %err, "delivery failed");
                }
            }
            // No deactivation: volume alerts re-arm against the freshly
            // overwritten baseline.
        }

        debug!(?summary, "volume cycle complete");
        summary
    }
}

/// De-duplicate referenced assets, preserving first-seen order.
fn distinct_assets<'a>(assets: impl Iterator<Item = &'a AssetId>) -> Vec<AssetId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for asset in assets {
        if seen.insert(asset.clone()) {
            out.push(asset.clone());
        }
    }
    out
}
