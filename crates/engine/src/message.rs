//! Plain-text rendering of triggered alerts.

use coinseer_store::{PriceAlert, VolumeAlert};

/// Render a triggered price alert.
pub fn price_alert_triggered(alert: &PriceAlert, current_price: f64) -> String {
    format!(
        "🔔 Price alert triggered!\n\n\
         {symbol}: price went {direction} {target:.2} {fiat}\n\
         Current price: {price:.2} {fiat}",
        symbol = alert.asset.display_symbol(),
        direction = alert.direction,
        target = alert.target_price,
        price = current_price,
        fiat = alert.fiat,
    )
}

/// Render a triggered volume-spike alert.
pub fn volume_alert_triggered(alert: &VolumeAlert, ratio: f64, current_volume: f64) -> String {
    format!(
        "📊 Volume alert triggered!\n\n\
         {symbol}: 24h volume is {ratio:.1}x the previous reading\n\
         Current 24h volume: {volume:.0} {fiat}",
        symbol = alert.asset.display_symbol(),
        ratio = ratio,
        volume = current_volume,
        fiat = alert.fiat,
    )
}
