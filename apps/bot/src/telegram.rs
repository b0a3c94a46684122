//! Telegram bot handlers.

use coinseer_core::{AssetId, Fiat, Observation, UserId};
use coinseer_engine::{DeliveryError, NotificationSink};
use coinseer_market::{CoinGeckoClient, MarketData};
use coinseer_store::{AlertStore, Direction, StoreError};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Db(#[from] StoreError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and register")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Current price. Usage: /price btc")]
    Price(String),
    #[command(description = "Create a price alert. Usage: /alert btc 50000 above [repeat]")]
    Alert(String),
    #[command(description = "Create a volume spike alert. Usage: /volumealert doge 2.5")]
    VolumeAlert(String),
    #[command(description = "List your active alerts")]
    MyAlerts,
    #[command(description = "Delete a price alert. Usage: /delalert 3")]
    DelAlert(String),
    #[command(description = "Delete a volume alert. Usage: /delvolumealert 3")]
    DelVolumeAlert(String),
    #[command(description = "Set preferred currency. Usage: /setfiat eur")]
    SetFiat(String),
    #[command(description = "Add a coin to your watchlist. Usage: /watch btc")]
    Watch(String),
    #[command(description = "Remove a coin from your watchlist. Usage: /unwatch btc")]
    Unwatch(String),
    #[command(description = "Show your watchlist with current prices")]
    Watchlist,
}

/// [`NotificationSink`] backed by the Telegram Bot API. The user id
/// doubles as the chat id for direct chats.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait::async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, recipient: UserId, message: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(recipient), message)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|err| DeliveryError(err.to_string()))
    }
}

/// Telegram bot wrapper.
pub struct CoinSeerBot {
    bot: Bot,
    store: AlertStore,
    market: Arc<CoinGeckoClient>,
}

impl CoinSeerBot {
    pub fn new(bot: Bot, store: AlertStore, market: Arc<CoinGeckoClient>) -> Self {
        Self { bot, store, market }
    }

    /// Run the bot command handler until shutdown (Ctrl+C).
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let user_id: UserId = msg.chat.id.0;

        match cmd {
            Command::Start => {
                self.store.ensure_user(user_id).await?;
                let text = "Welcome to CoinSeer!\n\n\
                     I watch crypto prices and 24h volumes and notify you when\n\
                     your alert conditions are met.\n\n\
                     Try /price btc to get started, or /help for all commands.";
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }

            Command::Price(value) => {
                let value = value.trim();
                if value.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /price <coin>\nExample: /price btc")
                        .await?;
                    return Ok(());
                }
                let asset = AssetId::from_user_input(value);
                let fiat = self.store.preferred_fiat(user_id).await?;

                match self.market.fetch_one(&asset, fiat).await {
                    Ok(Some(observation)) => {
                        bot.send_message(msg.chat.id, format_quote(&asset, &observation, fiat))
                            .parse_mode(ParseMode::Html)
                            .await?;
                    }
                    Ok(None) => {
                        bot.send_message(
                            msg.chat.id,
                            format!("Could not find a coin named '{value}'."),
                        )
                        .await?;
                    }
                    Err(err) => {
                        tracing::warn!(asset = %asset, error = %err, "price lookup failed");
                        bot.send_message(
                            msg.chat.id,
                            "Price data is temporarily unavailable, please try again.",
                        )
                        .await?;
                    }
                }
            }

            Command::Alert(value) => {
                let (asset, target, direction, recurring) = match parse_alert_args(&value) {
                    Ok(parsed) => parsed,
                    Err(usage) => {
                        bot.send_message(msg.chat.id, usage).await?;
                        return Ok(());
                    }
                };

                // Reject unknown coins up front instead of creating an
                // alert that can never resolve.
                let fiat = self.store.preferred_fiat(user_id).await?;
                match self.market.fetch_one(&asset, fiat).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        bot.send_message(
                            msg.chat.id,
                            format!("Could not find a coin named '{}'.", asset),
                        )
                        .await?;
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::warn!(asset = %asset, error = %err, "coin validation failed");
                        bot.send_message(
                            msg.chat.id,
                            "Price data is temporarily unavailable, please try again.",
                        )
                        .await?;
                        return Ok(());
                    }
                }

                match self
                    .store
                    .create_price_alert(user_id, &asset, target, direction, recurring)
                    .await
                {
                    Ok(id) => {
                        let kind = if recurring { "Recurring" } else { "One-time" };
                        bot.send_message(
                            msg.chat.id,
                            format!(
                                "{kind} alert #{id} created: {} {direction} {target:.2} {}",
                                asset.display_symbol(),
                                fiat.code(),
                            ),
                        )
                        .await?;
                    }
                    Err(StoreError::InvalidParameter(reason)) => {
                        bot.send_message(msg.chat.id, reason).await?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            Command::VolumeAlert(value) => {
                let (asset, multiplier) = match parse_volume_alert_args(&value) {
                    Ok(parsed) => parsed,
                    Err(usage) => {
                        bot.send_message(msg.chat.id, usage).await?;
                        return Ok(());
                    }
                };

                match self.store.create_volume_alert(user_id, &asset, multiplier).await {
                    Ok(id) => {
                        bot.send_message(
                            msg.chat.id,
                            format!(
                                "Volume alert #{id} created: {} at {multiplier:.1}x the previous reading",
                                asset.display_symbol(),
                            ),
                        )
                        .await?;
                    }
                    Err(StoreError::InvalidParameter(reason)) => {
                        bot.send_message(msg.chat.id, reason).await?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            Command::MyAlerts => {
                let price_alerts = self.store.price_alerts_for_user(user_id).await?;
                let volume_alerts = self.store.volume_alerts_for_user(user_id).await?;

                if price_alerts.is_empty() && volume_alerts.is_empty() {
                    bot.send_message(msg.chat.id, "You have no active alerts. Create one with /alert.")
                        .await?;
                    return Ok(());
                }

                let mut text = String::from("<b>Your active alerts</b>\n");
                for alert in &price_alerts {
                    let kind = if alert.recurring { " (recurring)" } else { "" };
                    text.push_str(&format!(
                        "\n#{}: {} {} {:.2} {}{}",
                        alert.id,
                        alert.asset.display_symbol(),
                        alert.direction,
                        alert.target_price,
                        alert.fiat,
                        kind,
                    ));
                }
                for alert in &volume_alerts {
                    text.push_str(&format!(
                        "\n#{}: {} volume {:.1}x (volume)",
                        alert.id,
                        alert.asset.display_symbol(),
                        alert.multiplier,
                    ));
                }
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }

            Command::DelAlert(value) => {
                let Ok(id) = value.trim().parse::<i64>() else {
                    bot.send_message(msg.chat.id, "Usage: /delalert <id>\nExample: /delalert 3")
                        .await?;
                    return Ok(());
                };
                // Owner-scoped: other users' alert ids are "not found".
                let text = if self.store.delete_price_alert(user_id, id).await? {
                    format!("Alert #{id} deleted.")
                } else {
                    format!("No alert #{id} found.")
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::DelVolumeAlert(value) => {
                let Ok(id) = value.trim().parse::<i64>() else {
                    bot.send_message(
                        msg.chat.id,
                        "Usage: /delvolumealert <id>\nExample: /delvolumealert 3",
                    )
                    .await?;
                    return Ok(());
                };
                let text = if self.store.delete_volume_alert(user_id, id).await? {
                    format!("Volume alert #{id} deleted.")
                } else {
                    format!("No volume alert #{id} found.")
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::SetFiat(value) => {
                let Some(fiat) = Fiat::parse(&value) else {
                    let supported = Fiat::all()
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    bot.send_message(
                        msg.chat.id,
                        format!("Usage: /setfiat <currency>\nSupported: {supported}"),
                    )
                    .await?;
                    return Ok(());
                };
                self.store.set_preferred_fiat(user_id, fiat).await?;
                bot.send_message(msg.chat.id, format!("Preferred currency set to {}.", fiat.code()))
                    .await?;
            }

            Command::Watch(value) => {
                let value = value.trim();
                if value.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /watch <coin>\nExample: /watch btc")
                        .await?;
                    return Ok(());
                }
                let asset = AssetId::from_user_input(value);
                let text = if self.store.add_to_watchlist(user_id, &asset).await? {
                    format!("{} added to your watchlist.", asset.display_symbol())
                } else {
                    format!("{} is already on your watchlist.", asset.display_symbol())
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::Unwatch(value) => {
                let value = value.trim();
                if value.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /unwatch <coin>\nExample: /unwatch btc")
                        .await?;
                    return Ok(());
                }
                let asset = AssetId::from_user_input(value);
                let text = if self.store.remove_from_watchlist(user_id, &asset).await? {
                    format!("{} removed from your watchlist.", asset.display_symbol())
                } else {
                    format!("{} is not on your watchlist.", asset.display_symbol())
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::Watchlist => {
                let assets = self.store.watchlist(user_id).await?;
                if assets.is_empty() {
                    bot.send_message(msg.chat.id, "Your watchlist is empty. Add coins with /watch.")
                        .await?;
                    return Ok(());
                }

                let fiat = self.store.preferred_fiat(user_id).await?;
                let batch = match self.market.fetch(&assets, fiat).await {
                    Ok(batch) => batch,
                    Err(err) => {
                        tracing::warn!(error = %err, "watchlist lookup failed");
                        bot.send_message(
                            msg.chat.id,
                            "Price data is temporarily unavailable, please try again.",
                        )
                        .await?;
                        return Ok(());
                    }
                };

                let mut text = String::from("<b>Your watchlist</b>\n");
                for asset in &assets {
                    match batch.get(asset).and_then(|o| o.price_in(fiat)) {
                        Some(price) => {
                            let change = batch
                                .get(asset)
                                .and_then(|o| o.change_in(fiat))
                                .map(|c| format!(" ({c:+.2}% 24h)"))
                                .unwrap_or_default();
                            text.push_str(&format!(
                                "\n{}: {} {}{}",
                                asset.display_symbol(),
                                format_price(price),
                                fiat.code(),
                                change,
                            ));
                        }
                        None => {
                            text.push_str(&format!("\n{}: no data", asset.display_symbol()));
                        }
                    }
                }
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
        }

        Ok(())
    }
}

/// Parse "/alert <coin> <price> <above|below> [repeat]".
fn parse_alert_args(value: &str) -> Result<(AssetId, f64, Direction, bool), String> {
    const USAGE: &str = "Usage: /alert <coin> <price> <above|below> [repeat]\n\
                         Example: /alert btc 50000 above";

    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(USAGE.to_string());
    }

    let asset = AssetId::from_user_input(parts[0]);
    let target = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a valid price.\n\n{USAGE}", parts[1]))?;
    let direction = Direction::parse(parts[2])
        .ok_or_else(|| format!("Direction must be 'above' or 'below'.\n\n{USAGE}"))?;

    let recurring = match parts.get(3) {
        None => false,
        Some(s) if s.eq_ignore_ascii_case("repeat") => true,
        Some(_) => return Err(USAGE.to_string()),
    };

    Ok((asset, target, direction, recurring))
}

/// Parse "/volumealert <coin> <multiplier>".
fn parse_volume_alert_args(value: &str) -> Result<(AssetId, f64), String> {
    const USAGE: &str = "Usage: /volumealert <coin> <multiplier>\n\
                         Example: /volumealert doge 2.5";

    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(USAGE.to_string());
    }

    let asset = AssetId::from_user_input(parts[0]);
    let multiplier = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a valid multiplier.\n\n{USAGE}", parts[1]))?;

    Ok((asset, multiplier))
}

/// Format price with appropriate precision based on magnitude.
fn format_price(price: f64) -> String {
    let abs_price = price.abs();
    if abs_price >= 1000.0 {
        format!("{:.2}", price)
    } else if abs_price >= 1.0 {
        format!("{:.4}", price)
    } else if abs_price >= 0.01 {
        format!("{:.6}", price)
    } else {
        format!("{:.8}", price)
    }
}

/// Format a /price reply.
fn format_quote(asset: &AssetId, observation: &Observation, fiat: Fiat) -> String {
    let mut text = format!("<b>{}</b>\n", asset.display_symbol());

    if let Some(price) = observation.price_in(fiat) {
        text.push_str(&format!("Price: {} {}\n", format_price(price), fiat.code()));
    }
    if let Some(change) = observation.change_in(fiat) {
        text.push_str(&format!("24h change: {change:+.2}%\n"));
    }
    if let Some(volume) = observation.volume_in(fiat) {
        text.push_str(&format!("24h volume: {volume:.0} {}\n", fiat.code()));
    }
    if let Some(cap) = observation.market_cap_in(fiat) {
        text.push_str(&format!("Market cap: {cap:.0} {}", fiat.code()));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinseer_core::QuoteMetrics;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_alert_args() {
        let (asset, target, direction, recurring) =
            parse_alert_args("btc 50000 above").unwrap();
        assert_eq!(asset.as_str(), "bitcoin");
        assert_eq!(target, 50000.0);
        assert_eq!(direction, Direction::Above);
        assert!(!recurring);

        let (_, _, direction, recurring) = parse_alert_args("eth 3000 below repeat").unwrap();
        assert_eq!(direction, Direction::Below);
        assert!(recurring);
    }

    #[test]
    fn test_parse_alert_args_rejects_garbage() {
        assert!(parse_alert_args("").is_err());
        assert!(parse_alert_args("btc").is_err());
        assert!(parse_alert_args("btc fifty above").is_err());
        assert!(parse_alert_args("btc 50000 sideways").is_err());
        assert!(parse_alert_args("btc 50000 above often").is_err());
    }

    #[test]
    fn test_parse_volume_alert_args() {
        let (asset, multiplier) = parse_volume_alert_args("doge 2.5").unwrap();
        assert_eq!(asset.as_str(), "dogecoin");
        assert_eq!(multiplier, 2.5);

        assert!(parse_volume_alert_args("doge").is_err());
        assert!(parse_volume_alert_args("doge lots").is_err());
    }

    #[test]
    fn test_format_price_precision() {
        assert_eq!(format_price(51234.567), "51234.57");
        assert_eq!(format_price(3.14159), "3.1416");
        assert_eq!(format_price(0.123456789), "0.123457");
        assert_eq!(format_price(0.00001234), "0.00001234");
    }

    #[test]
    fn test_format_quote() {
        let observation = Observation::with_quote(
            Fiat::Usd,
            QuoteMetrics {
                price: 51000.0,
                market_cap: Some(1.0e12),
                volume_24h: Some(3.0e10),
                change_24h: Some(2.5),
            },
        );

        let text = format_quote(&AssetId::new("bitcoin"), &observation, Fiat::Usd);
        assert!(text.contains("BTC"));
        assert!(text.contains("51000.00 USD"));
        assert!(text.contains("+2.50%"));
    }
}
