//! CoinSeer - crypto price and volume alert bot.
//!
//! Periodically checks market data against user-defined alerts and
//! delivers notifications over Telegram.

mod telegram;

use clap::Parser;
use coinseer_core::Fiat;
use coinseer_engine::{run_periodic, AlertEngine};
use coinseer_market::{CoinGeckoClient, GatewayConfig};
use coinseer_store::AlertStore;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use telegram::{CoinSeerBot, TelegramSink};

/// CoinSeer CLI
#[derive(Parser, Debug)]
#[command(name = "coinseer")]
#[command(about = "Crypto price and volume alert Telegram bot", long_about = None)]
struct Args {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://coinseer.db")]
    db: String,

    /// Seconds between price alert checks
    #[arg(long, default_value_t = 60)]
    price_interval: u64,

    /// Seconds between volume alert checks
    #[arg(long, default_value_t = 300)]
    volume_interval: u64,

    /// Quote currency used for evaluation batches: usd, eur, gbp
    #[arg(long, default_value = "usd")]
    fiat: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") else {
        error!("TELEGRAM_BOT_TOKEN is not set");
        return;
    };

    let default_fiat = match Fiat::parse(&args.fiat) {
        Some(fiat) => fiat,
        None => {
            warn!("Unknown quote currency '{}', falling back to usd", args.fiat);
            Fiat::default()
        }
    };

    info!("🔭 CoinSeer starting...");
    info!("  Database: {}", args.db);
    info!("  Price check interval: {}s", args.price_interval);
    info!("  Volume check interval: {}s", args.volume_interval);
    info!("  Quote currency: {}", default_fiat.code());

    let store = match AlertStore::connect(&args.db).await {
        Ok(store) => store,
        Err(err) => {
            error!("Failed to open database: {}", err);
            return;
        }
    };

    let market = Arc::new(CoinGeckoClient::new(GatewayConfig::default()));
    let bot = Bot::new(&token);
    let sink = Arc::new(TelegramSink::new(bot.clone()));
    let engine = Arc::new(AlertEngine::new(
        store.clone(),
        market.clone(),
        sink,
        default_fiat,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let price_engine = engine.clone();
    let price_handle = tokio::spawn(run_periodic(
        "price_alerts",
        Duration::from_secs(args.price_interval),
        shutdown_rx.clone(),
        move || {
            let engine = price_engine.clone();
            async move {
                let summary = engine.run_price_cycle().await;
                if summary.loaded > 0 {
                    info!(
                        loaded = summary.loaded,
                        delivered = summary.delivered,
                        deactivated = summary.deactivated,
                        skipped = summary.skipped,
                        "price check complete"
                    );
                }
            }
        },
    ));

    let volume_engine = engine.clone();
    let volume_handle = tokio::spawn(run_periodic(
        "volume_alerts",
        Duration::from_secs(args.volume_interval),
        shutdown_rx,
        move || {
            let engine = volume_engine.clone();
            async move {
                let summary = engine.run_volume_cycle().await;
                if summary.loaded > 0 {
                    info!(
                        loaded = summary.loaded,
                        delivered = summary.delivered,
                        skipped = summary.skipped,
                        "volume check complete"
                    );
                }
            }
        },
    ));

    // Blocks until Ctrl+C stops the dispatcher.
    let handler = Arc::new(CoinSeerBot::new(bot, store, market));
    handler.run().await;

    warn!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Let in-flight evaluation cycles finish.
    let _ = tokio::time::timeout(Duration::from_secs(5), price_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), volume_handle).await;

    info!("👋 CoinSeer stopped");
}
