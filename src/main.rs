//! buywatch - Solana buy notifier
//!
//! Usage:
//!   cargo run --release --bin buywatch
//!
//! Environment variables (a `.env` file is honoured):
//!   TELEGRAM_BOT_TOKEN - Bot credential (required)
//!   TELEGRAM_CHAT_ID   - Target channel (required)
//!   SOLANA_RPC_URL     - JSON-RPC endpoint (default: devnet)
//!   POLL_INTERVAL_SECS - Tip poll interval (default: 10)
//!   MESSAGE_DELAY_SECS - Pause between messages (default: 7)

use buywatch::clients::{
    CachedPriceClient, CoinGeckoPriceClient, LedgerClient, PriceClient, RpcLedgerClient,
    TelegramSink,
};
use buywatch::config::BotConfig;
use buywatch::watcher::{LoopConfig, Notifier, PollLoop};
use dotenv::dotenv;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = BotConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Starting buywatch");
    info!("   ├─ RPC: {}", config.rpc_url);
    info!("   ├─ Price feed: {} ({}/{})", config.price_api_url, config.price_asset_id, config.price_fiat);
    info!("   ├─ Chat: {}", config.telegram_chat_id);
    info!("   ├─ Poll interval: {:?}", config.poll_interval);
    info!("   ├─ Message delay: {:?}", config.message_delay);
    info!("   ├─ Price cache TTL: {:?}", config.price_cache_ttl);
    info!("   ├─ Min notify: {} SOL", config.min_notify_sol);
    info!("   └─ Upstream retries: {}", config.upstream_max_retries);

    let ledger: Box<dyn LedgerClient> =
        Box::new(RpcLedgerClient::new(&config.rpc_url, config.http_timeout)?);

    let feed = CoinGeckoPriceClient::new(
        &config.price_api_url,
        &config.price_asset_id,
        &config.price_fiat,
        config.http_timeout,
    )?;
    let prices: Box<dyn PriceClient> = if config.price_cache_ttl.is_zero() {
        Box::new(feed)
    } else {
        Box::new(CachedPriceClient::new(Box::new(feed), config.price_cache_ttl))
    };

    let sink = TelegramSink::new(
        &config.telegram_api_url,
        &config.telegram_bot_token,
        &config.telegram_chat_id,
        config.http_timeout,
    )?;
    let notifier = Notifier::new(Box::new(sink), config.links.clone())
        .with_min_native_amount(config.min_notify_sol);

    let mut poll_loop = PollLoop::new(ledger, prices, notifier, LoopConfig::from(&config));

    info!("🔄 Press CTRL+C to shutdown");

    tokio::select! {
        result = poll_loop.run() => {
            if let Err(e) = result {
                error!("❌ Watcher stopped: {}", e);
                return Err(e.into());
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
            }
        }
    }

    let stats = poll_loop.stats();
    info!(
        "✅ Stopped at slot {:?} ({} heights, {} delivered, {} signatures tracked)",
        poll_loop.watermark(),
        stats.heights_processed,
        stats.delivered,
        poll_loop.dedup().len()
    );
    Ok(())
}
