//! Bot configuration from environment variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`
//! - `TELEGRAM_CHAT_ID`
//!
//! Everything else has a default, see [`BotConfig::from_lookup`].

use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// URL prefixes used to build links in notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTemplates {
    pub wallet_explorer_url: String,
    pub tx_explorer_url: String,
    pub chart_url: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            wallet_explorer_url: "https://solscan.io/account/".to_string(),
            tx_explorer_url: "https://solscan.io/tx/".to_string(),
            chart_url: "https://www.geckoterminal.com/solana/pools/".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct BotConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    pub rpc_url: String,
    pub price_api_url: String,
    pub price_asset_id: String,
    pub price_fiat: String,
    pub links: LinkTemplates,
    pub poll_interval: Duration,
    pub message_delay: Duration,
    /// Zero disables the price cache
    pub price_cache_ttl: Duration,
    pub min_notify_sol: f64,
    /// Zero makes every upstream failure fatal
    pub upstream_max_retries: u32,
    pub http_timeout: Duration,
    pub rust_log: String,
}

/// The bot token is a credential and never printed.
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("rpc_url", &self.rpc_url)
            .field("price_api_url", &self.price_api_url)
            .field("price_asset_id", &self.price_asset_id)
            .field("price_fiat", &self.price_fiat)
            .field("links", &self.links)
            .field("poll_interval", &self.poll_interval)
            .field("message_delay", &self.message_delay)
            .field("price_cache_ttl", &self.price_cache_ttl)
            .field("min_notify_sol", &self.min_notify_sol)
            .field("upstream_max_retries", &self.upstream_max_retries)
            .field("http_timeout", &self.http_timeout)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// Environment variables:
    /// - `TELEGRAM_API_URL` (default: https://api.telegram.org)
    /// - `SOLANA_RPC_URL` (default: https://api.devnet.solana.com)
    /// - `PRICE_API_URL` (default: CoinGecko simple/price)
    /// - `PRICE_ASSET_ID` / `PRICE_FIAT` (default: solana / usd)
    /// - `WALLET_EXPLORER_URL`, `TX_EXPLORER_URL`, `CHART_URL`
    /// - `POLL_INTERVAL_SECS` (default: 10)
    /// - `MESSAGE_DELAY_SECS` (default: 7)
    /// - `PRICE_CACHE_TTL_SECS` (default: 0)
    /// - `MIN_NOTIFY_SOL` (default: 0)
    /// - `UPSTREAM_MAX_RETRIES` (default: 0)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `RUST_LOG` (default: info)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = required("TELEGRAM_CHAT_ID")?;

        let rpc_url = or_default("SOLANA_RPC_URL", "https://api.devnet.solana.com");
        if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SOLANA_RPC_URL must start with http:// or https://".to_string(),
            ));
        }

        let defaults = LinkTemplates::default();
        let links = LinkTemplates {
            wallet_explorer_url: or_default("WALLET_EXPLORER_URL", &defaults.wallet_explorer_url),
            tx_explorer_url: or_default("TX_EXPLORER_URL", &defaults.tx_explorer_url),
            chart_url: or_default("CHART_URL", &defaults.chart_url),
        };

        let min_notify_sol = parse_or(&lookup, "MIN_NOTIFY_SOL", 0.0_f64)?;
        if !(min_notify_sol >= 0.0) {
            return Err(ConfigError::InvalidValue(
                "MIN_NOTIFY_SOL must be a non-negative number".to_string(),
            ));
        }

        Ok(Self {
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_url: or_default("TELEGRAM_API_URL", "https://api.telegram.org"),
            rpc_url,
            price_api_url: or_default(
                "PRICE_API_URL",
                "https://api.coingecko.com/api/v3/simple/price",
            ),
            price_asset_id: or_default("PRICE_ASSET_ID", "solana"),
            price_fiat: or_default("PRICE_FIAT", "usd"),
            links,
            poll_interval: Duration::from_secs(parse_or(&lookup, "POLL_INTERVAL_SECS", 10)?),
            message_delay: Duration::from_secs(parse_or(&lookup, "MESSAGE_DELAY_SECS", 7)?),
            price_cache_ttl: Duration::from_secs(parse_or(&lookup, "PRICE_CACHE_TTL_SECS", 0)?),
            min_notify_sol,
            upstream_max_retries: parse_or(&lookup, "UPSTREAM_MAX_RETRIES", 0)?,
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10)?),
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
