use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slot number on the watched chain.
pub type Height = u64;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Native asset symbol shown in notifications
pub const NATIVE_SYMBOL: &str = "SOL";

/// Transactions of a single slot, in the order the node returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub height: Height,
    pub transactions: Vec<RawTransaction>,
}

impl Block {
    pub fn empty(height: Height) -> Self {
        Self {
            height,
            transactions: Vec::new(),
        }
    }
}

/// One entry of `getBlock(..).transactions` with `encoding: "json"`.
///
/// Only the fields the extractor reads are modelled; everything else in the
/// RPC payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction: RawTransactionBody,
    #[serde(default)]
    pub meta: Option<RawTransactionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionBody {
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub message: RawMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "accountKeys", default)]
    pub account_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionMeta {
    #[serde(rename = "preBalances", default)]
    pub pre_balances: Vec<u64>,
    #[serde(rename = "postBalances", default)]
    pub post_balances: Vec<u64>,
}

/// Normalized buy extracted from a raw transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyEvent {
    /// First transaction signature; dedup key
    pub signature: String,
    /// Fee payer (first account key)
    pub wallet: String,
    /// SOL spent by the fee payer, never negative
    pub amount_native: f64,
    pub is_new_holder: bool,
}

/// Fiat price of one unit of the native asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub unit_price_fiat: f64,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(unit_price_fiat: f64) -> Self {
        Self {
            unit_price_fiat,
            fetched_at: Utc::now(),
        }
    }
}

/// Rendered notification body (Telegram HTML markup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
}
