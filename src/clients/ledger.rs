//! Solana JSON-RPC client
//!
//! Two calls are used:
//! - `getSlot` for the current tip
//! - `getBlock` with `encoding: "json"` and full transaction details
//!
//! A `getBlock` reply without a `result` (skipped slot, slot not available
//! yet, pruned ledger) is reported as [`BlockError::Missing`].

use crate::error::{BlockError, UpstreamError};
use crate::types::{Block, Height, RawTransaction};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current tip height
    async fn current_height(&self) -> Result<Height, UpstreamError>;

    /// Transactions of the block at `height`
    async fn block_at(&self, height: Height) -> Result<Block, BlockError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

/// HTTP JSON-RPC implementation of [`LedgerClient`].
pub struct RpcLedgerClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Http(format!(
                "{} returned {}",
                method,
                response.status()
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn current_height(&self) -> Result<Height, UpstreamError> {
        let body = self.call("getSlot", json!([])).await?;
        parse_slot_response(body)
    }

    async fn block_at(&self, height: Height) -> Result<Block, BlockError> {
        let body = self.call("getBlock", block_params(height)).await?;
        parse_block_response(height, body)
    }
}

/// `getBlock` params: slot plus the fixed option object.
pub fn block_params(height: Height) -> Value {
    json!([
        height,
        {
            "encoding": "json",
            "maxSupportedTransactionVersion": 0,
            "transactionDetails": "full",
            "rewards": false
        }
    ])
}

pub fn parse_slot_response(body: Value) -> Result<Height, UpstreamError> {
    let response: RpcResponse = serde_json::from_value(body)?;

    if let Some(err) = response.error {
        return Err(UpstreamError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    response
        .result
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| UpstreamError::Malformed("getSlot result is not an integer".to_string()))
}

pub fn parse_block_response(height: Height, body: Value) -> Result<Block, BlockError> {
    let response: RpcResponse = serde_json::from_value(body).map_err(UpstreamError::from)?;

    let result = match response.result {
        Some(result) if !result.is_null() => result,
        _ => {
            match response.error {
                Some(err) => log::debug!(
                    "⚠️  No block at height {} (RPC {}: {})",
                    height,
                    err.code,
                    err.message
                ),
                None => log::debug!("⚠️  No block at height {}", height),
            }
            return Err(BlockError::Missing(height));
        }
    };

    let parsed: BlockResult = serde_json::from_value(result).map_err(UpstreamError::from)?;

    Ok(Block {
        height,
        transactions: parsed.transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_params_shape() {
        let params = block_params(250_000_123);
        assert_eq!(params[0], 250_000_123);
        assert_eq!(params[1]["encoding"], "json");
        assert_eq!(params[1]["maxSupportedTransactionVersion"], 0);
        assert_eq!(params[1]["transactionDetails"], "full");
        assert_eq!(params[1]["rewards"], false);
    }

    #[test]
    fn test_parse_slot() {
        let body = json!({ "jsonrpc": "2.0", "result": 1234, "id": 1 });
        assert_eq!(parse_slot_response(body).unwrap(), 1234);
    }

    #[test]
    fn test_parse_slot_errors() {
        let rpc_error = json!({
            "jsonrpc": "2.0",
            "error": { "code": -32005, "message": "Node is behind" },
            "id": 1
        });
        assert!(matches!(
            parse_slot_response(rpc_error),
            Err(UpstreamError::Rpc { code: -32005, .. })
        ));

        let garbage = json!({ "jsonrpc": "2.0", "result": "tip", "id": 1 });
        assert!(matches!(
            parse_slot_response(garbage),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_block() {
        let body = json!({
            "jsonrpc": "2.0",
            "result": {
                "blockHeight": 99,
                "blockhash": "8fYcZ1n1x3b1oMBzSc1xUJ5yqYV6S6CH1F2Q6P7ZQ1Tp",
                "parentSlot": 100,
                "transactions": [
                    {
                        "transaction": {
                            "signatures": ["sig1"],
                            "message": { "accountKeys": ["payer1"] }
                        },
                        "meta": { "preBalances": [10], "postBalances": [5] }
                    },
                    {
                        "transaction": {
                            "signatures": ["sig2"],
                            "message": { "accountKeys": ["payer2"] }
                        },
                        "meta": null
                    }
                ]
            },
            "id": 2
        });

        let block = parse_block_response(101, body).unwrap();
        assert_eq!(block.height, 101);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].transaction.signatures, vec!["sig1"]);
        assert!(block.transactions[1].meta.is_none());
    }

    #[test]
    fn test_skipped_slot_is_missing() {
        let body = json!({
            "jsonrpc": "2.0",
            "error": { "code": -32007, "message": "Slot 101 was skipped" },
            "id": 3
        });
        assert!(matches!(
            parse_block_response(101, body),
            Err(BlockError::Missing(101))
        ));

        let null_result = json!({ "jsonrpc": "2.0", "result": null, "id": 4 });
        assert!(matches!(
            parse_block_response(102, null_result),
            Err(BlockError::Missing(102))
        ));
    }

    #[test]
    fn test_malformed_block_is_upstream_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "result": { "transactions": "not-a-list" },
            "id": 5
        });
        assert!(matches!(
            parse_block_response(5, body),
            Err(BlockError::Upstream(UpstreamError::Json(_)))
        ));
    }
}
