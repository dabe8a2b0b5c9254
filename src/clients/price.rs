//! Native asset price lookup
//!
//! Endpoint: CoinGecko `simple/price?ids={asset}&vs_currencies={fiat}`
//! Returns: `{ "{asset}": { "{fiat}": price } }`

use crate::error::UpstreamError;
use crate::types::PriceQuote;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

#[async_trait]
pub trait PriceClient: Send + Sync {
    async fn current_unit_price(&self) -> Result<PriceQuote, UpstreamError>;
}

/// CoinGecko-compatible price feed.
pub struct CoinGeckoPriceClient {
    client: reqwest::Client,
    url: String,
    asset_id: String,
    fiat: String,
}

impl CoinGeckoPriceClient {
    pub fn new(url: &str, asset_id: &str, fiat: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            asset_id: asset_id.to_string(),
            fiat: fiat.to_string(),
        })
    }
}

#[async_trait]
impl PriceClient for CoinGeckoPriceClient {
    async fn current_unit_price(&self) -> Result<PriceQuote, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("ids", self.asset_id.as_str()), ("vs_currencies", self.fiat.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Http(format!(
                "price feed returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let price = parse_price_response(&body, &self.asset_id, &self.fiat)?;
        log::debug!("💵 {} price: {:.4} {}", self.asset_id, price, self.fiat);

        Ok(PriceQuote::new(price))
    }
}

/// Pull `body[asset][fiat]` out of a price-feed reply; it must be a positive number.
pub fn parse_price_response(body: &Value, asset_id: &str, fiat: &str) -> Result<f64, UpstreamError> {
    let price = body
        .get(asset_id)
        .and_then(|asset| asset.get(fiat))
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            UpstreamError::Malformed(format!("no {}/{} price in response", asset_id, fiat))
        })?;

    if !(price > 0.0) || !price.is_finite() {
        return Err(UpstreamError::Malformed(format!(
            "non-positive {}/{} price: {}",
            asset_id, fiat, price
        )));
    }

    Ok(price)
}

/// Reuses the last quote while it is younger than `ttl`.
pub struct CachedPriceClient {
    inner: Box<dyn PriceClient>,
    ttl: Duration,
    last: Mutex<Option<PriceQuote>>,
}

impl CachedPriceClient {
    pub fn new(inner: Box<dyn PriceClient>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            last: Mutex::new(None),
        }
    }

    fn is_fresh(&self, quote: &PriceQuote) -> bool {
        let age = Utc::now().signed_duration_since(quote.fetched_at);
        // negative age (wall clock stepped back) counts as stale
        age.to_std().map(|age| age < self.ttl).unwrap_or(false)
    }
}

#[async_trait]
impl PriceClient for CachedPriceClient {
    async fn current_unit_price(&self) -> Result<PriceQuote, UpstreamError> {
        let mut last = self.last.lock().await;

        if let Some(quote) = last.as_ref() {
            if self.is_fresh(quote) {
                return Ok(quote.clone());
            }
        }

        let quote = self.inner.current_unit_price().await?;
        *last = Some(quote.clone());
        Ok(quote)
    }
}
