//! Slot polling state machine
//!
//! ```text
//! Init ──► Idle ──(tip > watermark)──► CatchUp ──► Idle ──► …
//! ```
//!
//! Heights are processed strictly in increasing order and events within a
//! height in block order. A signature is marked in the [`DedupWindow`] before
//! its delivery is attempted. The watermark moves to the end of a catch-up
//! range only once every height in it has been handled.

use crate::clients::{LedgerClient, PriceClient};
use crate::config::BotConfig;
use crate::error::{BlockError, UpstreamError, WatcherError};
use crate::types::{Block, Height, PriceQuote};
use crate::watcher::backoff::ExponentialBackoff;
use crate::watcher::dedup::DedupWindow;
use crate::watcher::extractor::extract;
use crate::watcher::notifier::Notifier;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Idle,
    /// Inclusive range of heights still to process
    CatchUp { from: Height, to: Height },
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Sleep between tip polls
    pub poll_interval: Duration,
    /// Pause after each delivered message
    pub message_delay: Duration,
    pub retry_initial_delay: Duration,
    pub retry_max_delay: Duration,
    /// Upstream retries per call; 0 makes the first failure fatal
    pub max_retries: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            message_delay: Duration::from_secs(7),
            retry_initial_delay: Duration::from_secs(2),
            retry_max_delay: Duration::from_secs(60),
            max_retries: 0,
        }
    }
}

impl From<&BotConfig> for LoopConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            message_delay: config.message_delay,
            max_retries: config.upstream_max_retries,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub heights_processed: u64,
    pub missing_blocks: u64,
    pub events_seen: u64,
    pub duplicates: u64,
    pub filtered: u64,
    pub delivered: u64,
}

pub struct PollLoop {
    ledger: Box<dyn LedgerClient>,
    prices: Box<dyn PriceClient>,
    notifier: Notifier,
    dedup: DedupWindow,
    watermark: Option<Height>,
    config: LoopConfig,
    stats: LoopStats,
}

impl PollLoop {
    pub fn new(
        ledger: Box<dyn LedgerClient>,
        prices: Box<dyn PriceClient>,
        notifier: Notifier,
        config: LoopConfig,
    ) -> Self {
        Self {
            ledger,
            prices,
            notifier,
            dedup: DedupWindow::new(),
            watermark: None,
            config,
            stats: LoopStats::default(),
        }
    }

    /// Highest fully processed height; `None` before `Init` ran.
    pub fn watermark(&self) -> Option<Height> {
        self.watermark
    }

    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Run until a fatal error. Never returns `Ok`.
    pub async fn run(&mut self) -> Result<(), WatcherError> {
        let mut state = LoopState::Init;
        loop {
            state = self.step(state).await?;
        }
    }

    /// Execute one state and return the next.
    ///
    /// `Idle` before any watermark exists behaves like `Init`. A `CatchUp`
    /// range that does not start right after the watermark, or is empty, is
    /// ignored and leaves the watermark untouched.
    pub async fn step(&mut self, state: LoopState) -> Result<LoopState, WatcherError> {
        match state {
            LoopState::Init => self.init().await,
            LoopState::Idle => match self.watermark {
                None => self.init().await,
                Some(watermark) => {
                    sleep(self.config.poll_interval).await;
                    self.poll_tip(watermark).await
                }
            },
            LoopState::CatchUp { from, to } => {
                if self.is_next_range(from, to) {
                    self.catch_up(from, to).await?;
                } else {
                    log::warn!(
                        "⚠️  Ignoring catch-up range {}..={} (watermark {:?})",
                        from,
                        to,
                        self.watermark
                    );
                }
                Ok(LoopState::Idle)
            }
        }
    }

    async fn init(&mut self) -> Result<LoopState, WatcherError> {
        let tip = self.fetch_tip().await?;
        self.watermark = Some(tip);
        log::info!("🚀 Watching from slot {}", tip);
        Ok(LoopState::Idle)
    }

    /// Only `watermark + 1 ..= to` with `to >= watermark + 1` may be processed.
    fn is_next_range(&self, from: Height, to: Height) -> bool {
        match self.watermark {
            Some(watermark) => watermark.checked_add(1) == Some(from) && to >= from,
            None => false,
        }
    }

    async fn poll_tip(&self, watermark: Height) -> Result<LoopState, WatcherError> {
        let tip = self.fetch_tip().await?;

        if tip > watermark {
            log::debug!("🔄 Tip {} ahead of watermark {}", tip, watermark);
            Ok(LoopState::CatchUp {
                from: watermark + 1,
                to: tip,
            })
        } else {
            Ok(LoopState::Idle)
        }
    }

    async fn catch_up(&mut self, from: Height, to: Height) -> Result<(), WatcherError> {
        let before = self.stats.clone();

        for height in from..=to {
            self.process_height(height).await?;
        }

        self.watermark = Some(to);

        log::info!(
            "📊 Caught up to slot {} ({} heights, {} missing, {} delivered, {} filtered, {} duplicates, {} rate-limit waits total)",
            to,
            self.stats.heights_processed - before.heights_processed,
            self.stats.missing_blocks - before.missing_blocks,
            self.stats.delivered - before.delivered,
            self.stats.filtered - before.filtered,
            self.stats.duplicates - before.duplicates,
            self.notifier.rate_limit_waits(),
        );
        Ok(())
    }

    /// Fetch, price, extract and deliver everything at `height`.
    async fn process_height(&mut self, height: Height) -> Result<(), WatcherError> {
        let block = match self.fetch_block(height).await {
            Ok(block) => block,
            Err(BlockError::Missing(_)) => {
                self.stats.missing_blocks += 1;
                Block::empty(height)
            }
            Err(BlockError::Upstream(e)) => return Err(e.into()),
        };

        let price = self.fetch_price().await?;

        for event in extract(&block) {
            self.stats.events_seen += 1;

            if self.dedup.seen(&event.signature) {
                self.stats.duplicates += 1;
                continue;
            }
            self.dedup.mark_seen(&event.signature);

            if !self.notifier.should_notify(&event) {
                self.stats.filtered += 1;
                log::debug!(
                    "Skipping {} ({:.6} SOL below threshold)",
                    event.signature,
                    event.amount_native
                );
                continue;
            }

            log::debug!("🔎 {}", serde_json::to_string(&event).unwrap_or_default());

            let message = self.notifier.format(&event, &price);
            self.notifier.deliver(&message).await?;
            self.stats.delivered += 1;
            log::info!("✅ Message sent for {}", event.signature);

            sleep(self.config.message_delay).await;
        }

        self.stats.heights_processed += 1;
        Ok(())
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.config.retry_initial_delay,
            self.config.retry_max_delay,
            self.config.max_retries,
        )
    }

    async fn fetch_tip(&self) -> Result<Height, UpstreamError> {
        let mut backoff = self.backoff();
        loop {
            match self.ledger.current_height().await {
                Ok(tip) => return Ok(tip),
                Err(e) => {
                    log::warn!("⚠️  getSlot failed: {}", e);
                    backoff.sleep().await.map_err(|_| e)?;
                }
            }
        }
    }

    /// Retries the same height only; a missing block is returned at once.
    async fn fetch_block(&self, height: Height) -> Result<Block, BlockError> {
        let mut backoff = self.backoff();
        loop {
            match self.ledger.block_at(height).await {
                Err(BlockError::Upstream(e)) => {
                    log::warn!("⚠️  getBlock {} failed: {}", height, e);
                    backoff.sleep().await.map_err(|_| BlockError::Upstream(e))?;
                }
                other => return other,
            }
        }
    }

    async fn fetch_price(&self) -> Result<PriceQuote, UpstreamError> {
        let mut backoff = self.backoff();
        loop {
            match self.prices.current_unit_price().await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    log::warn!("⚠️  Price lookup failed: {}", e);
                    backoff.sleep().await.map_err(|_| e)?;
                }
            }
        }
    }
}
