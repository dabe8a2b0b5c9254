//! Solana buy notifier
//!
//! Polls the chain for new slots, turns each transaction into a [`BuyEvent`],
//! prices it in fiat and posts one Telegram message per signature.
//!
//! [`BuyEvent`]: types::BuyEvent

pub mod clients;
pub mod config;
pub mod error;
pub mod types;
pub mod watcher;
