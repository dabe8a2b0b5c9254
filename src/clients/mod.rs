pub mod ledger;
pub mod price;
pub mod telegram;

pub use ledger::{LedgerClient, RpcLedgerClient};
pub use price::{CachedPriceClient, CoinGeckoPriceClient, PriceClient};
pub use telegram::{ChatSink, TelegramSink};
