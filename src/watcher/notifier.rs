//! Buy notification formatting and delivery
//!
//! Messages use Telegram HTML markup. Delivery blocks on rate limits: a
//! `retry after N` reply sleeps N seconds and resends the same message, with
//! no upper bound on attempts. Any other sink failure is returned.

use crate::clients::ChatSink;
use crate::config::LinkTemplates;
use crate::error::SinkError;
use crate::types::{BuyEvent, Message, PriceQuote, NATIVE_SYMBOL};
use std::time::Duration;

pub struct Notifier {
    sink: Box<dyn ChatSink>,
    links: LinkTemplates,
    min_native_amount: f64,
    rate_limit_waits: u64,
}

impl Notifier {
    pub fn new(sink: Box<dyn ChatSink>, links: LinkTemplates) -> Self {
        Self {
            sink,
            links,
            min_native_amount: 0.0,
            rate_limit_waits: 0,
        }
    }

    /// Skip events spending less than `amount` SOL.
    pub fn with_min_native_amount(mut self, amount: f64) -> Self {
        self.min_native_amount = amount;
        self
    }

    pub fn should_notify(&self, event: &BuyEvent) -> bool {
        event.amount_native >= self.min_native_amount
    }

    /// Number of rate-limit backoffs taken so far.
    pub fn rate_limit_waits(&self) -> u64 {
        self.rate_limit_waits
    }

    pub fn format(&self, event: &BuyEvent, price: &PriceQuote) -> Message {
        let usd_spent = event.amount_native * price.unit_price_fiat;
        let holder_text = if event.is_new_holder {
            "New Holder!"
        } else {
            "Existing Holder"
        };

        let wallet = escape_html(&event.wallet);
        let chart_url = format!("{}{}", self.links.chart_url, wallet);
        let wallet_url = format!("{}{}", self.links.wallet_explorer_url, wallet);
        let tx_url = format!("{}{}", self.links.tx_explorer_url, escape_html(&event.signature));
        let short_signature = escape_html(&shorten_signature(&event.signature));

        let text = format!(
            "🚨 USER <a href='{chart}'>New Buy</a> 🚨\n\n\
             💰Spent: ${usd:.6} ({amount:.6} {symbol})\n\
             💼 Wallet: <a href='{wallet_url}'>{wallet}</a>\n\
             💵 Price: ${price:.4}\n\
             👥 {holder}\n\n\
             TX <a href='{tx_url}'>{short}</a> | CHART <a href='{chart}'>Link</a>",
            chart = chart_url,
            usd = usd_spent,
            amount = event.amount_native,
            symbol = NATIVE_SYMBOL,
            wallet_url = wallet_url,
            wallet = wallet,
            price = price.unit_price_fiat,
            holder = holder_text,
            tx_url = tx_url,
            short = short_signature,
        );

        Message { text }
    }

    pub async fn deliver(&mut self, message: &Message) -> Result<(), SinkError> {
        loop {
            match self.sink.send_message(message).await {
                Ok(()) => return Ok(()),
                Err(SinkError::RateLimited { retry_after }) => {
                    self.rate_limit_waits += 1;
                    log::warn!("⏳ Rate limit exceeded. Retrying after {} seconds.", retry_after);
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `first10...last10`, or the whole signature when it is 20 chars or shorter.
pub fn shorten_signature(signature: &str) -> String {
    let chars: Vec<char> = signature.chars().collect();
    if chars.len() <= 20 {
        return signature.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Escape text for Telegram HTML, including both quote styles.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted results, then succeeds.
    struct ScriptedSink {
        script: Mutex<VecDeque<Result<(), SinkError>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedSink {
        fn new(script: Vec<Result<(), SinkError>>, sent: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent,
            }
        }
    }

    #[async_trait]
    impl ChatSink for ScriptedSink {
        async fn send_message(&self, message: &Message) -> Result<(), SinkError> {
            self.sent.lock().unwrap().push(message.text.clone());
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn notifier(script: Vec<Result<(), SinkError>>) -> (Notifier, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = ScriptedSink::new(script, sent.clone());
        (Notifier::new(Box::new(sink), LinkTemplates::default()), sent)
    }

    fn event(signature: &str, wallet: &str, amount: f64) -> BuyEvent {
        BuyEvent {
            signature: signature.to_string(),
            wallet: wallet.to_string(),
            amount_native: amount,
            is_new_holder: true,
        }
    }

    #[test]
    fn test_format_amounts() {
        let (notifier, _) = notifier(vec![]);
        let msg = notifier.format(&event("sig", "wallet", 1.5), &PriceQuote::new(20.0));

        assert!(msg.text.contains("$30.000000"));
        assert!(msg.text.contains("(1.500000 SOL)"));
        assert!(msg.text.contains("💵 Price: $20.0000"));
        assert!(msg.text.contains("👥 New Holder!"));
    }

    #[test]
    fn test_format_links() {
        let (notifier, _) = notifier(vec![]);
        let signature = "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";
        let wallet = "3UVYmECPPMZSCqWKfENfuoTv51fTDTWicX9xmBD2euKe";
        let mut buy = event(signature, wallet, 0.25);
        buy.is_new_holder = false;

        let msg = notifier.format(&buy, &PriceQuote::new(142.5));

        assert!(msg.text.contains(&format!("<a href='https://solscan.io/account/{}'>{}</a>", wallet, wallet)));
        assert!(msg.text.contains(&format!(
            "TX <a href='https://solscan.io/tx/{}'>5VERv8NMvz...jKdiSZkQUW</a>",
            signature
        )));
        assert!(msg.text.contains(&format!("CHART <a href='https://www.geckoterminal.com/solana/pools/{}'>Link</a>", wallet)));
        assert!(msg.text.contains("👥 Existing Holder"));
    }

    #[test]
    fn test_wallet_is_escaped() {
        let (notifier, _) = notifier(vec![]);
        let msg = notifier.format(
            &event("sig", "<b>x</b>' onclick='y", 1.0),
            &PriceQuote::new(1.0),
        );

        assert!(!msg.text.contains("<b>x</b>"));
        assert!(!msg.text.contains("' onclick='"));
        assert!(msg.text.contains("&lt;b&gt;x&lt;/b&gt;&#x27; onclick=&#x27;y"));
    }

    #[test]
    fn test_shorten_signature() {
        assert_eq!(shorten_signature("abc"), "abc");
        assert_eq!(shorten_signature("0123456789abcdefghij"), "0123456789abcdefghij");
        assert_eq!(
            shorten_signature("0123456789-middle-abcdefghij"),
            "0123456789...abcdefghij"
        );
    }

    #[test]
    fn test_min_amount_policy() {
        let (notifier, _) = notifier(vec![]);
        let notifier = notifier.with_min_native_amount(0.1);
        assert!(!notifier.should_notify(&event("a", "w", 0.0)));
        assert!(!notifier.should_notify(&event("b", "w", 0.05)));
        assert!(notifier.should_notify(&event("c", "w", 0.1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_same_message() {
        let (mut notifier, sent) = notifier(vec![
            Err(SinkError::RateLimited { retry_after: 30 }),
            Err(SinkError::RateLimited { retry_after: 5 }),
        ]);
        let msg = Message { text: "hello".to_string() };

        let start = tokio::time::Instant::now();
        notifier.deliver(&msg).await.unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(35) && elapsed < Duration::from_secs(36));
        assert_eq!(*sent.lock().unwrap(), vec!["hello", "hello", "hello"]);
        assert_eq!(notifier.rate_limit_waits(), 2);
    }

    #[tokio::test]
    async fn test_other_sink_errors_propagate() {
        let (mut notifier, sent) = notifier(vec![Err(SinkError::Rejected {
            code: 403,
            description: "Forbidden: bot was kicked".to_string(),
        })]);
        let msg = Message { text: "hello".to_string() };

        let result = notifier.deliver(&msg).await;
        assert!(matches!(result, Err(SinkError::Rejected { code: 403, .. })));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }
}
