use crate::types::{Block, BuyEvent, RawTransaction, LAMPORTS_PER_SOL};

/// Lazily turn every transaction of `block` into a [`BuyEvent`], in block order.
///
/// No value filtering happens here; a fee payer whose balance went up or
/// stayed flat yields an event with `amount_native == 0.0`.
pub fn extract(block: &Block) -> impl Iterator<Item = BuyEvent> + '_ {
    block.transactions.iter().filter_map(move |tx| {
        let event = parse_transaction(tx);
        if event.is_none() {
            log::debug!(
                "⚠️  Skipping transaction without signature or account keys at height {}",
                block.height
            );
        }
        event
    })
}

/// Normalize one raw record.
///
/// Returns `None` when the record has no signature or no account keys, since
/// it could neither be deduplicated nor attributed to a wallet.
pub fn parse_transaction(tx: &RawTransaction) -> Option<BuyEvent> {
    let signature = tx.transaction.signatures.first()?.clone();
    let wallet = tx.transaction.message.account_keys.first()?.clone();

    Some(BuyEvent {
        signature,
        wallet,
        amount_native: sol_spent(tx),
        // TODO: replace with a holder lookup once a token-account index is wired in
        is_new_holder: true,
    })
}

/// SOL that left the fee payer (account 0), clamped at zero.
fn sol_spent(tx: &RawTransaction) -> f64 {
    let Some(meta) = tx.meta.as_ref() else {
        return 0.0;
    };

    match (meta.pre_balances.first(), meta.post_balances.first()) {
        (Some(pre), Some(post)) => pre.saturating_sub(*post) as f64 / LAMPORTS_PER_SOL,
        _ => 0.0,
    }
}
