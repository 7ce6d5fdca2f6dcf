use std::collections::BTreeMap;

use crate::classify::{ActionCategory, Vocabulary};
use crate::model::{BalanceRecord, ItemIdentity, TransactionRecord};
use crate::quantity::to_number;

/// Fold a transaction log into one balance per item identity, using the
/// built-in vocabulary.
pub fn aggregate(transactions: &[TransactionRecord]) -> BTreeMap<ItemIdentity, BalanceRecord> {
    aggregate_with(Vocabulary::builtin(), transactions)
}

/// Fold a transaction log into one balance per item identity.
///
/// Single pass, never fails. Unparseable quantities count as zero;
/// transactions that classify as unknown still create their identity's entry
/// but only feed `total_unclassified`. Totals do not depend on input order and
/// `last_updated` is the maximum `created_at` seen.
pub fn aggregate_with<'a, I>(vocabulary: &Vocabulary, transactions: I) -> BTreeMap<ItemIdentity, BalanceRecord>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut balances: BTreeMap<ItemIdentity, BalanceRecord> = BTreeMap::new();
    let mut unclassified = 0usize;

    for tx in transactions {
        let category = vocabulary.classify(&tx.action_label, tx.comment.as_deref());
        if category == ActionCategory::Unknown {
            unclassified += 1;
            log::debug!(
                "unclassified transaction for '{}': label {:?}, comment {:?}",
                tx.item_name,
                tx.action_label,
                tx.comment
            );
        }

        balances
            .entry(tx.identity())
            .or_insert_with_key(|identity| BalanceRecord::seed(identity.clone(), tx))
            .apply(category, to_number(&tx.quantity), tx);
    }

    if unclassified > 0 {
        log::warn!(
            "{unclassified} transaction(s) matched no intake/outflow keyword and were left out of balances"
        );
    }

    balances
}
