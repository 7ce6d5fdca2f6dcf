use std::collections::BTreeMap;

use crate::model::{BalanceRecord, ItemIdentity, LedgerStats};
use crate::normalize::normalize_str;

/// Compute the stats cards from recomputed balances.
pub fn compute_stats<'a, I>(balances: I) -> LedgerStats
where
    I: IntoIterator<Item = &'a BalanceRecord>,
{
    let mut stats = LedgerStats::default();
    for b in balances {
        stats.item_count += 1;
        stats.total_in += b.total_in;
        stats.total_out += b.total_out;
        stats.total_unclassified += b.total_unclassified;
        stats.unclassified_count += b.unclassified_count;
        if b.balance < 0.0 {
            stats.negative_balances += 1;
        }
    }
    stats
}

/// Balances ordered most recently updated first; ties fall back to identity order.
pub fn sorted_by_recency(balances: &BTreeMap<ItemIdentity, BalanceRecord>) -> Vec<&BalanceRecord> {
    let mut list: Vec<&BalanceRecord> = balances.values().collect();
    // BTreeMap iteration is already identity-ordered and the sort is stable.
    list.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    list
}

/// Keep records whose name or code contains `query` (case/space-insensitive).
pub fn search<'a, I>(records: I, query: &str) -> Vec<&'a BalanceRecord>
where
    I: IntoIterator<Item = &'a BalanceRecord>,
{
    let q = normalize_str(query);
    records
        .into_iter()
        .filter(|b| q.is_empty() || b.identity.name.contains(&q) || b.identity.code.contains(&q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::TransactionRecord;
    use chrono::{TimeZone, Utc};

    fn log() -> Vec<TransactionRecord> {
        let at = |h| Utc.with_ymd_and_hms(2025, 2, 1, h, 0, 0).unwrap();
        vec![
            TransactionRecord::new("Lenta Oq", Some("K1"), "kirim", "100", at(1)),
            TransactionRecord::new("Lenta Oq", Some("K1"), "chiqim", "30", at(2)),
            TransactionRecord::new("Podshipnik", Some("6204"), "kirim", "4", at(5)),
            TransactionRecord::new("Podshipnik", Some("6204"), "chiqim", "6", at(6)),
            TransactionRecord::new("Moy", None, "???", "2", at(3)),
        ]
    }

    #[test]
    fn stats_from_balances() {
        let balances = aggregate(&log());
        let stats = compute_stats(balances.values());
        assert_eq!(stats.item_count, 3);
        assert_eq!(stats.total_in, 104.0);
        assert_eq!(stats.total_out, 36.0);
        assert_eq!(stats.total_unclassified, 2.0);
        assert_eq!(stats.unclassified_count, 1);
        assert_eq!(stats.negative_balances, 1);
    }

    #[test]
    fn empty_stats() {
        assert_eq!(compute_stats(std::iter::empty()), LedgerStats::default());
    }

    #[test]
    fn recency_order() {
        let balances = aggregate(&log());
        let names: Vec<&str> = sorted_by_recency(&balances)
            .iter()
            .map(|b| b.identity.name.as_str())
            .collect();
        assert_eq!(names, vec!["podshipnik", "moy", "lenta oq"]);
    }

    #[test]
    fn search_name_and_code() {
        let balances = aggregate(&log());
        assert_eq!(search(balances.values(), "LENTA").len(), 1);
        assert_eq!(search(balances.values(), "6204")[0].identity.name, "podshipnik");
        assert_eq!(search(balances.values(), "  ").len(), 3);
        assert!(search(balances.values(), "zanjir").is_empty());
    }
}
