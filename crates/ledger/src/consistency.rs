//! Cross-check of recomputed balances against a pre-aggregated stock table.
//!
//! The transaction log is ground truth. A summary table is a cache of it, and
//! every way the two can drift gets its own bucket:
//! - Consistent: balances agree within tolerance and so do both totals
//! - BalanceMismatch: balances differ by more than the tolerance
//! - TotalsMismatch: balances agree but intake/outflow totals do not
//! - LogOnly: the log has the item, the summary never caught up
//! - SummaryOnly: the summary has an item the log never mentions

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ToleranceConfig;
use crate::model::{
    BalanceRecord, ConsistencyBucket, ConsistencyFinding, ConsistencyReport, ConsistencySummary,
    ItemIdentity, SummaryRow, Totals,
};

/// Compare log balances with summary rows keyed by the same item identity.
/// Summary rows sharing an identity are summed.
pub fn cross_check(
    balances: &BTreeMap<ItemIdentity, BalanceRecord>,
    summary_rows: &[SummaryRow],
    tolerance: &ToleranceConfig,
) -> ConsistencyReport {
    let summary = summary_totals(summary_rows);

    let keys: BTreeSet<&ItemIdentity> = balances.keys().chain(summary.keys()).collect();
    let mut findings = Vec::with_capacity(keys.len());

    for identity in keys {
        let logged = balances.get(identity).map(|b| Totals {
            total_in: b.total_in,
            total_out: b.total_out,
            balance: b.balance,
        });
        let cached = summary.get(identity).copied();

        let (bucket, balance_delta) = match (logged, cached) {
            (Some(l), Some(s)) => {
                let delta = l.balance - s.balance;
                let bucket = if delta.abs() > tolerance.balance {
                    ConsistencyBucket::BalanceMismatch
                } else if (l.total_in - s.total_in).abs() > tolerance.balance
                    || (l.total_out - s.total_out).abs() > tolerance.balance
                {
                    ConsistencyBucket::TotalsMismatch
                } else {
                    ConsistencyBucket::Consistent
                };
                (bucket, Some(delta))
            }
            (Some(_), None) => (ConsistencyBucket::LogOnly, None),
            (None, Some(_)) => (ConsistencyBucket::SummaryOnly, None),
            (None, None) => continue,
        };

        if bucket != ConsistencyBucket::Consistent {
            log::warn!("consistency: {identity} is {bucket} (balance delta {balance_delta:?})");
        }

        findings.push(ConsistencyFinding {
            bucket,
            identity: identity.clone(),
            log: logged,
            summary: cached,
            balance_delta,
        });
    }

    ConsistencyReport {
        summary: summarize(&findings),
        findings,
    }
}

fn summary_totals(rows: &[SummaryRow]) -> BTreeMap<ItemIdentity, Totals> {
    let mut totals: BTreeMap<ItemIdentity, Totals> = BTreeMap::new();
    for row in rows {
        let total_in = row.total_in.value();
        let total_out = row.total_out.value();
        // A missing remaining column is derived rather than read as zero.
        let balance = if row.remaining.is_missing() {
            total_in - total_out
        } else {
            row.remaining.value()
        };
        let entry = totals.entry(row.identity()).or_insert(Totals {
            total_in: 0.0,
            total_out: 0.0,
            balance: 0.0,
        });
        entry.total_in += total_in;
        entry.total_out += total_out;
        entry.balance += balance;
    }
    totals
}

fn summarize(findings: &[ConsistencyFinding]) -> ConsistencySummary {
    let mut summary = ConsistencySummary {
        total_items: findings.len(),
        ..ConsistencySummary::default()
    };
    for f in findings {
        match f.bucket {
            ConsistencyBucket::Consistent => summary.consistent += 1,
            ConsistencyBucket::BalanceMismatch => summary.balance_mismatches += 1,
            ConsistencyBucket::TotalsMismatch => summary.totals_mismatches += 1,
            ConsistencyBucket::LogOnly => summary.log_only += 1,
            ConsistencyBucket::SummaryOnly => summary.summary_only += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::TransactionRecord;
    use crate::quantity::RawQuantity;
    use chrono::{TimeZone, Utc};

    fn row(name: &str, code: Option<&str>, tin: &str, tout: &str, rem: Option<&str>) -> SummaryRow {
        SummaryRow {
            item_name: name.into(),
            item_code: code.map(str::to_string),
            total_in: tin.into(),
            total_out: tout.into(),
            remaining: RawQuantity::from(rem),
        }
    }

    fn balances() -> BTreeMap<ItemIdentity, BalanceRecord> {
        let at = |h| Utc.with_ymd_and_hms(2025, 4, 1, h, 0, 0).unwrap();
        aggregate(&[
            TransactionRecord::new("Lenta", Some("K1"), "kirim", "100", at(1)),
            TransactionRecord::new("Lenta", Some("K1"), "chiqim", "40", at(2)),
            TransactionRecord::new("Bolt", None, "kirim", "10", at(3)),
        ])
    }

    #[test]
    fn all_consistent() {
        let rows = vec![
            row("LENTA", Some("k1"), "100", "40", Some("60")),
            row("bolt", None, "10", "0", Some("10")),
        ];
        let report = cross_check(&balances(), &rows, &ToleranceConfig::default());
        assert!(report.is_consistent());
        assert_eq!(report.summary.total_items, 2);
        assert!(report.findings.iter().all(|f| f.balance_delta == Some(0.0)));
    }

    #[test]
    fn drifted_balance() {
        let rows = vec![
            row("Lenta", Some("K1"), "100", "30", Some("70")),
            row("Bolt", None, "10", "0", Some("10")),
        ];
        let report = cross_check(&balances(), &rows, &ToleranceConfig::default());
        assert!(!report.is_consistent());
        assert_eq!(report.summary.balance_mismatches, 1);
        let f = report
            .findings
            .iter()
            .find(|f| f.bucket == ConsistencyBucket::BalanceMismatch)
            .unwrap();
        assert_eq!(f.identity, ItemIdentity::new("lenta", Some("k1")));
        assert_eq!(f.balance_delta, Some(-10.0));
    }

    #[test]
    fn totals_drift_with_equal_balance() {
        let rows = vec![
            row("Lenta", Some("K1"), "110", "50", Some("60")),
            row("Bolt", None, "10", "0", Some("10")),
        ];
        let report = cross_check(&balances(), &rows, &ToleranceConfig::default());
        assert_eq!(report.summary.totals_mismatches, 1);
        assert_eq!(report.summary.consistent, 1);
    }

    #[test]
    fn missing_rows_on_either_side() {
        let rows = vec![
            row("Lenta", Some("K1"), "100", "40", Some("60")),
            row("Zanjir", None, "5", "0", None),
        ];
        let report = cross_check(&balances(), &rows, &ToleranceConfig::default());
        assert_eq!(report.summary.log_only, 1);
        assert_eq!(report.summary.summary_only, 1);
        assert_eq!(report.summary.consistent, 1);
        assert_eq!(report.summary.total_items, 3);
    }

    #[test]
    fn remaining_derived_when_missing_and_duplicates_summed() {
        let rows = vec![
            row("Lenta", Some("K1"), "60", "40", None),
            row("lenta ", Some("K1"), "40", "", None),
            row("Bolt", None, "10", "0", Some("10")),
        ];
        let report = cross_check(&balances(), &rows, &ToleranceConfig::default());
        assert!(report.is_consistent(), "{:?}", report.summary);
    }

    #[test]
    fn tolerance_absorbs_rounding() {
        let rows = vec![
            row("Lenta", Some("K1"), "100", "40", Some("60.004")),
            row("Bolt", None, "10", "0", Some("10")),
        ];
        let loose = ToleranceConfig { balance: 0.01 };
        assert!(cross_check(&balances(), &rows, &loose).is_consistent());
        assert!(!cross_check(&balances(), &rows, &ToleranceConfig::default()).is_consistent());
    }

    #[test]
    fn both_empty() {
        let report = cross_check(&BTreeMap::new(), &[], &ToleranceConfig::default());
        assert!(report.is_consistent());
        assert_eq!(report.summary.total_items, 0);
    }
}
