use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::aggregate::aggregate_with;
use crate::classify::Vocabulary;
use crate::config::{LedgerConfig, ToleranceConfig};
use crate::consistency::cross_check;
use crate::error::LedgerError;
use crate::model::{
    BalanceRecord, ConsistencyReport, InventoryKind, ItemIdentity, LedgerStats, SummaryRow,
    TransactionRecord,
};
use crate::source::TransactionSource;
use crate::stats::{compute_stats, sorted_by_recency};

// ---------------------------------------------------------------------------
// Per-inventory ledger
// ---------------------------------------------------------------------------

/// One inventory kind bound to a vocabulary. Every kind runs the same fold;
/// only the source differs.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    kind: InventoryKind,
    vocabulary: Vocabulary,
}

impl InventoryLedger {
    pub fn new(kind: InventoryKind) -> Self {
        Self {
            kind,
            vocabulary: Vocabulary::default(),
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn kind(&self) -> InventoryKind {
        self.kind
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Balances of an in-memory snapshot. Infallible.
    pub fn balances_of(&self, transactions: &[TransactionRecord]) -> BTreeMap<ItemIdentity, BalanceRecord> {
        aggregate_with(&self.vocabulary, transactions)
    }

    /// Load a snapshot from `source` and fold it. Only loading can fail.
    pub fn balances(
        &self,
        source: &dyn TransactionSource,
    ) -> Result<BTreeMap<ItemIdentity, BalanceRecord>, LedgerError> {
        let transactions = source.load()?;
        log::debug!(
            "{} ({}): aggregating {} transaction(s) from '{}'",
            self.kind,
            self.kind.table_name(),
            transactions.len(),
            source.name()
        );
        Ok(self.balances_of(&transactions))
    }

    pub fn stats(&self, source: &dyn TransactionSource) -> Result<LedgerStats, LedgerError> {
        Ok(compute_stats(self.balances(source)?.values()))
    }

    /// Balances, stats and (when a summary table is given) a consistency
    /// check, all from one aggregation.
    pub fn report(
        &self,
        transactions: &[TransactionRecord],
        summary: Option<&[SummaryRow]>,
        tolerance: &ToleranceConfig,
    ) -> InventoryReport {
        let balances = self.balances_of(transactions);
        InventoryReport {
            kind: self.kind,
            unit: self.kind.unit(),
            stats: compute_stats(balances.values()),
            consistency: summary.map(|rows| cross_check(&balances, rows, tolerance)),
            balances: sorted_by_recency(&balances).into_iter().cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config-driven run
// ---------------------------------------------------------------------------

/// Pre-loaded logs (and optional summary tables) keyed by inventory name.
#[derive(Debug, Default)]
pub struct LedgerInput {
    pub logs: HashMap<String, Vec<TransactionRecord>>,
    pub summaries: HashMap<String, Vec<SummaryRow>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub kind: InventoryKind,
    pub unit: &'static str,
    pub stats: LedgerStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencyReport>,
    /// Most recently updated first.
    pub balances: Vec<BalanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerResult {
    pub meta: LedgerMeta,
    pub inventories: BTreeMap<String, InventoryReport>,
}

impl LedgerResult {
    /// True when every inventory with a summary table agrees with its log.
    pub fn is_consistent(&self) -> bool {
        self.inventories
            .values()
            .filter_map(|r| r.consistency.as_ref())
            .all(ConsistencyReport::is_consistent)
    }
}

/// Run every configured inventory over pre-loaded input.
pub fn run(config: &LedgerConfig, input: &LedgerInput) -> Result<LedgerResult, LedgerError> {
    let vocabulary = config.vocabulary();
    let mut inventories = BTreeMap::new();

    for (name, inv) in &config.inventories {
        let transactions = input.logs.get(name).ok_or_else(|| LedgerError::MissingInput {
            inventory: name.clone(),
            what: format!("log '{}'", inv.log),
        })?;
        let summary = match (&inv.summary, input.summaries.get(name)) {
            (Some(_), Some(rows)) => Some(rows.as_slice()),
            (Some(path), None) => {
                return Err(LedgerError::MissingInput {
                    inventory: name.clone(),
                    what: format!("summary '{path}'"),
                })
            }
            (None, _) => None,
        };

        let ledger = InventoryLedger::new(inv.kind).with_vocabulary(vocabulary.clone());
        inventories.insert(name.clone(), ledger.report(transactions, summary, &config.tolerance));
    }

    Ok(LedgerResult {
        meta: LedgerMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        inventories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use chrono::{TimeZone, Utc};

    fn at(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap()
    }

    struct FailingSource;

    impl TransactionSource for FailingSource {
        fn name(&self) -> &str {
            "broken"
        }

        fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
            Err(LedgerError::Io("connection refused".into()))
        }
    }

    #[test]
    fn same_fold_for_every_kind() {
        let log = vec![
            TransactionRecord::new("Bolt", None, "kirim", "5", at(1)),
            TransactionRecord::new("Bolt", None, "chiqim", "2", at(2)),
        ];
        let source = MemorySource::new("mem", log);
        for kind in InventoryKind::ALL {
            let balances = InventoryLedger::new(kind).balances(&source).unwrap();
            assert_eq!(balances[&ItemIdentity::new("bolt", None)].balance, 3.0, "{kind}");
        }
    }

    #[test]
    fn load_failure_propagates() {
        let err = InventoryLedger::new(InventoryKind::Goods)
            .stats(&FailingSource)
            .unwrap_err();
        assert_eq!(err.to_string(), "IO error: connection refused");
    }

    #[test]
    fn run_from_config() {
        let config = LedgerConfig::from_toml(
            r#"
name = "Sex"
[inventories.ribbons]
kind = "ribbons"
log = "kronkalar.csv"
summary = "ombor.csv"
[inventories.goods]
kind = "goods"
log = "tovarlar.csv"
"#,
        )
        .unwrap();

        let mut input = LedgerInput::default();
        input.logs.insert(
            "ribbons".into(),
            vec![
                TransactionRecord::new("Lenta", Some("K1"), "Olib kelindi", "100", at(1)),
                TransactionRecord::new("Lenta", Some("K1"), "Ishlatildi", "30", at(2)),
            ],
        );
        input.logs.insert(
            "goods".into(),
            vec![TransactionRecord::new("Stol", None, "kirim", "2", at(3))],
        );
        input.summaries.insert(
            "ribbons".into(),
            vec![SummaryRow {
                item_name: "Lenta".into(),
                item_code: Some("K1".into()),
                total_in: "100".into(),
                total_out: "30".into(),
                remaining: "70".into(),
            }],
        );

        let result = run(&config, &input).unwrap();
        assert_eq!(result.meta.config_name, "Sex");
        assert!(result.is_consistent());

        let ribbons = &result.inventories["ribbons"];
        assert_eq!(ribbons.unit, "m");
        assert_eq!(ribbons.stats.total_in, 100.0);
        assert_eq!(ribbons.balances[0].balance, 70.0);
        assert!(result.inventories["goods"].consistency.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["inventories"]["goods"]["kind"], "goods");
    }

    #[test]
    fn run_requires_loaded_log() {
        let config = LedgerConfig::from_toml(
            "name = \"x\"\n[inventories.goods]\nkind = \"goods\"\nlog = \"t.csv\"\n",
        )
        .unwrap();
        let err = run(&config, &LedgerInput::default()).unwrap_err();
        assert!(matches!(err, LedgerError::MissingInput { ref inventory, .. } if inventory == "goods"));
        assert_eq!(err.to_string(), "inventory 'goods': log 't.csv' was not loaded");
    }
}
