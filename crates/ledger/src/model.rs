use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::classify::ActionCategory;
use crate::normalize::{normalize, normalize_str};
use crate::quantity::RawQuantity;

// ---------------------------------------------------------------------------
// Inventory kinds
// ---------------------------------------------------------------------------

/// The inventory categories that keep a transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    #[serde(alias = "kronkalar")]
    Ribbons,
    #[serde(alias = "zapchastlar")]
    SpareParts,
    #[serde(alias = "tovarlar")]
    Goods,
}

impl InventoryKind {
    pub const ALL: [InventoryKind; 3] = [Self::Ribbons, Self::SpareParts, Self::Goods];

    /// Name of the store table holding this kind's transaction log.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Ribbons => "kronkalar",
            Self::SpareParts => "zapchastlar",
            Self::Goods => "tovarlar",
        }
    }

    /// Unit quantities are counted in.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Ribbons => "m",
            Self::SpareParts | Self::Goods => "pcs",
        }
    }
}

impl std::fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ribbons => write!(f, "ribbons"),
            Self::SpareParts => write!(f, "spare_parts"),
            Self::Goods => write!(f, "goods"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One append-only ledger entry. Field aliases accept the store's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(alias = "tovar_nomi", default, deserialize_with = "string_or_null")]
    pub item_name: String,
    #[serde(alias = "raqami", default, deserialize_with = "optional_text")]
    pub item_code: Option<String>,
    #[serde(alias = "amal_turi", default, deserialize_with = "string_or_null")]
    pub action_label: String,
    #[serde(alias = "izoh", default, deserialize_with = "optional_text")]
    pub comment: Option<String>,
    #[serde(alias = "miqdor", default)]
    pub quantity: RawQuantity,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        item_name: impl Into<String>,
        item_code: Option<&str>,
        action_label: impl Into<String>,
        quantity: impl Into<RawQuantity>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            item_code: item_code.map(str::to_string),
            action_label: action_label.into(),
            comment: None,
            quantity: quantity.into(),
            created_at,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity::new(&self.item_name, self.item_code.as_deref())
    }
}

/// Normalized (name, code) pair naming one ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemIdentity {
    pub name: String,
    pub code: String,
}

impl ItemIdentity {
    pub fn new(name: &str, code: Option<&str>) -> Self {
        Self {
            name: normalize_str(name),
            code: normalize(code),
        }
    }
}

impl std::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.code.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} [{}]", self.name, self.code)
        }
    }
}

/// A row of a pre-aggregated stock table. Only a cache of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(alias = "tovar_nomi", default, deserialize_with = "string_or_null")]
    pub item_name: String,
    #[serde(alias = "raqami", default, deserialize_with = "optional_text")]
    pub item_code: Option<String>,
    #[serde(alias = "jami_keltirilgan", default)]
    pub total_in: RawQuantity,
    #[serde(alias = "jami_ishlatilgan", default)]
    pub total_out: RawQuantity,
    #[serde(alias = "qoldiq", default)]
    pub remaining: RawQuantity,
}

impl SummaryRow {
    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity::new(&self.item_name, self.item_code.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Running balance of one item identity, derived from the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRecord {
    pub identity: ItemIdentity,
    /// Trimmed name as typed on the most recent transaction.
    pub display_name: String,
    pub display_code: Option<String>,
    pub total_in: f64,
    pub total_out: f64,
    pub balance: f64,
    pub last_updated: DateTime<Utc>,
    /// Quantity of transactions whose label and comment matched no keyword.
    /// Never part of `balance`.
    pub total_unclassified: f64,
    pub transaction_count: usize,
    pub unclassified_count: usize,
}

impl BalanceRecord {
    /// Zeroed record seeded from the first transaction seen for `identity`.
    pub(crate) fn seed(identity: ItemIdentity, first: &TransactionRecord) -> Self {
        let (display_name, display_code) = display_fields(first);
        Self {
            identity,
            display_name,
            display_code,
            total_in: 0.0,
            total_out: 0.0,
            balance: 0.0,
            last_updated: first.created_at,
            total_unclassified: 0.0,
            transaction_count: 0,
            unclassified_count: 0,
        }
    }

    pub(crate) fn apply(&mut self, category: ActionCategory, quantity: f64, tx: &TransactionRecord) {
        self.transaction_count += 1;
        match category {
            ActionCategory::Intake => self.total_in += quantity,
            ActionCategory::Outflow => self.total_out += quantity,
            ActionCategory::Unknown => {
                self.total_unclassified += quantity;
                self.unclassified_count += 1;
            }
        }
        self.balance = self.total_in - self.total_out;

        if tx.created_at > self.last_updated {
            self.last_updated = tx.created_at;
            let (name, code) = display_fields(tx);
            self.display_name = name;
            self.display_code = code;
        }
    }
}

fn display_fields(tx: &TransactionRecord) -> (String, Option<String>) {
    let code = tx
        .item_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    (tx.item_name.trim().to_string(), code)
}

/// Totals across every balance of one inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub item_count: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub total_unclassified: f64,
    pub unclassified_count: usize,
    pub negative_balances: usize,
}

// ---------------------------------------------------------------------------
// Consistency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyBucket {
    Consistent,
    BalanceMismatch,
    TotalsMismatch,
    LogOnly,
    SummaryOnly,
}

impl std::fmt::Display for ConsistencyBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consistent => write!(f, "consistent"),
            Self::BalanceMismatch => write!(f, "balance_mismatch"),
            Self::TotalsMismatch => write!(f, "totals_mismatch"),
            Self::LogOnly => write!(f, "log_only"),
            Self::SummaryOnly => write!(f, "summary_only"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub total_in: f64,
    pub total_out: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyFinding {
    pub bucket: ConsistencyBucket,
    pub identity: ItemIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Totals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Totals>,
    /// log balance minus summary balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_delta: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencySummary {
    pub total_items: usize,
    pub consistent: usize,
    pub balance_mismatches: usize,
    pub totals_mismatches: usize,
    pub log_only: usize,
    pub summary_only: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub summary: ConsistencySummary,
    pub findings: Vec<ConsistencyFinding>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.summary.consistent == self.summary.total_items
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse a store timestamp. Offset-less values are taken as UTC; a bare date
/// is midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Text cell of loose type: numbers and booleans keep their JSON spelling,
/// null is `None`. Arrays and objects keep their JSON text too.
fn text_cell(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_cell(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_cell(Value::deserialize(deserializer)?))
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("cannot parse timestamp '{raw}'")))
}
