use std::collections::BTreeMap;

use serde::Deserialize;

use crate::classify::Vocabulary;
use crate::error::LedgerError;
use crate::model::InventoryKind;
use crate::normalize::normalize_str;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub name: String,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    pub inventories: BTreeMap<String, InventoryConfig>,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Keyword configuration.
///
/// In `extend` mode (default) the listed keywords are added to the built-in
/// sets; in `replace` mode they are the whole vocabulary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub mode: VocabularyMode,
    #[serde(default)]
    pub intake: Vec<String>,
    #[serde(default)]
    pub outflow: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyMode {
    #[default]
    Extend,
    Replace,
}

impl VocabularyConfig {
    pub fn build(&self) -> Vocabulary {
        let base = match self.mode {
            VocabularyMode::Extend => Vocabulary::default(),
            VocabularyMode::Replace => Vocabulary::empty(),
        };
        base.with_intake(&self.intake).with_outflow(&self.outflow)
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    pub kind: InventoryKind,
    /// Transaction log file, relative to the config file.
    pub log: String,
    /// Optional pre-aggregated summary table to cross-check against.
    #[serde(default)]
    pub summary: Option<String>,
    /// Input format; inferred from the file extension when absent.
    #[serde(default)]
    pub format: Option<InputFormat>,
    /// Summary format; inferred from the summary's extension when absent.
    #[serde(default)]
    pub summary_format: Option<InputFormat>,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub summary_columns: SummaryColumns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Explicit format, else `.json` means JSON and anything else CSV.
    pub fn resolve(explicit: Option<InputFormat>, path: &str) -> InputFormat {
        explicit.unwrap_or_else(|| {
            if path.to_ascii_lowercase().ends_with(".json") {
                InputFormat::Json
            } else {
                InputFormat::Csv
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// CSV header names for transaction fields. Defaults are the store's columns.
/// `item_code` and `comment` may be absent from the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub item_name: String,
    pub item_code: String,
    pub action_label: String,
    pub comment: String,
    pub quantity: String,
    pub created_at: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            item_name: "tovar_nomi".into(),
            item_code: "raqami".into(),
            action_label: "amal_turi".into(),
            comment: "izoh".into(),
            quantity: "miqdor".into(),
            created_at: "created_at".into(),
        }
    }
}

/// CSV header names for summary-table fields. `remaining` may be absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryColumns {
    pub item_name: String,
    pub item_code: String,
    pub total_in: String,
    pub total_out: String,
    pub remaining: String,
}

impl Default for SummaryColumns {
    fn default() -> Self {
        Self {
            item_name: "tovar_nomi".into(),
            item_code: "raqami".into(),
            total_in: "jami_keltirilgan".into(),
            total_out: "jami_ishlatilgan".into(),
            remaining: "qoldiq".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// Largest balance difference still reported as consistent.
    #[serde(default = "default_balance_tolerance")]
    pub balance: f64,
}

fn default_balance_tolerance() -> f64 {
    1e-9
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            balance: default_balance_tolerance(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LedgerConfig {
    pub fn from_toml(input: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            toml::from_str(input).map_err(|e| LedgerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.inventories.is_empty() {
            return Err(LedgerError::ConfigValidation(
                "at least 1 inventory is required".into(),
            ));
        }

        // A blank keyword would match every label.
        for (set, keywords) in [("intake", &self.vocabulary.intake), ("outflow", &self.vocabulary.outflow)] {
            if keywords.iter().any(|k| normalize_str(k).is_empty()) {
                return Err(LedgerError::ConfigValidation(format!(
                    "vocabulary.{set}: keywords must not be blank"
                )));
            }
        }

        if self.vocabulary.mode == VocabularyMode::Replace
            && self.vocabulary.intake.is_empty()
            && self.vocabulary.outflow.is_empty()
        {
            return Err(LedgerError::ConfigValidation(
                "vocabulary mode 'replace' needs at least one keyword".into(),
            ));
        }

        if !self.tolerance.balance.is_finite() || self.tolerance.balance < 0.0 {
            return Err(LedgerError::ConfigValidation(format!(
                "tolerance.balance must be a non-negative number, got {}",
                self.tolerance.balance
            )));
        }

        for (name, inv) in &self.inventories {
            if inv.log.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "inventory '{name}': log path is empty"
                )));
            }
            let c = &inv.columns;
            for (field, column) in [
                ("item_name", &c.item_name),
                ("action_label", &c.action_label),
                ("quantity", &c.quantity),
                ("created_at", &c.created_at),
            ] {
                if column.trim().is_empty() {
                    return Err(LedgerError::ConfigValidation(format!(
                        "inventory '{name}': columns.{field} is empty"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary.build()
    }

    pub fn inventory(&self, name: &str) -> Result<&InventoryConfig, LedgerError> {
        self.inventories
            .get(name)
            .ok_or_else(|| LedgerError::UnknownInventory(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ActionCategory;

    const VALID: &str = r#"
name = "Sex ombori"

[inventories.ribbons]
kind = "ribbons"
log = "kronkalar.csv"
summary = "ombor.csv"

[inventories.parts]
kind = "zapchastlar"
log = "zapchastlar.json"

[inventories.parts.columns]
item_name = "name"
action_label = "action"

[tolerance]
balance = 0.01
"#;

    #[test]
    fn parse_valid() {
        let config = LedgerConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Sex ombori");
        assert_eq!(config.inventories.len(), 2);
        assert_eq!(config.tolerance.balance, 0.01);

        let ribbons = config.inventory("ribbons").unwrap();
        assert_eq!(ribbons.kind, InventoryKind::Ribbons);
        assert_eq!(ribbons.summary.as_deref(), Some("ombor.csv"));
        assert_eq!(ribbons.columns.quantity, "miqdor");
        assert_eq!(InputFormat::resolve(ribbons.format, &ribbons.log), InputFormat::Csv);

        let parts = config.inventory("parts").unwrap();
        assert_eq!(parts.kind, InventoryKind::SpareParts);
        assert_eq!(parts.columns.item_name, "name");
        // Unset columns keep their defaults.
        assert_eq!(parts.columns.created_at, "created_at");
        assert_eq!(InputFormat::resolve(parts.format, &parts.log), InputFormat::Json);
    }

    #[test]
    fn summary_format_follows_extension() {
        let input = r#"
name = "x"
[inventories.ribbons]
kind = "ribbons"
log = "kronkalar.csv"
summary = "ombor.JSON"
[inventories.goods]
kind = "goods"
log = "tovarlar.csv"
summary = "ombor-export"
summary_format = "json"
"#;
        let config = LedgerConfig::from_toml(input).unwrap();
        let ribbons = config.inventory("ribbons").unwrap();
        let summary = ribbons.summary.as_deref().unwrap();
        assert_eq!(InputFormat::resolve(ribbons.summary_format, summary), InputFormat::Json);
        let goods = config.inventory("goods").unwrap();
        let summary = goods.summary.as_deref().unwrap();
        assert_eq!(InputFormat::resolve(goods.summary_format, summary), InputFormat::Json);
        assert_eq!(InputFormat::resolve(goods.format, &goods.log), InputFormat::Csv);
    }

    #[test]
    fn tolerance_defaults() {
        let input = r#"
name = "x"
[inventories.goods]
kind = "goods"
log = "tovarlar.csv"
"#;
        let config = LedgerConfig::from_toml(input).unwrap();
        assert_eq!(config.tolerance.balance, 1e-9);
        assert_eq!(config.vocabulary.mode, VocabularyMode::Extend);
    }

    #[test]
    fn extend_vocabulary() {
        let input = format!(
            r#"{VALID}
[vocabulary]
intake = ["Qaytarildi"]
outflow = ["yo'qoldi"]
"#
        );
        let vocab = LedgerConfig::from_toml(&input).unwrap().vocabulary();
        assert_eq!(vocab.classify("qaytarildi", None), ActionCategory::Intake);
        assert_eq!(vocab.classify("Yo'qoldi", None), ActionCategory::Outflow);
        assert_eq!(vocab.classify("kirim", None), ActionCategory::Intake);
    }

    #[test]
    fn replace_vocabulary() {
        let input = format!(
            r#"{VALID}
[vocabulary]
mode = "replace"
intake = ["plus"]
outflow = ["minus"]
"#
        );
        let vocab = LedgerConfig::from_toml(&input).unwrap().vocabulary();
        assert_eq!(vocab.classify("kirim", None), ActionCategory::Unknown);
        assert_eq!(vocab.classify("minus", None), ActionCategory::Outflow);
    }

    #[test]
    fn reject_blank_keyword() {
        let input = format!("{VALID}\n[vocabulary]\noutflow = [\"  \"]\n");
        let err = LedgerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("vocabulary.outflow"));
    }

    #[test]
    fn reject_empty_replace() {
        let input = format!("{VALID}\n[vocabulary]\nmode = \"replace\"\n");
        let err = LedgerConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("replace"));
    }

    #[test]
    fn reject_no_inventories() {
        let err = LedgerConfig::from_toml("name = \"x\"\n[inventories]\n").unwrap_err();
        assert!(err.to_string().contains("at least 1 inventory"));
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = r#"
name = "x"
[inventories.goods]
kind = "goods"
log = "tovarlar.csv"
[tolerance]
balance = -1.0
"#;
        let err = LedgerConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("tolerance.balance"));
    }

    #[test]
    fn reject_unknown_kind() {
        let input = r#"
name = "x"
[inventories.misc]
kind = "furniture"
log = "x.csv"
"#;
        assert!(matches!(
            LedgerConfig::from_toml(input),
            Err(LedgerError::ConfigParse(_))
        ));
    }

    #[test]
    fn unknown_inventory_lookup() {
        let config = LedgerConfig::from_toml(VALID).unwrap();
        let err = config.inventory("goods").unwrap_err();
        assert_eq!(err.to_string(), "unknown inventory: goods");
    }
}
