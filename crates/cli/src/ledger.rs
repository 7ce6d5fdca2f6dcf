//! `ombor balance|stats|check|validate|classify` over a `.ombor.toml` config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use ombor_ledger::config::{InputFormat, InventoryConfig};
use ombor_ledger::engine::{run, InventoryReport, LedgerInput, LedgerResult};
use ombor_ledger::model::{BalanceRecord, ConsistencyReport, LedgerStats, SummaryRow, TransactionRecord};
use ombor_ledger::source::{load_csv_records, load_csv_summary, load_json};
use ombor_ledger::stats::search;
use ombor_ledger::{InventoryKind, LedgerConfig, LedgerError, Vocabulary};

use crate::exit_codes::{
    ledger_exit_code, EXIT_LEDGER_MISMATCH, EXIT_LEDGER_RUNTIME, EXIT_USAGE,
};
use crate::CliError;

fn ledger_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<LedgerError> for CliError {
    fn from(err: LedgerError) -> Self {
        let hint = match &err {
            LedgerError::MissingColumn { .. } => {
                Some("map the header under [inventories.<name>.columns]".to_string())
            }
            LedgerError::TimestampParse { .. } => {
                Some("timestamps must be RFC 3339 or 'YYYY-MM-DD HH:MM:SS'".to_string())
            }
            _ => None,
        };
        CliError { code: ledger_exit_code(&err), message: err.to_string(), hint }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn read_config(config_path: &Path) -> Result<LedgerConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        ledger_err(EXIT_LEDGER_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    Ok(LedgerConfig::from_toml(&config_str)?)
}

/// Narrow the config to one inventory when `--inventory` is given.
fn select(mut config: LedgerConfig, inventory: Option<&str>) -> Result<LedgerConfig, CliError> {
    let Some(name) = inventory else {
        return Ok(config);
    };
    if let Err(err) = config.inventory(name) {
        let known: Vec<&str> = config.inventories.keys().map(String::as_str).collect();
        return Err(CliError {
            hint: Some(format!("configured inventories: {}", known.join(", "))),
            ..CliError::from(err)
        });
    }
    config.inventories.retain(|k, _| k == name);
    Ok(config)
}

fn read_input_file(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| ledger_err(EXIT_LEDGER_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn load_log(base_dir: &Path, name: &str, inv: &InventoryConfig) -> Result<Vec<TransactionRecord>, CliError> {
    let data = read_input_file(base_dir, &inv.log)?;
    let records = match InputFormat::resolve(inv.format, &inv.log) {
        InputFormat::Csv => load_csv_records(name, &data, &inv.columns)?,
        InputFormat::Json => load_json::<TransactionRecord>(name, &data)?,
    };
    Ok(records)
}

fn load_summary(base_dir: &Path, name: &str, inv: &InventoryConfig, summary: &str) -> Result<Vec<SummaryRow>, CliError> {
    let data = read_input_file(base_dir, summary)?;
    let rows = match InputFormat::resolve(inv.summary_format, summary) {
        InputFormat::Csv => load_csv_summary(name, &data, &inv.summary_columns)?,
        InputFormat::Json => load_json::<SummaryRow>(name, &data)?,
    };
    Ok(rows)
}

/// Load every log and summary the config names. Paths resolve relative to
/// the config file's directory.
pub fn load_input(config_path: &Path, config: &LedgerConfig) -> Result<LedgerInput, CliError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut input = LedgerInput::default();

    for (name, inv) in &config.inventories {
        let records = load_log(base_dir, name, inv)?;
        log::info!("{name}: loaded {} transaction(s) from {}", records.len(), inv.log);
        input.logs.insert(name.clone(), records);

        if let Some(ref summary) = inv.summary {
            let rows = load_summary(base_dir, name, inv, summary)?;
            log::info!("{name}: loaded {} summary row(s) from {summary}", rows.len());
            input.summaries.insert(name.clone(), rows);
        }
    }

    Ok(input)
}

fn run_selected(config_path: &Path, inventory: Option<&str>) -> Result<(LedgerConfig, LedgerResult), CliError> {
    let config = select(read_config(config_path)?, inventory)?;
    let input = load_input(config_path, &config)?;
    let result = run(&config, &input)?;
    Ok((config, result))
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn emit_json<T: Serialize>(value: &T, json_output: bool, output_file: Option<&Path>) -> Result<(), CliError> {
    if !json_output && output_file.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| ledger_err(EXIT_LEDGER_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| ledger_err(EXIT_LEDGER_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

/// Whole quantities print without a fraction.
fn fmt_qty(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn print_balances(name: &str, report: &InventoryReport) {
    println!(
        "{name} ({}, {}): {} item(s)",
        report.kind.table_name(),
        report.unit,
        report.balances.len()
    );
    if report.balances.is_empty() {
        return;
    }
    println!(
        "  {:<24} {:<10} {:>10} {:>10} {:>10}  {}",
        "NAME", "CODE", "IN", "OUT", "BALANCE", "LAST UPDATED"
    );
    for b in &report.balances {
        println!(
            "  {:<24} {:<10} {:>10} {:>10} {:>10}  {}",
            b.display_name,
            b.display_code.as_deref().unwrap_or("-"),
            fmt_qty(b.total_in),
            fmt_qty(b.total_out),
            fmt_qty(b.balance),
            b.last_updated.format("%Y-%m-%d %H:%M"),
        );
    }
}

// ---------------------------------------------------------------------------
// balance
// ---------------------------------------------------------------------------

pub fn cmd_balance(
    config_path: PathBuf,
    inventory: Option<String>,
    query: Option<String>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let (_, mut result) = run_selected(&config_path, inventory.as_deref())?;

    if let Some(ref q) = query {
        for report in result.inventories.values_mut() {
            let matched: Vec<BalanceRecord> = search(&report.balances, q).into_iter().cloned().collect();
            report.balances = matched;
        }
    }

    emit_json(&result, json_output, output_file.as_deref())?;

    if !json_output {
        for (name, report) in &result.inventories {
            print_balances(name, report);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatsOutput<'a> {
    kind: InventoryKind,
    unit: &'static str,
    #[serde(flatten)]
    stats: &'a LedgerStats,
}

pub fn cmd_stats(config_path: PathBuf, inventory: Option<String>, json_output: bool) -> Result<(), CliError> {
    let (_, result) = run_selected(&config_path, inventory.as_deref())?;

    let output: BTreeMap<&str, StatsOutput> = result
        .inventories
        .iter()
        .map(|(name, r)| (name.as_str(), StatsOutput { kind: r.kind, unit: r.unit, stats: &r.stats }))
        .collect();
    emit_json(&output, json_output, None)?;

    if !json_output {
        for (name, s) in &output {
            println!(
                "{name}: {} item(s), in {} {unit}, out {} {unit}, unclassified {} {unit} in {} transaction(s), {} negative",
                s.stats.item_count,
                fmt_qty(s.stats.total_in),
                fmt_qty(s.stats.total_out),
                fmt_qty(s.stats.total_unclassified),
                s.stats.unclassified_count,
                s.stats.negative_balances,
                unit = s.unit,
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

pub fn cmd_check(
    config_path: PathBuf,
    inventory: Option<String>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let (config, result) = run_selected(&config_path, inventory.as_deref())?;

    let reports: BTreeMap<&str, &ConsistencyReport> = result
        .inventories
        .iter()
        .filter_map(|(name, r)| r.consistency.as_ref().map(|c| (name.as_str(), c)))
        .collect();

    if reports.is_empty() {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("'{}': no selected inventory has a summary table", config.name),
            hint: Some("add `summary = \"ombor.csv\"` under [inventories.<name>]".to_string()),
        });
    }

    emit_json(&reports, json_output, output_file.as_deref())?;

    // Human summary to stderr
    for (name, report) in &reports {
        let s = &report.summary;
        eprintln!(
            "{name}: {} item(s), {} consistent, {} balance mismatch(es), {} totals mismatch(es), {} log-only, {} summary-only",
            s.total_items, s.consistent, s.balance_mismatches, s.totals_mismatches, s.log_only, s.summary_only,
        );
        for finding in &report.findings {
            match (&finding.log, &finding.summary, finding.balance_delta) {
                (Some(l), Some(r), Some(delta)) => eprintln!(
                    "  {:<17} {}: log {} vs summary {} (delta {})",
                    finding.bucket.to_string(),
                    finding.identity,
                    fmt_qty(l.balance),
                    fmt_qty(r.balance),
                    fmt_qty(delta),
                ),
                _ => eprintln!("  {:<17} {}", finding.bucket.to_string(), finding.identity),
            }
        }
    }

    if !result.is_consistent() {
        return Err(ledger_err(EXIT_LEDGER_MISMATCH, "summary table disagrees with the transaction log"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

pub fn cmd_classify(
    label: String,
    comment: Option<String>,
    config_path: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let vocabulary = match config_path {
        Some(ref path) => read_config(path)?.vocabulary(),
        None => Vocabulary::default(),
    };
    let category = vocabulary.classify(&label, comment.as_deref());

    if json_output {
        let value = serde_json::json!({
            "label": label,
            "comment": comment,
            "category": category,
        });
        println!("{value}");
    } else {
        println!("{category}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let vocabulary = config.vocabulary();
    eprintln!(
        "valid: ledger '{}' with {} inventory(ies), {} intake / {} outflow keyword(s)",
        config.name,
        config.inventories.len(),
        vocabulary.intake().len(),
        vocabulary.outflow().len(),
    );
    for (name, inv) in &config.inventories {
        eprintln!(
            "  {name}: {} <- {}{}",
            inv.kind,
            inv.log,
            inv.summary.as_deref().map(|s| format!(" (checked against {s})")).unwrap_or_default(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_print_without_trailing_zeros() {
        assert_eq!(fmt_qty(60.0), "60");
        assert_eq!(fmt_qty(-10.0), "-10");
        assert_eq!(fmt_qty(2.5), "2.5");
    }

    #[test]
    fn ledger_errors_carry_exit_code_and_hint() {
        let err = CliError::from(LedgerError::MissingColumn {
            source: "ribbons".into(),
            column: "miqdor".into(),
        });
        assert_eq!(err.code, EXIT_LEDGER_RUNTIME);
        assert!(err.message.contains("miqdor"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn select_unknown_inventory_lists_known_ones() {
        let config = LedgerConfig::from_toml(
            "name = \"x\"\n[inventories.goods]\nkind = \"goods\"\nlog = \"t.csv\"\n",
        )
        .unwrap();
        let err = select(config, Some("tools")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert_eq!(err.hint.as_deref(), Some("configured inventories: goods"));
    }
}
