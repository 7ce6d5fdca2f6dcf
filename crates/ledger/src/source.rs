//! Transaction sources: where an inventory's log comes from.
//!
//! The engine never fetches anything itself. A source hands over a snapshot;
//! if the snapshot cannot be produced the error surfaces here, before any
//! aggregation runs.

use csv::StringRecord;

use crate::config::{ColumnMapping, InputFormat, SummaryColumns};
use crate::error::LedgerError;
use crate::model::{parse_timestamp, SummaryRow, TransactionRecord};
use crate::quantity::RawQuantity;

pub trait TransactionSource {
    /// Short name used in errors and logs.
    fn name(&self) -> &str;

    /// Produce a full snapshot of the log.
    fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// A snapshot the caller already holds.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    records: Vec<TransactionRecord>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<TransactionRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn push(&mut self, record: TransactionRecord) {
        self.records.push(record);
    }
}

impl TransactionSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(self.records.clone())
    }
}

/// Log text in CSV or JSON form, e.g. an export of the store table.
#[derive(Debug, Clone)]
pub struct TextSource {
    name: String,
    data: String,
    format: InputFormat,
    columns: ColumnMapping,
}

impl TextSource {
    pub fn csv(name: impl Into<String>, data: impl Into<String>, columns: ColumnMapping) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            format: InputFormat::Csv,
            columns,
        }
    }

    pub fn json(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            format: InputFormat::Json,
            columns: ColumnMapping::default(),
        }
    }
}

impl TransactionSource for TextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        match self.format {
            InputFormat::Csv => load_csv_records(&self.name, &self.data, &self.columns),
            InputFormat::Json => load_json(&self.name, &self.data),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

struct Headers {
    source: String,
    names: Vec<String>,
}

impl Headers {
    fn read(source: &str, reader: &mut csv::Reader<&[u8]>) -> Result<Self, LedgerError> {
        let names = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        Ok(Self {
            source: source.to_string(),
            names,
        })
    }

    fn required(&self, column: &str) -> Result<usize, LedgerError> {
        self.optional(column).ok_or_else(|| LedgerError::MissingColumn {
            source: self.source.clone(),
            column: column.to_string(),
        })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.names.iter().position(|h| h == column)
    }
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn optional_cell(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.map(|i| cell(record, i))
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Read a transaction log from CSV text. Only the timestamp is strict; every
/// other field is taken as typed and left for the engine to interpret.
pub fn load_csv_records(
    source: &str,
    csv_data: &str,
    columns: &ColumnMapping,
) -> Result<Vec<TransactionRecord>, LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let headers = Headers::read(source, &mut reader)?;

    let name_idx = headers.required(&columns.item_name)?;
    let label_idx = headers.required(&columns.action_label)?;
    let qty_idx = headers.required(&columns.quantity)?;
    let at_idx = headers.required(&columns.created_at)?;
    let code_idx = headers.optional(&columns.item_code);
    let comment_idx = headers.optional(&columns.comment);
    if code_idx.is_none() {
        log::debug!("source '{source}': no '{}' column, items have no code", columns.item_code);
    }

    let mut records = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;

        let raw_at = cell(&record, at_idx);
        let created_at = parse_timestamp(raw_at).ok_or_else(|| LedgerError::TimestampParse {
            source: source.to_string(),
            row,
            value: raw_at.to_string(),
        })?;

        records.push(TransactionRecord {
            item_name: cell(&record, name_idx).to_string(),
            item_code: optional_cell(&record, code_idx),
            action_label: cell(&record, label_idx).to_string(),
            comment: optional_cell(&record, comment_idx),
            quantity: RawQuantity::Text(cell(&record, qty_idx).to_string()),
            created_at,
        });
    }

    log::debug!("source '{source}': loaded {} transaction(s) from CSV", records.len());
    Ok(records)
}

/// Read a pre-aggregated summary table from CSV text.
pub fn load_csv_summary(
    source: &str,
    csv_data: &str,
    columns: &SummaryColumns,
) -> Result<Vec<SummaryRow>, LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let headers = Headers::read(source, &mut reader)?;

    let name_idx = headers.required(&columns.item_name)?;
    let in_idx = headers.required(&columns.total_in)?;
    let out_idx = headers.required(&columns.total_out)?;
    let code_idx = headers.optional(&columns.item_code);
    let remaining_idx = headers.optional(&columns.remaining);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(SummaryRow {
            item_name: cell(&record, name_idx).to_string(),
            item_code: optional_cell(&record, code_idx),
            total_in: RawQuantity::Text(cell(&record, in_idx).to_string()),
            total_out: RawQuantity::Text(cell(&record, out_idx).to_string()),
            remaining: optional_cell(&record, remaining_idx).into(),
        });
    }

    log::debug!("source '{source}': loaded {} summary row(s) from CSV", rows.len());
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Decode a JSON array as returned by the store (`select *`). Store column
/// names and engine field names are both accepted.
pub fn load_json<T>(source: &str, json: &str) -> Result<Vec<T>, LedgerError>
where
    T: serde::de::DeserializeOwned,
{
    let rows: Vec<T> = serde_json::from_str(json).map_err(|e| LedgerError::JsonParse {
        source: source.to_string(),
        message: e.to_string(),
    })?;
    log::debug!("source '{source}': loaded {} row(s) from JSON", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemIdentity;

    const LOG_CSV: &str = "\
id,tovar_nomi,raqami,amal_turi,miqdor,izoh,created_at
1,Lenta,K1,Olib kelindi,\"1,000\",,2025-01-10T08:00:00Z
2,Lenta,K1,Ishlatildi,250,,2025-01-11 09:15:00+00
3,Bolt,,???,7,omborga keldi,2025-01-12
";

    #[test]
    fn csv_with_store_columns() {
        let records = load_csv_records("kronkalar", LOG_CSV, &ColumnMapping::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].quantity.value(), 1000.0);
        assert_eq!(records[0].comment, None);
        assert_eq!(records[2].item_code, None);
        assert_eq!(records[2].comment.as_deref(), Some("omborga keldi"));
        assert_eq!(records[2].identity(), ItemIdentity::new("bolt", None));
    }

    #[test]
    fn csv_without_optional_columns() {
        let csv = "tovar_nomi,amal_turi,miqdor,created_at\nBolt,kirim,3,2025-01-01\n";
        let records = load_csv_records("t", csv, &ColumnMapping::default()).unwrap();
        assert_eq!(records[0].item_code, None);
        assert_eq!(records[0].comment, None);
    }

    #[test]
    fn csv_custom_columns() {
        let columns = ColumnMapping {
            item_name: "name".into(),
            action_label: "action".into(),
            quantity: "qty".into(),
            created_at: "at".into(),
            ..ColumnMapping::default()
        };
        let csv = "name,action,qty,at\nBolt,received,12,2025-01-01\n";
        let records = load_csv_records("t", csv, &columns).unwrap();
        assert_eq!(records[0].action_label, "received");
    }

    #[test]
    fn csv_missing_required_column() {
        let csv = "tovar_nomi,miqdor,created_at\nBolt,3,2025-01-01\n";
        let err = load_csv_records("tovarlar", csv, &ColumnMapping::default()).unwrap_err();
        assert_eq!(err.to_string(), "source 'tovarlar': missing column 'amal_turi'");
    }

    #[test]
    fn csv_bad_timestamp_names_row() {
        let csv = "tovar_nomi,amal_turi,miqdor,created_at\nBolt,kirim,3,2025-01-01\nBolt,kirim,3,soon\n";
        let err = load_csv_records("t", csv, &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, LedgerError::TimestampParse { row: 3, .. }), "{err}");
    }

    #[test]
    fn csv_summary() {
        let csv = "tovar_nomi,raqami,jami_keltirilgan,jami_ishlatilgan,qoldiq\nLenta,K1,\"1,000\",250,750\nBolt,,7,0,\n";
        let rows = load_csv_summary("ombor", csv, &SummaryColumns::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_in.value(), 1000.0);
        assert_eq!(rows[0].remaining.value(), 750.0);
        assert!(rows[1].remaining.is_missing());
    }

    #[test]
    fn json_store_rows() {
        let json = r#"[
            {"tovar_nomi": "Lenta", "raqami": "K1", "amal_turi": "kirim", "miqdor": 5, "created_at": "2025-01-10T08:00:00+00:00"},
            {"item_name": "Lenta", "item_code": "k1", "action_label": "chiqim", "quantity": "2", "created_at": "2025-01-11T08:00:00Z"}
        ]"#;
        let source = TextSource::json("kronkalar", json);
        let records = source.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity(), records[1].identity());
    }

    #[test]
    fn json_not_an_array() {
        let err = load_json::<TransactionRecord>("x", "{}").unwrap_err();
        assert!(matches!(err, LedgerError::JsonParse { .. }));
    }

    #[test]
    fn memory_source_snapshot() {
        let mut source = MemorySource::new("mem", Vec::new());
        assert!(source.load().unwrap().is_empty());
        source.push(TransactionRecord::new(
            "Bolt",
            None,
            "kirim",
            1i64,
            parse_timestamp("2025-01-01").unwrap(),
        ));
        assert_eq!(source.load().unwrap().len(), 1);
        assert_eq!(source.name(), "mem");
    }
}
