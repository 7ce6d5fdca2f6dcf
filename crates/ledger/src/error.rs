use std::fmt;

#[derive(Debug)]
pub enum LedgerError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no inventories, empty keyword, bad tolerance, etc.).
    ConfigValidation(String),
    /// An inventory name with no config entry.
    UnknownInventory(String),
    /// A configured log or summary absent from the run input.
    MissingInput { inventory: String, what: String },
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// Timestamp parse error.
    TimestampParse { source: String, row: usize, value: String },
    /// JSON input could not be decoded.
    JsonParse { source: String, message: String },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownInventory(name) => write!(f, "unknown inventory: {name}"),
            Self::MissingInput { inventory, what } => {
                write!(f, "inventory '{inventory}': {what} was not loaded")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::TimestampParse { source, row, value } => {
                write!(f, "source '{source}', row {row}: cannot parse timestamp '{value}'")
            }
            Self::JsonParse { source, message } => {
                write!(f, "source '{source}': invalid JSON: {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        Self::Io(err.to_string())
    }
}
