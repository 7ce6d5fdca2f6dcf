//! `ombor-ledger`: inventory ledger reconciliation engine.
//!
//! Pure engine crate: receives transaction snapshots, returns per-item
//! balances, stats and consistency reports. No CLI dependencies.

pub mod aggregate;
pub mod change;
pub mod classify;
pub mod config;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod quantity;
pub mod source;
pub mod stats;

pub use aggregate::{aggregate, aggregate_with};
pub use classify::{classify, ActionCategory, Vocabulary};
pub use config::LedgerConfig;
pub use consistency::cross_check;
pub use engine::{run, InventoryLedger, LedgerInput, LedgerResult};
pub use error::LedgerError;
pub use model::{BalanceRecord, InventoryKind, ItemIdentity, SummaryRow, TransactionRecord};
pub use normalize::normalize;
pub use quantity::{to_number, RawQuantity};
