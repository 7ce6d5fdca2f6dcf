//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `ombor` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 2    | Universal | CLI usage error (bad args, unknown inventory) |
//! | 60   | ledger    | Config could not be parsed or validated       |
//! | 61   | ledger    | Runtime error (unreadable file, bad row)      |
//! | 62   | ledger    | Log and summary table disagree                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, unknown inventory name.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Ledger (60-69)
// =============================================================================

/// Config file is not valid TOML or fails validation.
pub const EXIT_LEDGER_INVALID_CONFIG: u8 = 60;

/// Runtime error: a config, log or summary file could not be read or decoded.
pub const EXIT_LEDGER_RUNTIME: u8 = 61;

/// `check` found at least one identity where the summary table disagrees
/// with the recomputed log.
pub const EXIT_LEDGER_MISMATCH: u8 = 62;

// =============================================================================
// Ledger error mapping
// =============================================================================

use ombor_ledger::LedgerError;

/// Map a LedgerError to its exit code.
pub fn ledger_exit_code(err: &LedgerError) -> u8 {
    match err {
        LedgerError::ConfigParse(_) | LedgerError::ConfigValidation(_) => EXIT_LEDGER_INVALID_CONFIG,
        LedgerError::UnknownInventory(_) => EXIT_USAGE,
        LedgerError::MissingInput { .. }
        | LedgerError::MissingColumn { .. }
        | LedgerError::TimestampParse { .. }
        | LedgerError::JsonParse { .. }
        | LedgerError::Io(_) => EXIT_LEDGER_RUNTIME,
    }
}
