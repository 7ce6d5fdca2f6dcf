// Ombor CLI - inventory ledger reconciliation from the shell

mod exit_codes;
mod ledger;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "ombor")]
#[command(about = "Recompute inventory balances from transaction logs")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List per-item balances, most recently updated first
    #[command(after_help = "\
Examples:
  ombor balance sex.ombor.toml
  ombor balance sex.ombor.toml --inventory ribbons --search lenta
  ombor balance sex.ombor.toml --json
  ombor balance sex.ombor.toml --output balances.json")]
    Balance {
        /// Path to the .ombor.toml config file
        config: PathBuf,

        /// Only this inventory (a key under [inventories])
        #[arg(long, short = 'i')]
        inventory: Option<String>,

        /// Keep items whose name or code contains this text
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show totals per inventory
    #[command(after_help = "\
Examples:
  ombor stats sex.ombor.toml
  ombor stats sex.ombor.toml --inventory parts --json")]
    Stats {
        /// Path to the .ombor.toml config file
        config: PathBuf,

        /// Only this inventory (a key under [inventories])
        #[arg(long, short = 'i')]
        inventory: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Compare recomputed balances with each configured summary table
    #[command(after_help = "\
Examples:
  ombor check sex.ombor.toml
  ombor check sex.ombor.toml --json
  ombor check sex.ombor.toml --output check.json

Exits 62 when any summary row disagrees with the log.")]
    Check {
        /// Path to the .ombor.toml config file
        config: PathBuf,

        /// Only this inventory (a key under [inventories])
        #[arg(long, short = 'i')]
        inventory: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Classify one action label (and optional comment)
    #[command(after_help = "\
Examples:
  ombor classify 'Olib kelindi'
  ombor classify '???' --comment 'mahsulot keldi'
  ombor classify 'yo'\\''qoldi' --config sex.ombor.toml --json")]
    Classify {
        /// Action label as written in the log
        label: String,

        /// Free-text comment, consulted when the label matches nothing
        #[arg(long, short = 'c')]
        comment: Option<String>,

        /// Use the vocabulary from this config instead of the built-in one
        #[arg(long, env = "OMBOR_CONFIG")]
        config: Option<PathBuf>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a config without loading any data
    #[command(after_help = "\
Examples:
  ombor validate sex.ombor.toml")]
    Validate {
        /// Path to the .ombor.toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  ombor-ledger ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  ombor-ledger ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Balance { config, inventory, search, json, output } => {
            ledger::cmd_balance(config, inventory, search, json, output)
        }
        Commands::Stats { config, inventory, json } => ledger::cmd_stats(config, inventory, json),
        Commands::Check { config, inventory, json, output } => {
            ledger::cmd_check(config, inventory, json, output)
        }
        Commands::Classify { label, comment, config, json } => {
            ledger::cmd_classify(label, comment, config, json)
        }
        Commands::Validate { config } => ledger::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
