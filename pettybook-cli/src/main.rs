//! Pettybook CLI - petty cash and bank book in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{category, status, storage, summary, transaction};
use pettybook_core::services::finance::RECENT_COUNT;
use pettybook_core::StorageKind;

/// Pettybook - track deposits, withdrawals and petty cash
#[derive(Parser)]
#[command(name = "pb", version, about, long_about = None)]
struct Cli {
    /// Use this storage backend for this run only (memory, embedded, document)
    #[arg(long, global = true, value_parser = parse_storage)]
    storage: Option<StorageKind>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection state, record counts and balances
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or change the storage backend
    Storage {
        #[command(subcommand)]
        command: storage::StorageCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// Manage transactions
    Transaction {
        #[command(subcommand)]
        command: transaction::TransactionCommands,
    },

    /// Show totals, balances and recent transactions
    Summary {
        /// Number of recent transactions to show
        #[arg(long, default_value_t = RECENT_COUNT)]
        recent: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_storage(value: &str) -> std::result::Result<StorageKind, String> {
    value.parse().map_err(|e: pettybook_core::Error| e.to_string())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PETTYBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let storage = cli.storage;
    match cli.command {
        Commands::Status { json } => status::run(storage, json).await,
        Commands::Storage { command } => storage::run(command, storage).await,
        Commands::Category { command } => category::run(command, storage).await,
        Commands::Transaction { command } => transaction::run(command, storage).await,
        Commands::Summary { recent, json } => summary::run(storage, recent, json).await,
    }
}
