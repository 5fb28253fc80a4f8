//! Storage command - show, select and probe storage backends

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use pettybook_core::config::redact_uri;
use pettybook_core::services::{ConnectionState, FallbackPolicy};
use pettybook_core::{StorageKind, StorageProvider};

use super::{get_context, get_data_dir};
use crate::output;

#[derive(Subcommand)]
pub enum StorageCommands {
    /// Show the configured backend and where it keeps its data
    Show,
    /// Select a backend and save the choice
    Use {
        /// memory, embedded or document
        #[arg(value_parser = crate::parse_storage)]
        kind: StorageKind,
    },
    /// Choose how far a failed connection falls back (cascade, single-step)
    Fallback {
        #[arg(value_parser = parse_fallback)]
        policy: FallbackPolicy,
    },
    /// Test the connection to every backend
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct CheckResult {
    backend: StorageKind,
    reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(command: StorageCommands, storage: Option<StorageKind>) -> Result<()> {
    match command {
        StorageCommands::Show => show(storage),
        StorageCommands::Use { kind } => use_backend(kind).await,
        StorageCommands::Fallback { policy } => set_fallback(policy),
        StorageCommands::Check { json } => check(storage, json).await,
    }
}

fn parse_fallback(value: &str) -> std::result::Result<FallbackPolicy, String> {
    match value.trim().to_lowercase().as_str() {
        "cascade" => Ok(FallbackPolicy::Cascade),
        "single-step" | "single" => Ok(FallbackPolicy::SingleStep),
        other => Err(format!("Unknown fallback policy: {} (expected cascade or single-step)", other)),
    }
}

fn set_fallback(policy: FallbackPolicy) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut ctx = get_context(None)?;
    ctx.config.set_fallback(policy);
    ctx.config.save(&data_dir)?;
    output::success(&format!("Fallback policy set to {:?}", policy));
    Ok(())
}

fn show(storage: Option<StorageKind>) -> Result<()> {
    let ctx = get_context(storage)?;
    let config = &ctx.config;

    let mut table = output::create_table();
    table.set_header(vec!["Backend", "Selected", "Location"]);
    for kind in StorageKind::ALL {
        let location = match kind {
            StorageKind::Memory => "process memory (not saved)".to_string(),
            StorageKind::Embedded => ctx.data_dir.join(&config.embedded_file).display().to_string(),
            StorageKind::Document => {
                format!("{} / {}", redact_uri(&config.document_uri), config.document_database)
            }
        };
        let selected = if kind == config.storage { "●" } else { "" };
        table.add_row(vec![kind.display_name(), selected, &location]);
    }
    println!("{}", table);

    if !ctx.capabilities.outbound_network {
        output::warning("Outbound networking is disabled; MongoDB cannot be used.");
    }
    println!("Fallback: {:?}", config.fallback);
    Ok(())
}

async fn use_backend(kind: StorageKind) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut ctx = get_context(Some(kind))?;

    match ctx.switch_to(kind).await? {
        ConnectionState::Connected(active) if active == kind => {
            ctx.config.set_storage(kind);
            ctx.config.save(&data_dir)?;
            output::success(&format!("Now using {} storage", kind.display_name()));
            Ok(())
        }
        ConnectionState::Connected(active) => bail!(
            "{} storage is not available (fell back to {}); selection not saved",
            kind.display_name(),
            active.display_name()
        ),
        ConnectionState::Failed(err) => {
            eprintln!("{}", err.explanation());
            bail!("{}; selection not saved", err.message)
        }
        ConnectionState::Loading(_) => bail!("Connection did not finish; selection not saved"),
    }
}

async fn check(storage: Option<StorageKind>, json: bool) -> Result<()> {
    let ctx = get_context(storage)?;

    let mut results = Vec::new();
    for kind in StorageKind::ALL {
        let provider = ctx.selector.provider_for(kind);
        let outcome = provider.check_connection().await;
        results.push(CheckResult {
            backend: kind,
            reachable: outcome.is_ok(),
            error: outcome.err().map(|f| f.to_string()),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        match &result.error {
            None => println!("{} {}", "✓".green(), result.backend.display_name()),
            Some(error) => println!("{} {}: {}", "✗".red(), result.backend.display_name(), error.dimmed()),
        }
    }
    Ok(())
}
