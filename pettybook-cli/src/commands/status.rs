//! Status command - show backend, connection state and record counts

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use pettybook_core::config::redact_uri;
use pettybook_core::services::ConnectionState;
use pettybook_core::{FinanceSummary, StorageKind};

use super::connected_context;
use crate::output::{format_amount, summary_table};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    configured: StorageKind,
    active: StorageKind,
    state: ConnectionState,
    location: String,
    categories: usize,
    transactions: usize,
    summary: FinanceSummary,
}

pub async fn run(storage: Option<StorageKind>, json: bool) -> Result<()> {
    let ctx = connected_context(storage).await?;
    let active = ctx.storage_type();

    let location = match active {
        StorageKind::Memory => "process memory (not saved)".to_string(),
        StorageKind::Embedded => ctx.data_dir.join(&ctx.config.embedded_file).display().to_string(),
        StorageKind::Document => format!(
            "{} / {}",
            redact_uri(&ctx.config.document_uri),
            ctx.config.document_database
        ),
    };

    let status = Status {
        configured: ctx.config.storage,
        active,
        state: ctx.connection.state(),
        location,
        categories: ctx.finance.categories().len(),
        transactions: ctx.finance.transactions().len(),
        summary: ctx.finance.summary(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Pettybook Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Storage", active.display_name()]);
    table.add_row(vec!["Location", &status.location]);
    table.add_row(vec!["Categories", &status.categories.to_string()]);
    table.add_row(vec!["Transactions", &status.transactions.to_string()]);
    println!("{}", table);
    println!();

    if status.transactions > 0 {
        println!("{}", summary_table(&status.summary));
        println!();
        println!(
            "Net position: {}",
            format_amount(status.summary.bank_balance + status.summary.cash_in_hand).bold()
        );
    }

    Ok(())
}
