//! Summary command - totals, balances and recent activity

use anyhow::Result;
use colored::Colorize;

use pettybook_core::StorageKind;

use super::connected_context;
use crate::output;

pub async fn run(storage: Option<StorageKind>, recent: usize, json: bool) -> Result<()> {
    let ctx = connected_context(storage).await?;
    let finance = &ctx.finance;
    let summary = finance.summary();
    let latest = finance.recent_transactions(recent);

    if json {
        let value = serde_json::json!({
            "summary": summary,
            "recentTransactions": latest,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Summary".bold());
    println!("{}", output::summary_table(&summary));

    if recent > 0 {
        println!();
        println!("{}", "Recent Transactions".bold());
        if latest.is_empty() {
            println!("{}", "No transactions yet".dimmed());
        } else {
            println!("{}", output::transactions_table(finance, &latest));
        }
    }

    Ok(())
}
