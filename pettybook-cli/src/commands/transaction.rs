//! Transaction command - list, record, edit and remove transactions

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;

use pettybook_core::services::FinanceService;
use pettybook_core::{NewTransaction, RecordId, StorageKind, TransactionKind, TransactionUpdate};

use super::{connected_context, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List transactions, newest first
    List {
        /// Only this type (deposit, withdrawal, petty-cash)
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<TransactionKind>,
        /// Earliest date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a transaction
    Add(AddArgs),
    /// Change fields of a transaction
    Update(UpdateArgs),
    /// Remove a transaction
    Remove {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Args)]
pub struct AddArgs {
    /// deposit, withdrawal or petty-cash
    #[arg(long = "type", value_parser = parse_kind)]
    kind: TransactionKind,
    #[arg(long)]
    amount: Decimal,
    /// Category id or name
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: String,
    /// Reference, cheque or voucher number, depending on the type
    #[arg(long)]
    reference: String,
    /// Defaults to today (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
pub struct UpdateArgs {
    id: String,
    #[arg(long)]
    amount: Option<Decimal>,
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Category id or name
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Reference, cheque or voucher number for the transaction's type
    #[arg(long)]
    reference: Option<String>,
}

fn parse_kind(value: &str) -> std::result::Result<TransactionKind, String> {
    value.parse().map_err(|e: pettybook_core::Error| e.to_string())
}

/// Accept a category id or an exact (case-insensitive) name
fn resolve_category(finance: &FinanceService, value: &str) -> Result<RecordId> {
    let id = parse_id(value);
    if let Some(category) = finance.category(&id) {
        return Ok(category.id.clone());
    }
    finance
        .categories()
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(value.trim()))
        .map(|c| c.id.clone())
        .with_context(|| format!("No category matches '{}'", value))
}

pub async fn run(command: TransactionCommands, storage: Option<StorageKind>) -> Result<()> {
    let mut ctx = connected_context(storage).await?;
    let finance = &mut ctx.finance;

    match command {
        TransactionCommands::List { kind, from, to, json } => {
            let start = from.unwrap_or(NaiveDate::MIN);
            let end = to.unwrap_or(NaiveDate::MAX);
            let selected: Vec<_> = finance
                .transactions_by_date_range(start, end)
                .into_iter()
                .filter(|t| kind.map_or(true, |k| t.kind == k))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
                return Ok(());
            }
            if selected.is_empty() {
                output::info("No transactions found");
                return Ok(());
            }
            println!("{}", output::transactions_table(finance, &selected));
        }
        TransactionCommands::Add(args) => {
            let category = resolve_category(finance, &args.category)?;
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            let new = NewTransaction::new(args.kind, args.amount, date, category, args.description)
                .with_reference(args.reference);

            let created = finance.add_transaction(new).await?;
            output::success(&format!(
                "Recorded {} {} of {} ({})",
                created.kind,
                created.reference().unwrap_or_default(),
                output::format_amount(created.amount),
                created.id
            ));
        }
        TransactionCommands::Update(args) => {
            let id = parse_id(&args.id);
            let Some(current) = finance.transaction(&id).cloned() else {
                bail!("Transaction {} not found", id);
            };

            let mut update = match args.reference {
                Some(reference) => TransactionUpdate::reference(current.kind, reference),
                None => TransactionUpdate::default(),
            };
            update.amount = args.amount;
            update.date = args.date;
            update.description = args.description;
            if let Some(category) = &args.category {
                update.category_id = Some(resolve_category(finance, category)?);
            }
            if update.is_empty() {
                output::warning("Nothing to change");
                return Ok(());
            }

            if !finance.update_transaction(&current.id, &update).await? {
                bail!("Transaction {} not found", id);
            }
            output::success(&format!("Updated transaction {}", current.id));
        }
        TransactionCommands::Remove { id, force } => {
            let id = parse_id(&id);
            let Some(current) = finance.transaction(&id).cloned() else {
                bail!("Transaction {} not found", id);
            };

            if !force && atty::is(atty::Stream::Stdin) {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Remove {} '{}' of {}?",
                        current.kind,
                        current.description,
                        output::format_amount(current.amount)
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            if !finance.delete_transaction(&current.id).await? {
                bail!("Transaction {} not found", id);
            }
            output::success(&format!("Removed transaction {}", current.id));
        }
    }

    Ok(())
}
