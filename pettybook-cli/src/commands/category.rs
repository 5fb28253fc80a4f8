//! Category command - list, add, rename and remove categories

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use pettybook_core::{Error, StorageKind};

use super::{connected_context, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories with their transaction counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add {
        name: String,
    },
    /// Rename a category
    Rename {
        id: String,
        name: String,
    },
    /// Remove a category no transaction uses
    Remove {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: CategoryCommands, storage: Option<StorageKind>) -> Result<()> {
    let mut ctx = connected_context(storage).await?;
    let finance = &mut ctx.finance;

    match command {
        CategoryCommands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(finance.categories())?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Name", "Transactions"]);
            for category in finance.categories() {
                let used = finance.category_usage(&category.id);
                table.add_row(vec![category.id.to_string(), category.name.clone(), used.to_string()]);
            }
            println!("{}", table);
        }
        CategoryCommands::Add { name } => {
            let created = finance.add_category(&name).await?;
            output::success(&format!("Added category '{}' ({})", created.name, created.id));
        }
        CategoryCommands::Rename { id, name } => {
            let id = parse_id(&id);
            if !finance.update_category(&id, &name).await? {
                bail!("Category {} not found", id);
            }
            output::success(&format!("Renamed category {} to '{}'", id, name.trim()));
        }
        CategoryCommands::Remove { id, force } => {
            let id = parse_id(&id);
            let Some(category) = finance.category(&id).cloned() else {
                bail!("Category {} not found", id);
            };

            if !force && !finance.category_in_use(&id) && atty::is(atty::Stream::Stdin) {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Remove category '{}'?", category.name))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            match finance.delete_category(&id).await {
                Ok(true) => output::success(&format!("Removed category '{}'", category.name)),
                Ok(false) => bail!("Category {} not found", id),
                Err(Error::CategoryInUse(_)) => bail!(
                    "Category '{}' is used by existing transactions. Reassign them first.",
                    category.name
                ),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
