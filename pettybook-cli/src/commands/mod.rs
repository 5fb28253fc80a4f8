//! CLI command implementations

pub mod category;
pub mod status;
pub mod storage;
pub mod summary;
pub mod transaction;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};

use pettybook_core::config::Config;
use pettybook_core::services::{ConnectionState, Recovery};
use pettybook_core::{PettybookContext, RecordId, StorageKind};

use crate::output;

/// Get the pettybook directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PETTYBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".pettybook"))
        .context("Could not find home directory; set PETTYBOOK_DIR")
}

/// Build the context without connecting
///
/// `storage` overrides the configured backend for this run only.
pub fn get_context(storage: Option<StorageKind>) -> Result<PettybookContext> {
    let data_dir = get_data_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create pettybook directory: {:?}", data_dir))?;

    let mut config = Config::load(&data_dir).context("Failed to load settings")?;
    if let Some(kind) = storage {
        config.storage = kind;
    }
    tracing::debug!(data_dir = %data_dir.display(), backend = %config.storage, "settings loaded");
    Ok(PettybookContext::with_config(&data_dir, config))
}

/// Build the context and connect, offering recovery when that fails
pub async fn connected_context(storage: Option<StorageKind>) -> Result<PettybookContext> {
    let mut ctx = get_context(storage)?;
    let mut state = with_spinner(ctx.storage_type(), ctx.connect()).await?;

    loop {
        let err = match state {
            ConnectionState::Connected(kind) => {
                if let Some(message) = fallback_notice(ctx.config.storage, kind) {
                    output::warning(&message);
                }
                return Ok(ctx);
            }
            ConnectionState::Failed(err) => err,
            ConnectionState::Loading(kind) => {
                bail!("Connection to {} storage did not finish", kind.display_name())
            }
        };

        output::error(&err.message);
        eprintln!("{}", err.explanation());

        let options = err.recovery_options();
        if options.is_empty() || !atty::is(atty::Stream::Stdin) {
            bail!("No storage backend could be connected");
        }

        let Some(action) = choose_recovery(&options)? else {
            bail!("No storage backend could be connected");
        };
        let target = match action {
            Recovery::Retry => ctx.storage_type(),
            Recovery::Use(kind) => kind,
        };
        state = with_spinner(target, ctx.recover(action)).await?;
    }
}

/// Warning for a run that ended up on a different backend than configured
fn fallback_notice(configured: StorageKind, active: StorageKind) -> Option<String> {
    if active == configured {
        return None;
    }
    let mut message = format!(
        "{} storage is unavailable; using {} storage for now.",
        configured.display_name(),
        active.display_name()
    );
    if active == StorageKind::Memory {
        message.push_str(" Changes made in this run are discarded when it exits.");
    }
    Some(message)
}

fn choose_recovery(options: &[Recovery]) -> Result<Option<Recovery>> {
    let labels: Vec<String> = options.iter().map(|o| o.to_string()).collect();
    let choice = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| options[i]))
}

/// Show a spinner while `work` runs
async fn with_spinner<T>(kind: StorageKind, work: impl std::future::Future<Output = T>) -> T {
    let spinner = if atty::is(atty::Stream::Stderr) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Initializing {} database...", kind.display_name()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    } else {
        None
    };

    let result = work.await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    result
}

/// Parse an id typed on the command line
pub fn parse_id(value: &str) -> RecordId {
    value.parse().unwrap_or_else(|never| match never {})
}
