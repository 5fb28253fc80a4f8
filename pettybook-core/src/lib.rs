//! Pettybook Core - storage layer of a small finance tracker
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Core entities (Category, Transaction, FinanceSummary)
//! - **ports**: The storage contract every backend implements
//! - **adapters**: In-memory, DuckDB and MongoDB backends
//! - **services**: Backend selection, connection fallback, finance data layer

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use config::{Capabilities, Config};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Category, FinanceSummary, NewTransaction, RecordId, Transaction, TransactionKind,
    TransactionUpdate,
};
pub use domain::result::Error;
pub use ports::{BackendFailure, FailureKind, StorageKind, StorageProvider};

/// Main context for Pettybook operations
///
/// Owns the configuration, the backend selector and everything built on it.
/// Nothing touches a backend until [`PettybookContext::connect`] is called.
pub struct PettybookContext {
    pub config: Config,
    pub capabilities: Capabilities,
    pub data_dir: PathBuf,
    pub selector: Arc<StorageSelector>,
    pub connection: ConnectionController,
    pub finance: FinanceService,
}

impl PettybookContext {
    /// Create a context from the settings in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)
            .with_context(|| format!("Failed to load settings from {:?}", data_dir))?;
        Ok(Self::with_config(data_dir, config))
    }

    /// Create a context from an already resolved config
    pub fn with_config(data_dir: &Path, config: Config) -> Self {
        let capabilities = Capabilities::detect(&config);
        let providers = StorageProviders::from_config(&config, &capabilities, data_dir);
        Self::with_providers(data_dir, config, capabilities, providers)
    }

    /// Create a context over the given providers
    pub fn with_providers(
        data_dir: &Path,
        config: Config,
        capabilities: Capabilities,
        providers: StorageProviders,
    ) -> Self {
        let selector = Arc::new(StorageSelector::new(providers, config.storage));
        let connection = ConnectionController::new(Arc::clone(&selector), capabilities, config.fallback);
        let finance = FinanceService::new(Arc::clone(&selector));

        Self {
            config,
            capabilities,
            data_dir: data_dir.to_path_buf(),
            selector,
            connection,
            finance,
        }
    }

    /// Bring a backend up and load its data
    ///
    /// A failed connection is reported through the returned state, not as
    /// an `Err`; `Err` means the backend connected but its data could not
    /// be read.
    pub async fn connect(&mut self) -> Result<ConnectionState> {
        let state = self.connection.connect().await;
        self.load_if_connected(&state).await?;
        Ok(state)
    }

    /// Carry out a recovery action after a failed connect
    pub async fn recover(&mut self, action: Recovery) -> Result<ConnectionState> {
        let state = self.connection.recover(action).await;
        self.load_if_connected(&state).await?;
        Ok(state)
    }

    /// Switch backends and reconnect
    pub async fn switch_to(&mut self, kind: StorageKind) -> Result<ConnectionState> {
        let state = self.connection.switch_to(kind).await;
        self.load_if_connected(&state).await?;
        Ok(state)
    }

    async fn load_if_connected(&mut self, state: &ConnectionState) -> Result<()> {
        if let ConnectionState::Connected(kind) = state {
            self.finance
                .load()
                .await
                .with_context(|| format!("Failed to load data from {} storage", kind.display_name()))?;
        }
        Ok(())
    }

    /// Backend currently in use
    pub fn storage_type(&self) -> StorageKind {
        self.selector.storage_type()
    }
}
