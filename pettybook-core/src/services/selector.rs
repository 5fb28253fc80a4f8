//! Provider selector - which backend is active

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::adapters::duckdb::DuckDbStorage;
use crate::adapters::memory::MemoryStorage;
use crate::adapters::mongodb::{MongoSettings, MongoStorage};
use crate::config::{Capabilities, Config};
use crate::ports::{StorageKind, StorageProvider};

/// One provider per backend kind
#[derive(Clone)]
pub struct StorageProviders {
    pub memory: Arc<dyn StorageProvider>,
    pub embedded: Arc<dyn StorageProvider>,
    pub document: Arc<dyn StorageProvider>,
}

impl StorageProviders {
    /// Build the real adapters
    ///
    /// Nothing is opened or connected here; each adapter connects on first use.
    pub fn from_config(config: &Config, capabilities: &Capabilities, data_dir: &Path) -> Self {
        let document = MongoStorage::new(MongoSettings {
            uri: config.document_uri.clone(),
            database: config.document_database.clone(),
            timeout: config.connect_timeout(),
            outbound_network: capabilities.outbound_network,
        });

        Self {
            memory: Arc::new(MemoryStorage::new()),
            embedded: Arc::new(DuckDbStorage::new(&data_dir.join(&config.embedded_file))),
            document: Arc::new(document),
        }
    }

    pub fn get(&self, kind: StorageKind) -> &Arc<dyn StorageProvider> {
        match kind {
            StorageKind::Memory => &self.memory,
            StorageKind::Embedded => &self.embedded,
            StorageKind::Document => &self.document,
        }
    }
}

/// Holds the active backend choice
///
/// Switching only changes which provider later calls go to; no data is
/// copied between backends.
pub struct StorageSelector {
    providers: StorageProviders,
    active: RwLock<StorageKind>,
}

impl StorageSelector {
    pub fn new(providers: StorageProviders, initial: StorageKind) -> Self {
        Self {
            providers,
            active: RwLock::new(initial),
        }
    }

    /// Currently selected backend
    pub fn storage_type(&self) -> StorageKind {
        // A poisoned lock still holds a valid Copy value
        *self.active.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_storage_type(&self, kind: StorageKind) {
        let mut active = self.active.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *active != kind {
            tracing::info!(from = %*active, to = %kind, "storage backend switched");
        }
        *active = kind;
    }

    /// Provider for the active backend
    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        self.provider_for(self.storage_type())
    }

    pub fn provider_for(&self, kind: StorageKind) -> Arc<dyn StorageProvider> {
        Arc::clone(self.providers.get(kind))
    }
}
