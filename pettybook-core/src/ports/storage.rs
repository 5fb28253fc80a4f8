//! Storage port - the contract every backend implements

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::result::{Error, Result};
use crate::domain::{Category, NewTransaction, RecordId, Transaction, TransactionKind, TransactionUpdate};

/// Available storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local, lost on exit
    Memory,
    /// DuckDB file in the data directory
    Embedded,
    /// MongoDB over the network
    Document,
}

impl StorageKind {
    pub const ALL: [StorageKind; 3] = [StorageKind::Document, StorageKind::Embedded, StorageKind::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::Embedded => "embedded",
            StorageKind::Document => "document",
        }
    }

    /// Human-facing backend name
    pub fn display_name(&self) -> &'static str {
        match self {
            StorageKind::Memory => "In-memory",
            StorageKind::Embedded => "DuckDB",
            StorageKind::Document => "MongoDB",
        }
    }

    /// Next backend in the downgrade chain: document -> embedded -> memory
    pub fn fallback(&self) -> Option<StorageKind> {
        match self {
            StorageKind::Document => Some(StorageKind::Embedded),
            StorageKind::Embedded => Some(StorageKind::Memory),
            StorageKind::Memory => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mock" | "ephemeral" => Ok(StorageKind::Memory),
            "embedded" | "duckdb" | "indexeddb" => Ok(StorageKind::Embedded),
            "document" | "mongodb" | "mongo" => Ok(StorageKind::Document),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected memory, embedded or document)",
                other
            ))),
        }
    }
}

/// Why a backend could not be brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Network, socket or file-system failure
    Unreachable,
    /// Reachable, but schema creation or seeding failed
    SchemaSetup,
    /// The running environment cannot use this backend at all
    CapabilityMissing,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::SchemaSetup => "schema setup failed",
            FailureKind::CapabilityMissing => "not supported here",
        })
    }
}

/// Typed failure from `check_connection` / `prepare`
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{} storage {kind}: {message}", .backend.display_name())]
pub struct BackendFailure {
    pub backend: StorageKind,
    pub kind: FailureKind,
    pub message: String,
}

impl BackendFailure {
    pub fn unreachable(backend: StorageKind, message: impl Into<String>) -> Self {
        Self { backend, kind: FailureKind::Unreachable, message: message.into() }
    }

    pub fn schema(backend: StorageKind, message: impl Into<String>) -> Self {
        Self { backend, kind: FailureKind::SchemaSetup, message: message.into() }
    }

    pub fn capability(backend: StorageKind, message: impl Into<String>) -> Self {
        Self { backend, kind: FailureKind::CapabilityMissing, message: message.into() }
    }
}

/// Storage provider abstraction
///
/// One implementation per backend. Missing records are a normal outcome:
/// lookups return `None`, listings return an empty vec and mutations
/// return `false`. `Err` is reserved for failures the caller has to report.
///
/// Listings come back newest date first.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> StorageKind;

    // === Lifecycle ===

    /// Cheap reachability check
    async fn check_connection(&self) -> std::result::Result<(), BackendFailure>;

    /// Idempotent setup: schema, indexes, default categories
    async fn prepare(&self) -> std::result::Result<(), BackendFailure>;

    /// `check_connection` collapsed to a flag
    async fn test_connection(&self) -> bool {
        match self.check_connection().await {
            Ok(()) => true,
            Err(failure) => {
                tracing::warn!(backend = %self.kind(), %failure, "connection test failed");
                false
            }
        }
    }

    /// `prepare` collapsed to a flag
    async fn initialize_database(&self) -> bool {
        match self.prepare().await {
            Ok(()) => true,
            Err(failure) => {
                tracing::warn!(backend = %self.kind(), %failure, "initialization failed");
                false
            }
        }
    }

    // === Categories ===

    async fn get_all_categories(&self) -> Result<Vec<Category>>;

    async fn get_category_by_id(&self, id: &RecordId) -> Result<Option<Category>>;

    async fn create_category(&self, name: &str) -> Result<Category>;

    /// Rename; `false` if no such category
    async fn update_category(&self, id: &RecordId, name: &str) -> Result<bool>;

    /// `false` if no such category
    async fn delete_category(&self, id: &RecordId) -> Result<bool>;

    // === Transactions ===

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>>;

    async fn get_transaction_by_id(&self, id: &RecordId) -> Result<Option<Transaction>>;

    async fn get_transactions_by_type(&self, kind: TransactionKind) -> Result<Vec<Transaction>>;

    /// Both bounds inclusive; an inverted range is empty
    async fn get_transactions_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>>;

    /// Assigns the id and both timestamps
    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction>;

    /// Merge `update` and refresh `updated_at`; `false` if no such transaction
    async fn update_transaction(&self, id: &RecordId, update: &TransactionUpdate) -> Result<bool>;

    /// `false` if no such transaction
    async fn delete_transaction(&self, id: &RecordId) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain() {
        assert_eq!(StorageKind::Document.fallback(), Some(StorageKind::Embedded));
        assert_eq!(StorageKind::Embedded.fallback(), Some(StorageKind::Memory));
        assert_eq!(StorageKind::Memory.fallback(), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("mock".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("IndexedDB".parse::<StorageKind>().unwrap(), StorageKind::Embedded);
        assert_eq!("mongodb".parse::<StorageKind>().unwrap(), StorageKind::Document);
        assert!("postgres".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_failure_display_names_backend() {
        let failure = BackendFailure::unreachable(StorageKind::Document, "connection refused");
        assert_eq!(failure.to_string(), "MongoDB storage unreachable: connection refused");
    }
}
