//! Connection controller - bring a backend up, fall back when it won't come
//!
//! States run `Loading -> Connected | Failed`, and every connect or switch
//! starts again from `Loading`.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Capabilities;
use crate::ports::{BackendFailure, FailureKind, StorageKind};
use crate::services::StorageSelector;

/// How far a failed backend may be downgraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Try the next backend in the chain once, then give up
    SingleStep,
    /// Keep walking the chain until something connects or it runs out
    #[default]
    Cascade,
}

impl FallbackPolicy {
    /// Backends tried after the selected one
    fn max_downgrades(&self) -> usize {
        match self {
            FallbackPolicy::SingleStep => 1,
            FallbackPolicy::Cascade => StorageKind::ALL.len() - 1,
        }
    }
}

/// Terminal failure of a connect attempt
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ConnectionError {
    /// Every backend tried, in order
    pub attempted: Vec<StorageKind>,
    /// Failure of the last one
    pub failure: BackendFailure,
    pub message: String,
}

impl ConnectionError {
    fn new(attempted: Vec<StorageKind>, failure: BackendFailure) -> Self {
        let message = if failure.kind == FailureKind::CapabilityMissing {
            format!(
                "{} is not available in this environment: {}",
                failure.backend.display_name(),
                failure.message
            )
        } else {
            let names: Vec<&str> = attempted.iter().map(|k| k.display_name()).collect();
            format!(
                "Could not connect to {} ({}). Tried: {}",
                failure.backend.display_name(),
                failure.message,
                names.join(", ")
            )
        };
        Self { attempted, failure, message }
    }

    /// Backend the last attempt was made against
    pub fn last_attempted(&self) -> StorageKind {
        self.failure.backend
    }

    /// What the user can do about it
    pub fn explanation(&self) -> &'static str {
        match (self.failure.backend, self.failure.kind) {
            (StorageKind::Document, FailureKind::CapabilityMissing) => {
                "MongoDB needs outbound network access, which this environment does not have. \
                 Switch to DuckDB or in-memory storage instead."
            }
            (StorageKind::Document, _) => {
                "Make sure a MongoDB server is running and that MONGODB_URI points at it."
            }
            (StorageKind::Embedded, FailureKind::SchemaSetup) => {
                "The DuckDB file opened but its tables could not be created. \
                 The file may be damaged or from an incompatible version."
            }
            (StorageKind::Embedded, _) => {
                "The DuckDB file could not be opened. Check that the data directory is writable \
                 and that no other process holds the database lock."
            }
            (StorageKind::Memory, _) => "In-memory storage could not be initialized.",
        }
    }

    /// Actions to offer: retry, or pick a backend that was not tried
    ///
    /// The document database is never offered here; switching to it is a
    /// deliberate choice made elsewhere.
    pub fn recovery_options(&self) -> Vec<Recovery> {
        let mut options = Vec::new();
        if self.failure.kind != FailureKind::CapabilityMissing {
            options.push(Recovery::Retry);
        }
        options.extend(
            [StorageKind::Embedded, StorageKind::Memory]
                .into_iter()
                .filter(|kind| !self.attempted.contains(kind))
                .map(Recovery::Use),
        );
        options
    }
}

/// A way out of the failed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Retry,
    Use(StorageKind),
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::Retry => f.write_str("Retry"),
            Recovery::Use(kind) => write!(f, "Use {} storage", kind.display_name()),
        }
    }
}

/// Where the connection currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ConnectionState {
    Loading(StorageKind),
    Connected(StorageKind),
    Failed(ConnectionError),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

/// Drives the active backend from `Loading` to a terminal state
pub struct ConnectionController {
    selector: Arc<StorageSelector>,
    capabilities: Capabilities,
    policy: FallbackPolicy,
    state: RwLock<ConnectionState>,
}

impl ConnectionController {
    pub fn new(
        selector: Arc<StorageSelector>,
        capabilities: Capabilities,
        policy: FallbackPolicy,
    ) -> Self {
        let initial = ConnectionState::Loading(selector.storage_type());
        Self {
            selector,
            capabilities,
            policy,
            state: RwLock::new(initial),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn selector(&self) -> &Arc<StorageSelector> {
        &self.selector
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    fn set_state(&self, next: ConnectionState) -> ConnectionState {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = next.clone();
        next
    }

    /// Connect the selected backend, falling back per policy
    pub async fn connect(&self) -> ConnectionState {
        let selected = self.selector.storage_type();
        self.set_state(ConnectionState::Loading(selected));
        tracing::info!(backend = %selected, "connecting");

        if selected == StorageKind::Document && !self.capabilities.outbound_network {
            let failure = BackendFailure::capability(
                StorageKind::Document,
                "no outbound network access",
            );
            tracing::warn!(%failure, "document store unavailable in this environment");
            return self.set_state(ConnectionState::Failed(ConnectionError::new(
                vec![StorageKind::Document],
                failure,
            )));
        }

        let mut attempted = Vec::new();
        let mut candidate = Some(selected);

        while let Some(kind) = candidate {
            if !attempted.is_empty() {
                self.set_state(ConnectionState::Loading(kind));
                tracing::warn!(from = %attempted[attempted.len() - 1], to = %kind, "falling back");
            }
            attempted.push(kind);

            match self.bring_up(kind).await {
                Ok(()) => {
                    self.selector.set_storage_type(kind);
                    tracing::info!(backend = %kind, "connected");
                    return self.set_state(ConnectionState::Connected(kind));
                }
                Err(failure) => {
                    tracing::warn!(%failure, "backend failed");
                    let downgrades = attempted.len() - 1;
                    candidate = kind.fallback().filter(|_| downgrades < self.policy.max_downgrades());
                    if candidate.is_none() {
                        let error = ConnectionError::new(attempted, failure);
                        tracing::warn!(error = %error, "no backend could be connected");
                        return self.set_state(ConnectionState::Failed(error));
                    }
                }
            }
        }

        // The loop only exits through its returns; an empty chain still needs a state
        self.state()
    }

    /// User-chosen switch; earlier attempts play no part
    pub async fn switch_to(&self, kind: StorageKind) -> ConnectionState {
        self.selector.set_storage_type(kind);
        self.connect().await
    }

    /// Try the current selection again
    pub async fn retry(&self) -> ConnectionState {
        self.connect().await
    }

    /// Carry out a recovery action
    pub async fn recover(&self, action: Recovery) -> ConnectionState {
        match action {
            Recovery::Retry => self.retry().await,
            Recovery::Use(kind) => self.switch_to(kind).await,
        }
    }

    async fn bring_up(&self, kind: StorageKind) -> Result<(), BackendFailure> {
        let provider = self.selector.provider_for(kind);
        provider.check_connection().await?;
        provider.prepare().await
    }
}
