//! Port definitions (hexagonal architecture)
//!
//! The services depend only on these traits, never on a concrete backend.

mod storage;

pub use storage::{BackendFailure, FailureKind, StorageKind, StorageProvider};
