//! Connection controller sequencing against scripted backends
//!
//! Run with: cargo test --test fallback_test

mod common;

use std::sync::Arc;

use common::{providers, ScriptedStorage};
use pettybook_core::config::Capabilities;
use pettybook_core::services::{
    ConnectionController, ConnectionState, FallbackPolicy, Recovery, StorageSelector,
};
use pettybook_core::{FailureKind, StorageKind};

struct Harness {
    memory: Arc<ScriptedStorage>,
    embedded: Arc<ScriptedStorage>,
    document: Arc<ScriptedStorage>,
    controller: ConnectionController,
}

impl Harness {
    fn new(
        memory: Arc<ScriptedStorage>,
        embedded: Arc<ScriptedStorage>,
        document: Arc<ScriptedStorage>,
        selected: StorageKind,
        capabilities: Capabilities,
        policy: FallbackPolicy,
    ) -> Self {
        let selector = Arc::new(StorageSelector::new(
            providers(&memory, &embedded, &document),
            selected,
        ));
        let controller = ConnectionController::new(selector, capabilities, policy);
        Self { memory, embedded, document, controller }
    }

    fn selected(&self) -> StorageKind {
        self.controller.selector().storage_type()
    }
}

#[tokio::test]
async fn test_offline_document_selection_fails_without_any_call() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::healthy(StorageKind::Embedded),
        ScriptedStorage::healthy(StorageKind::Document),
        StorageKind::Document,
        Capabilities::offline(),
        FallbackPolicy::Cascade,
    );

    let state = h.controller.connect().await;

    let ConnectionState::Failed(err) = state else {
        panic!("expected failure, got {:?}", h.controller.state());
    };
    assert_eq!(err.failure.kind, FailureKind::CapabilityMissing);
    assert_eq!(err.attempted, vec![StorageKind::Document]);
    assert!(err.message.contains("not available in this environment"));
    assert_eq!(h.document.checks(), 0);
    assert_eq!(h.embedded.checks(), 0);
    assert_eq!(h.memory.checks(), 0);
    assert_eq!(h.selected(), StorageKind::Document);
}

#[tokio::test]
async fn test_unreachable_document_downgrades_once_to_embedded() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::healthy(StorageKind::Embedded),
        ScriptedStorage::unreachable(StorageKind::Document),
        StorageKind::Document,
        Capabilities::full(),
        FallbackPolicy::SingleStep,
    );

    let state = h.controller.connect().await;

    assert_eq!(state, ConnectionState::Connected(StorageKind::Embedded));
    assert_eq!(h.document.checks(), 1);
    assert_eq!(h.document.prepares(), 0);
    assert_eq!(h.embedded.checks(), 1);
    assert_eq!(h.embedded.prepares(), 1);
    assert_eq!(h.memory.checks(), 0);
    // Later requests stay on the backend that worked
    assert_eq!(h.selected(), StorageKind::Embedded);
    assert_eq!(h.controller.state(), state);
}

#[tokio::test]
async fn test_single_step_stops_after_one_downgrade() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::unreachable(StorageKind::Embedded),
        ScriptedStorage::unreachable(StorageKind::Document),
        StorageKind::Document,
        Capabilities::full(),
        FallbackPolicy::SingleStep,
    );

    let state = h.controller.connect().await;

    let ConnectionState::Failed(err) = state else {
        panic!("expected failure, got {:?}", h.controller.state());
    };
    assert_eq!(err.attempted, vec![StorageKind::Document, StorageKind::Embedded]);
    assert_eq!(err.last_attempted(), StorageKind::Embedded);
    assert!(err.message.contains("DuckDB"));
    assert_eq!(h.memory.checks(), 0);
    assert_eq!(
        err.recovery_options(),
        vec![Recovery::Retry, Recovery::Use(StorageKind::Memory)]
    );
}

#[tokio::test]
async fn test_cascade_walks_the_whole_chain() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::unreachable(StorageKind::Embedded),
        ScriptedStorage::unreachable(StorageKind::Document),
        StorageKind::Document,
        Capabilities::full(),
        FallbackPolicy::Cascade,
    );

    let state = h.controller.connect().await;

    assert_eq!(state, ConnectionState::Connected(StorageKind::Memory));
    assert_eq!(h.document.checks(), 1);
    assert_eq!(h.embedded.checks(), 1);
    assert_eq!(h.memory.prepares(), 1);
    assert_eq!(h.selected(), StorageKind::Memory);
}

#[tokio::test]
async fn test_setup_failure_falls_back_like_unreachable() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::broken_schema(StorageKind::Embedded),
        ScriptedStorage::healthy(StorageKind::Document),
        StorageKind::Embedded,
        Capabilities::full(),
        FallbackPolicy::SingleStep,
    );

    let state = h.controller.connect().await;

    assert_eq!(state, ConnectionState::Connected(StorageKind::Memory));
    assert_eq!(h.embedded.checks(), 1);
    assert_eq!(h.embedded.prepares(), 1);
    // Document is never a fallback target
    assert_eq!(h.document.checks(), 0);
}

#[tokio::test]
async fn test_everything_failing_reports_last_backend() {
    let h = Harness::new(
        ScriptedStorage::broken_schema(StorageKind::Memory),
        ScriptedStorage::unreachable(StorageKind::Embedded),
        ScriptedStorage::unreachable(StorageKind::Document),
        StorageKind::Document,
        Capabilities::full(),
        FallbackPolicy::Cascade,
    );

    let state = h.controller.connect().await;

    let ConnectionState::Failed(err) = state else {
        panic!("expected failure, got {:?}", h.controller.state());
    };
    assert_eq!(err.attempted, StorageKind::ALL.to_vec());
    assert_eq!(err.failure.backend, StorageKind::Memory);
    assert_eq!(err.failure.kind, FailureKind::SchemaSetup);
    assert_eq!(err.recovery_options(), vec![Recovery::Retry]);
    // Selection is left where the user put it
    assert_eq!(h.selected(), StorageKind::Document);
}

#[tokio::test]
async fn test_manual_switch_ignores_previous_history() {
    let h = Harness::new(
        ScriptedStorage::healthy(StorageKind::Memory),
        ScriptedStorage::unreachable(StorageKind::Embedded),
        ScriptedStorage::unreachable(StorageKind::Document),
        StorageKind::Document,
        Capabilities::full(),
        FallbackPolicy::SingleStep,
    );
    assert!(!h.controller.connect().await.is_connected());

    h.embedded.set_reachable(true);
    let state = h.controller.switch_to(StorageKind::Embedded).await;

    assert_eq!(state, ConnectionState::Connected(StorageKind::Embedded));
    assert_eq!(h.embedded.checks(), 2);
    assert_eq!(h.document.checks(), 1);
}

#[tokio::test]
async fn test_retry_after_backend_recovers() {
    let h = Harness::new(
        ScriptedStorage::unreachable(StorageKind::Memory),
        ScriptedStorage::unreachable(StorageKind::Embedded),
        ScriptedStorage::healthy(StorageKind::Document),
        StorageKind::Embedded,
        Capabilities::full(),
        FallbackPolicy::Cascade,
    );
    assert!(matches!(h.controller.connect().await, ConnectionState::Failed(_)));

    h.embedded.set_reachable(true);
    let state = h.controller.recover(Recovery::Retry).await;

    assert_eq!(state, ConnectionState::Connected(StorageKind::Embedded));
    assert_eq!(h.memory.checks(), 1);
}
