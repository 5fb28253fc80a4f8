//! Shared test helpers
//!
//! `ScriptedStorage` behaves like the in-memory store but can be told to
//! fail its connection check or its setup, and counts the calls it gets.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use pettybook_core::adapters::memory::MemoryStorage;
use pettybook_core::domain::result::Result;
use pettybook_core::services::StorageProviders;
use pettybook_core::{
    BackendFailure, Category, NewTransaction, RecordId, StorageKind, StorageProvider, Transaction,
    TransactionKind, TransactionUpdate,
};

pub struct ScriptedStorage {
    kind: StorageKind,
    inner: MemoryStorage,
    reachable: AtomicBool,
    schema_ok: AtomicBool,
    checks: AtomicUsize,
    prepares: AtomicUsize,
    category_deletes: AtomicUsize,
    transaction_updates: AtomicUsize,
}

impl ScriptedStorage {
    fn build(kind: StorageKind, reachable: bool, schema_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            inner: MemoryStorage::new(),
            reachable: AtomicBool::new(reachable),
            schema_ok: AtomicBool::new(schema_ok),
            checks: AtomicUsize::new(0),
            prepares: AtomicUsize::new(0),
            category_deletes: AtomicUsize::new(0),
            transaction_updates: AtomicUsize::new(0),
        })
    }

    pub fn healthy(kind: StorageKind) -> Arc<Self> {
        Self::build(kind, true, true)
    }

    pub fn unreachable(kind: StorageKind) -> Arc<Self> {
        Self::build(kind, false, true)
    }

    pub fn broken_schema(kind: StorageKind) -> Arc<Self> {
        Self::build(kind, true, false)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn category_deletes(&self) -> usize {
        self.category_deletes.load(Ordering::SeqCst)
    }

    pub fn transaction_updates(&self) -> usize {
        self.transaction_updates.load(Ordering::SeqCst)
    }
}

/// Providers keyed the usual way, from three scripted stores
pub fn providers(
    memory: &Arc<ScriptedStorage>,
    embedded: &Arc<ScriptedStorage>,
    document: &Arc<ScriptedStorage>,
) -> StorageProviders {
    StorageProviders {
        memory: memory.clone(),
        embedded: embedded.clone(),
        document: document.clone(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[async_trait]
impl StorageProvider for ScriptedStorage {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    async fn check_connection(&self) -> std::result::Result<(), BackendFailure> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendFailure::unreachable(self.kind, "connection refused"))
        }
    }

    async fn prepare(&self) -> std::result::Result<(), BackendFailure> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        if !self.schema_ok.load(Ordering::SeqCst) {
            return Err(BackendFailure::schema(self.kind, "could not create indexes"));
        }
        self.inner.prepare().await
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.inner.get_all_categories().await
    }

    async fn get_category_by_id(&self, id: &RecordId) -> Result<Option<Category>> {
        self.inner.get_category_by_id(id).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        self.inner.create_category(name).await
    }

    async fn update_category(&self, id: &RecordId, name: &str) -> Result<bool> {
        self.inner.update_category(id, name).await
    }

    async fn delete_category(&self, id: &RecordId) -> Result<bool> {
        self.category_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_category(id).await
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>> {
        self.inner.get_all_transactions().await
    }

    async fn get_transaction_by_id(&self, id: &RecordId) -> Result<Option<Transaction>> {
        self.inner.get_transaction_by_id(id).await
    }

    async fn get_transactions_by_type(&self, kind: TransactionKind) -> Result<Vec<Transaction>> {
        self.inner.get_transactions_by_type(kind).await
    }

    async fn get_transactions_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        self.inner.get_transactions_by_date_range(start, end).await
    }

    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        self.inner.create_transaction(new).await
    }

    async fn update_transaction(&self, id: &RecordId, update: &TransactionUpdate) -> Result<bool> {
        self.transaction_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_transaction(id, update).await
    }

    async fn delete_transaction(&self, id: &RecordId) -> Result<bool> {
        self.inner.delete_transaction(id).await
    }
}
