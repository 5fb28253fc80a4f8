//! In-memory storage provider
//!
//! Zero-dependency last resort of the fallback chain. Everything lives in
//! the process and is gone on exit.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::adapters::seed::sample_transactions;
use crate::domain::result::{Error, Result};
use crate::domain::summary::sort_newest_first;
use crate::domain::{
    Category, NewTransaction, RecordId, Transaction, TransactionKind, TransactionUpdate,
    DEFAULT_CATEGORY_NAMES,
};
use crate::ports::{BackendFailure, StorageKind, StorageProvider};

#[derive(Debug, Default)]
struct MemoryState {
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    samples_seeded: bool,
}

impl MemoryState {
    /// One generator for both collections: max id seen anywhere, plus one
    fn next_id(&self) -> i64 {
        let categories = self.categories.iter().filter_map(|c| c.id.as_int());
        let transactions = self.transactions.iter().filter_map(|t| t.id.as_int());
        categories.chain(transactions).max().unwrap_or(0) + 1
    }

    fn category_index(&self, id: &RecordId) -> Option<usize> {
        self.categories.iter().position(|c| &c.id == id || matches_int(&c.id, id))
    }

    fn transaction_index(&self, id: &RecordId) -> Option<usize> {
        self.transactions.iter().position(|t| &t.id == id || matches_int(&t.id, id))
    }

    fn newest_first(&self, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut selected: Vec<Transaction> =
            self.transactions.iter().filter(|t| keep(t)).cloned().collect();
        sort_newest_first(&mut selected);
        selected
    }
}

/// Ids given as text ("5") still find integer-keyed records
fn matches_int(stored: &RecordId, wanted: &RecordId) -> bool {
    match (stored.as_int(), wanted.as_int()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the given records instead of an empty store
    pub fn with_records(categories: Vec<Category>, transactions: Vec<Transaction>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                categories,
                transactions,
                samples_seeded: false,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    async fn check_connection(&self) -> std::result::Result<(), BackendFailure> {
        Ok(())
    }

    async fn prepare(&self) -> std::result::Result<(), BackendFailure> {
        let mut state = self
            .lock()
            .map_err(|e| BackendFailure::schema(StorageKind::Memory, e.to_string()))?;

        if state.categories.is_empty() {
            for name in DEFAULT_CATEGORY_NAMES {
                let id = state.next_id();
                state.categories.push(Category::new(id, name));
            }
            tracing::info!(count = DEFAULT_CATEGORY_NAMES.len(), "seeded default categories");
        }

        if state.transactions.is_empty() && !state.samples_seeded {
            let now = Utc::now();
            for sample in sample_transactions(&state.categories) {
                let id = state.next_id();
                state.transactions.push(Transaction::from_new(RecordId::Int(id), &sample, now));
            }
            tracing::info!(count = state.transactions.len(), "seeded sample transactions");
        }
        state.samples_seeded = true;

        Ok(())
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        Ok(self.lock()?.categories.clone())
    }

    async fn get_category_by_id(&self, id: &RecordId) -> Result<Option<Category>> {
        let state = self.lock()?;
        Ok(state.category_index(id).map(|i| state.categories[i].clone()))
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut state = self.lock()?;
        let category = Category::new(state.next_id(), name);
        state.categories.push(category.clone());
        tracing::debug!(id = %category.id, "created category");
        Ok(category)
    }

    async fn update_category(&self, id: &RecordId, name: &str) -> Result<bool> {
        let mut state = self.lock()?;
        match state.category_index(id) {
            Some(i) => {
                state.categories[i].name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: &RecordId) -> Result<bool> {
        let mut state = self.lock()?;
        match state.category_index(id) {
            Some(i) => {
                state.categories.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock()?.newest_first(|_| true))
    }

    async fn get_transaction_by_id(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let state = self.lock()?;
        Ok(state.transaction_index(id).map(|i| state.transactions[i].clone()))
    }

    async fn get_transactions_by_type(&self, kind: TransactionKind) -> Result<Vec<Transaction>> {
        Ok(self.lock()?.newest_first(|t| t.kind == kind))
    }

    async fn get_transactions_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        Ok(self.lock()?.newest_first(|t| t.date >= start && t.date <= end))
    }

    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let mut state = self.lock()?;
        let tx = Transaction::from_new(RecordId::Int(state.next_id()), new, Utc::now());
        state.transactions.push(tx.clone());
        tracing::debug!(id = %tx.id, kind = %tx.kind, "created transaction");
        Ok(tx)
    }

    async fn update_transaction(&self, id: &RecordId, update: &TransactionUpdate) -> Result<bool> {
        let mut state = self.lock()?;
        match state.transaction_index(id) {
            Some(i) => {
                update.apply_to(&mut state.transactions[i], Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_transaction(&self, id: &RecordId) -> Result<bool> {
        let mut state = self.lock()?;
        match state.transaction_index(id) {
            Some(i) => {
                state.transactions.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
