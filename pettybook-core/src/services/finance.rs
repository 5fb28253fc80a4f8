//! Finance service - the application's view of its data
//!
//! Holds local copies of both collections plus the derived summary. Every
//! mutation is written to the active backend first; local state only
//! changes once the backend has answered.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::result::{Error, Result};
use crate::domain::summary::sort_newest_first;
use crate::domain::{
    calculate_summary, recent_transactions, Category, FinanceSummary, NewTransaction, RecordId,
    Transaction, TransactionKind, TransactionUpdate,
};
use crate::ports::StorageProvider;
use crate::services::StorageSelector;

/// Number of entries shown as "recent" by default
pub const RECENT_COUNT: usize = 5;

pub struct FinanceService {
    selector: Arc<StorageSelector>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    summary: FinanceSummary,
}

impl FinanceService {
    pub fn new(selector: Arc<StorageSelector>) -> Self {
        Self {
            selector,
            categories: Vec::new(),
            transactions: Vec::new(),
            summary: FinanceSummary::default(),
        }
    }

    fn provider(&self) -> Arc<dyn StorageProvider> {
        self.selector.provider()
    }

    fn refresh_summary(&mut self) {
        self.summary = calculate_summary(&self.transactions);
    }

    /// Re-read both collections from the active backend
    pub async fn load(&mut self) -> Result<()> {
        let provider = self.provider();
        self.categories = provider.get_all_categories().await?;
        self.transactions = provider.get_all_transactions().await?;
        sort_newest_first(&mut self.transactions);
        self.refresh_summary();
        tracing::debug!(
            backend = %provider.kind(),
            categories = self.categories.len(),
            transactions = self.transactions.len(),
            "finance data loaded"
        );
        Ok(())
    }

    // === Reads ===

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All transactions, newest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn summary(&self) -> FinanceSummary {
        self.summary
    }

    pub fn recent_transactions(&self, count: usize) -> Vec<Transaction> {
        recent_transactions(&self.transactions, count)
    }

    pub fn transactions_by_type(&self, kind: TransactionKind) -> Vec<Transaction> {
        self.transactions.iter().filter(|t| t.kind == kind).cloned().collect()
    }

    /// Both bounds inclusive
    pub fn transactions_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect()
    }

    pub fn category(&self, id: &RecordId) -> Option<&Category> {
        self.categories.iter().find(|c| same_id(&c.id, id))
    }

    /// Display name for a category id, "Unknown" when it no longer exists
    pub fn category_name(&self, id: &RecordId) -> &str {
        self.category(id).map(|c| c.name.as_str()).unwrap_or("Unknown")
    }

    /// Whether any transaction is filed under this category
    pub fn category_in_use(&self, id: &RecordId) -> bool {
        self.transactions.iter().any(|t| same_id(&t.category_id, id))
    }

    // === Transactions ===

    pub async fn add_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        new.validate()?;
        let created = self.provider().create_transaction(&new).await?;
        self.transactions.push(created.clone());
        sort_newest_first(&mut self.transactions);
        self.refresh_summary();
        Ok(created)
    }

    /// Apply a partial update; `false` if the backend has no such transaction
    ///
    /// The merged record must still satisfy the create rules, otherwise
    /// `Error::Validation` is returned and the backend is not written.
    pub async fn update_transaction(
        &mut self,
        id: &RecordId,
        update: &TransactionUpdate,
    ) -> Result<bool> {
        let provider = self.provider();
        let Some(mut merged) = provider.get_transaction_by_id(id).await? else {
            return Ok(false);
        };
        update.apply_to(&mut merged, chrono::Utc::now());
        merged.validate()?;

        if !provider.update_transaction(id, update).await? {
            return Ok(false);
        }

        // Take the stored record so local state matches the backend exactly
        let stored = provider.get_transaction_by_id(id).await?.unwrap_or(merged);
        self.transactions.retain(|t| !same_id(&t.id, id));
        self.transactions.push(stored);
        sort_newest_first(&mut self.transactions);
        self.refresh_summary();
        Ok(true)
    }

    /// Cached transaction with this id
    pub fn transaction(&self, id: &RecordId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| same_id(&t.id, id))
    }

    /// Number of transactions filed under a category
    pub fn category_usage(&self, id: &RecordId) -> usize {
        self.transactions.iter().filter(|t| same_id(&t.category_id, id)).count()
    }

    pub async fn delete_transaction(&mut self, id: &RecordId) -> Result<bool> {
        let deleted = self.provider().delete_transaction(id).await?;
        if deleted {
            self.transactions.retain(|t| !same_id(&t.id, id));
            self.refresh_summary();
        }
        Ok(deleted)
    }

    // === Categories ===

    pub async fn add_category(&mut self, name: &str) -> Result<Category> {
        let name = validated_name(name)?;
        let created = self.provider().create_category(name).await?;
        self.categories.push(created.clone());
        Ok(created)
    }

    pub async fn update_category(&mut self, id: &RecordId, name: &str) -> Result<bool> {
        let name = validated_name(name)?;
        let updated = self.provider().update_category(id, name).await?;
        if updated {
            if let Some(local) = self.categories.iter_mut().find(|c| same_id(&c.id, id)) {
                local.name = name.to_string();
            }
        }
        Ok(updated)
    }

    /// Delete a category nothing refers to
    ///
    /// A category still used by a transaction is refused with
    /// `Error::CategoryInUse` and the backend is left untouched.
    pub async fn delete_category(&mut self, id: &RecordId) -> Result<bool> {
        if self.category_in_use(id) {
            tracing::info!(%id, "refusing to delete category in use");
            return Err(Error::CategoryInUse(id.clone()));
        }
        let deleted = self.provider().delete_category(id).await?;
        if deleted {
            self.categories.retain(|c| !same_id(&c.id, id));
        }
        Ok(deleted)
    }
}

fn validated_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Category name is required"));
    }
    Ok(trimmed)
}

/// Ids typed as text still match integer ids
fn same_id(a: &RecordId, b: &RecordId) -> bool {
    a == b || matches!((a.as_int(), b.as_int()), (Some(x), Some(y)) if x == y)
}
