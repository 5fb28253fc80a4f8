//! The storage contract, run against every backend
//!
//! The in-memory and DuckDB stores are always tested. MongoDB is tested when
//! PETTYBOOK_TEST_MONGODB_URI points at a server.
//!
//! Run with: cargo test --test storage_contract_test -- --nocapture

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use pettybook_core::adapters::duckdb::DuckDbStorage;
use pettybook_core::adapters::memory::MemoryStorage;
use pettybook_core::adapters::mongodb::{MongoSettings, MongoStorage};
use pettybook_core::{NewTransaction, RecordId, StorageProvider, TransactionKind, TransactionUpdate};

// ============================================================================
// Test Helpers
// ============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An id no backend will have handed out
fn missing_id() -> RecordId {
    RecordId::from("000000000000000000000000")
}

fn deposit(amount: i64, on: NaiveDate, category: RecordId, reference: &str) -> NewTransaction {
    NewTransaction::new(TransactionKind::Deposit, Decimal::new(amount, 2), on, category, "Client invoice")
        .with_reference(reference)
}

async fn any_category(storage: &dyn StorageProvider) -> RecordId {
    storage.create_category("Contract Test").await.unwrap().id
}

// ============================================================================
// Contract checks
// ============================================================================

async fn created_category_can_be_read_back(storage: &dyn StorageProvider) {
    let created = storage.create_category("Travel Claims").await.unwrap();
    let found = storage.get_category_by_id(&created.id).await.unwrap();

    assert_eq!(found.map(|c| c.name), Some("Travel Claims".to_string()));
    assert!(storage.get_all_categories().await.unwrap().contains(&created));
}

async fn category_rename_and_delete(storage: &dyn StorageProvider) {
    let created = storage.create_category("Utilitys").await.unwrap();

    assert!(storage.update_category(&created.id, "Utilities").await.unwrap());
    let renamed = storage.get_category_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Utilities");

    assert!(storage.delete_category(&created.id).await.unwrap());
    assert!(!storage.delete_category(&created.id).await.unwrap());
    assert!(storage.get_category_by_id(&created.id).await.unwrap().is_none());
}

async fn not_found_is_not_an_error(storage: &dyn StorageProvider) {
    let missing = missing_id();

    assert!(!storage.delete_category(&missing).await.unwrap());
    assert!(!storage.update_category(&missing, "Nothing").await.unwrap());
    assert!(storage.get_category_by_id(&missing).await.unwrap().is_none());
    assert!(!storage.delete_transaction(&missing).await.unwrap());
    assert!(!storage
        .update_transaction(&missing, &TransactionUpdate::amount(Decimal::ONE))
        .await
        .unwrap());
    assert!(storage.get_transaction_by_id(&missing).await.unwrap().is_none());
}

async fn update_changes_only_amount_and_timestamp(storage: &dyn StorageProvider) {
    let category = any_category(storage).await;
    let created = storage
        .create_transaction(&deposit(12345, date(2019, 6, 15), category, "DEP-UPD"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let update = TransactionUpdate::amount(Decimal::new(750, 0));
    assert!(storage.update_transaction(&created.id, &update).await.unwrap());

    let after = storage.get_transaction_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(after.amount, Decimal::new(750, 0));
    assert!(after.updated_at > created.updated_at);

    assert_eq!(after.id, created.id);
    assert_eq!(after.kind, created.kind);
    assert_eq!(after.date, created.date);
    assert_eq!(after.category_id, created.category_id);
    assert_eq!(after.description, created.description);
    assert_eq!(after.ref_number, created.ref_number);
    assert_eq!(after.cheque_number, created.cheque_number);
    assert_eq!(after.voucher_number, created.voucher_number);
    assert_eq!(after.created_at, created.created_at);
}

async fn date_range_is_inclusive_and_newest_first(storage: &dyn StorageProvider) {
    let category = any_category(storage).await;
    let mut ids = Vec::new();
    for (i, day) in [date(2018, 12, 31), date(2019, 1, 1), date(2019, 1, 31), date(2019, 2, 1)]
        .into_iter()
        .enumerate()
    {
        let tx = storage
            .create_transaction(&deposit(1000, day, category.clone(), &format!("DEP-R{}", i)))
            .await
            .unwrap();
        ids.push(tx.id);
    }

    let found: Vec<RecordId> = storage
        .get_transactions_by_date_range(date(2019, 1, 1), date(2019, 1, 31))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .filter(|id| ids.contains(id))
        .collect();

    assert_eq!(found, vec![ids[2].clone(), ids[1].clone()]);

    let inverted = storage
        .get_transactions_by_date_range(date(2019, 1, 31), date(2019, 1, 1))
        .await
        .unwrap();
    assert!(inverted.is_empty());
}

async fn listings_filter_by_type(storage: &dyn StorageProvider) {
    let category = any_category(storage).await;
    let voucher = NewTransaction::new(
        TransactionKind::PettyCash,
        Decimal::new(4550, 2),
        date(2019, 3, 3),
        category,
        "Courier",
    )
    .with_reference("PET-T1");
    let created = storage.create_transaction(&voucher).await.unwrap();
    assert_eq!(created.voucher_number.as_deref(), Some("PET-T1"));

    let petty = storage.get_transactions_by_type(TransactionKind::PettyCash).await.unwrap();
    assert!(petty.iter().any(|t| t.id == created.id));
    assert!(petty.iter().all(|t| t.kind == TransactionKind::PettyCash));

    let all = storage.get_all_transactions().await.unwrap();
    assert!(all.windows(2).all(|w| w[0].date >= w[1].date));

    assert!(storage.delete_transaction(&created.id).await.unwrap());
    assert!(!storage.delete_transaction(&created.id).await.unwrap());
}

async fn run_contract(storage: &dyn StorageProvider) {
    assert!(storage.test_connection().await);
    assert!(storage.initialize_database().await);
    // Setup is repeatable
    assert!(storage.initialize_database().await);

    created_category_can_be_read_back(storage).await;
    category_rename_and_delete(storage).await;
    not_found_is_not_an_error(storage).await;
    update_changes_only_amount_and_timestamp(storage).await;
    date_range_is_inclusive_and_newest_first(storage).await;
    listings_filter_by_type(storage).await;
}

// ============================================================================
// Backends
// ============================================================================

#[tokio::test]
async fn test_memory_contract() {
    run_contract(&MemoryStorage::new()).await;
}

#[tokio::test]
async fn test_duckdb_contract() {
    let temp_dir = TempDir::new().unwrap();
    let storage = DuckDbStorage::new(&temp_dir.path().join("contract.duckdb"));
    run_contract(&storage).await;
}

#[tokio::test]
async fn test_mongodb_contract() {
    let Ok(uri) = std::env::var("PETTYBOOK_TEST_MONGODB_URI") else {
        println!("PETTYBOOK_TEST_MONGODB_URI not set, skipping");
        return;
    };
    let storage = MongoStorage::new(MongoSettings {
        uri,
        database: format!("pettybook_test_{}", std::process::id()),
        timeout: Duration::from_secs(2),
        outbound_network: true,
    });
    run_contract(&storage).await;
}

// ============================================================================
// DuckDB persistence
// ============================================================================

#[tokio::test]
async fn test_duckdb_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("persist.duckdb");

    let created = {
        let storage = DuckDbStorage::new(&db_path);
        assert!(storage.initialize_database().await);
        let category = any_category(&storage).await;
        storage
            .create_transaction(&deposit(50000, date(2024, 1, 15), category, "DEP001"))
            .await
            .unwrap()
    };

    let reopened = DuckDbStorage::new(&db_path);
    assert!(reopened.initialize_database().await);

    let found = reopened.get_transaction_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(found, created);
    // Defaults are only seeded into an empty table
    assert_eq!(reopened.get_all_categories().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_duckdb_ids_given_as_text_resolve() {
    let storage = DuckDbStorage::in_memory();
    assert!(storage.initialize_database().await);

    let created = storage.create_category("Fuel").await.unwrap();
    let as_text = RecordId::from(created.id.to_string());

    assert_eq!(storage.get_category_by_id(&as_text).await.unwrap(), Some(created));
}
