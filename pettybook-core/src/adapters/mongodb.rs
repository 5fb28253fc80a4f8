//! MongoDB storage provider (document database)
//!
//! Records keep their native ObjectId; it is handed out as the hex string in
//! `RecordId::Key`. Dates, amounts and timestamps are stored as strings, so
//! ISO dates compare correctly in `$gte`/`$lte` range filters.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Category, NewTransaction, RecordId, Transaction, TransactionKind, TransactionUpdate,
    DEFAULT_CATEGORY_NAMES,
};
use crate::ports::{BackendFailure, StorageKind, StorageProvider};

const CATEGORIES: &str = "categories";
const TRANSACTIONS: &str = "transactions";

/// Connection settings for [`MongoStorage`]
#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    /// Used for both connect and server selection
    pub timeout: Duration,
    /// False where no outbound sockets can be opened
    pub outbound_network: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<Bson>,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<Bson>,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: Decimal,
    date: NaiveDate,
    category_id: RecordId,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ref_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cheque_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voucher_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionDoc {
    fn from_new(new: &NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            kind: new.kind,
            amount: new.amount,
            date: new.date,
            category_id: new.category_id.clone(),
            description: new.description.clone(),
            ref_number: new.ref_number.clone(),
            cheque_number: new.cheque_number.clone(),
            voucher_number: new.voucher_number.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn into_transaction(self) -> Result<Transaction> {
        let id = self
            .id
            .as_ref()
            .and_then(record_id_from_bson)
            .ok_or_else(|| Error::database("transaction document without usable _id"))?;
        Ok(Transaction {
            id,
            kind: self.kind,
            amount: self.amount,
            date: self.date,
            category_id: self.category_id,
            description: self.description,
            ref_number: self.ref_number,
            cheque_number: self.cheque_number,
            voucher_number: self.voucher_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// External id for a stored `_id`
fn record_id_from_bson(value: &Bson) -> Option<RecordId> {
    match value {
        Bson::ObjectId(oid) => Some(RecordId::Key(oid.to_hex())),
        Bson::String(s) => Some(RecordId::Key(s.clone())),
        Bson::Int32(n) => Some(RecordId::Int(i64::from(*n))),
        Bson::Int64(n) => Some(RecordId::Int(*n)),
        _ => None,
    }
}

/// `_id` predicate for either id form
///
/// A 24-digit hex key is an ObjectId, any other key is matched as a string
/// and an integer is matched as an integer.
pub fn id_filter(id: &RecordId) -> Document {
    match id {
        RecordId::Int(n) => doc! { "_id": *n },
        RecordId::Key(key) => match ObjectId::parse_str(key) {
            Ok(oid) => doc! { "_id": oid },
            Err(_) => doc! { "_id": key.as_str() },
        },
    }
}

/// Sort every listing newest date first; `_id` keeps insertion order within a day
fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "date": -1, "_id": 1 }).build()
}

/// Sort the driver's errors into "could not reach the server" and the rest
fn classify(err: mongodb::error::Error) -> Error {
    match *err.kind {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => Error::unavailable(err.to_string()),
        _ => Error::database(err.to_string()),
    }
}

fn bson_error(err: impl std::fmt::Display) -> Error {
    Error::database(format!("BSON conversion failed: {}", err))
}

/// MongoDB-backed storage
pub struct MongoStorage {
    settings: MongoSettings,
    client: OnceCell<Client>,
}

impl MongoStorage {
    pub fn new(settings: MongoSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    fn capability_failure(&self) -> BackendFailure {
        BackendFailure::capability(
            StorageKind::Document,
            "this environment has no outbound network access; a document database cannot be reached from here",
        )
    }

    /// Cached client, built on first use
    ///
    /// Building it does not touch the network; the first real operation does.
    async fn database(&self) -> Result<Database> {
        if !self.settings.outbound_network {
            return Err(Error::unavailable(self.capability_failure().message));
        }

        let client = self
            .client
            .get_or_try_init(|| async {
                let mut options = ClientOptions::parse(&self.settings.uri).await.map_err(classify)?;
                options.app_name = Some("pettybook".to_string());
                options.connect_timeout = Some(self.settings.timeout);
                options.server_selection_timeout = Some(self.settings.timeout);
                Client::with_options(options).map_err(classify)
            })
            .await?;

        Ok(client.database(&self.settings.database))
    }

    async fn categories(&self) -> Result<Collection<CategoryDoc>> {
        Ok(self.database().await?.collection(CATEGORIES))
    }

    async fn transactions(&self) -> Result<Collection<TransactionDoc>> {
        Ok(self.database().await?.collection(TRANSACTIONS))
    }

    /// Swap an unreachable server for the empty answer
    fn recover<T: Default>(&self, operation: &str, result: Result<T>) -> Result<T> {
        match result {
            Err(Error::Unavailable(msg)) => {
                tracing::warn!(operation, error = %msg, "document store unreachable, returning empty result");
                Ok(T::default())
            }
            other => other,
        }
    }

    async fn find_transactions(&self, filter: Document) -> Result<Vec<Transaction>> {
        let mut cursor = self
            .transactions()
            .await?
            .find(filter, newest_first())
            .await
            .map_err(classify)?;

        let mut found = Vec::new();
        while cursor.advance().await.map_err(classify)? {
            let doc = cursor.deserialize_current().map_err(classify)?;
            found.push(doc.into_transaction()?);
        }
        Ok(found)
    }

    async fn ensure_schema(&self) -> Result<usize> {
        let db = self.database().await?;
        db.run_command(doc! { "ping": 1 }, None).await.map_err(classify)?;
        tracing::info!(database = %self.settings.database, "connected to document store");

        let categories = self.categories().await?;
        let transactions = self.transactions().await?;
        let index = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };
        categories
            .create_index(index(doc! { "name": 1 }, "name"), None)
            .await
            .map_err(classify)?;
        transactions
            .create_indexes(
                [index(doc! { "type": 1 }, "type"), index(doc! { "date": 1 }, "date")],
                None,
            )
            .await
            .map_err(classify)?;

        if categories.count_documents(doc! {}, None).await.map_err(classify)? > 0 {
            return Ok(0);
        }
        let defaults = DEFAULT_CATEGORY_NAMES.iter().map(|name| CategoryDoc {
            id: None,
            name: name.to_string(),
        });
        categories.insert_many(defaults, None).await.map_err(classify)?;
        Ok(DEFAULT_CATEGORY_NAMES.len())
    }
}

#[async_trait]
impl StorageProvider for MongoStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Document
    }

    async fn check_connection(&self) -> std::result::Result<(), BackendFailure> {
        if !self.settings.outbound_network {
            return Err(self.capability_failure());
        }
        let db = self
            .database()
            .await
            .map_err(|e| BackendFailure::unreachable(StorageKind::Document, e.to_string()))?;
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| BackendFailure::unreachable(StorageKind::Document, e.to_string()))
    }

    async fn prepare(&self) -> std::result::Result<(), BackendFailure> {
        if !self.settings.outbound_network {
            return Err(self.capability_failure());
        }
        match self.ensure_schema().await {
            Ok(seeded) => {
                tracing::info!(seeded_categories = seeded, "document store ready");
                Ok(())
            }
            Err(Error::Unavailable(msg)) => {
                Err(BackendFailure::unreachable(StorageKind::Document, msg))
            }
            Err(e) => Err(BackendFailure::schema(StorageKind::Document, e.to_string())),
        }
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let result = async {
            let mut cursor = self
                .categories()
                .await?
                .find(doc! {}, FindOptions::builder().sort(doc! { "_id": 1 }).build())
                .await
                .map_err(classify)?;
            let mut found = Vec::new();
            while cursor.advance().await.map_err(classify)? {
                let doc = cursor.deserialize_current().map_err(classify)?;
                if let Some(id) = doc.id.as_ref().and_then(record_id_from_bson) {
                    found.push(Category { id, name: doc.name });
                }
            }
            Ok::<_, Error>(found)
        }
        .await;
        self.recover("get_all_categories", result)
    }

    async fn get_category_by_id(&self, id: &RecordId) -> Result<Option<Category>> {
        let result = async {
            let found = self
                .categories()
                .await?
                .find_one(id_filter(id), None)
                .await
                .map_err(classify)?;
            Ok::<_, Error>(found.map(|doc| Category::new(id.clone(), doc.name)))
        }
        .await;
        self.recover("get_category_by_id", result)
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let inserted = self
            .categories()
            .await?
            .insert_one(CategoryDoc { id: None, name: name.to_string() }, None)
            .await
            .map_err(classify)?;
        let id = record_id_from_bson(&inserted.inserted_id)
            .ok_or_else(|| Error::database("insert returned an unusable _id"))?;
        tracing::debug!(%id, "created category");
        Ok(Category::new(id, name))
    }

    async fn update_category(&self, id: &RecordId, name: &str) -> Result<bool> {
        let result = async {
            let updated = self
                .categories()
                .await?
                .update_one(id_filter(id), doc! { "$set": { "name": name } }, None)
                .await
                .map_err(classify)?;
            Ok::<_, Error>(updated.matched_count > 0)
        }
        .await;
        self.recover("update_category", result)
    }

    async fn delete_category(&self, id: &RecordId) -> Result<bool> {
        let result = async {
            let deleted = self
                .categories()
                .await?
                .delete_one(id_filter(id), None)
                .await
                .map_err(classify)?;
            Ok::<_, Error>(deleted.deleted_count > 0)
        }
        .await;
        self.recover("delete_category", result)
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>> {
        let result = self.find_transactions(doc! {}).await;
        self.recover("get_all_transactions", result)
    }

    async fn get_transaction_by_id(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let result = async {
            let found = self
                .transactions()
                .await?
                .find_one(id_filter(id), None)
                .await
                .map_err(classify)?;
            found.map(TransactionDoc::into_transaction).transpose()
        }
        .await;
        self.recover("get_transaction_by_id", result)
    }

    async fn get_transactions_by_type(&self, kind: TransactionKind) -> Result<Vec<Transaction>> {
        let result = self.find_transactions(doc! { "type": kind.as_str() }).await;
        self.recover("get_transactions_by_type", result)
    }

    async fn get_transactions_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        if start > end {
            return Ok(Vec::new());
        }
        let filter = doc! {
            "date": { "$gte": start.to_string(), "$lte": end.to_string() }
        };
        let result = self.find_transactions(filter).await;
        self.recover("get_transactions_by_date_range", result)
    }

    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let now = Utc::now();
        let inserted = self
            .transactions()
            .await?
            .insert_one(TransactionDoc::from_new(new, now), None)
            .await
            .map_err(classify)?;
        let id = record_id_from_bson(&inserted.inserted_id)
            .ok_or_else(|| Error::database("insert returned an unusable _id"))?;
        tracing::debug!(%id, kind = %new.kind, "created transaction");
        Ok(Transaction::from_new(id, new, now))
    }

    async fn update_transaction(&self, id: &RecordId, update: &TransactionUpdate) -> Result<bool> {
        let result = async {
            let mut set = bson::to_document(update).map_err(bson_error)?;
            set.insert("updatedAt", Utc::now().to_rfc3339());
            let updated = self
                .transactions()
                .await?
                .update_one(id_filter(id), doc! { "$set": set }, None)
                .await
                .map_err(classify)?;
            Ok::<_, Error>(updated.matched_count > 0)
        }
        .await;
        self.recover("update_transaction", result)
    }

    async fn delete_transaction(&self, id: &RecordId) -> Result<bool> {
        let result = async {
            let deleted = self
                .transactions()
                .await?
                .delete_one(id_filter(id), None)
                .await
                .map_err(classify)?;
            Ok::<_, Error>(deleted.deleted_count > 0)
        }
        .await;
        self.recover("delete_transaction", result)
    }
}
