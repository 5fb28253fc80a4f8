//! DuckDB storage provider (embedded, persistent)

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, Connection, ToSql};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Category, NewTransaction, RecordId, Transaction, TransactionKind, TransactionUpdate,
    DEFAULT_CATEGORY_NAMES,
};
use crate::ports::{BackendFailure, StorageKind, StorageProvider};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TRANSACTION_COLUMNS: &str = "id, type, amount::VARCHAR, date::VARCHAR, category_id, description,
     ref_number, cheque_number, voucher_number, created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    InMemory,
}

type SharedConnection = Arc<Mutex<Option<Connection>>>;

fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Option<Connection>>> {
    conn.lock()
        .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
}

/// Run blocking DuckDB work off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::database(format!("DuckDB task failed: {}", e)))?
}

/// DuckDB-backed storage
///
/// The connection is opened on first use and kept for the life of the
/// provider. All DuckDB calls run on the blocking thread pool. Every
/// operation holds the mutex for its whole duration, which serializes writers
/// inside this process. A second process writing the same file is not guarded
/// against: `update_transaction` reads, merges and writes back, and that
/// sequence is only atomic within one process.
pub struct DuckDbStorage {
    conn: SharedConnection,
    location: Location,
}

impl DuckDbStorage {
    /// Storage backed by the database file at `db_path`
    pub fn new(db_path: &Path) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            location: Location::File(db_path.to_path_buf()),
        }
    }

    /// Storage backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            location: Location::InMemory,
        }
    }

    /// Open the database, retrying with exponential backoff while the file is locked
    ///
    /// The backoff sleeps on the tokio timer, so other tasks keep running.
    async fn open_with_retry(&self) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            let conn = Arc::clone(&self.conn);
            let location = self.location.clone();
            let opened = blocking(move || {
                let mut guard = lock(&conn)?;
                if guard.is_none() {
                    match Self::try_open_connection(&location) {
                        Ok(opened) => *guard = Some(opened),
                        Err(e) => return Ok(Err(e.to_string())),
                    }
                }
                Ok(Ok(()))
            })
            .await?;

            match opened {
                Ok(()) => return Ok(()),
                Err(err_msg) => {
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(err_msg);
                        continue;
                    }
                    return Err(Error::unavailable(err_msg));
                }
            }
        }

        Err(Error::unavailable(last_error.unwrap_or_else(|| {
            format!("Failed to open database after {} retries", MAX_RETRIES)
        })))
    }

    fn try_open_connection(location: &Location) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        match location {
            Location::File(path) => Connection::open_with_flags(path, config),
            Location::InMemory => Connection::open_in_memory_with_flags(config),
        }
    }

    /// Run `f` against the cached connection on the blocking pool, opening it first if needed
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.open_with_retry().await?;
        let conn = Arc::clone(&self.conn);
        blocking(move || {
            let mut guard = lock(&conn)?;
            match guard.as_mut() {
                Some(conn) => f(conn),
                None => Err(Error::unavailable("database connection not open")),
            }
        })
        .await
    }

    fn seed_default_categories(conn: &Connection) -> Result<usize> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(0);
        }
        for name in DEFAULT_CATEGORY_NAMES {
            conn.execute("INSERT INTO categories (name) VALUES (?)", params![name])?;
        }
        Ok(DEFAULT_CATEGORY_NAMES.len())
    }

    fn query_transactions(
        conn: &Connection,
        filter: &str,
        args: &[&dyn ToSql],
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date DESC, id ASC",
            TRANSACTION_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(args, TransactionRow::from_row)?;

        let transactions = rows
            .map(|row| row.map_err(Error::from).and_then(TransactionRow::into_transaction))
            .collect::<Result<Vec<_>>>()?;
        Ok(transactions)
    }

    fn find_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
        let mut found = Self::query_transactions(conn, "WHERE id = ?", params![id])?;
        Ok(found.pop())
    }
}

/// Raw column values of one transactions row
struct TransactionRow {
    id: i64,
    kind: String,
    amount: String,
    date: String,
    category_id: String,
    description: String,
    ref_number: Option<String>,
    cheque_number: Option<String>,
    voucher_number: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TransactionRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            amount: row.get(2)?,
            date: row.get(3)?,
            category_id: row.get(4)?,
            description: row.get(5)?,
            ref_number: row.get(6)?,
            cheque_number: row.get(7)?,
            voucher_number: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction> {
        let malformed = |what: &str, value: &str| {
            Error::database(format!("transaction {}: malformed {} '{}'", self.id, what, value))
        };

        Ok(Transaction {
            id: RecordId::Int(self.id),
            kind: self.kind.parse().map_err(|_| malformed("type", &self.kind))?,
            amount: self.amount.parse::<Decimal>().map_err(|_| malformed("amount", &self.amount))?,
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .map_err(|_| malformed("date", &self.date))?,
            category_id: self
                .category_id
                .parse()
                .unwrap_or_else(|never| match never {}),
            description: self.description.clone(),
            ref_number: self.ref_number.clone(),
            cheque_number: self.cheque_number.clone(),
            voucher_number: self.voucher_number.clone(),
            created_at: parse_timestamp(&self.created_at)
                .ok_or_else(|| malformed("created_at", &self.created_at))?,
            updated_at: parse_timestamp(&self.updated_at)
                .ok_or_else(|| malformed("updated_at", &self.updated_at))?,
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl StorageProvider for DuckDbStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Embedded
    }

    async fn check_connection(&self) -> std::result::Result<(), BackendFailure> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
        .map_err(|e| BackendFailure::unreachable(StorageKind::Embedded, e.to_string()))
    }

    async fn prepare(&self) -> std::result::Result<(), BackendFailure> {
        let result = self
            .with_conn(|conn| {
                let migrations = MigrationService::new(conn).run_pending()?;
                let seeded = Self::seed_default_categories(conn)?;
                Ok((migrations, seeded))
            })
            .await;

        match result {
            Ok((migrations, seeded)) => {
                tracing::info!(
                    schema_version = migrations.current_version,
                    applied = migrations.applied.len(),
                    seeded_categories = seeded,
                    "embedded store ready"
                );
                Ok(())
            }
            Err(Error::Unavailable(msg)) => {
                Err(BackendFailure::unreachable(StorageKind::Embedded, msg))
            }
            Err(e) => Err(BackendFailure::schema(StorageKind::Embedded, e.to_string())),
        }
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Category::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            let categories = rows.collect::<duckdb::Result<Vec<_>>>()?;
            Ok(categories)
        })
        .await
    }

    async fn get_category_by_id(&self, id: &RecordId) -> Result<Option<Category>> {
        let Some(id) = id.as_int() else {
            return Ok(None);
        };
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories WHERE id = ?")?;
            let mut rows = stmt.query_map(params![id], |row| {
                Ok(Category::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            let found = rows.next().transpose()?;
            Ok(found)
        })
        .await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let id: i64 = conn.query_row(
                "INSERT INTO categories (name) VALUES (?) RETURNING id",
                params![name],
                |row| row.get(0),
            )?;
            tracing::debug!(id, "created category");
            Ok(Category::new(id, name))
        })
        .await
    }

    async fn update_category(&self, id: &RecordId, name: &str) -> Result<bool> {
        let Some(id) = id.as_int() else {
            return Ok(false);
        };
        let name = name.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute("UPDATE categories SET name = ? WHERE id = ?", params![name, id])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_category(&self, id: &RecordId) -> Result<bool> {
        let Some(id) = id.as_int() else {
            return Ok(false);
        };
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| Self::query_transactions(conn, "", params![]))
            .await
    }

    async fn get_transaction_by_id(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let Some(id) = id.as_int() else {
            return Ok(None);
        };
        self.with_conn(move |conn| Self::find_transaction(conn, id))
            .await
    }

    async fn get_transactions_by_type(&self, kind: TransactionKind) -> Result<Vec<Transaction>> {
        self.with_conn(move |conn| {
            Self::query_transactions(conn, "WHERE type = ?", params![kind.as_str()])
        })
        .await
    }

    async fn get_transactions_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        if start > end {
            return Ok(Vec::new());
        }
        self.with_conn(move |conn| {
            Self::query_transactions(
                conn,
                "WHERE date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
                params![start.to_string(), end.to_string()],
            )
        })
        .await
    }

    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let mut stored = new.clone();
        stored.amount = new.amount.round_dp(2);
        let now = Utc::now();

        self.with_conn(move |conn| {
            let id: i64 = conn.query_row(
                "INSERT INTO transactions (type, amount, date, category_id, description,
                                           ref_number, cheque_number, voucher_number,
                                           created_at, updated_at)
                 VALUES (?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?)
                 RETURNING id",
                params![
                    stored.kind.as_str(),
                    stored.amount.to_string(),
                    stored.date.to_string(),
                    stored.category_id.to_string(),
                    stored.description,
                    stored.ref_number,
                    stored.cheque_number,
                    stored.voucher_number,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
                |row| row.get(0),
            )?;
            tracing::debug!(id, kind = %stored.kind, "created transaction");
            Ok(Transaction::from_new(RecordId::Int(id), &stored, now))
        })
        .await
    }

    async fn update_transaction(&self, id: &RecordId, update: &TransactionUpdate) -> Result<bool> {
        let Some(id) = id.as_int() else {
            return Ok(false);
        };
        let update = update.clone();

        self.with_conn(move |conn| {
            let db_tx = conn.transaction()?;

            let Some(mut tx) = Self::find_transaction(&db_tx, id)? else {
                return Ok(false);
            };
            update.apply_to(&mut tx, Utc::now());
            tx.amount = tx.amount.round_dp(2);

            db_tx.execute(
                "UPDATE transactions SET amount = CAST(? AS DECIMAL(18, 2)),
                        date = CAST(? AS DATE), category_id = ?, description = ?,
                        ref_number = ?, cheque_number = ?, voucher_number = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    tx.amount.to_string(),
                    tx.date.to_string(),
                    tx.category_id.to_string(),
                    tx.description,
                    tx.ref_number,
                    tx.cheque_number,
                    tx.voucher_number,
                    tx.updated_at.to_rfc3339(),
                    id,
                ],
            )?;
            db_tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn delete_transaction(&self, id: &RecordId) -> Result<bool> {
        let Some(id) = id.as_int() else {
            return Ok(false);
        };
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
            Ok(changed > 0)
        })
        .await
    }
}
