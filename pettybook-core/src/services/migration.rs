//! Migration service - brings the embedded store up to `SCHEMA_VERSION`
//!
//! Each applied version is recorded in sys_schema_versions, so opening a
//! database that is already current does nothing.

use duckdb::{params, Connection};

use crate::domain::result::Result;
use crate::migrations::{MIGRATIONS, SCHEMA_VERSION};

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Versions applied by this run
    pub applied: Vec<u32>,
    /// Version the database is at afterwards
    pub current_version: u32,
}

/// Service for managing embedded-store schema versions
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Apply every version newer than the recorded one
    ///
    /// Version 0 creates the bookkeeping table itself, so it is run first
    /// whenever that table is missing.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.versions_table_exists()? {
            if let Some((version, name, sql)) = MIGRATIONS.iter().find(|(v, _, _)| *v == 0) {
                self.conn.execute_batch(sql)?;
                self.record_version(*version, name)?;
                applied.push(*version);
            }
        }

        let current = self.current_version()?;
        for (version, name, sql) in MIGRATIONS.iter() {
            if *version == 0 || *version > SCHEMA_VERSION || current.is_some_and(|c| *version <= c) {
                continue;
            }
            self.conn.execute_batch(sql)?;
            self.record_version(*version, name)?;
            applied.push(*version);
            tracing::info!(version, name, "applied schema version");
        }

        Ok(MigrationResult {
            applied,
            current_version: self.current_version()?.unwrap_or(0),
        })
    }

    /// Highest recorded version, `None` on a fresh database
    pub fn current_version(&self) -> Result<Option<u32>> {
        let version: Option<i64> =
            self.conn
                .query_row("SELECT MAX(version) FROM sys_schema_versions", [], |row| row.get(0))?;
        Ok(version.map(|v| v as u32))
    }

    fn versions_table_exists(&self) -> Result<bool> {
        let result: std::result::Result<i64, _> = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_schema_versions'",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(count) => Ok(count > 0),
            Err(_) => Ok(false),
        }
    }

    fn record_version(&self, version: u32, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_schema_versions (version, name) VALUES (?, ?)",
            params![version as i64, name],
        )?;
        Ok(())
    }
}
