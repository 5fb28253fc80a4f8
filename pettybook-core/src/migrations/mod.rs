//! Embedded-store schema versions
//!
//! SQL files are compiled into the binary with include_str!. Each entry is
//! (version, name, sql). Versions are applied in ascending order and only
//! ever add to the schema.

/// All schema versions, embedded at compile time.
///
/// IMPORTANT: When adding a new version:
/// 1. Create the SQL file: NNN_description.sql
/// 2. Append an entry here with the next version number
pub const MIGRATIONS: &[(u32, &str, &str)] = &[
    (0, "000_schema_versions.sql", include_str!("000_schema_versions.sql")),
    (1, "001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];

/// Version the embedded store is brought up to
pub const SCHEMA_VERSION: u32 = 1;
