//! Adapter implementations
//!
//! Adapters implement the storage port with concrete technologies:
//! - in-process vectors for the ephemeral store
//! - DuckDB for the embedded persistent store
//! - MongoDB for the document database

pub mod duckdb;
pub mod memory;
pub mod mongodb;
pub mod seed;
