//! Core domain entities
//!
//! Pure data structures and calculations - no I/O.

mod category;
mod record_id;
pub mod result;
pub mod summary;
mod transaction;

pub use category::{Category, DEFAULT_CATEGORY_NAMES};
pub use record_id::RecordId;
pub use summary::{calculate_summary, recent_transactions, FinanceSummary};
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionUpdate};
