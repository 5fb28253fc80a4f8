//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod connection;
pub mod finance;
pub mod migration;
mod selector;

pub use connection::{ConnectionController, ConnectionError, ConnectionState, FallbackPolicy, Recovery};
pub use finance::FinanceService;
pub use migration::{MigrationResult, MigrationService};
pub use selector::{StorageProviders, StorageSelector};
