//! Result and error types for the core library

use thiserror::Error;

use super::RecordId;

/// Core library error type
///
/// "Not found" is deliberately absent: storage operations report a missing
/// record as `Ok(false)`, `Ok(None)` or an empty list.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    /// The backend could not be reached (refused connection, no network, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot delete category {0}: it is used by at least one transaction")]
    CategoryInUse(RecordId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error means the backend was unreachable rather than broken
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_in_use_message_names_id() {
        let err = Error::CategoryInUse(RecordId::Int(4));
        assert!(err.to_string().contains("category 4"));
    }

    #[test]
    fn test_is_unavailable() {
        assert!(Error::unavailable("connection refused").is_unavailable());
        assert!(!Error::database("corrupt row").is_unavailable());
    }
}
