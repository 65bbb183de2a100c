//! Backend facade errors

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a storage backend or one of its write handles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Table does not exist and was not allowed to be created
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Write handle used after close
    #[error("write handle for table {0} is closed")]
    HandleClosed(String),

    /// Caller lacks permission for the operation
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Stored cell failed checksum verification
    #[error("checksum mismatch in table {table} at row {row}")]
    Corruption { table: String, row: String },

    /// Backend could not be reached or refused the operation
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend-internal lock was poisoned by a panicking thread
    #[error("backend state poisoned: {0}")]
    Poisoned(String),
}
