//! Error types for tm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// BEGIN / COMMIT / ROLLBACK failed (D003)
    #[error("[D003] Transaction {action} failed: {message}")]
    TransactionError { action: String, message: String },

    /// Unknown dialect identifier (D004)
    #[error("[D004] Unsupported database dialect '{0}'. Supported: postgres, mysql, sqlite3, redshift, duckdb")]
    UnsupportedDialect(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Ledger table name is not a plain (optionally schema-qualified) identifier (D007)
    #[error("[D007] Invalid ledger table name '{0}': expected [schema.]name made of letters, digits and '_'")]
    InvalidIdentifier(String),

    /// A ledger row could not be decoded (D008)
    #[error("[D008] Malformed ledger row: {0}")]
    MalformedRow(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<postgres::Error> for DbError {
    fn from(err: postgres::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<mysql::Error> for DbError {
    fn from(err: mysql::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
