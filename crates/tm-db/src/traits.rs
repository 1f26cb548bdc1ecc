//! Database trait definition

use crate::error::{DbError, DbResult};
use crate::ledger::LedgerRow;
use chrono::NaiveDateTime;

/// A bound query parameter.
///
/// Every value that reaches SQL text goes through one of these; nothing is
/// interpolated into statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Boolean(bool),
    Text(String),
    /// Naive UTC timestamp, microsecond precision
    Timestamp(NaiveDateTime),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Boolean(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// Synchronous connection capability used by the ledger and the runner.
///
/// Procedural migrations receive a `&dyn Database` as their execution handle;
/// while a transactional step is running that handle is inside the step's
/// transaction.
pub trait Database: Send + Sync {
    /// Execute one statement with bound parameters, returns affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute SQL text that may hold several statements, without parameters
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query whose first row's first column is an integer (COUNT, MAX, ...)
    fn query_i64(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64>;

    /// Run a ledger select returning `(id, version_id, tstamp as text, is_applied)`
    fn query_ledger_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<LedgerRow>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Open a transaction
    fn begin(&self) -> DbResult<()> {
        self.execute_batch("BEGIN")
            .map_err(|e| transaction_error("BEGIN", e))
    }

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| transaction_error("COMMIT", e))
    }

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| transaction_error("ROLLBACK", e))
    }
}

fn transaction_error(action: &str, err: DbError) -> DbError {
    DbError::TransactionError {
        action: action.to_string(),
        message: err.to_string(),
    }
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
///
/// A failed `COMMIT` is rolled back and reported; a failed `ROLLBACK` after a
/// body error is logged and the body error is returned.
pub fn with_transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce(&dyn Database) -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    let result = body(db);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                let _ = db.rollback();
                return Err(commit_err.into());
            }
        }
        Err(_) => {
            if let Err(rollback_err) = db.rollback() {
                log::warn!("{rollback_err}");
            }
        }
    }
    result
}
