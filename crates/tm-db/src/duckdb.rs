//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::ledger::LedgerRow;
use crate::traits::{Database, SqlValue};
use duckdb::types::{TimeUnit, ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(v) => Value::BigInt(*v),
            SqlValue::Boolean(v) => Value::Boolean(*v),
            SqlValue::Text(v) => Value::Text(v.clone()),
            SqlValue::Timestamp(v) => {
                Value::Timestamp(TimeUnit::Microsecond, v.and_utc().timestamp_micros())
            }
        }))
    }
}

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, params_from_iter(params.iter()))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query_i64(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        let conn = self.lock()?;
        let value: i64 = conn.query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(value)
    }

    fn query_ledger_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<LedgerRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(id, version, tstamp, is_applied)| {
                LedgerRow::from_columns(id, version, &tstamp, is_applied)
            })
            .collect()
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
