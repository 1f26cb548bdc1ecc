//! Resolve a dialect + DSN into a live connection

use crate::dialect::DialectKind;
use crate::duckdb::DuckDbBackend;
use crate::error::{DbError, DbResult};
use crate::mysql::MySqlBackend;
use crate::postgres::PostgresBackend;
use crate::sqlite::SqliteBackend;
use crate::traits::Database;

/// Open a connection for `kind`.
///
/// Redshift speaks the PostgreSQL protocol and goes through the postgres
/// backend.
pub fn connect(kind: DialectKind, dsn: &str) -> DbResult<Box<dyn Database>> {
    if dsn.trim().is_empty() {
        return Err(DbError::ConnectionError(format!(
            "empty connection string for {kind}"
        )));
    }
    log::debug!("Opening {} connection", kind);
    match kind {
        DialectKind::DuckDb => Ok(Box::new(DuckDbBackend::new(dsn)?)),
        DialectKind::Sqlite3 => Ok(Box::new(SqliteBackend::new(dsn)?)),
        DialectKind::Postgres => Ok(Box::new(PostgresBackend::connect(dsn)?)),
        DialectKind::Redshift => Ok(Box::new(PostgresBackend::connect_redshift(dsn)?)),
        DialectKind::MySql => Ok(Box::new(MySqlBackend::connect(dsn)?)),
    }
}

#[cfg(test)]
#[path = "connect_test.rs"]
mod tests;
