//! PostgreSQL database backend, also used for Amazon Redshift

use crate::error::{DbError, DbResult};
use crate::ledger::LedgerRow;
use crate::traits::{Database, SqlValue};
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use std::sync::{Mutex, MutexGuard};

/// PostgreSQL (or Redshift) backend over a blocking client
pub struct PostgresBackend {
    client: Mutex<Client>,
    db_type: &'static str,
}

impl PostgresBackend {
    /// Connect with a key/value DSN (`host=... dbname=...`) or a
    /// `postgres://` URL
    pub fn connect(dsn: &str) -> DbResult<Self> {
        Self::open(dsn, "postgres")
    }

    /// Connect to Redshift through its PostgreSQL wire protocol
    pub fn connect_redshift(dsn: &str) -> DbResult<Self> {
        Self::open(dsn, "redshift")
    }

    fn open(dsn: &str, db_type: &'static str) -> DbResult<Self> {
        let client = Client::connect(dsn, NoTls)
            .map_err(|e| DbError::ConnectionError(format!("{db_type}: {e}")))?;
        Ok(Self {
            client: Mutex::new(client),
            db_type,
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Client>> {
        self.client
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

fn bind(params: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Sync> {
            match p {
                SqlValue::Null => Box::new(Option::<String>::None),
                SqlValue::Integer(v) => Box::new(*v),
                SqlValue::Boolean(v) => Box::new(*v),
                SqlValue::Text(v) => Box::new(v.clone()),
                SqlValue::Timestamp(v) => Box::new(*v),
            }
        })
        .collect()
}

fn refs(bound: &[Box<dyn ToSql + Sync>]) -> Vec<&(dyn ToSql + Sync)> {
    bound.iter().map(|b| b.as_ref()).collect()
}

// `serial` ids are int4 on postgres and redshift, `bigserial` would be int8
fn ledger_id(row: &Row) -> DbResult<i64> {
    row.try_get::<_, i64>(0)
        .or_else(|_| row.try_get::<_, i32>(0).map(i64::from))
        .map_err(|e| DbError::MalformedRow(e.to_string()))
}

impl Database for PostgresBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let bound = bind(params);
        let mut client = self.lock()?;
        let affected = client
            .execute(sql, &refs(&bound))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
        Ok(affected as usize)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let mut client = self.lock()?;
        client
            .batch_execute(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query_i64(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        let bound = bind(params);
        let mut client = self.lock()?;
        let row = client.query_one(sql, &refs(&bound))?;
        Ok(row.try_get::<_, i64>(0)?)
    }

    fn query_ledger_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<LedgerRow>> {
        let bound = bind(params);
        let mut client = self.lock()?;
        client
            .query(sql, &refs(&bound))?
            .iter()
            .map(|row| -> DbResult<LedgerRow> {
                let tstamp: String = row.try_get(2)?;
                LedgerRow::from_columns(ledger_id(row)?, row.try_get(1)?, &tstamp, row.try_get(3)?)
            })
            .collect()
    }

    fn db_type(&self) -> &'static str {
        self.db_type
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
