//! MySQL / MariaDB database backend

use crate::error::{DbError, DbResult};
use crate::ledger::LedgerRow;
use crate::traits::{Database, SqlValue};
use chrono::{Datelike, Timelike};
use mysql::prelude::Queryable;
use mysql::{from_row_opt, Conn, Opts, Params, Row, Value};
use std::sync::{Mutex, MutexGuard};

const DEFAULT_ADDR: &str = "127.0.0.1:3306";

/// MySQL backend over a single blocking connection
pub struct MySqlBackend {
    conn: Mutex<Conn>,
}

impl MySqlBackend {
    /// Connect with a `mysql://` URL or a `user:password@tcp(host:port)/dbname` DSN
    pub fn connect(dsn: &str) -> DbResult<Self> {
        let url = mysql_url(dsn)?;
        let opts = Opts::from_url(&url).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let conn = Conn::new(opts).map_err(|e| DbError::ConnectionError(format!("mysql: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Conn>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

/// Normalize a DSN into a `mysql://` URL.
///
/// `user[:password]@[tcp(host[:port])]/dbname[?params]` is rewritten; query
/// parameters of that form are dropped since the URL form names them
/// differently. URLs pass through unchanged.
pub fn mysql_url(dsn: &str) -> DbResult<String> {
    if dsn.starts_with("mysql://") {
        return Ok(dsn.to_string());
    }
    let invalid = |reason: &str| DbError::ConnectionError(format!("invalid mysql DSN: {reason}"));

    let (userinfo, rest) = match dsn.rfind('@') {
        Some(pos) => (&dsn[..pos], &dsn[pos + 1..]),
        None => ("", dsn),
    };

    let (addr, path) = if let Some(path) = rest.strip_prefix('/') {
        (DEFAULT_ADDR.to_string(), path)
    } else {
        let open = rest.find('(').ok_or_else(|| invalid("expected '/dbname' or 'tcp(host:port)/dbname'"))?;
        let close = rest.find(')').ok_or_else(|| invalid("unclosed '(' in address"))?;
        if close < open {
            return Err(invalid("malformed address"));
        }
        let protocol = &rest[..open];
        if protocol != "tcp" {
            return Err(invalid(&format!("protocol '{protocol}' is not supported")));
        }
        let path = rest[close + 1..]
            .strip_prefix('/')
            .ok_or_else(|| invalid("expected '/dbname' after the address"))?;
        let addr = &rest[open + 1..close];
        let addr = if addr.is_empty() { DEFAULT_ADDR } else { addr };
        (addr.to_string(), path)
    };

    let (dbname, params) = path.split_once('?').unwrap_or((path, ""));
    if !params.is_empty() {
        log::debug!("Ignoring mysql DSN parameters: {}", params);
    }

    let credentials = match userinfo.split_once(':') {
        Some((user, password)) => format!("{}:{}@", encode(user), encode(password)),
        None if userinfo.is_empty() => String::new(),
        None => format!("{}@", encode(userinfo)),
    };
    Ok(format!("mysql://{}{}/{}", credentials, addr, dbname))
}

fn encode(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for b in part.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn to_value(v: &SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::NULL,
        SqlValue::Integer(v) => Value::Int(*v),
        SqlValue::Boolean(v) => Value::Int(i64::from(*v)),
        SqlValue::Text(v) => Value::Bytes(v.clone().into_bytes()),
        SqlValue::Timestamp(ts) => Value::Date(
            ts.year() as u16,
            ts.month() as u8,
            ts.day() as u8,
            ts.hour() as u8,
            ts.minute() as u8,
            ts.second() as u8,
            ts.nanosecond() / 1_000,
        ),
    }
}

fn bind(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_value).collect())
    }
}

impl Database for MySqlBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let mut conn = self.lock()?;
        conn.exec_drop(sql, bind(params))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
        Ok(conn.affected_rows() as usize)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let mut conn = self.lock()?;
        conn.query_drop(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query_i64(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        let mut conn = self.lock()?;
        let row: Row = conn
            .exec_first(sql, bind(params))?
            .ok_or_else(|| DbError::ExecutionError(format!("query returned no rows: {sql}")))?;
        let (value,) =
            from_row_opt::<(i64,)>(row).map_err(|e| DbError::MalformedRow(e.to_string()))?;
        Ok(value)
    }

    fn query_ledger_rows(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<LedgerRow>> {
        let mut conn = self.lock()?;
        let rows: Vec<Row> = conn.exec(sql, bind(params))?;
        rows.into_iter()
            .map(|row| -> DbResult<LedgerRow> {
                let (id, version, tstamp, is_applied) =
                    from_row_opt::<(i64, i64, String, bool)>(row)
                        .map_err(|e| DbError::MalformedRow(e.to_string()))?;
                LedgerRow::from_columns(id, version, &tstamp, is_applied)
            })
            .collect()
    }

    fn db_type(&self) -> &'static str {
        "mysql"
    }
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
