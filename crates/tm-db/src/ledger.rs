//! The version ledger: an append-only history table inside the target database.
//!
//! Every apply or rollback appends one row; nothing is ever updated. The state
//! of a version is the `is_applied` flag of its latest row, ordered by
//! timestamp with `id` breaking ties.

use crate::dialect::{SqlDialect, TableName};
use crate::error::{DbError, DbResult};
use crate::traits::{with_transaction, Database, SqlValue};
use chrono::{Duration, NaiveDateTime, SubsecRound, Utc};
use std::collections::BTreeMap;

/// Default ledger table name
pub const DEFAULT_LEDGER_TABLE: &str = "tidemark_db_version";

/// Formats accepted for `tstamp` rendered as text, most precise first.
const TSTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// One historical fact in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Auto-incrementing row id
    pub id: i64,

    /// Migration version this event refers to
    pub version: i64,

    /// Wall-clock time the row was written
    pub tstamp: NaiveDateTime,

    /// `true` for an apply event, `false` for a rollback event
    pub is_applied: bool,
}

impl LedgerRow {
    /// Build a row from raw column values, parsing the textual timestamp
    pub fn from_columns(id: i64, version: i64, tstamp: &str, is_applied: bool) -> DbResult<Self> {
        let tstamp = parse_tstamp(tstamp).ok_or_else(|| {
            DbError::MalformedRow(format!(
                "row {id} (version {version}) has unreadable tstamp '{tstamp}'"
            ))
        })?;
        Ok(Self {
            id,
            version,
            tstamp,
            is_applied,
        })
    }

    fn is_newer_than(&self, other: &LedgerRow) -> bool {
        (self.tstamp, self.id) > (other.tstamp, other.id)
    }
}

fn parse_tstamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    // Drop a trailing UTC offset such as "+00", "+00:00" or "Z".
    let trimmed = match trimmed.rfind(['+', 'Z']) {
        Some(pos) if pos > 10 => &trimmed[..pos],
        _ => trimmed,
    };
    TSTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Reduce an event log to the latest row of every version, keyed by version.
pub fn latest_by_version(rows: impl IntoIterator<Item = LedgerRow>) -> BTreeMap<i64, LedgerRow> {
    let mut latest: BTreeMap<i64, LedgerRow> = BTreeMap::new();
    for row in rows {
        match latest.get(&row.version) {
            Some(existing) if !row.is_newer_than(existing) => {}
            _ => {
                latest.insert(row.version, row);
            }
        }
    }
    latest
}

/// Read/write access to the ledger table
pub struct Ledger<'a> {
    db: &'a dyn Database,
    dialect: &'a dyn SqlDialect,
    table: TableName,
}

impl<'a> Ledger<'a> {
    /// Bind a ledger to a connection, dialect and table
    pub fn new(db: &'a dyn Database, dialect: &'a dyn SqlDialect, table: TableName) -> Self {
        Self { db, dialect, table }
    }

    /// The ledger table
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// The connection this ledger writes through
    pub fn db(&self) -> &'a dyn Database {
        self.db
    }

    /// Whether the ledger table exists
    pub fn exists(&self) -> DbResult<bool> {
        let (sql, params) = self.dialect.table_exists_query(&self.table);
        Ok(self.db.query_i64(&sql, &params)? > 0)
    }

    /// Create the ledger table if absent and return the current version.
    pub fn ensure_table(&self) -> DbResult<i64> {
        if !self.exists()? {
            log::info!("Creating ledger table {}", self.table);
            let ddl = self.dialect.create_ledger_table_sql(&self.table);
            with_transaction(self.db, |db| db.execute_batch(&ddl))?;
        }
        self.current_version()
    }

    /// Highest version whose latest row is an apply event, or 0.
    pub fn current_version(&self) -> DbResult<i64> {
        Ok(self
            .latest_rows_above(i64::MIN)?
            .iter()
            .filter(|row| row.is_applied)
            .map(|row| row.version)
            .max()
            .unwrap_or(0))
    }

    /// Every row above `min_version`, in insertion order
    pub fn rows_above(&self, min_version: i64) -> DbResult<Vec<LedgerRow>> {
        let sql = self.dialect.select_ledger_rows_sql(&self.table);
        self.db
            .query_ledger_rows(&sql, &[SqlValue::Integer(min_version)])
    }

    /// The latest row of every version above `min_version`, ascending by version
    pub fn latest_rows_above(&self, min_version: i64) -> DbResult<Vec<LedgerRow>> {
        Ok(latest_by_version(self.rows_above(min_version)?)
            .into_values()
            .collect())
    }

    /// Versions above `min_version` whose latest row is an apply event, ascending
    pub fn applied_versions_above(&self, min_version: i64) -> DbResult<Vec<i64>> {
        Ok(self
            .latest_rows_above(min_version)?
            .into_iter()
            .filter(|row| row.is_applied)
            .map(|row| row.version)
            .collect())
    }

    /// Every row of one version, oldest first
    pub fn history(&self, version: i64) -> DbResult<Vec<LedgerRow>> {
        let sql = self.dialect.select_version_history_sql(&self.table);
        self.db
            .query_ledger_rows(&sql, &[SqlValue::Integer(version)])
    }

    /// Latest row of one version, if any
    pub fn latest(&self, version: i64) -> DbResult<Option<LedgerRow>> {
        Ok(latest_by_version(self.history(version)?).remove(&version))
    }

    /// Append one apply (`true`) or rollback (`false`) event.
    ///
    /// The row's `tstamp` is strictly newer than every earlier row of the
    /// same version.
    pub fn append(&self, version: i64, is_applied: bool) -> DbResult<()> {
        let tstamp = self.next_tstamp(version)?;
        let sql = self.dialect.insert_ledger_row_sql(&self.table);
        self.db.execute(
            &sql,
            &[
                SqlValue::Integer(version),
                SqlValue::Boolean(is_applied),
                SqlValue::Timestamp(tstamp),
            ],
        )?;
        Ok(())
    }

    /// UTC now at microsecond precision, moved past the version's latest row
    fn next_tstamp(&self, version: i64) -> DbResult<NaiveDateTime> {
        let now = Utc::now().naive_utc().trunc_subsecs(6);
        Ok(match self.latest(version)? {
            Some(row) if row.tstamp >= now => row.tstamp + Duration::microseconds(1),
            _ => now,
        })
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
