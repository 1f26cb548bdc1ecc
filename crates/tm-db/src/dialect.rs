//! SQL dialect abstraction for the version ledger
//!
//! The ledger and runner only ever talk to [`SqlDialect`]; each supported
//! database kind supplies its DDL, existence check and placeholder style.

use crate::error::{DbError, DbResult};
use crate::traits::SqlValue;
use std::fmt;
use std::str::FromStr;

/// A validated, optionally schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Parse `name` or `schema.name`, rejecting anything that is not a plain
    /// identifier so the name is safe to splice into DDL.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(DbError::InvalidIdentifier(raw.to_string()));
        }
        match parts.as_slice() {
            [name] => Ok(Self {
                schema: None,
                name: name.to_string(),
            }),
            [schema, name] => Ok(Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            }),
            _ => Err(DbError::InvalidIdentifier(raw.to_string())),
        }
    }

    /// Schema part, if qualified
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Unqualified table name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Placeholder style for bound parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    QuestionMark,
    /// `$1`, `$2`, ...
    Numbered,
}

/// Trait for ledger-facing dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Dialect identifier
    fn name(&self) -> &'static str;

    /// How bound parameters are written
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// DDL creating the ledger table (may hold several statements)
    fn create_ledger_table_sql(&self, table: &TableName) -> String;

    /// Query counting tables named `table`, plus its parameters
    fn table_exists_query(&self, table: &TableName) -> (String, Vec<SqlValue>) {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = {} AND table_schema = {}",
            self.text_placeholder(1),
            match table.schema() {
                Some(_) => self.text_placeholder(2),
                None => self.current_schema_expr().to_string(),
            }
        );
        let mut params = vec![SqlValue::from(table.name())];
        if let Some(schema) = table.schema() {
            params.push(SqlValue::from(schema));
        }
        (sql, params)
    }

    /// Expression naming the session's default schema
    fn current_schema_expr(&self) -> &'static str {
        "current_schema()"
    }

    /// Expression rendering `tstamp` as text
    fn tstamp_text_expr(&self) -> &'static str {
        "CAST(tstamp AS TEXT)"
    }

    /// Parameter placeholder for the 1-based `index`
    fn placeholder(&self, index: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${index}"),
        }
    }

    /// Placeholder for a parameter compared against a catalog text column
    fn text_placeholder(&self, index: usize) -> String {
        self.placeholder(index)
    }

    /// Insert one ledger event: params `(version_id, is_applied, tstamp)`
    fn insert_ledger_row_sql(&self, table: &TableName) -> String {
        format!(
            "INSERT INTO {} (version_id, is_applied, tstamp) VALUES ({}, {}, {})",
            table,
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3)
        )
    }

    /// Select every ledger event above a version: params `(min_version)`
    fn select_ledger_rows_sql(&self, table: &TableName) -> String {
        format!(
            "SELECT id, version_id, {}, is_applied FROM {} WHERE version_id > {} ORDER BY id",
            self.tstamp_text_expr(),
            table,
            self.placeholder(1)
        )
    }

    /// Select the events of one version: params `(version_id)`
    fn select_version_history_sql(&self, table: &TableName) -> String {
        format!(
            "SELECT id, version_id, {}, is_applied FROM {} WHERE version_id = {} ORDER BY id",
            self.tstamp_text_expr(),
            table,
            self.placeholder(1)
        )
    }
}

/// PostgreSQL
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    // information_schema columns are sql_identifier, which text binds do not accept
    fn text_placeholder(&self, index: usize) -> String {
        format!("${index}::text")
    }

    fn create_ledger_table_sql(&self, table: &TableName) -> String {
        format!(
            "CREATE TABLE {table} (
                id serial NOT NULL,
                version_id bigint NOT NULL,
                is_applied boolean NOT NULL,
                tstamp timestamp NULL default now(),
                PRIMARY KEY(id)
            )"
        )
    }
}

/// Amazon Redshift
pub struct RedshiftDialect;

impl SqlDialect for RedshiftDialect {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn text_placeholder(&self, index: usize) -> String {
        format!("${index}::text")
    }

    fn create_ledger_table_sql(&self, table: &TableName) -> String {
        format!(
            "CREATE TABLE {table} (
                id integer NOT NULL identity(1, 1),
                version_id bigint NOT NULL,
                is_applied boolean NOT NULL,
                tstamp timestamp NULL default sysdate,
                PRIMARY KEY(id)
            )"
        )
    }

    fn tstamp_text_expr(&self) -> &'static str {
        "CAST(tstamp AS VARCHAR)"
    }
}

/// MySQL / MariaDB
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn create_ledger_table_sql(&self, table: &TableName) -> String {
        format!(
            "CREATE TABLE {table} (
                id serial NOT NULL,
                version_id bigint NOT NULL,
                is_applied boolean NOT NULL,
                tstamp timestamp(6) NULL default now(6),
                PRIMARY KEY(id)
            )"
        )
    }

    fn current_schema_expr(&self) -> &'static str {
        "DATABASE()"
    }

    fn tstamp_text_expr(&self) -> &'static str {
        "CAST(tstamp AS CHAR)"
    }
}

/// SQLite 3
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn create_ledger_table_sql(&self, table: &TableName) -> String {
        format!(
            "CREATE TABLE {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version_id INTEGER NOT NULL,
                is_applied INTEGER NOT NULL,
                tstamp TIMESTAMP DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            )"
        )
    }

    // sqlite has no information_schema; attached schemas keep their own catalog
    fn table_exists_query(&self, table: &TableName) -> (String, Vec<SqlValue>) {
        let catalog = match table.schema() {
            Some(schema) => format!("{schema}.sqlite_master"),
            None => "sqlite_master".to_string(),
        };
        (
            format!("SELECT COUNT(*) FROM {catalog} WHERE type = 'table' AND name = ?"),
            vec![SqlValue::from(table.name())],
        )
    }
}

/// DuckDB
pub struct DuckDbDialect;

impl SqlDialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn create_ledger_table_sql(&self, table: &TableName) -> String {
        let seq = match table.schema() {
            Some(schema) => format!("{}.{}_id_seq", schema, table.name()),
            None => format!("{}_id_seq", table.name()),
        };
        format!(
            "CREATE SEQUENCE IF NOT EXISTS {seq};
             CREATE TABLE {table} (
                 id BIGINT PRIMARY KEY DEFAULT nextval('{seq}'),
                 version_id BIGINT NOT NULL,
                 is_applied BOOLEAN NOT NULL,
                 tstamp TIMESTAMP DEFAULT current_timestamp
             );"
        )
    }

    fn tstamp_text_expr(&self) -> &'static str {
        "CAST(tstamp AS VARCHAR)"
    }
}

/// The closed set of supported database kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Postgres,
    MySql,
    Sqlite3,
    Redshift,
    DuckDb,
}

impl DialectKind {
    /// All supported kinds, in display order
    pub const ALL: [DialectKind; 5] = [
        DialectKind::Postgres,
        DialectKind::MySql,
        DialectKind::Sqlite3,
        DialectKind::Redshift,
        DialectKind::DuckDb,
    ];

    /// Resolve the dialect adapter for this kind
    pub fn adapter(&self) -> &'static dyn SqlDialect {
        match self {
            DialectKind::Postgres => &PostgresDialect,
            DialectKind::MySql => &MySqlDialect,
            DialectKind::Sqlite3 => &SqliteDialect,
            DialectKind::Redshift => &RedshiftDialect,
            DialectKind::DuckDb => &DuckDbDialect,
        }
    }
}

impl FromStr for DialectKind {
    type Err = DbError;

    fn from_str(s: &str) -> DbResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mysql" => Ok(DialectKind::MySql),
            "sqlite3" | "sqlite" => Ok(DialectKind::Sqlite3),
            "redshift" => Ok(DialectKind::Redshift),
            "duckdb" => Ok(DialectKind::DuckDb),
            _ => Err(DbError::UnsupportedDialect(s.to_string())),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.adapter().name())
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
