//! tm-db - Database layer for Tidemark
//!
//! This crate provides the synchronous `Database` trait, the dialect adapters
//! that hide ledger DDL differences, DuckDB, SQLite, PostgreSQL (and
//! Redshift) and MySQL backends, and the append-only version ledger.

pub mod connect;
pub mod dialect;
pub mod duckdb;
pub mod error;
pub mod ledger;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod traits;

pub use connect::connect;
pub use dialect::{DialectKind, PlaceholderStyle, SqlDialect, TableName};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use ledger::{latest_by_version, Ledger, LedgerRow, DEFAULT_LEDGER_TABLE};
pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use traits::{with_transaction, Database, SqlValue};
