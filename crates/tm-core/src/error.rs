//! Error types for tm-core

use thiserror::Error;
use tm_db::DbError;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Migrations directory cannot be listed
    #[error("[C004] Cannot read migrations directory '{path}': {source}")]
    DirectoryUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// C005: Two migration units share a version
    #[error("[C005] Duplicate migration version {version}: {origins}")]
    DuplicateVersion { version: i64, origins: String },

    /// C006: A procedural migration file has no registered unit
    #[error("[C006] Procedural migration {path} (version {version}) is not registered")]
    UnregisteredMigration { version: i64, path: String },

    /// C007: A required Up/Down section is absent
    #[error("[C007] Migration {migration} has no '{section}' section")]
    MissingSection { migration: String, section: String },

    /// C008: The collected sequence holds no migrations
    #[error("[C008] No migrations found")]
    EmptySequence,

    /// C009: No unit with the requested version
    #[error("[C009] No migration with version {version}")]
    MigrationNotFound { version: i64 },

    /// C010: No unit after the given version; signals an exhausted sequence
    #[error("[C010] No migration after version {after}")]
    NoNextVersion { after: i64 },

    /// C011: IO error with file path context
    #[error("[C011] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C012: Refusing to overwrite an existing migration file
    #[error("[C012] Failed to create file: {path} already exists")]
    FileExists { path: String },

    /// C013: Migration name unusable in a file name
    #[error("[C013] Invalid migration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// C014: Template rendering failed
    #[error("[C014] Template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    /// C015: No sequence number fits after the newest version
    #[error("[C015] Cannot allocate a version after {last}: sequence numbers are exhausted")]
    VersionOverflow { last: i64 },

    /// P001: Malformed directive in a declarative migration
    #[error("[P001] Parse error in {file} at line {line} ({directive}): {message}")]
    ParseError {
        file: String,
        line: usize,
        directive: String,
        message: String,
    },

    /// Database layer error
    #[error(transparent)]
    Db(#[from] DbError),
}

impl CoreError {
    /// True for the sentinel that only means "nothing after this version"
    pub fn is_no_next_version(&self) -> bool {
        matches!(self, CoreError::NoNextVersion { .. })
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
