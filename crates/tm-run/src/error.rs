//! Error types for tm-run

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

/// Boxed failure raised by a statement or a procedural step
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Runner error type
#[derive(Error, Debug)]
pub enum RunError {
    /// R001: A migration step failed; nothing of the step was recorded
    #[error("[R001] Migration {version} ({origin}) failed: {cause}")]
    Execution {
        version: i64,
        origin: String,
        #[source]
        cause: StepError,
    },

    /// R002: Applied versions leave earlier migrations unapplied
    #[error("[R002] Migrations {} have been skipped", format_versions(.versions))]
    Drift { versions: Vec<i64> },

    /// Migration discovery or lookup error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database layer error
    #[error(transparent)]
    Db(#[from] DbError),
}

fn format_versions(versions: &[i64]) -> String {
    let joined = versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

/// Result type alias for RunError
pub type RunResult<T> = Result<T, RunError>;
