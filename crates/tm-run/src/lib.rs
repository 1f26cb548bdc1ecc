//! tm-run - Migration runner for Tidemark
//!
//! Schedules apply/rollback steps against the ledger, detects skipped
//! migrations, and reports per-migration status.

pub mod check;
pub mod error;
pub mod runner;
pub mod status;

pub use check::{check, find_skipped};
pub use error::{RunError, RunResult, StepError};
pub use runner::{RunReport, Runner, RunnerState, StepOutcome};
pub use status::{format_applied_at, render_status, status, MigrationStatus};
