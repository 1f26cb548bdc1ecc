//! Per-migration status derived from the ledger

use crate::error::RunResult;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt::Write;
use tm_core::{MigrationSequence, MIN_VERSION};
use tm_db::{Ledger, LedgerRow};

/// `Mon Jan  2 15:04:05 2006`
pub const ANSIC_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Status of one collected migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,

    /// File name or registration name
    pub source: String,

    /// Timestamp of the latest row when that row is an apply event
    pub applied_at: Option<NaiveDateTime>,

    /// Every ledger row of this version, oldest first; only filled on request
    pub history: Vec<LedgerRow>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Status of every migration in `sequence`, ascending by version.
///
/// Creates the ledger table when absent.
pub fn status(
    ledger: &Ledger<'_>,
    sequence: &MigrationSequence,
    with_history: bool,
) -> RunResult<Vec<MigrationStatus>> {
    ledger.ensure_table()?;
    let latest: BTreeMap<i64, LedgerRow> = ledger
        .latest_rows_above(MIN_VERSION)?
        .into_iter()
        .map(|row| (row.version, row))
        .collect();

    sequence
        .iter()
        .map(|unit| -> RunResult<MigrationStatus> {
            let applied_at = latest
                .get(&unit.version)
                .filter(|row| row.is_applied)
                .map(|row| row.tstamp);
            let history = if with_history {
                ledger.history(unit.version)?
            } else {
                Vec::new()
            };
            Ok(MigrationStatus {
                version: unit.version,
                source: unit.display_name().to_string(),
                applied_at,
                history,
            })
        })
        .collect()
}

/// ANSIC rendering of `applied_at`, or `Pending`
pub fn format_applied_at(applied_at: Option<NaiveDateTime>) -> String {
    match applied_at {
        Some(ts) => ts.format(ANSIC_FORMAT).to_string(),
        None => "Pending".to_string(),
    }
}

/// Render the `Applied At` / `Migration` table
pub fn render_status(statuses: &[MigrationStatus], with_history: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "    Applied At                  Migration");
    let _ = writeln!(out, "    =======================================");
    for status in statuses {
        let _ = writeln!(
            out,
            "    {:<24} -- {}",
            format_applied_at(status.applied_at),
            status.source
        );
        if with_history {
            for row in &status.history {
                let event = if row.is_applied { "applied" } else { "rolled back" };
                let _ = writeln!(
                    out,
                    "        #{:<6} {:<11} {}",
                    row.id,
                    event,
                    row.tstamp.format(ANSIC_FORMAT)
                );
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
