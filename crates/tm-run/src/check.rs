//! Detection of migrations skipped by out-of-order application

use crate::error::{RunError, RunResult};
use tm_core::MigrationSequence;
use tm_db::Ledger;

/// Versions in `sequence` that lie below some applied version but were
/// never applied themselves.
///
/// `applied` must be ascending. Scanning stops once the sequence is
/// exhausted, so applied versions past the last known unit are not reported.
pub fn find_skipped(applied: &[i64], sequence: &MigrationSequence, min_version: i64) -> Vec<i64> {
    let mut skipped = Vec::new();
    let mut current = min_version;

    for &version in applied {
        let mut next = sequence.next(current);
        while let Ok(unit) = next {
            if unit.version >= version {
                break;
            }
            skipped.push(unit.version);
            current = unit.version;
            next = sequence.next(current);
        }
        match next {
            Ok(unit) if unit.version == version => current = unit.version,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    skipped
}

/// Fail with [`RunError::Drift`] when the ledger shows skipped migrations.
///
/// Read-only: a missing ledger table counts as an empty ledger.
pub fn check(ledger: &Ledger<'_>, sequence: &MigrationSequence, min_version: i64) -> RunResult<()> {
    let applied = if ledger.exists()? {
        ledger.applied_versions_above(min_version)?
    } else {
        Vec::new()
    };

    let versions = find_skipped(&applied, sequence, min_version);
    if versions.is_empty() {
        log::debug!("No skipped migrations among {} applied", applied.len());
        Ok(())
    } else {
        Err(RunError::Drift { versions })
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
