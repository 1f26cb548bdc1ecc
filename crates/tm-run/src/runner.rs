//! Applies and rolls back migrations one step at a time
//!
//! Each step runs its statements (or procedural callable) and appends one
//! ledger row. Transactional units do both inside a single `BEGIN`/`COMMIT`,
//! so a failing step leaves neither statements nor a ledger row behind.

use crate::error::{RunError, RunResult, StepError};
use log::{debug, info, warn};
use std::time::Instant;
use tm_core::{Direction, MigrationBody, MigrationSequence, MigrationUnit, MIN_VERSION};
use tm_db::{with_transaction, Database, Ledger};

/// Where the runner is in its current command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunnerState {
    #[default]
    Idle,
    /// Executing the apply step of this version
    Applying(i64),
    /// The last completed step rolled this version back
    RolledBack(i64),
    /// The step for this version failed with the given message
    Failed(i64, String),
}

/// One completed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub version: i64,

    /// File name or registration name
    pub source: String,

    pub direction: Direction,

    /// Wall time of the step in milliseconds
    pub duration_ms: u64,
}

/// Steps completed by one command, in execution order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Versions applied, in execution order
    pub fn applied(&self) -> Vec<i64> {
        self.versions(Direction::Apply)
    }

    /// Versions rolled back, in execution order
    pub fn rolled_back(&self) -> Vec<i64> {
        self.versions(Direction::Rollback)
    }

    fn versions(&self, direction: Direction) -> Vec<i64> {
        self.steps
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| s.version)
            .collect()
    }
}

/// Drives a migration sequence against one ledger
pub struct Runner<'a> {
    ledger: Ledger<'a>,
    sequence: &'a MigrationSequence,
    state: RunnerState,
}

impl<'a> Runner<'a> {
    pub fn new(ledger: Ledger<'a>, sequence: &'a MigrationSequence) -> Self {
        Self {
            ledger,
            sequence,
            state: RunnerState::Idle,
        }
    }

    /// State after the most recent step
    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger<'a> {
        &self.ledger
    }

    /// Apply every migration after the current version
    pub fn up(&mut self) -> RunResult<RunReport> {
        self.up_to(i64::MAX)
    }

    /// Apply migrations after the current version up to and including `target`
    pub fn up_to(&mut self, target: i64) -> RunResult<RunReport> {
        let mut current = self.ledger.ensure_table()?;
        let mut report = RunReport::default();
        let sequence = self.sequence;

        loop {
            let unit = match sequence.next(current) {
                Ok(unit) => unit,
                Err(e) if e.is_no_next_version() => break,
                Err(e) => return Err(e.into()),
            };
            if unit.version > target {
                break;
            }
            report.steps.push(self.run_step(unit, Direction::Apply)?);
            current = unit.version;
        }

        if report.is_empty() {
            info!("no migrations to run. current version: {}", current);
        }
        Ok(report)
    }

    /// Roll back the highest applied version
    pub fn down(&mut self) -> RunResult<RunReport> {
        let current = self.ledger.ensure_table()?;
        let mut report = RunReport::default();
        if current == 0 {
            info!("no migrations to roll back");
            return Ok(report);
        }

        let sequence = self.sequence;
        let unit = sequence.current(current)?;
        report.steps.push(self.run_step(unit, Direction::Rollback)?);
        Ok(report)
    }

    /// Roll back, highest first, while the current version is above `target`.
    ///
    /// Stops early, successfully, at an applied version with no unit.
    pub fn down_to(&mut self, target: i64) -> RunResult<RunReport> {
        let mut current = self.ledger.ensure_table()?;
        let mut report = RunReport::default();
        let sequence = self.sequence;

        while current > target && current != 0 {
            // An applied version without a unit ends the walk without failing
            let Ok(unit) = sequence.current(current) else {
                info!("no migrations to run. current version: {}", current);
                return Ok(report);
            };
            report.steps.push(self.run_step(unit, Direction::Rollback)?);
            current = self.ledger.current_version()?;
        }

        if report.is_empty() {
            info!("no migrations to roll back. current version: {}", current);
        }
        Ok(report)
    }

    /// Roll back and re-apply the highest applied version
    pub fn redo(&mut self) -> RunResult<RunReport> {
        let current = self.ledger.ensure_table()?;
        let mut report = RunReport::default();
        if current == 0 {
            info!("no migrations to roll back");
            return Ok(report);
        }

        let sequence = self.sequence;
        let unit = sequence.current(current)?;
        report.steps.push(self.run_step(unit, Direction::Rollback)?);
        report.steps.push(self.run_step(unit, Direction::Apply)?);
        Ok(report)
    }

    /// Roll back every applied version, highest first
    pub fn reset(&mut self) -> RunResult<RunReport> {
        self.ledger.ensure_table()?;
        let mut applied = self.ledger.applied_versions_above(MIN_VERSION)?;
        applied.reverse();

        let mut report = RunReport::default();
        let sequence = self.sequence;
        for version in applied {
            match sequence.current(version) {
                Ok(unit) => report.steps.push(self.run_step(unit, Direction::Rollback)?),
                Err(_) => warn!(
                    "version {} is applied but has no migration; leaving it in place",
                    version
                ),
            }
        }

        if report.is_empty() {
            info!("no migrations to roll back");
        }
        Ok(report)
    }

    /// Run one unit in one direction and record it in the ledger
    pub fn run_step(
        &mut self,
        unit: &MigrationUnit,
        direction: Direction,
    ) -> RunResult<StepOutcome> {
        // Resolve statements up front so a missing section never touches the database
        let statements = unit.statements(direction)?;

        if direction == Direction::Apply {
            self.state = RunnerState::Applying(unit.version);
        }
        let start = Instant::now();

        let ledger = &self.ledger;
        let body = |db: &dyn Database| -> RunResult<()> {
            execute_body(db, unit, direction, statements)?;
            ledger.append(unit.version, direction.is_applied())?;
            Ok(())
        };

        let result = if unit.use_transaction {
            with_transaction(ledger.db(), body)
        } else {
            warn!("Running {} outside a transaction", unit.display_name());
            body(ledger.db())
        };

        if let Err(e) = result {
            self.state = RunnerState::Failed(unit.version, e.to_string());
            return Err(e);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match direction {
            Direction::Apply => {
                info!("OK    {} ({}ms)", unit.display_name(), duration_ms);
                self.state = RunnerState::Idle;
            }
            Direction::Rollback => {
                info!("OK    rolled back {} ({}ms)", unit.display_name(), duration_ms);
                self.state = RunnerState::RolledBack(unit.version);
            }
        }

        Ok(StepOutcome {
            version: unit.version,
            source: unit.display_name().to_string(),
            direction,
            duration_ms,
        })
    }
}

fn execute_body(
    db: &dyn Database,
    unit: &MigrationUnit,
    direction: Direction,
    statements: Option<&[String]>,
) -> RunResult<()> {
    let failed = |cause: StepError| RunError::Execution {
        version: unit.version,
        origin: unit.source.clone(),
        cause,
    };

    match (&unit.body, statements) {
        (MigrationBody::Procedural { apply, rollback }, _) => {
            let step = match direction {
                Direction::Apply => apply,
                Direction::Rollback => rollback,
            };
            step(db).map_err(failed)
        }
        (MigrationBody::Declarative { .. }, Some(statements)) => {
            for stmt in statements {
                debug!("Executing statement: {}", stmt);
                db.execute_batch(stmt).map_err(|e| failed(e.into()))?;
            }
            Ok(())
        }
        (MigrationBody::Declarative { .. }, None) => Ok(()),
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
