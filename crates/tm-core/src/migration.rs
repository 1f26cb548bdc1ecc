//! Migration units and the version-sorted sequence they are collected into

use crate::error::{CoreError, CoreResult};
use crate::parser::ParsedMigration;
use std::path::Path;
use tm_db::Database;

/// Lowest version bound; collection keeps versions strictly above it
pub const MIN_VERSION: i64 = 0;

/// Highest version bound; collection keeps versions up to and including it
pub const MAX_VERSION: i64 = i64::MAX;

/// Outcome of a procedural migration step
pub type StepResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Apply or rollback callable of a procedural migration.
///
/// The handle is transaction-scoped when the unit uses a transaction.
pub type MigrationFn = fn(&dyn Database) -> StepResult;

/// How a unit was authored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// Parsed from a directive-annotated `.sql` file
    Declarative,
    /// Registered apply/rollback function pair
    Procedural,
}

impl std::fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationKind::Declarative => write!(f, "declarative"),
            MigrationKind::Procedural => write!(f, "procedural"),
        }
    }
}

/// Which way a step moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Apply,
    Rollback,
}

impl Direction {
    /// Section name used in files and errors
    pub fn section(&self) -> &'static str {
        match self {
            Direction::Apply => "Up",
            Direction::Rollback => "Down",
        }
    }

    /// Value written to the ledger's `is_applied` column
    pub fn is_applied(&self) -> bool {
        matches!(self, Direction::Apply)
    }
}

/// The executable payload of a unit
#[derive(Debug, Clone)]
pub enum MigrationBody {
    /// Statement lists; `None` when the file has no such section
    Declarative {
        apply: Option<Vec<String>>,
        rollback: Option<Vec<String>>,
    },
    Procedural {
        apply: MigrationFn,
        rollback: MigrationFn,
    },
}

/// One schema change
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    /// Sequence number or `YYYYMMDDHHMMSS` stamp
    pub version: i64,

    /// File path or registration name, for display only
    pub source: String,

    pub body: MigrationBody,

    /// Run each step inside a transaction (default true)
    pub use_transaction: bool,
}

impl MigrationUnit {
    /// Build a declarative unit from a parsed file
    pub fn declarative(version: i64, source: impl Into<String>, parsed: ParsedMigration) -> Self {
        Self {
            version,
            source: source.into(),
            body: MigrationBody::Declarative {
                apply: parsed.apply,
                rollback: parsed.rollback,
            },
            use_transaction: parsed.use_transaction,
        }
    }

    /// Build a procedural unit from a function pair
    pub fn procedural(
        version: i64,
        source: impl Into<String>,
        apply: MigrationFn,
        rollback: MigrationFn,
        use_transaction: bool,
    ) -> Self {
        Self {
            version,
            source: source.into(),
            body: MigrationBody::Procedural { apply, rollback },
            use_transaction,
        }
    }

    /// Declarative or procedural
    pub fn kind(&self) -> MigrationKind {
        match self.body {
            MigrationBody::Declarative { .. } => MigrationKind::Declarative,
            MigrationBody::Procedural { .. } => MigrationKind::Procedural,
        }
    }

    /// File name of the source, or the registration name
    pub fn display_name(&self) -> &str {
        Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }

    /// Statements for `direction`, failing when the section is absent.
    ///
    /// Returns `Ok(None)` for procedural units.
    pub fn statements(&self, direction: Direction) -> CoreResult<Option<&[String]>> {
        match &self.body {
            MigrationBody::Declarative { apply, rollback } => {
                let section = match direction {
                    Direction::Apply => apply,
                    Direction::Rollback => rollback,
                };
                section
                    .as_deref()
                    .map(Some)
                    .ok_or_else(|| CoreError::MissingSection {
                        migration: self.source.clone(),
                        section: direction.section().to_string(),
                    })
            }
            MigrationBody::Procedural { .. } => Ok(None),
        }
    }
}

/// Version-sorted, duplicate-free migration units
#[derive(Debug, Clone, Default)]
pub struct MigrationSequence {
    units: Vec<MigrationUnit>,
}

impl MigrationSequence {
    /// Sort `units` by version and reject duplicates, naming every origin of
    /// the first duplicated version.
    pub fn new(mut units: Vec<MigrationUnit>) -> CoreResult<Self> {
        units.sort_by_key(|u| u.version);
        if let Some(pair) = units.windows(2).find(|w| w[0].version == w[1].version) {
            let version = pair[0].version;
            let origins = units
                .iter()
                .filter(|u| u.version == version)
                .map(|u| u.source.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CoreError::DuplicateVersion { version, origins });
        }
        Ok(Self { units })
    }

    /// Keep only versions in `(min_version, max_version]`
    pub fn filtered(self, min_version: i64, max_version: i64) -> Self {
        Self {
            units: self
                .units
                .into_iter()
                .filter(|u| u.version > min_version && u.version <= max_version)
                .collect(),
        }
    }

    /// Highest-version unit
    pub fn last(&self) -> CoreResult<&MigrationUnit> {
        self.units.last().ok_or(CoreError::EmptySequence)
    }

    /// Smallest unit with version strictly greater than `after`
    pub fn next(&self, after: i64) -> CoreResult<&MigrationUnit> {
        let idx = self.units.partition_point(|u| u.version <= after);
        self.units
            .get(idx)
            .ok_or(CoreError::NoNextVersion { after })
    }

    /// Largest unit with version strictly less than `before`
    pub fn previous(&self, before: i64) -> CoreResult<&MigrationUnit> {
        let idx = self.units.partition_point(|u| u.version < before);
        idx.checked_sub(1)
            .and_then(|i| self.units.get(i))
            .ok_or(CoreError::MigrationNotFound { version: before })
    }

    /// The unit with exactly `version`
    pub fn current(&self, version: i64) -> CoreResult<&MigrationUnit> {
        self.units
            .binary_search_by_key(&version, |u| u.version)
            .map(|idx| &self.units[idx])
            .map_err(|_| CoreError::MigrationNotFound { version })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All versions, ascending
    pub fn versions(&self) -> Vec<i64> {
        self.units.iter().map(|u| u.version).collect()
    }
}

impl<'a> IntoIterator for &'a MigrationSequence {
    type Item = &'a MigrationUnit;
    type IntoIter = std::slice::Iter<'a, MigrationUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
