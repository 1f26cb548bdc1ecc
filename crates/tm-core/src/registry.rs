//! Explicit registry of procedural migrations
//!
//! Applications build a `Registry` in a bootstrap function and hand it to the
//! collector. Duplicate versions are accepted here; the collector reports
//! them together with every conflicting source.

use crate::migration::{MigrationFn, MigrationUnit};

/// One registered apply/rollback pair
#[derive(Debug, Clone)]
pub struct RegisteredMigration {
    pub version: i64,
    /// Registration name shown as the unit's source
    pub name: String,
    pub apply: MigrationFn,
    pub rollback: MigrationFn,
    pub use_transaction: bool,
}

impl RegisteredMigration {
    /// Convert into a collectable unit
    pub fn to_unit(&self) -> MigrationUnit {
        MigrationUnit::procedural(
            self.version,
            self.name.clone(),
            self.apply,
            self.rollback,
            self.use_transaction,
        )
    }
}

/// Owned collection of procedural migrations
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegisteredMigration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration whose steps run inside a transaction
    pub fn register(
        &mut self,
        version: i64,
        name: impl Into<String>,
        apply: MigrationFn,
        rollback: MigrationFn,
    ) -> &mut Self {
        self.push(version, name.into(), apply, rollback, true)
    }

    /// Register a migration whose steps run without a transaction
    pub fn register_no_tx(
        &mut self,
        version: i64,
        name: impl Into<String>,
        apply: MigrationFn,
        rollback: MigrationFn,
    ) -> &mut Self {
        self.push(version, name.into(), apply, rollback, false)
    }

    fn push(
        &mut self,
        version: i64,
        name: String,
        apply: MigrationFn,
        rollback: MigrationFn,
        use_transaction: bool,
    ) -> &mut Self {
        log::debug!("Registered procedural migration {} ({})", version, name);
        self.entries.push(RegisteredMigration {
            version,
            name,
            apply,
            rollback,
            use_transaction,
        });
        self
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[RegisteredMigration] {
        &self.entries
    }

    /// First entry registered under `version`
    pub fn get(&self, version: i64) -> Option<&RegisteredMigration> {
        self.entries.iter().find(|e| e.version == version)
    }

    pub fn contains(&self, version: i64) -> bool {
        self.get(version).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered versions, ascending and deduplicated
    pub fn versions(&self) -> Vec<i64> {
        let mut versions: Vec<i64> = self.entries.iter().map(|e| e.version).collect();
        versions.sort_unstable();
        versions.dedup();
        versions
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
