//! Runtime context for commands that touch the database

use anyhow::{Context, Result};
use std::path::PathBuf;
use tm_core::{collect, Config, MigrationSequence, Registry, MAX_VERSION, MIN_VERSION};
use tm_db::{connect, Database, DialectKind, Ledger, TableName};
use tm_run::Runner;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_config, resolve_database_config, resolve_migrations_dir};

/// Resolved configuration, open connection and collected migrations
pub(crate) struct RuntimeContext {
    pub(crate) migrations_dir: PathBuf,
    pub(crate) sequence: MigrationSequence,
    kind: DialectKind,
    table: TableName,
    db: Box<dyn Database>,
}

impl RuntimeContext {
    /// Resolve config and target, connect, and collect migrations.
    ///
    /// The CLI has no procedural migrations of its own, so `.rs` files in
    /// the migrations directory are rejected as unregistered.
    pub(crate) fn new(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let target = Config::resolve_target(global.target.as_deref());
        if let Some(name) = &target {
            log::debug!("Using target '{}'", name);
        }

        let migrations_dir = resolve_migrations_dir(global, config.as_ref(), target.as_deref())?;
        let database = resolve_database_config(global, config.as_ref(), target.as_deref())?;
        let kind = database.dialect()?;
        let table = database.table_name()?;

        let sequence = collect(&migrations_dir, &Registry::new(), MIN_VERSION, MAX_VERSION)
            .with_context(|| {
                format!("Failed to collect migrations from {}", migrations_dir.display())
            })?;

        let db = connect(kind, &database.url)
            .with_context(|| format!("Failed to connect to {} database", kind))?;
        log::debug!(
            "Connected to {} ({} migrations, ledger table {})",
            db.db_type(),
            sequence.len(),
            table
        );

        Ok(Self {
            migrations_dir,
            sequence,
            kind,
            table,
            db,
        })
    }

    pub(crate) fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.db.as_ref(), self.kind.adapter(), self.table.clone())
    }

    pub(crate) fn runner(&self) -> Runner<'_> {
        Runner::new(self.ledger(), &self.sequence)
    }
}
