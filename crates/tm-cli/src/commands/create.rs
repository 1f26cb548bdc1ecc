//! Create command implementation - writes a new migration file

use anyhow::{Context, Result};
use tm_core::{create_migration, Config, Registry};

use crate::cli::{CreateArgs, GlobalArgs};
use crate::commands::common::{load_config, resolve_migrations_dir};

/// Write a templated migration file; no database connection is opened
pub(crate) fn execute(args: &CreateArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let target = Config::resolve_target(global.target.as_deref());
    let dir = resolve_migrations_dir(global, config.as_ref(), target.as_deref())?;

    let path = create_migration(
        &dir,
        &args.name,
        args.kind.into(),
        args.timestamp,
        &Registry::new(),
    )
    .with_context(|| format!("Failed to create migration '{}'", args.name))?;

    println!("Created new file: {}", path.display());
    Ok(())
}
