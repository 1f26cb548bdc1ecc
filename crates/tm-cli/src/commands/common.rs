//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tm_core::{Config, CoreError, DatabaseConfig};
use tm_run::RunReport;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main.rs prints nothing for it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the config file.
///
/// An explicit `--config` must exist; a missing tidemark.yml in the config
/// directory yields `None`.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Option<Config>> {
    if let Some(path) = &global.config {
        let config = Config::load(Path::new(path))
            .with_context(|| format!("Failed to load configuration file {}", path))?;
        return Ok(Some(config));
    }

    match Config::load_from_dir(Path::new(&global.config_dir)) {
        Ok(config) => Ok(Some(config)),
        Err(CoreError::ConfigNotFound { path }) => {
            log::debug!("No config file at {}", path);
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to load project configuration"),
    }
}

/// Migrations directory: `--dir`, then the (target's) config value, then
/// `migrations` under the config directory
pub(crate) fn resolve_migrations_dir(
    global: &GlobalArgs,
    config: Option<&Config>,
    target: Option<&str>,
) -> Result<PathBuf> {
    if let Some(dir) = &global.dir {
        return Ok(PathBuf::from(dir));
    }
    let root = Path::new(&global.config_dir);
    match config {
        Some(config) => Ok(config.get_migrations_dir(root, target)?),
        None => Ok(root.join(Config::default().migrations_dir)),
    }
}

/// Database config from the (target's) config file, with `--driver` and
/// `--dsn` applied on top
pub(crate) fn resolve_database_config(
    global: &GlobalArgs,
    config: Option<&Config>,
    target: Option<&str>,
) -> Result<DatabaseConfig> {
    let base = match config {
        Some(config) => config.get_database_config(target)?,
        None => None,
    };

    let database = match (base, &global.driver, &global.dsn) {
        (Some(mut db), driver, dsn) => {
            if let Some(driver) = driver {
                db.driver = driver.clone();
            }
            if let Some(dsn) = dsn {
                db.url = dsn.clone();
            }
            db
        }
        (None, Some(driver), Some(dsn)) => DatabaseConfig::new(driver.clone(), dsn.clone()),
        (None, _, _) => anyhow::bail!(
            "No database configured: add a 'database' section to tidemark.yml or pass both --driver and --dsn"
        ),
    };

    database.dialect()?;
    database.table_name()?;
    Ok(database)
}

/// Print a one-line summary of a runner command
pub(crate) fn print_report(report: &RunReport, current_version: i64) {
    println!("{}", summarize(report, current_version));
}

pub(crate) fn summarize(report: &RunReport, current_version: i64) -> String {
    if report.is_empty() {
        return format!("No migrations to run. Current version: {}", current_version);
    }
    format!(
        "Applied: {}, rolled back: {}. Current version: {}",
        report.applied().len(),
        report.rolled_back().len(),
        current_version
    )
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
