//! File templates for `create`

use crate::collector::{discover_files, RUST_EXTENSION, SQL_EXTENSION};
use crate::error::{CoreError, CoreResult};
use crate::registry::Registry;
use crate::version::{next_version, timestamp_version, INITIAL_VERSION};
use chrono::Utc;
use minijinja::{context, Environment};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SQL_TEMPLATE: &str = r#"-- +tidemark Up
-- SQL in this section is executed when the migration is applied.

-- +tidemark Down
-- SQL in this section is executed when the migration is rolled back.
"#;

const RUST_TEMPLATE: &str = r#"use tm_core::{Registry, StepResult};
use tm_db::Database;

/// Adds this migration to the application's registry
pub fn register(registry: &mut Registry) {
    registry.register({{ version_number }}, "{{ file_name }}", up_{{ version }}, down_{{ version }});
}

pub fn up_{{ version }}(db: &dyn Database) -> StepResult {
    // This code is executed when the migration is applied.
    let _ = db;
    Ok(())
}

pub fn down_{{ version }}(db: &dyn Database) -> StepResult {
    // This code is executed when the migration is rolled back.
    let _ = db;
    Ok(())
}
"#;

/// Kind of file `create` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationTemplate {
    #[default]
    Sql,
    Rust,
}

impl MigrationTemplate {
    /// File extension written for this template
    pub fn extension(&self) -> &'static str {
        match self {
            MigrationTemplate::Sql => SQL_EXTENSION,
            MigrationTemplate::Rust => RUST_EXTENSION,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            MigrationTemplate::Sql => SQL_TEMPLATE,
            MigrationTemplate::Rust => RUST_TEMPLATE,
        }
    }

    /// Render the template for `version` and file name `file_name`
    pub fn render(&self, version: &str, file_name: &str) -> CoreResult<String> {
        let version_number: i64 = version.parse().map_err(|_| CoreError::InvalidName {
            name: version.to_string(),
            reason: "version must be numeric".to_string(),
        })?;

        let mut env = Environment::new();
        let template_name = format!("migration.{}", self.extension());
        env.add_template(&template_name, self.source())?;
        let rendered = env.get_template(&template_name)?.render(context! {
            version => version,
            version_number => version_number,
            file_name => file_name,
        })?;
        Ok(rendered)
    }
}

impl FromStr for MigrationTemplate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(MigrationTemplate::Sql),
            "rs" | "rust" => Ok(MigrationTemplate::Rust),
            other => Err(CoreError::InvalidName {
                name: other.to_string(),
                reason: "migration type must be 'sql' or 'rs'".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for MigrationTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Reject names that would escape the directory or break the file-name layout
pub fn validate_name(name: &str) -> CoreResult<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.contains('/') || name.contains('\\') || name.contains("..") {
        Some("must not contain '/', '\\' or '..'")
    } else if name.starts_with('.') || name.starts_with('-') {
        Some("must not start with '.' or '-'")
    } else if name.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Highest version among files in `dir` and registry entries
fn last_known_version(dir: &Path, registry: &Registry) -> CoreResult<Option<i64>> {
    let from_files = if dir.exists() {
        discover_files(dir)?.last().map(|f| f.version)
    } else {
        None
    };
    let from_registry = registry.versions().last().copied();
    Ok(from_files.max(from_registry))
}

/// Write a new migration file into `dir` and return its path.
///
/// The version follows the newest existing one, or is a timestamp when
/// `force_timestamp` is set. Existing files are never overwritten.
pub fn create_migration(
    dir: &Path,
    name: &str,
    template: MigrationTemplate,
    force_timestamp: bool,
    registry: &Registry,
) -> CoreResult<PathBuf> {
    validate_name(name)?;

    let version = if force_timestamp {
        timestamp_version(Utc::now())
    } else {
        match last_known_version(dir, registry)? {
            Some(last) => next_version(last)?,
            None => INITIAL_VERSION.to_string(),
        }
    };

    write_migration(dir, &version, name, template)
}

/// Render `template` into `<dir>/<version>_<name>.<ext>`, failing if the
/// file already exists
pub fn write_migration(
    dir: &Path,
    version: &str,
    name: &str,
    template: MigrationTemplate,
) -> CoreResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let file_name = format!("{}_{}.{}", version, name, template.extension());
    let path = dir.join(&file_name);
    if path.exists() {
        return Err(CoreError::FileExists {
            path: path.display().to_string(),
        });
    }

    let content = template.render(version, &file_name)?;
    std::fs::write(&path, content).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;

    log::debug!("Wrote migration template to {}", path.display());
    Ok(path)
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
