//! Migration discovery: directory scan merged with the procedural registry

use crate::error::{CoreError, CoreResult};
use crate::migration::{MigrationSequence, MigrationUnit};
use crate::parser::parse_migration;
use crate::registry::Registry;
use log::debug;
use std::path::{Path, PathBuf};

/// Extension of declarative migration files
pub const SQL_EXTENSION: &str = "sql";

/// Extension of procedural migration files
pub const RUST_EXTENSION: &str = "rs";

/// A file whose name follows `<version>_<name>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: i64,
    pub path: PathBuf,
    /// `sql` or `rs`
    pub extension: String,
}

/// Split a file name into its version.
///
/// Returns `None` for names without a numeric prefix, without `_` after it,
/// with an unknown extension, or with version 0.
pub fn parse_file_name(file_name: &str) -> Option<(i64, &str)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext != SQL_EXTENSION && ext != RUST_EXTENSION {
        return None;
    }
    let (digits, _name) = stem.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version: i64 = digits.parse().ok()?;
    if version <= 0 {
        return None;
    }
    Some((version, ext))
}

/// List migration files in `dir`, sorted by version then path.
///
/// Subdirectories and non-matching names are skipped.
pub fn discover_files(dir: &Path) -> CoreResult<Vec<MigrationFile>> {
    let unreadable = |e: std::io::Error| CoreError::DirectoryUnreadable {
        path: dir.display().to_string(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_file_name(file_name) {
            Some((version, ext)) => {
                let extension = ext.to_string();
                files.push(MigrationFile {
                    version,
                    path,
                    extension,
                });
            }
            None => debug!("Ignoring non-migration file {}", path.display()),
        }
    }

    files.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

/// Collect every migration in `dir` plus the registry's procedural units,
/// keeping versions in `(min_version, max_version]`.
pub fn collect(
    dir: &Path,
    registry: &Registry,
    min_version: i64,
    max_version: i64,
) -> CoreResult<MigrationSequence> {
    let mut units = Vec::new();

    for file in discover_files(dir)? {
        let display = file.path.display().to_string();
        if file.extension == SQL_EXTENSION {
            let content =
                std::fs::read_to_string(&file.path).map_err(|e| CoreError::IoWithPath {
                    path: display.clone(),
                    source: e,
                })?;
            let parsed = parse_migration(&display, &content)?;
            debug!("Parsed declarative migration {}", display);
            units.push(MigrationUnit::declarative(file.version, display, parsed));
        } else if !registry.contains(file.version) {
            return Err(CoreError::UnregisteredMigration {
                version: file.version,
                path: display,
            });
        }
    }

    units.extend(registry.entries().iter().map(|entry| entry.to_unit()));

    let sequence = MigrationSequence::new(units)?.filtered(min_version, max_version);
    debug!(
        "Collected {} migrations from {}",
        sequence.len(),
        dir.display()
    );
    Ok(sequence)
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
