//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tm_db::{DialectKind, TableName, DEFAULT_LEDGER_TABLE};

/// Environment variable consulted when no `--target` flag is given
pub const TARGET_ENV_VAR: &str = "TIDEMARK_TARGET";

/// Config file names looked up in the config directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tidemark.yml", "tidemark.yaml"];

const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Project configuration from tidemark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding `<version>_<name>.<ext>` files
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Base database connection
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Named overrides (e.g. dev, staging, production)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            database: None,
            targets: HashMap::new(),
        }
    }
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database fields overriding the base database, field by field
    #[serde(default)]
    pub database: Option<DatabaseOverride>,

    /// Migrations directory override
    #[serde(default)]
    pub migrations_dir: Option<String>,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Dialect identifier (postgres, mysql, sqlite3, redshift, duckdb)
    pub driver: String,

    /// Connection string or database file path
    pub url: String,

    /// Ledger table name, optionally schema-qualified
    #[serde(default = "default_table")]
    pub table: String,
}

/// Partial database block of a target; omitted fields come from the base
/// `database` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub table: Option<String>,
}

impl DatabaseOverride {
    /// Apply these fields on top of `base`.
    ///
    /// Without a base, `driver` and `url` must both be present.
    pub fn merge_onto(&self, base: Option<&DatabaseConfig>) -> CoreResult<DatabaseConfig> {
        let mut merged = match (base, &self.driver, &self.url) {
            (Some(base), _, _) => base.clone(),
            (None, Some(driver), Some(url)) => DatabaseConfig::new(driver.clone(), url.clone()),
            (None, _, _) => {
                return Err(CoreError::ConfigInvalid {
                    message: "database needs 'driver' and 'url' when no base database is configured"
                        .to_string(),
                })
            }
        };
        if let Some(driver) = &self.driver {
            merged.driver = driver.clone();
        }
        if let Some(url) = &self.url {
            merged.url = url.clone();
        }
        if let Some(table) = &self.table {
            merged.table = table.clone();
        }
        Ok(merged)
    }
}

impl DatabaseConfig {
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            url: url.into(),
            table: default_table(),
        }
    }

    /// Parsed dialect
    pub fn dialect(&self) -> CoreResult<DialectKind> {
        self.driver
            .parse::<DialectKind>()
            .map_err(|e| CoreError::ConfigInvalid {
                message: e.to_string(),
            })
    }

    /// Validated ledger table name
    pub fn table_name(&self) -> CoreResult<TableName> {
        TableName::parse(&self.table).map_err(|e| CoreError::ConfigInvalid {
            message: e.to_string(),
        })
    }

    fn validate(&self) -> CoreResult<()> {
        self.dialect()?;
        self.table_name()?;
        if self.url.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: format!("database url for driver '{}' cannot be empty", self.driver),
            });
        }
        Ok(())
    }
}

fn default_migrations_dir() -> String {
    DEFAULT_MIGRATIONS_DIR.to_string()
}

fn default_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory containing tidemark.yml or tidemark.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .map(|path| Self::load(&path))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                })
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }
        if let Some(db) = &self.database {
            db.validate()?;
        }
        for (name, target) in &self.targets {
            if let Some(over) = &target.database {
                over.merge_onto(self.database.as_ref())
                    .and_then(|db| db.validate())
                    .map_err(|e| CoreError::ConfigInvalid {
                        message: format!("target '{}': {}", name, e),
                    })?;
            }
        }
        Ok(())
    }

    fn target(&self, target: Option<&str>) -> CoreResult<Option<&TargetConfig>> {
        let Some(name) = target else {
            return Ok(None);
        };
        self.targets.get(name).map(Some).ok_or_else(|| {
            let mut available: Vec<&str> = self.targets.keys().map(|k| k.as_str()).collect();
            available.sort_unstable();
            CoreError::ConfigInvalid {
                message: format!(
                    "Target '{}' not found. Available targets: [{}]",
                    name,
                    available.join(", ")
                ),
            }
        })
    }

    /// Database configuration with the target's fields merged over the base.
    ///
    /// `None` when neither the base config nor the target names a database.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<Option<DatabaseConfig>> {
        let over = self.target(target)?.and_then(|tc| tc.database.as_ref());
        match over {
            Some(over) => over.merge_onto(self.database.as_ref()).map(Some),
            None => Ok(self.database.clone()),
        }
    }

    /// Migrations directory, applying target overrides, relative to `root`
    pub fn get_migrations_dir(&self, root: &Path, target: Option<&str>) -> CoreResult<PathBuf> {
        let dir = self
            .target(target)?
            .and_then(|tc| tc.migrations_dir.as_deref())
            .unwrap_or(&self.migrations_dir);
        Ok(root.join(dir))
    }

    /// Resolve target from CLI flag or TIDEMARK_TARGET environment variable
    ///
    /// Priority: CLI flag > TIDEMARK_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
