//! tm-core - Core library for Tidemark
//!
//! Configuration, migration units and their discovery, the directive parser,
//! the procedural registry, and version allocation for new files.

pub mod collector;
pub mod config;
pub mod error;
pub mod migration;
pub mod parser;
pub mod registry;
pub mod template;
pub mod version;

pub use collector::{collect, discover_files, parse_file_name, MigrationFile};
pub use config::{Config, DatabaseConfig, DatabaseOverride, TargetConfig};
pub use error::{CoreError, CoreResult};
pub use migration::{
    Direction, MigrationBody, MigrationFn, MigrationKind, MigrationSequence, MigrationUnit,
    StepResult, MAX_VERSION, MIN_VERSION,
};
pub use parser::{parse_migration, ParsedMigration};
pub use registry::{RegisteredMigration, Registry};
pub use template::{create_migration, MigrationTemplate};
pub use version::{is_timestamp_version, next_version};
