//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use tm_core::MigrationTemplate;

/// Tidemark - versioned SQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Migrations directory (overrides migrations_dir from config)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<String>,

    /// Directory containing tidemark.yml
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Database dialect (postgres, mysql, sqlite3, redshift, duckdb)
    #[arg(long, global = true)]
    pub driver: Option<String>,

    /// Connection string or database file path
    #[arg(long, global = true)]
    pub dsn: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply all pending migrations
    Up,

    /// Apply pending migrations up to and including a version
    UpTo(VersionArgs),

    /// Roll back the most recently applied migration
    Down,

    /// Roll back migrations down to (not including) a version
    DownTo(VersionArgs),

    /// Roll back and re-apply the most recently applied migration
    Redo,

    /// Roll back every applied migration
    Reset,

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Fail when migrations were skipped by out-of-order application
    Check,

    /// Print the current database version
    Version,

    /// Create a new migration file
    Create(CreateArgs),
}

/// Target version argument for up-to / down-to
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Migration version
    pub version: i64,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print every ledger row of each migration
    #[arg(long)]
    pub history: bool,
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Migration name, used in the file name
    pub name: String,

    /// File type to create
    #[arg(value_enum, default_value = "sql")]
    pub kind: MigrationType,

    /// Use a YYYYMMDDHHMMSS version even if existing files are numbered
    #[arg(long)]
    pub timestamp: bool,
}

/// Migration file types
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationType {
    /// Declarative SQL with Up/Down directives
    Sql,
    /// Procedural Rust functions registered in code
    Rs,
}

impl From<MigrationType> for MigrationTemplate {
    fn from(kind: MigrationType) -> Self {
        match kind {
            MigrationType::Sql => MigrationTemplate::Sql,
            MigrationType::Rs => MigrationTemplate::Rust,
        }
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
