//! Check command implementation

use anyhow::Result;
use tm_core::MIN_VERSION;
use tm_run::RunError;

use crate::cli::GlobalArgs;
use crate::commands::common::ExitCode;
use crate::context::RuntimeContext;

/// Exit 1 when applied versions leave earlier migrations unapplied
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    match tm_run::check(&ctx.ledger(), &ctx.sequence, MIN_VERSION) {
        Ok(()) => {
            println!("No skipped migrations");
            Ok(())
        }
        Err(RunError::Drift { versions }) => {
            let list: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
            eprintln!("Skipped migrations: {}", list.join(", "));
            Err(ExitCode(1).into())
        }
        Err(e) => Err(e.into()),
    }
}
