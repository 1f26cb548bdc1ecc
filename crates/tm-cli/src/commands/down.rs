//! Down command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::print_report;
use crate::context::RuntimeContext;

/// Roll back the most recently applied migration
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let mut runner = ctx.runner();
    let report = runner.down()?;
    print_report(&report, runner.ledger().current_version()?);
    Ok(())
}
