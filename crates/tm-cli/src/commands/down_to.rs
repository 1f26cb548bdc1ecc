//! Down-to command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, VersionArgs};
use crate::commands::common::print_report;
use crate::context::RuntimeContext;

/// Roll back applied migrations above `args.version`, newest first
pub(crate) fn execute(args: &VersionArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let mut runner = ctx.runner();
    let report = runner.down_to(args.version)?;
    print_report(&report, runner.ledger().current_version()?);
    Ok(())
}
