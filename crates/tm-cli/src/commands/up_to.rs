//! Up-to command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, VersionArgs};
use crate::commands::common::print_report;
use crate::context::RuntimeContext;

/// Apply pending migrations up to and including `args.version`
pub(crate) fn execute(args: &VersionArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let mut runner = ctx.runner();
    let report = runner.up_to(args.version)?;
    print_report(&report, runner.ledger().current_version()?);
    Ok(())
}
