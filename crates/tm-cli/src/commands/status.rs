//! Status command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::context::RuntimeContext;

/// Print the applied/pending table for every collected migration
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    if ctx.sequence.is_empty() {
        println!("No migrations found in {}", ctx.migrations_dir.display());
        return Ok(());
    }

    let statuses = tm_run::status(&ctx.ledger(), &ctx.sequence, args.history)?;
    print!("{}", tm_run::render_status(&statuses, args.history));
    Ok(())
}
