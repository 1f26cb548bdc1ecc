//! Version command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::context::RuntimeContext;

/// Print the current database version
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let current = ctx.ledger().ensure_table()?;
    println!("tidemark: version {}", current);
    Ok(())
}
