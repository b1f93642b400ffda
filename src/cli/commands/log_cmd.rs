//! log command - Show the audit trail

use crate::cli::{Context, Workspace};
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Print the newest `count` audit entries, newest first.
pub fn log(ctx: &Context, count: usize) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let entries = ws
        .audit()
        .recent(count)
        .with_context(|| format!("Failed to read {}", ws.audit().path().display()))?;

    if entries.is_empty() {
        output::print("No activity recorded yet.", ctx.verbosity());
        return Ok(());
    }

    for entry in &entries {
        println!("{}", output::format_audit_entry(entry));
    }
    Ok(())
}
