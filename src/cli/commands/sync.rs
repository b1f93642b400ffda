//! sync commands - Pull from and push to the remote

use crate::cli::{Context, Workspace};
use crate::engine::{Outcome, Request};
use crate::ui::output;
use anyhow::Result;

use super::{execute, report};

/// Discard local edits, fetch, and merge the remote branch.
pub fn pull(ctx: &Context) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, Request::Pull, "Pull")?;
    report(ctx, &outcome);

    if let Outcome::Pulled { incoming, .. } = &outcome {
        let lines: Vec<String> = incoming
            .iter()
            .map(|c| format!("{} {}", c.oid.short(7), c.summary))
            .collect();
        if !lines.is_empty() {
            output::print(output::format_list(&lines, "  "), ctx.verbosity());
        }
    }
    Ok(())
}

pub fn push(ctx: &Context) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, Request::Push, "Push")?;
    report(ctx, &outcome);
    Ok(())
}
