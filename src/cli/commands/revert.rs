//! revert commands - Make a branch look like an earlier revision

use crate::cli::{Context, Workspace};
use crate::core::types::BranchName;
use crate::engine::{EngineError, Outcome, Request, Respond, RevertRequest, RevertScope};
use crate::git::RepositoryDriver;
use crate::ui::output;
use anyhow::{Context as _, Result};

use super::{branch_arg, execute, report};

/// Revert `branch` (default: the current branch) to `revision`.
///
/// `inline` prints the full result; otherwise a summary line and a pointer
/// to the audit trail.
pub fn revert(
    ctx: &Context,
    revision: &str,
    branch: Option<&str>,
    scope: RevertScope,
    inline: bool,
    record_ref: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let request = Request::Revert(RevertRequest {
        branch: target_branch(&ws, branch)?,
        revision: revision.to_string(),
        scope,
        record_ref,
        respond: if inline {
            Respond::Inline
        } else {
            Respond::Redirect
        },
    });

    let outcome = execute(&ws, request, "Revert")?;
    match &outcome {
        Outcome::Reverted(revert) if revert.respond == Respond::Inline => {
            output::print(output::format_revert(revert), ctx.verbosity());
        }
        other => {
            report(ctx, other);
            output::print("See 'rk log' for the audit trail.", ctx.verbosity());
        }
    }
    Ok(())
}

/// File-only revert; writes the audit line but sends no notification.
pub fn revert_files(ctx: &Context, revision: &str, branch: Option<&str>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let request = Request::RevertFiles {
        branch: target_branch(&ws, branch)?,
        revision: revision.to_string(),
    };

    let outcome = execute(&ws, request, "Revert")?;
    report(ctx, &outcome);
    Ok(())
}

fn target_branch(ws: &Workspace, branch: Option<&str>) -> Result<BranchName> {
    if let Some(name) = branch {
        return branch_arg(name);
    }

    let current = ws
        .git()
        .current_branch()
        .context("Failed to read the current branch")?;
    match current {
        Some(branch) => Ok(branch),
        None => {
            Err(EngineError::Validation("no branch checked out; pass --branch".to_string()).into())
        }
    }
}
