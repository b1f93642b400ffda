//! branch command - Create and delete branches

use crate::cli::{Context, Workspace};
use crate::engine::{CreateBranchRequest, DeleteBranchRequest, EngineError, Request};
use anyhow::{Context as _, Result};

use super::{branch_arg, execute, report};

/// Create a branch at HEAD. Whitespace in `name` becomes `-`.
pub fn create_branch(ctx: &Context, name: &str, checkout: bool) -> Result<()> {
    let request = CreateBranchRequest::new(name, checkout)
        .map_err(EngineError::from)
        .with_context(|| format!("Invalid branch name '{}'", name))?;

    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, Request::CreateBranch(request), "Branch creation")?;
    report(ctx, &outcome);
    Ok(())
}

/// Delete a branch, and with `remote` its counterpart on the remote.
pub fn delete_branch(ctx: &Context, name: &str, remote: bool) -> Result<()> {
    let request = Request::DeleteBranch(DeleteBranchRequest {
        branch: branch_arg(name)?,
        delete_remote: remote,
    });

    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, request, "Branch deletion")?;
    report(ctx, &outcome);
    Ok(())
}
