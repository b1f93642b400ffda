//! checkout command - Switch branches

use crate::cli::{Context, Workspace};
use crate::engine::{CheckoutRequest, Request};
use anyhow::Result;

use super::{branch_arg, execute, report};

/// Switch to `branch`.
///
/// `new_branch` marks a branch that was just created from the current
/// tip, which has no data of its own to restore.
pub fn checkout(ctx: &Context, branch: &str, new_branch: bool) -> Result<()> {
    let request = Request::Checkout(CheckoutRequest {
        branch: branch_arg(branch)?,
        new_branch,
    });

    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, request, "Checkout")?;
    report(ctx, &outcome);
    Ok(())
}
