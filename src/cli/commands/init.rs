//! init command - Create a repository in the working directory

use crate::cli::{Context, Workspace};
use crate::engine::Request;
use anyhow::Result;

use super::{execute, report};

/// Create a repository, or report that one already exists.
pub fn init(ctx: &Context) -> Result<()> {
    let ws = Workspace::for_init(ctx)?;
    let outcome = execute(&ws, Request::Init, "Init")?;
    report(ctx, &outcome);
    Ok(())
}
