//! discard command - Throw away uncommitted changes

use crate::cli::{Context, Workspace};
use crate::engine::Request;
use anyhow::Result;

use super::{execute, report};

pub fn discard(ctx: &Context) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, Request::Discard, "Discard")?;
    report(ctx, &outcome);
    Ok(())
}
