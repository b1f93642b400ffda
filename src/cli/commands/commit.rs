//! commit command - Commit files or pair a data snapshot with HEAD

use crate::cli::{Context, Workspace};
use crate::engine::{CommitRequest, Outcome, Request};
use crate::ui::output;
use anyhow::Result;

use super::{execute, report};

/// Commit `paths`, or snapshot the data store when `snapshot` is set and
/// no paths are given.
pub fn commit(
    ctx: &Context,
    message: &str,
    paths: Vec<String>,
    quick: bool,
    snapshot: bool,
) -> Result<()> {
    if !paths.is_empty() && snapshot {
        output::warn("paths given; ignoring --snapshot", ctx.verbosity());
    }
    let request = Request::Commit(CommitRequest::from_inputs(message, paths, quick, snapshot));

    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, request, "Commit")?;
    report(ctx, &outcome);

    if let Outcome::Committed(record) = &outcome {
        if !record.files.is_empty() {
            output::debug(
                format!("files:\n{}", output::format_list(&record.files, "  ")),
                ctx.verbosity(),
            );
        }
    }
    Ok(())
}
