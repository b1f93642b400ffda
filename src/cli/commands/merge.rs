//! merge command - Merge a branch into the current one

use crate::cli::{Context, Workspace};
use crate::engine::{EngineError, MergeRequest, Request};
use crate::git::DriverError;
use crate::ui::output;
use anyhow::Result;

use super::{branch_arg, execute, report};

pub fn merge(ctx: &Context, branch: &str, import_data: bool) -> Result<()> {
    let request = Request::Merge(MergeRequest {
        branch: branch_arg(branch)?,
        import_data,
    });

    let ws = Workspace::open(ctx)?;
    let result = execute(&ws, request, "Merge");

    if let Err(err) = &result {
        let driver = err
            .downcast_ref::<EngineError>()
            .and_then(EngineError::driver_error);
        if let Some(DriverError::MergeConflict { files, .. }) = driver {
            output::print(
                format!(
                    "The merge was aborted. Conflicting files:\n{}",
                    output::format_list(files, "  ")
                ),
                ctx.verbosity(),
            );
        }
    }

    report(ctx, &result?);
    Ok(())
}
