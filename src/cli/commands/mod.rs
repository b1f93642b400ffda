//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Turns raw arguments into a typed [`Request`]
//! 2. Opens the [`Workspace`] and runs the request through the orchestrator
//! 3. Formats and displays the outcome
//!
//! Handlers do NOT perform repository or data-store mutations directly.

mod branch;
mod checkout;
mod commit;
mod completion;
mod discard;
mod import;
mod init;
mod log_cmd;
mod merge;
mod policy;
mod revert;
mod sync;

// Re-export command functions for testing and direct invocation
pub use branch::{create_branch, delete_branch};
pub use checkout::checkout;
pub use commit::commit;
pub use completion::completion;
pub use discard::discard;
pub use import::{import, list_importable};
pub use init::init;
pub use log_cmd::log;
pub use merge::merge;
pub use policy::{get as policy_get, set as policy_set};
pub use revert::{revert, revert_files};
pub use sync::{pull, push};

use anyhow::{Context as _, Result};

use super::args::{BranchAction, Command, PolicyAction};
use super::{Context, Workspace};
use crate::core::types::BranchName;
use crate::engine::{EngineError, Outcome, Request};
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init => init::init(ctx),
        Command::Checkout { branch, new } => checkout::checkout(ctx, &branch, new),
        Command::Commit {
            message,
            paths,
            quick,
            snapshot,
        } => commit::commit(ctx, &message, paths, quick, snapshot),
        Command::Branch { action } => match action {
            BranchAction::Create { name, checkout } => branch::create_branch(ctx, &name, checkout),
            BranchAction::Delete { name, remote } => branch::delete_branch(ctx, &name, remote),
        },
        Command::Merge {
            branch,
            import_data,
        } => merge::merge(ctx, &branch, import_data),
        Command::Pull => sync::pull(ctx),
        Command::Push => sync::push(ctx),
        Command::Discard => discard::discard(ctx),
        Command::Revert {
            revision,
            branch,
            scope,
            inline,
            record_ref,
        } => revert::revert(
            ctx,
            &revision,
            branch.as_deref(),
            scope,
            inline,
            record_ref,
        ),
        Command::RevertFiles { revision, branch } => {
            revert::revert_files(ctx, &revision, branch.as_deref())
        }
        Command::Import { units, list } => {
            if list {
                import::list_importable(ctx)
            } else {
                import::import(ctx, &units)
            }
        }
        Command::Policy { action } => match action {
            PolicyAction::Get { key } => policy::get(ctx, key),
            PolicyAction::Set { key, value } => policy::set(ctx, key, &value),
        },
        Command::Log { count } => log_cmd::log(ctx, count),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Run one request against an open workspace.
///
/// `what` names the operation in the error context ("Checkout failed").
fn execute(ws: &Workspace, request: Request, what: &str) -> Result<Outcome> {
    ws.orchestrator()
        .handle(request)
        .with_context(|| format!("{} failed", what))
}

/// Print an outcome's summary, or the refusal reason as a warning.
fn report(ctx: &Context, outcome: &Outcome) {
    match outcome {
        Outcome::Refused { reason } => {
            output::warn(format!("nothing done: {}", reason), ctx.verbosity())
        }
        other => output::print(other.summary(), ctx.verbosity()),
    }
}

/// Parse a branch argument as given. A bad name is a validation error.
fn branch_arg(raw: &str) -> Result<BranchName> {
    BranchName::new(raw)
        .map_err(EngineError::from)
        .with_context(|| format!("Invalid branch name '{}'", raw))
}
