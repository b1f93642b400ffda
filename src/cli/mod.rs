//! cli
//!
//! Command-line interface layer for revkeep.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Wire the production drivers into an [`crate::engine::Orchestrator`]
//! - Delegate to command handlers and print outcomes
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, turns them into a
//! validated [`crate::engine::Request`], and hands that to the engine. It
//! never mutates the repository or the data store itself.

pub mod args;
pub mod commands;
mod workspace;

pub use args::{Cli, Shell};
pub use workspace::Workspace;

use std::path::PathBuf;

use anyhow::Result;

use crate::core::logging::{self, Profile};
use crate::engine::{EngineError, ErrorKind};
use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// The directory commands run in.
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let log_json = cli.log_json || Workspace::global_log_json();
    logging::init(Profile::from_flags(log_json), cli.debug);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Process exit code for a failed command.
///
/// - 2: the request was invalid
/// - 3: the request selected nothing
/// - 1: anything else
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EngineError>().map(EngineError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NothingToDo) => 3,
        _ => 1,
    }
}
