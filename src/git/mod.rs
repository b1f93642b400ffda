//! git
//!
//! Repository access for the orchestrator.
//!
//! # Architecture
//!
//! Everything the orchestrator needs from version control goes through the
//! [`RepositoryDriver`] trait. No other module imports `git2` or spawns the
//! `git` binary.
//!
//! - [`Git`]: the production driver (git2 for reads, the git binary for
//!   working-tree and network mutations)
//! - [`mock::MockRepository`]: an in-memory driver for tests
//!
//! # Invariants
//!
//! - Drivers never retry and never roll back; a failed call leaves the
//!   repository wherever git left it
//! - Merge conflicts are aborted by the driver before `MergeConflict` is
//!   returned
//! - All values crossing the boundary are strong types (`Oid`, `BranchName`)

mod driver;
mod interface;
pub mod mock;

pub use driver::{
    CommitSummary, DriverError, RepositoryDriver, RepositoryState, ResetMode, WorktreeStatus,
};
pub use interface::Git;
