//! revkeep - keep a git working tree and its data store in lockstep
//!
//! revkeep drives a git working tree together with a companion data store
//! (a directory of data units) so that code and data can be switched,
//! committed, merged, pulled, and reverted as one.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - The orchestrator: one request, one ordered sequence of driver calls
//! - [`core`] - Domain types, configuration, policy, and commit records
//! - [`git`] - Single interface for all repository operations
//! - [`snapshot`] - Capture and restore of the data store
//! - [`audit`] - Audit trail and notifications
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Validation happens before the first mutation
//! 2. Checkout, merge, and revert end on a clean tracked tree or fail
//! 3. Reverts add a commit; history is never rewritten
//! 4. Nothing is rolled back; a failure leaves state where the last step put it

pub mod audit;
pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod snapshot;
pub mod ui;
