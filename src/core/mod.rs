//! core
//!
//! Domain types, configuration, and storage shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Strong types (BranchName, Oid, SnapshotId, UnitId)
//! - [`naming`] - Branch name normalization
//! - [`paths`] - Storage layout under `.git/revkeep`
//! - [`config`] - Global and repo configuration files
//! - [`policy`] - Policy toggles in git config
//! - [`records`] - Commit records and their store
//! - [`logging`] - `tracing` subscriber setup

pub mod config;
pub mod logging;
pub mod naming;
pub mod paths;
pub mod policy;
pub mod records;
pub mod types;
