//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Command handlers print through this module so quiet and debug modes
//! behave the same everywhere. Diagnostics meant for operators go through
//! `tracing` instead.

pub mod output;
