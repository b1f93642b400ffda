//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout, diagnostics to stderr. Everything except errors
//! respects the quiet flag.

use std::fmt::Display;

use crate::audit::AuditEntry;
use crate::engine::RevertOutcome;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One audit entry as a log line: `2026-01-01 12:00:00 [commit] message`.
pub fn format_audit_entry(entry: &AuditEntry) -> String {
    format!(
        "{} [{}] {}",
        entry.timestamp.as_datetime().format("%Y-%m-%d %H:%M:%S"),
        entry.category,
        entry.message
    )
}

/// Multi-line revert report for `--inline`.
pub fn format_revert(outcome: &RevertOutcome) -> String {
    let mut lines = vec![
        format!("branch:   {}", outcome.branch),
        format!("target:   {}", outcome.target),
        format!("scope:    {}", outcome.scope),
    ];
    if let Some(rev) = &outcome.new_revision {
        lines.push(format!("commit:   {}", rev));
    }
    if let Some(id) = &outcome.restored {
        lines.push(format!("restored: {}", id));
    }
    if outcome.pushed {
        lines.push("pushed:   yes".to_string());
    }
    lines.join("\n")
}
