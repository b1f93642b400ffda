//! audit
//!
//! Audit trail and notifications for completed operations.
//!
//! # Architecture
//!
//! Every completed mutating operation writes one human-readable line through
//! a [`Notifier`]. Some operations (revert) also send a notification. The
//! orchestrator treats both as best effort: a failed write is logged with
//! `tracing` and the operation still succeeds.
//!
//! [`AuditLog`] appends JSON lines to `.git/revkeep/audit.jsonl`. The log
//! is evidence, not authority; nothing reads it back to make decisions.
//!
//! # Example
//!
//! ```no_run
//! use revkeep::audit::{AuditLog, Category, Notifier};
//! use std::path::PathBuf;
//!
//! let log = AuditLog::new(PathBuf::from(".git/revkeep/audit.jsonl"));
//! log.log("Checked out branch: feature.", Category::Checkout).unwrap();
//! for entry in log.recent(10).unwrap() {
//!     println!("{} [{}] {}", entry.timestamp, entry.category, entry.message);
//! }
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{OpId, UtcTimestamp};

/// Errors from audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize audit entry: {0}")]
    Serialize(String),

    /// A line in the log is not a valid entry.
    #[error("audit log corrupted at line {line}: {message}")]
    Corrupted { line: usize, message: String },
}

/// What kind of operation an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Branch,
    Checkout,
    Commit,
    Discard,
    Import,
    Init,
    Merge,
    Notification,
    Pull,
    Push,
    Revert,
    Snapshot,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Branch => "branch",
            Category::Checkout => "checkout",
            Category::Commit => "commit",
            Category::Discard => "discard",
            Category::Import => "import",
            Category::Init => "init",
            Category::Merge => "merge",
            Category::Notification => "notification",
            Category::Pull => "pull",
            Category::Push => "push",
            Category::Revert => "revert",
            Category::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: UtcTimestamp,
    pub category: Category,
    pub message: String,
    /// Operation that wrote the entry, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<OpId>,
}

/// Sink for audit lines and user notifications.
pub trait Notifier {
    fn log(&self, message: &str, category: Category) -> Result<(), AuditError>;

    fn notify(&self, subject: &str, body: &str) -> Result<(), AuditError>;
}

/// Append-only JSON-lines audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    notifications: bool,
    op_id: Option<OpId>,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            notifications: true,
            op_id: None,
        }
    }

    /// Turn notification delivery on or off. Audit lines are always written.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    /// Stamp every entry with this operation id.
    pub fn with_op_id(mut self, op_id: OpId) -> Self {
        self.op_id = Some(op_id);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let io_err = |source| AuditError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut line =
            serde_json::to_string(entry).map_err(|e| AuditError::Serialize(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)
    }

    /// The last `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut entries = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<AuditEntry>(line).map_err(|e| AuditError::Corrupted {
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }
}

impl Notifier for AuditLog {
    fn log(&self, message: &str, category: Category) -> Result<(), AuditError> {
        tracing::debug!(%category, message, "audit");
        self.append(&AuditEntry {
            timestamp: UtcTimestamp::now(),
            category,
            message: message.to_string(),
            op_id: self.op_id.clone(),
        })
    }

    fn notify(&self, subject: &str, body: &str) -> Result<(), AuditError> {
        if !self.notifications {
            tracing::debug!(subject, "notifications disabled, dropping");
            return Ok(());
        }

        tracing::info!(subject, body, "notification");
        self.append(&AuditEntry {
            timestamp: UtcTimestamp::now(),
            category: Category::Notification,
            message: format!("{}: {}", subject, body),
            op_id: self.op_id.clone(),
        })
    }
}

/// In-memory notifier for tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    inner: Arc<Mutex<MemoryNotifierInner>>,
}

#[derive(Debug, Default)]
struct MemoryNotifierInner {
    logs: Vec<(Category, String)>,
    notifications: Vec<(String, String)>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every call fails.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.inner.lock().unwrap().failing = true;
        notifier
    }

    pub fn logs(&self) -> Vec<(Category, String)> {
        self.inner.lock().unwrap().logs.clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().notifications.clone()
    }

    fn check(&self) -> Result<(), AuditError> {
        if self.inner.lock().unwrap().failing {
            return Err(AuditError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
            });
        }
        Ok(())
    }
}

impl Notifier for MemoryNotifier {
    fn log(&self, message: &str, category: Category) -> Result<(), AuditError> {
        self.check()?;
        self.inner
            .lock()
            .unwrap()
            .logs
            .push((category, message.to_string()));
        Ok(())
    }

    fn notify(&self, subject: &str, body: &str) -> Result<(), AuditError> {
        self.check()?;
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_and_read_back_newest_first() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("revkeep/audit.jsonl"));

        log.log("Committed #abc1234 to main.", Category::Commit)
            .unwrap();
        log.log("Pushed changes to origin/main.", Category::Push)
            .unwrap();

        let entries = log.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, Category::Push);
        assert_eq!(entries[1].message, "Committed #abc1234 to main.");
    }

    #[test]
    fn recent_truncates() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("audit.jsonl"));
        for i in 0..5 {
            log.log(&format!("entry {}", i), Category::Snapshot).unwrap();
        }
        let entries = log.recent(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "entry 4");
    }

    #[test]
    fn missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("none.jsonl"));
        assert!(log.recent(5).unwrap().is_empty());
    }

    #[test]
    fn notifications_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("audit.jsonl")).with_notifications(false);
        log.notify("Site - Commit Reverted", "reverted").unwrap();
        assert!(log.recent(5).unwrap().is_empty());
    }

    #[test]
    fn op_id_is_stamped() {
        let temp = TempDir::new().unwrap();
        let op_id = OpId::new();
        let log = AuditLog::new(temp.path().join("audit.jsonl")).with_op_id(op_id.clone());
        log.log("Discarded all uncommitted changes.", Category::Discard)
            .unwrap();
        assert_eq!(log.recent(1).unwrap()[0].op_id, Some(op_id));
    }

    #[test]
    fn corrupt_line_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.jsonl");
        fs::write(&path, "not json\n").unwrap();
        let err = AuditLog::new(path).recent(5).unwrap_err();
        assert!(matches!(err, AuditError::Corrupted { line: 1, .. }));
    }

    #[test]
    fn memory_notifier_records_and_fails_on_demand() {
        let notifier = MemoryNotifier::new();
        notifier.log("hello", Category::Init).unwrap();
        notifier.notify("subject", "body").unwrap();
        assert_eq!(notifier.logs(), vec![(Category::Init, "hello".to_string())]);
        assert_eq!(notifier.notifications().len(), 1);

        assert!(MemoryNotifier::failing()
            .log("x", Category::Init)
            .is_err());
    }
}
