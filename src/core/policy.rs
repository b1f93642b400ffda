//! core::policy
//!
//! Policy toggles read before destructive operations.
//!
//! Toggles live in git config under the `revkeep` namespace so they travel
//! with the clone's `.git/config` and can be flipped with plain
//! `git config revkeep.snapshot-on-pull true`. When a key is unset, the
//! `[policy]` table of the repo config file supplies the default; when that
//! is unset too, the toggle is off.
//!
//! The orchestrator writes exactly one key itself: `last-snapshot-id`, the
//! undo point recorded before a pull.

use std::str::FromStr;

use crate::core::config::PolicyDefaults;
use crate::core::types::SnapshotId;
use crate::git::{DriverError, RepositoryDriver};

/// Git config namespace for every policy key.
pub const POLICY_NAMESPACE: &str = "revkeep";

/// Key holding the undo snapshot recorded before the last pull.
pub const LAST_SNAPSHOT_KEY: &str = "last-snapshot-id";

/// A boolean policy toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKey {
    /// Snapshot before checkout, restore after switching to an existing branch.
    SnapshotOnCheckout,
    /// Snapshot before pulling and remember it as the undo point.
    SnapshotOnPull,
    /// Push after a revert commit.
    AutoPush,
}

impl PolicyKey {
    pub const ALL: [PolicyKey; 3] = [
        PolicyKey::SnapshotOnCheckout,
        PolicyKey::SnapshotOnPull,
        PolicyKey::AutoPush,
    ];

    /// Git config key name (without namespace).
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKey::SnapshotOnCheckout => "snapshot-on-checkout",
            PolicyKey::SnapshotOnPull => "snapshot-on-pull",
            PolicyKey::AutoPush => "auto-push",
        }
    }

    fn default_from(&self, defaults: &PolicyDefaults) -> bool {
        match self {
            PolicyKey::SnapshotOnCheckout => defaults.snapshot_on_checkout,
            PolicyKey::SnapshotOnPull => defaults.snapshot_on_pull,
            PolicyKey::AutoPush => defaults.auto_push,
        }
        .unwrap_or(false)
    }
}

impl std::fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PolicyKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = PolicyKey::ALL.iter().map(PolicyKey::as_str).collect();
                format!("unknown policy '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

/// Parse a git-style boolean.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Policy view over one repository.
pub struct Policy<'a> {
    repo: &'a dyn RepositoryDriver,
    defaults: PolicyDefaults,
}

impl<'a> Policy<'a> {
    pub fn new(repo: &'a dyn RepositoryDriver, defaults: PolicyDefaults) -> Self {
        Self { repo, defaults }
    }

    /// Whether a toggle is on. Git config wins over file defaults.
    pub fn enabled(&self, key: PolicyKey) -> Result<bool, DriverError> {
        let fallback = key.default_from(&self.defaults);

        match self.repo.get_config(POLICY_NAMESPACE, key.as_str())? {
            None => Ok(fallback),
            Some(raw) => Ok(parse_bool(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    key = %key,
                    value = %raw,
                    fallback,
                    "unrecognized policy value"
                );
                fallback
            })),
        }
    }

    pub fn set(&self, key: PolicyKey, enabled: bool) -> Result<(), DriverError> {
        let value = if enabled { "true" } else { "false" };
        self.repo.set_config(POLICY_NAMESPACE, key.as_str(), value)
    }

    /// The undo point recorded by the last pull, if any.
    pub fn last_snapshot(&self) -> Result<Option<SnapshotId>, DriverError> {
        match self.repo.get_config(POLICY_NAMESPACE, LAST_SNAPSHOT_KEY)? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(SnapshotId::new(raw.trim())?)),
            _ => Ok(None),
        }
    }

    pub fn record_last_snapshot(&self, id: &SnapshotId) -> Result<(), DriverError> {
        self.repo
            .set_config(POLICY_NAMESPACE, LAST_SNAPSHOT_KEY, id.as_str())
    }
}
