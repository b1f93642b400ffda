//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$REVKEEP_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/revkeep/config.toml`
//! 3. `~/.revkeep/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/revkeep/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing: remote names cannot be empty and the
//! log format must be one the logging layer understands.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// log_format = "text"
///
/// [notify]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log output format ("text" or "json")
    pub log_format: Option<String>,

    /// Notification settings
    pub notify: Option<NotifyConfig>,
}

impl GlobalConfig {
    /// Accepted values for `log_format`.
    pub const LOG_FORMATS: &'static [&'static str] = &["text", "json"];

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(format) = &self.log_format {
            if !Self::LOG_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log_format '{}', must be one of: {}",
                    format,
                    Self::LOG_FORMATS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// remote = "origin"
/// data_dir = "/srv/site/data"
/// site_name = "Staging"
///
/// [policy]
/// snapshot_on_checkout = true
/// snapshot_on_pull = true
/// auto_push = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remote name (default: "origin")
    pub remote: Option<String>,

    /// Directory holding the managed data units. Must lie outside the
    /// work tree or under `.git`.
    pub data_dir: Option<PathBuf>,

    /// Name used in audit and notification messages
    pub site_name: Option<String>,

    /// Default policy toggles; git config `revkeep.*` overrides these
    pub policy: Option<PolicyDefaults>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote cannot be empty".to_string(),
                ));
            }
        }

        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "data_dir cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Policy defaults stored in the repo config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyDefaults {
    /// Take a snapshot before checkout and restore one after
    pub snapshot_on_checkout: Option<bool>,

    /// Take an undo snapshot before pulling
    pub snapshot_on_pull: Option<bool>,

    /// Push after a revert commit
    pub auto_push: Option<bool>,
}

/// Notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    /// Whether notifications are emitted at all
    pub enabled: Option<bool>,
}
