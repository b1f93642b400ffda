//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! revkeep has two configuration scopes:
//! - **Global**: User-level settings (logging, notifications)
//! - **Repo**: Repository-level settings (remote, data store, policy defaults)
//!
//! # Precedence
//!
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. Git config `revkeep.*` keys (policy toggles only, see [`crate::core::policy`])
//! 5. CLI flags (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use revkeep::core::config::Config;
//! use revkeep::core::paths::RevkeepPaths;
//! use std::path::PathBuf;
//!
//! let paths = RevkeepPaths::new(PathBuf::from("/path/to/repo/.git"));
//! let config = Config::load(Some(&paths)).unwrap();
//! println!("Remote: {}", config.remote());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, NotifyConfig, PolicyDefaults, RepoConfig};

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::paths::RevkeepPaths;

/// Site name used in messages when none is configured.
pub const DEFAULT_SITE_NAME: &str = "revkeep";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo and the file exists)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// Missing files are not an error; defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// holds an invalid value.
    pub fn load(paths: Option<&RevkeepPaths>) -> Result<Self, ConfigError> {
        let global_path = Self::find_global();
        Self::load_with_global(global_path.as_deref(), paths)
    }

    /// Load with an explicit global config location.
    pub fn load_with_global(
        global_path: Option<&Path>,
        paths: Option<&RevkeepPaths>,
    ) -> Result<Self, ConfigError> {
        let global = match global_path {
            Some(path) if path.exists() => read_toml::<GlobalConfig>(path)?,
            _ => GlobalConfig::default(),
        };
        global.validate()?;

        let repo_path = paths.map(RevkeepPaths::repo_config_path);
        let repo = match &repo_path {
            Some(path) if path.exists() => {
                let repo: RepoConfig = read_toml(path)?;
                repo.validate()?;
                Some(repo)
            }
            _ => None,
        };

        Ok(Config {
            global,
            repo,
            global_path: global_path.filter(|p| p.exists()).map(Path::to_path_buf),
            repo_path: repo_path.filter(|p| p.exists()),
        })
    }

    /// Locate the global config file, if one exists.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REVKEEP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("revkeep/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".revkeep/config.toml"))
            .filter(|path| path.exists())
    }

    // =========================================================================
    // Accessors with precedence
    // =========================================================================

    /// Remote name, defaulting to "origin".
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Directory of the managed data store.
    ///
    /// Relative paths resolve against `work_dir`. Without a configured
    /// value the store lives under `.git/revkeep/data`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the directory lies inside
    /// the work tree outside `.git`, where `git clean` would delete it.
    pub fn data_dir(&self, paths: &RevkeepPaths, work_dir: &Path) -> Result<PathBuf, ConfigError> {
        let Some(dir) = self.repo.as_ref().and_then(|r| r.data_dir.as_ref()) else {
            return Ok(paths.default_data_dir());
        };

        let resolved = normalize(&work_dir.join(dir));
        let inside_work_tree = resolved.starts_with(normalize(work_dir))
            && !resolved.starts_with(normalize(paths.git_dir()));
        if inside_work_tree {
            return Err(ConfigError::InvalidValue(format!(
                "data_dir '{}' is inside the work tree {}; use a directory outside it",
                dir.display(),
                work_dir.display()
            )));
        }
        Ok(resolved)
    }

    /// Name used in audit lines and notification subjects.
    pub fn site_name(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.site_name.as_deref())
            .unwrap_or(DEFAULT_SITE_NAME)
    }

    /// Policy defaults from the repo file (all off when absent).
    pub fn policy_defaults(&self) -> PolicyDefaults {
        self.repo
            .as_ref()
            .and_then(|r| r.policy.clone())
            .unwrap_or_default()
    }

    /// Whether logs should be emitted as JSON.
    pub fn log_json(&self) -> bool {
        self.global.log_format.as_deref() == Some("json")
    }

    /// Whether notifications are emitted, `true` when unset.
    pub fn notifications_enabled(&self) -> bool {
        self.global
            .notify
            .as_ref()
            .and_then(|n| n.enabled)
            .unwrap_or(true)
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_paths(temp: &TempDir) -> RevkeepPaths {
        RevkeepPaths::new(temp.path().join(".git"))
    }

    #[test]
    fn defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_with_global(None, Some(&repo_paths(&temp))).unwrap();

        assert_eq!(config.remote(), "origin");
        assert_eq!(config.site_name(), DEFAULT_SITE_NAME);
        assert_eq!(config.policy_defaults(), PolicyDefaults::default());
        assert!(config.notifications_enabled());
        assert!(!config.log_json());
        assert!(config.repo_config_loaded_from().is_none());
    }

    #[test]
    fn loads_global_file() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(
            &global,
            r#"
            log_format = "json"

            [notify]
            enabled = false
            "#,
        )
        .unwrap();

        let config = Config::load_with_global(Some(&global), None).unwrap();
        assert!(config.log_json());
        assert!(!config.notifications_enabled());
        assert_eq!(config.global_config_loaded_from(), Some(global.as_path()));
    }

    #[test]
    fn loads_repo_file() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(
            paths.repo_config_path(),
            r#"
            remote = "upstream"
            site_name = "Shop"
            data_dir = "../site-data"

            [policy]
            snapshot_on_pull = true
            "#,
        )
        .unwrap();

        let config = Config::load_with_global(None, Some(&paths)).unwrap();
        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.site_name(), "Shop");
        assert_eq!(config.policy_defaults().snapshot_on_pull, Some(true));
        assert_eq!(
            config.data_dir(&paths, Path::new("/work")).unwrap(),
            PathBuf::from("/site-data")
        );
    }

    fn with_data_dir(dir: &str) -> Config {
        Config {
            repo: Some(RepoConfig {
                data_dir: Some(PathBuf::from(dir)),
                ..RepoConfig::default()
            }),
            ..Config::default()
        }
    }

    #[test]
    fn data_dir_inside_work_tree_is_rejected() {
        let paths = RevkeepPaths::new(PathBuf::from("/work/.git"));
        let work_dir = Path::new("/work");

        for dir in ["var/data", "./data", "/work/data", "sub/../data", "."] {
            assert!(
                matches!(
                    with_data_dir(dir).data_dir(&paths, work_dir),
                    Err(ConfigError::InvalidValue(_))
                ),
                "{dir} should be rejected"
            );
        }
    }

    #[test]
    fn data_dir_outside_work_tree_or_under_git_dir() {
        let paths = RevkeepPaths::new(PathBuf::from("/work/.git"));
        let work_dir = Path::new("/work");

        assert_eq!(
            with_data_dir("/srv/site/data").data_dir(&paths, work_dir).unwrap(),
            PathBuf::from("/srv/site/data")
        );
        assert_eq!(
            with_data_dir("../work-data").data_dir(&paths, work_dir).unwrap(),
            PathBuf::from("/work-data")
        );
        assert_eq!(
            with_data_dir(".git/site-data").data_dir(&paths, work_dir).unwrap(),
            PathBuf::from("/work/.git/site-data")
        );
    }

    #[test]
    fn data_dir_defaults_under_git_dir() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);
        let config = Config::default();
        assert_eq!(
            config.data_dir(&paths, temp.path()).unwrap(),
            paths.default_data_dir()
        );
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let paths = repo_paths(&temp);
        fs::create_dir_all(paths.root()).unwrap();
        fs::write(paths.repo_config_path(), "trunk = \"main\"").unwrap();

        let result = Config::load_with_global(None, Some(&paths));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
