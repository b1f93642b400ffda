//! core::logging
//!
//! One-time initialization of the `tracing` subscriber.
//!
//! The library only emits events; the binary decides where they go. Library
//! users who never call [`init`] get no output and pay nothing.
//!
//! `RUST_LOG` overrides the default filter for every profile.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Logging profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output, warnings and up unless `--debug`.
    Development,
    /// JSON lines on stderr, info and up.
    Production,
    /// No subscriber; used by tests.
    Test,
}

impl Profile {
    /// Pick the profile from CLI flags and config.
    pub fn from_flags(json: bool) -> Self {
        if json {
            Profile::Production
        } else {
            Profile::Development
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber. Later calls are ignored.
pub fn init(profile: Profile, debug: bool) {
    INIT_ONCE.call_once(|| {
        let default_level = if debug { "revkeep=debug" } else { "revkeep=warn" };
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
        };

        // try_init: a host application may already own the global subscriber
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .without_time()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .try_init(),
            Profile::Test => Ok(()),
        };
    });
}
