//! policy command - Read or change policy toggles

use crate::cli::{Context, Workspace};
use crate::core::policy::{parse_bool, PolicyKey};
use crate::engine::EngineError;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Print one toggle as `true`/`false`, or every toggle as `key = value`
/// followed by the last pull's undo point.
pub fn get(ctx: &Context, key: Option<PolicyKey>) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let engine = ws.orchestrator();
    let policy = engine.policy();

    if let Some(key) = key {
        let enabled = policy
            .enabled(key)
            .with_context(|| format!("Failed to read policy {}", key))?;
        println!("{}", enabled);
        return Ok(());
    }

    for key in PolicyKey::ALL {
        let enabled = policy
            .enabled(key)
            .with_context(|| format!("Failed to read policy {}", key))?;
        println!("{} = {}", key, enabled);
    }
    let undo = policy
        .last_snapshot()
        .context("Failed to read the last snapshot id")?;
    output::print(
        format!(
            "last-snapshot-id = {}",
            undo.map(|id| id.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        ),
        ctx.verbosity(),
    );
    Ok(())
}

/// Set a toggle in git config.
pub fn set(ctx: &Context, key: PolicyKey, value: &str) -> Result<()> {
    let enabled = parse_bool(value).ok_or_else(|| {
        EngineError::Validation(format!(
            "'{}' is not a boolean (use true/false, yes/no, on/off, 1/0)",
            value
        ))
    })?;

    let ws = Workspace::open(ctx)?;
    ws.orchestrator()
        .policy()
        .set(key, enabled)
        .with_context(|| format!("Failed to set policy {}", key))?;

    output::print(format!("Set {} = {}", key, enabled), ctx.verbosity());
    Ok(())
}
