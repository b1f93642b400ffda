//! import command - Bring snapshot-only data units into the live store

use crate::cli::{Context, Workspace};
use crate::core::types::UnitId;
use crate::engine::{EngineError, ImportRequest, Request};
use crate::snapshot::SnapshotStore;
use crate::ui::output;
use anyhow::{Context as _, Result};

use super::{execute, report};

pub fn import(ctx: &Context, units: &[String]) -> Result<()> {
    let units = units
        .iter()
        .map(|raw| {
            UnitId::new(raw.as_str())
                .map_err(EngineError::from)
                .with_context(|| format!("Invalid data unit '{}'", raw))
        })
        .collect::<Result<Vec<_>>>()?;

    let ws = Workspace::open(ctx)?;
    let outcome = execute(&ws, Request::Import(ImportRequest { units }), "Import")?;
    report(ctx, &outcome);
    Ok(())
}

/// Print the units that exist only in snapshots.
pub fn list_importable(ctx: &Context) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let units = ws
        .snapshots()
        .untracked_units()
        .context("Failed to list snapshot units")?;

    if units.is_empty() {
        output::print("Every snapshotted unit is already live.", ctx.verbosity());
    } else {
        // Unit names go to stdout even in quiet mode so they can be piped.
        println!("{}", output::format_list(&units, ""));
    }
    Ok(())
}
