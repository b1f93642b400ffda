//! snapshot::file_store
//!
//! Directory-backed snapshot storage.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/                  live units, one regular file each
//! <snapshots_dir>/<id>/        copies of the captured units
//! <snapshots_dir>/<id>/manifest.json
//! ```
//!
//! The manifest holds the [`SnapshotRecord`] plus a sha256 digest per unit.
//! Restores verify every digest before writing anything to the live store.
//!
//! Snapshots are written into `<id>.tmp` and renamed into place, so a
//! crash mid-copy never leaves a half-written snapshot under a valid id.
//! An existing snapshot directory is never removed or overwritten.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SnapshotError, SnapshotRecord, SnapshotScope, SnapshotStore};
use crate::core::types::{Digest, Oid, SnapshotId, UnitId, UtcTimestamp};

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    record: SnapshotRecord,
    digests: BTreeMap<UnitId, Digest>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError {
    let path = path.to_path_buf();
    move |source| SnapshotError::Io { path, source }
}

/// Snapshots stored as plain directories.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    data_dir: PathBuf,
    snapshots_dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(data_dir: PathBuf, snapshots_dir: PathBuf) -> Self {
        Self {
            data_dir,
            snapshots_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.snapshots_dir.join(id.as_str())
    }

    /// Units currently in the live store, sorted.
    ///
    /// Subdirectories and files whose names are not valid unit ids are ignored.
    pub fn live_units(&self) -> Result<Vec<UnitId>, SnapshotError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut units = Vec::new();
        for entry in fs::read_dir(&self.data_dir).map_err(io_err(&self.data_dir))? {
            let entry = entry.map_err(io_err(&self.data_dir))?;
            let file_type = entry.file_type().map_err(io_err(&entry.path()))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(unit) = entry.file_name().to_str().and_then(|n| UnitId::new(n).ok()) {
                units.push(unit);
            }
        }
        units.sort();
        Ok(units)
    }

    fn read_manifest(&self, id: &SnapshotId) -> Result<Option<Manifest>, SnapshotError> {
        let path = self.snapshot_dir(id).join(UnitId::MANIFEST);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(io_err(&path))?;
        let manifest = serde_json::from_str(&contents).map_err(|e| SnapshotError::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(manifest))
    }

    /// Read a unit out of a snapshot and check it against the manifest.
    fn verified_unit(
        &self,
        manifest: &Manifest,
        unit: &UnitId,
    ) -> Result<Vec<u8>, SnapshotError> {
        let id = &manifest.record.id;
        let expected = manifest
            .digests
            .get(unit)
            .ok_or_else(|| SnapshotError::UnitNotFound {
                unit: format!("{} (in snapshot {})", unit, id),
            })?;

        let path = self.snapshot_dir(id).join(unit.as_str());
        let bytes = fs::read(&path).map_err(io_err(&path))?;
        if &Digest::of(&bytes) != expected {
            return Err(SnapshotError::Corrupt {
                id: id.to_string(),
                unit: unit.to_string(),
            });
        }
        Ok(bytes)
    }

    fn write_live(&self, unit: &UnitId, bytes: &[u8]) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.data_dir).map_err(io_err(&self.data_dir))?;
        let path = self.data_dir.join(unit.as_str());
        fs::write(&path, bytes).map_err(io_err(&path))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn snapshot(
        &self,
        scope: &SnapshotScope,
        revision: &Oid,
    ) -> Result<SnapshotRecord, SnapshotError> {
        let live = self.live_units()?;
        let units = match scope {
            SnapshotScope::Full => live,
            SnapshotScope::Units(wanted) => {
                if let Some(missing) = wanted.iter().find(|u| !live.contains(u)) {
                    return Err(SnapshotError::UnitNotFound {
                        unit: missing.to_string(),
                    });
                }
                let mut wanted = wanted.clone();
                wanted.sort();
                wanted.dedup();
                wanted
            }
        };

        let id = SnapshotId::generate(revision);
        let final_dir = self.snapshot_dir(&id);
        if final_dir.exists() {
            return Err(SnapshotError::AlreadyExists { id: id.to_string() });
        }
        let temp_dir = self.snapshots_dir.join(format!("{}.tmp", id));
        fs::create_dir_all(&temp_dir).map_err(io_err(&temp_dir))?;

        let mut digests = BTreeMap::new();
        for unit in &units {
            let source = self.data_dir.join(unit.as_str());
            let bytes = fs::read(&source).map_err(io_err(&source))?;
            let target = temp_dir.join(unit.as_str());
            fs::write(&target, &bytes).map_err(io_err(&target))?;
            digests.insert(unit.clone(), Digest::of(&bytes));
        }

        let record = SnapshotRecord {
            id: id.clone(),
            created_at: UtcTimestamp::now(),
            method: scope.method(),
            revision: revision.clone(),
            units,
        };
        let manifest = Manifest {
            record: record.clone(),
            digests,
        };
        let manifest_path = temp_dir.join(UnitId::MANIFEST);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| SnapshotError::Manifest {
            path: manifest_path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&manifest_path, json).map_err(io_err(&manifest_path))?;

        fs::rename(&temp_dir, &final_dir).map_err(io_err(&final_dir))?;

        tracing::info!(id = %id, units = record.units.len(), method = ?record.method, "snapshot taken");
        Ok(record)
    }

    fn restore(
        &self,
        id: &SnapshotId,
        scope: &SnapshotScope,
    ) -> Result<SnapshotRecord, SnapshotError> {
        let manifest = self
            .read_manifest(id)?
            .ok_or_else(|| SnapshotError::NotFound { id: id.to_string() })?;

        let units: Vec<UnitId> = match scope {
            SnapshotScope::Full => manifest.record.units.clone(),
            SnapshotScope::Units(wanted) => wanted.clone(),
        };

        // Verify everything up front so a corrupt snapshot restores nothing.
        let contents = units
            .iter()
            .map(|unit| Ok((unit, self.verified_unit(&manifest, unit)?)))
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        if matches!(scope, SnapshotScope::Full) {
            for stale in self.live_units()? {
                if !manifest.digests.contains_key(&stale) {
                    let path = self.data_dir.join(stale.as_str());
                    fs::remove_file(&path).map_err(io_err(&path))?;
                }
            }
        }

        for (unit, bytes) in contents {
            self.write_live(unit, &bytes)?;
        }

        tracing::info!(id = %id, units = units.len(), "snapshot restored");
        Ok(manifest.record)
    }

    fn import_untracked(&self, units: &[UnitId]) -> Result<Vec<UnitId>, SnapshotError> {
        let live = self.live_units()?;
        let snapshots = self.list()?;
        let mut imported = Vec::new();

        for unit in units {
            if live.contains(unit) {
                tracing::debug!(unit = %unit, "already in the live store, skipping import");
                continue;
            }

            let source = snapshots
                .iter()
                .find(|s| s.units.contains(unit))
                .ok_or_else(|| SnapshotError::UnitNotFound {
                    unit: unit.to_string(),
                })?;
            let manifest = self
                .read_manifest(&source.id)?
                .ok_or_else(|| SnapshotError::NotFound {
                    id: source.id.to_string(),
                })?;

            let bytes = self.verified_unit(&manifest, unit)?;
            self.write_live(unit, &bytes)?;
            imported.push(unit.clone());
        }

        Ok(imported)
    }

    fn find(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, SnapshotError> {
        Ok(self.read_manifest(id)?.map(|m| m.record))
    }

    fn list(&self) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        if !self.snapshots_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.snapshots_dir).map_err(io_err(&self.snapshots_dir))? {
            let entry = entry.map_err(io_err(&self.snapshots_dir))?;
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|n| SnapshotId::new(n).ok())
            else {
                continue;
            };
            if let Some(manifest) = self.read_manifest(&id)? {
                records.push(manifest.record);
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn untracked_units(&self) -> Result<Vec<UnitId>, SnapshotError> {
        let live = self.live_units()?;
        let mut units: Vec<UnitId> = self
            .list()?
            .into_iter()
            .flat_map(|s| s.units)
            .filter(|u| !live.contains(u))
            .collect();
        units.sort();
        units.dedup();
        Ok(units)
    }
}
