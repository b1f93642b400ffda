//! snapshot::mock
//!
//! In-memory snapshot store for orchestrator tests.
//!
//! Live units and snapshot contents are plain strings. Calls are recorded,
//! optionally into a [`CallTrace`] shared with
//! [`MockRepository`](crate::git::mock::MockRepository) so a test can assert
//! that a snapshot happened before a checkout.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{SnapshotError, SnapshotRecord, SnapshotScope, SnapshotStore};
use crate::core::types::{Oid, SnapshotId, UnitId, UtcTimestamp};
use crate::git::mock::CallTrace;

/// Mock snapshot store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSnapshotStore {
    inner: Arc<Mutex<MockSnapshotInner>>,
}

#[derive(Debug, Default)]
struct MockSnapshotInner {
    live: BTreeMap<UnitId, String>,
    snapshots: BTreeMap<SnapshotId, (SnapshotRecord, BTreeMap<UnitId, String>)>,
    /// Ids in creation order, for deterministic `list`.
    order: Vec<SnapshotId>,
    /// Snapshots taken so far; the next id is `sequenced(rev, taken + 1)`.
    taken: u64,
    fail_on: Option<SnapshotFailOn>,
    operations: Vec<SnapshotOperation>,
    trace: Option<CallTrace>,
}

/// Which call should fail with [`SnapshotError::Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFailOn {
    Snapshot,
    Restore,
    Import,
}

/// Recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOperation {
    Snapshot { scope: SnapshotScope, revision: Oid },
    Restore { id: SnapshotId, scope: SnapshotScope },
    Import { units: Vec<UnitId> },
}

impl SnapshotOperation {
    fn label(&self) -> String {
        match self {
            SnapshotOperation::Snapshot { scope, revision } => {
                format!("snapshot {} @{}", scope_label(scope), revision.short(7))
            }
            SnapshotOperation::Restore { id, scope } => {
                format!("restore {} @{}", scope_label(scope), &id.as_str()[..7])
            }
            SnapshotOperation::Import { units } => format!(
                "import {}",
                units.iter().map(UnitId::as_str).collect::<Vec<_>>().join(" ")
            ),
        }
    }
}

fn scope_label(scope: &SnapshotScope) -> String {
    match scope {
        SnapshotScope::Full => "full".to_string(),
        SnapshotScope::Units(units) => units
            .iter()
            .map(UnitId::as_str)
            .collect::<Vec<_>>()
            .join(","),
    }
}

impl MockSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(self, trace: CallTrace) -> Self {
        self.inner.lock().unwrap().trace = Some(trace);
        self
    }

    pub fn fail_on(self, fail_on: SnapshotFailOn) -> Self {
        self.inner.lock().unwrap().fail_on = Some(fail_on);
        self
    }

    pub fn set_unit(&self, unit: &str, contents: &str) {
        let unit = UnitId::new(unit).unwrap_or_else(|e| panic!("bad unit in test: {e}"));
        self.inner
            .lock()
            .unwrap()
            .live
            .insert(unit, contents.to_string());
    }

    pub fn remove_unit(&self, unit: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.live.retain(|u, _| u.as_str() != unit);
    }

    pub fn unit(&self, unit: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .live
            .iter()
            .find(|(u, _)| u.as_str() == unit)
            .map(|(_, c)| c.clone())
    }

    pub fn operations(&self) -> Vec<SnapshotOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.lock().unwrap().snapshots.len()
    }

    fn record(&self, op: SnapshotOperation) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(trace) = &inner.trace {
            trace.lock().unwrap().push(format!("data: {}", op.label()));
        }
        inner.operations.push(op);
    }

    fn check_fail(&self, expected: SnapshotFailOn) -> Result<(), SnapshotError> {
        if self.inner.lock().unwrap().fail_on == Some(expected) {
            return Err(SnapshotError::Backend {
                message: format!("injected {:?} failure", expected),
            });
        }
        Ok(())
    }
}

impl SnapshotStore for MockSnapshotStore {
    fn snapshot(
        &self,
        scope: &SnapshotScope,
        revision: &Oid,
    ) -> Result<SnapshotRecord, SnapshotError> {
        self.record(SnapshotOperation::Snapshot {
            scope: scope.clone(),
            revision: revision.clone(),
        });
        self.check_fail(SnapshotFailOn::Snapshot)?;

        let mut inner = self.inner.lock().unwrap();
        let contents: BTreeMap<UnitId, String> = match scope {
            SnapshotScope::Full => inner.live.clone(),
            SnapshotScope::Units(units) => units
                .iter()
                .map(|u| {
                    inner
                        .live
                        .get(u)
                        .map(|c| (u.clone(), c.clone()))
                        .ok_or_else(|| SnapshotError::UnitNotFound {
                            unit: u.to_string(),
                        })
                })
                .collect::<Result<_, _>>()?,
        };

        inner.taken += 1;
        let id = SnapshotId::sequenced(revision, inner.taken);
        let record = SnapshotRecord {
            id: id.clone(),
            created_at: UtcTimestamp::now(),
            method: scope.method(),
            revision: revision.clone(),
            units: contents.keys().cloned().collect(),
        };

        inner.order.push(id.clone());
        inner.snapshots.insert(id, (record.clone(), contents));
        Ok(record)
    }

    fn restore(
        &self,
        id: &SnapshotId,
        scope: &SnapshotScope,
    ) -> Result<SnapshotRecord, SnapshotError> {
        self.record(SnapshotOperation::Restore {
            id: id.clone(),
            scope: scope.clone(),
        });
        self.check_fail(SnapshotFailOn::Restore)?;

        let mut inner = self.inner.lock().unwrap();
        let (record, contents) = inner
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| SnapshotError::NotFound { id: id.to_string() })?;

        match scope {
            SnapshotScope::Full => inner.live = contents,
            SnapshotScope::Units(units) => {
                for unit in units {
                    let value = contents.get(unit).cloned().ok_or_else(|| {
                        SnapshotError::UnitNotFound {
                            unit: unit.to_string(),
                        }
                    })?;
                    inner.live.insert(unit.clone(), value);
                }
            }
        }
        Ok(record)
    }

    fn import_untracked(&self, units: &[UnitId]) -> Result<Vec<UnitId>, SnapshotError> {
        self.record(SnapshotOperation::Import {
            units: units.to_vec(),
        });
        self.check_fail(SnapshotFailOn::Import)?;

        let mut inner = self.inner.lock().unwrap();
        let mut imported = Vec::new();
        for unit in units {
            if inner.live.contains_key(unit) {
                continue;
            }
            let value = inner
                .order
                .iter()
                .rev()
                .filter_map(|id| inner.snapshots.get(id))
                .find_map(|(_, contents)| contents.get(unit).cloned())
                .ok_or_else(|| SnapshotError::UnitNotFound {
                    unit: unit.to_string(),
                })?;
            inner.live.insert(unit.clone(), value);
            imported.push(unit.clone());
        }
        Ok(imported)
    }

    fn find(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.snapshots.get(id).map(|(record, _)| record.clone()))
    }

    fn list(&self) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.snapshots.get(id))
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn untracked_units(&self) -> Result<Vec<UnitId>, SnapshotError> {
        let inner = self.inner.lock().unwrap();
        let mut units: Vec<UnitId> = inner
            .snapshots
            .values()
            .flat_map(|(record, _)| record.units.iter().cloned())
            .filter(|u| !inner.live.contains_key(u))
            .collect();
        units.sort();
        units.dedup();
        Ok(units)
    }
}
