//! Shared fixture for orchestrator unit tests.

use std::sync::{Arc, Mutex};

use super::events::{Event, EventBus};
use super::orchestrator::Orchestrator;
use crate::audit::MemoryNotifier;
use crate::core::config::PolicyDefaults;
use crate::core::policy::{Policy, PolicyKey};
use crate::core::records::MemoryRecordStore;
use crate::git::mock::{new_trace, CallTrace, MockRepository};
use crate::snapshot::mock::MockSnapshotStore;

/// Mocks wired to one shared call trace and a recording event bus.
pub struct Harness {
    pub repo: MockRepository,
    pub snapshots: MockSnapshotStore,
    pub records: MemoryRecordStore,
    pub audit: MemoryNotifier,
    pub events: EventBus,
    pub seen: Arc<Mutex<Vec<Event>>>,
    pub trace: CallTrace,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(MemoryNotifier::new())
    }

    pub fn with_notifier(audit: MemoryNotifier) -> Self {
        let trace = new_trace();
        let (events, seen) = EventBus::recording();
        Self {
            repo: MockRepository::new().with_trace(trace.clone()),
            snapshots: MockSnapshotStore::new().with_trace(trace.clone()),
            records: MemoryRecordStore::new(),
            audit,
            events,
            seen,
            trace,
        }
    }

    pub fn engine(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.repo,
            &self.snapshots,
            &self.records,
            &self.audit,
            &self.events,
        )
        .with_site_name("Test Site")
    }

    pub fn enable(&self, key: PolicyKey) {
        Policy::new(&self.repo, PolicyDefaults::default())
            .set(key, true)
            .unwrap();
    }

    /// Event names in firing order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().iter().map(Event::name).collect()
    }

    /// Trace lines, without config writes.
    pub fn calls(&self) -> Vec<String> {
        self.trace
            .lock()
            .unwrap()
            .iter()
            .filter(|line| !line.starts_with("repo: config "))
            .cloned()
            .collect()
    }

    pub fn clear_trace(&self) {
        self.trace.lock().unwrap().clear();
        self.repo.clear_operations();
    }
}
