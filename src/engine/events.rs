//! engine::events
//!
//! Lifecycle events fired around mutating operations.
//!
//! # Ordering
//!
//! - `Pre*` events fire before the operation's first mutation
//! - `Post*` events fire only after the whole operation succeeded
//! - A failed operation fires its `Pre*` event (if it got that far) and no
//!   `Post*` event
//!
//! Observers are extension points only. They run synchronously on the
//! calling thread, and a panicking observer is caught and logged so it can
//! never fail or abort the operation.
//!
//! # Example
//!
//! ```
//! use revkeep::engine::events::{Event, EventBus};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let mut bus = EventBus::new();
//! bus.subscribe(move |event| sink.lock().unwrap().push(event.name()));
//! bus.fire(&Event::PreDiscard);
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["pre_discard"]);
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::request::RevertScope;
use crate::core::types::{BranchName, Oid, UnitId};
use crate::git::CommitSummary;

/// A lifecycle event and its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    PreInit,
    PostInit,
    PreCheckout { branch: BranchName },
    PostCheckout { branch: BranchName },
    PostCommit { revision: Oid, files: usize },
    PostBranchCreated { branch: BranchName },
    PostBranchDeleted { branch: BranchName },
    PreMerge { branch: BranchName },
    PostMerge { branch: BranchName },
    /// Carries the remote commits about to be merged.
    PrePull { commits: Vec<CommitSummary> },
    PostPull { incoming: usize },
    PrePush,
    PostPush,
    PreDiscard,
    PostDiscard,
    PreRevert { scope: RevertScope },
    PostRevert { revision: Oid, scope: RevertScope },
    PostImport { units: Vec<UnitId> },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::PreInit => "pre_init",
            Event::PostInit => "post_init",
            Event::PreCheckout { .. } => "pre_checkout",
            Event::PostCheckout { .. } => "post_checkout",
            Event::PostCommit { .. } => "post_commit",
            Event::PostBranchCreated { .. } => "post_branch_created",
            Event::PostBranchDeleted { .. } => "post_branch_deleted",
            Event::PreMerge { .. } => "pre_merge",
            Event::PostMerge { .. } => "post_merge",
            Event::PrePull { .. } => "pre_pull",
            Event::PostPull { .. } => "post_pull",
            Event::PrePush => "pre_push",
            Event::PostPush => "post_push",
            Event::PreDiscard => "pre_discard",
            Event::PostDiscard => "post_discard",
            Event::PreRevert { .. } => "pre_revert",
            Event::PostRevert { .. } => "post_revert",
            Event::PostImport { .. } => "post_import",
        }
    }
}

type Observer = Box<dyn Fn(&Event) + Send + Sync>;

/// Registered observers, invoked in subscription order.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Observer>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// A bus with one observer that records every event, plus the record.
    pub fn recording() -> (Self, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut bus = Self::new();
        bus.subscribe(move |event| {
            if let Ok(mut events) = sink.lock() {
                events.push(event.clone());
            }
        });
        (bus, seen)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer. Never fails.
    pub fn fire(&self, event: &Event) {
        tracing::debug!(event = event.name(), observers = self.observers.len(), "fire");

        for (index, observer) in self.observers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                tracing::warn!(event = event.name(), index, "event observer panicked");
            }
        }
    }
}
