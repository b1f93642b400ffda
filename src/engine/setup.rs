//! engine::setup
//!
//! Repository initialization and data import.

use crate::audit::Category;
use crate::core::types::UnitId;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{ImportRequest, Outcome};
use super::EngineError;

impl Orchestrator<'_> {
    /// Create a repository in the working directory.
    ///
    /// An existing repository is left alone and the request is refused.
    pub fn init_repo(&self) -> Result<Outcome, EngineError> {
        if self.repo.is_repo() {
            return Ok(Outcome::Refused {
                reason: "a repository already exists here".to_string(),
            });
        }

        self.fire(Event::PreInit);
        self.repo.init()?;

        self.audit("Initialized a new repository.", Category::Init);
        self.fire(Event::PostInit);
        Ok(Outcome::Initialized)
    }

    /// Copy data units that exist only in stored snapshots back into the
    /// live store.
    pub fn import_untracked(&self, request: &ImportRequest) -> Result<Outcome, EngineError> {
        if request.units.is_empty() {
            return Err(EngineError::Validation(
                "select at least one data unit to import".to_string(),
            ));
        }

        let units = self.snapshots.import_untracked(&request.units)?;

        if units.is_empty() {
            tracing::info!("all requested units are already live");
        } else {
            let names: Vec<&str> = units.iter().map(UnitId::as_str).collect();
            self.audit(
                &format!(
                    "Imported {} data unit(s): {}.",
                    units.len(),
                    names.join(", ")
                ),
                Category::Import,
            );
        }
        self.fire(Event::PostImport {
            units: units.clone(),
        });

        Ok(Outcome::Imported { units })
    }
}
