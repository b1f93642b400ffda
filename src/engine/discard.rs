//! engine::discard

use crate::audit::Category;
use crate::git::ResetMode;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::Outcome;
use super::EngineError;

impl Orchestrator<'_> {
    /// Throw away every uncommitted change, untracked files included.
    ///
    /// On failure no `PostDiscard` event fires and nothing is audited.
    pub fn discard(&self) -> Result<Outcome, EngineError> {
        self.fire(Event::PreDiscard);

        self.repo.reset(ResetMode::Hard, "HEAD", true)?;

        self.audit("Discarded all uncommitted changes.", Category::Discard);
        self.fire(Event::PostDiscard);
        Ok(Outcome::Discarded)
    }
}
