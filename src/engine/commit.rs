//! engine::commit
//!
//! Commit working-tree files, or pair a data snapshot with the current
//! revision.

use crate::audit::Category;
use crate::core::records::{CommitRecord, RecordKind};
use crate::snapshot::SnapshotScope;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{is_blank_message, CommitRequest, Outcome};
use super::EngineError;

/// Width of the status column in review lines (`"M  path"`).
const STATUS_PREFIX_WIDTH: usize = 3;

/// Characters that may appear in either status column of a review line.
const STATUS_CODES: &[u8] = b" MTADRCU?!";

/// Path named by one commit entry, `None` for a blank entry.
///
/// Quick-staged entries are plain paths. Reviewed entries carry the
/// two-letter status and a space in front of the path; anything else is
/// rejected rather than cut down to a different path.
fn entry_path(entry: &str, quick_stage: bool) -> Result<Option<String>, EngineError> {
    if entry.trim().is_empty() {
        return Ok(None);
    }
    if quick_stage {
        return Ok(Some(entry.trim().to_string()));
    }

    let bytes = entry.as_bytes();
    let is_status_line = bytes.len() >= STATUS_PREFIX_WIDTH
        && STATUS_CODES.contains(&bytes[0])
        && STATUS_CODES.contains(&bytes[1])
        && bytes[2] == b' ';
    if !is_status_line {
        return Err(EngineError::Validation(format!(
            "'{}' is not a status line; pass --quick to commit plain paths",
            entry
        )));
    }

    let path = entry[STATUS_PREFIX_WIDTH..].trim();
    Ok((!path.is_empty()).then(|| path.to_string()))
}

impl Orchestrator<'_> {
    pub fn commit(&self, request: &CommitRequest) -> Result<Outcome, EngineError> {
        if is_blank_message(request.message()) {
            return Err(EngineError::Validation(
                "a commit message is required".to_string(),
            ));
        }

        match request {
            CommitRequest::Files {
                paths,
                quick_stage,
                message,
            } => self.commit_files(paths, *quick_stage, message),
            CommitRequest::Snapshot { message } => self.commit_snapshot(message),
            CommitRequest::Empty { .. } => Err(EngineError::NothingToDo(
                "no files or data selected".to_string(),
            )),
        }
    }

    fn commit_files(
        &self,
        entries: &[String],
        quick_stage: bool,
        message: &str,
    ) -> Result<Outcome, EngineError> {
        let mut paths = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(path) = entry_path(entry, quick_stage)? {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(EngineError::NothingToDo("no files selected".to_string()));
        }

        let branch = self.repo.current_branch()?;
        let pending = CommitRecord::pending(branch, message, paths.clone());

        self.repo.stage(&paths)?;
        let revision = self.repo.commit(message)?;
        let mut record = pending.committed(revision.clone());
        if record.branch.is_none() {
            // The first commit on an unborn branch creates it.
            record.branch = self.repo.current_branch()?;
        }
        self.records.put(&record)?;

        let target = record
            .branch
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "detached HEAD".to_string());
        self.audit(
            &format!("Committed #{} to {}.", revision.short(7), target),
            Category::Commit,
        );
        self.fire(Event::PostCommit {
            revision,
            files: record.files_changed(),
        });

        Ok(Outcome::Committed(record))
    }

    fn commit_snapshot(&self, message: &str) -> Result<Outcome, EngineError> {
        let revision = self.repo.current_revision()?;
        if let Some(existing) = self.records.get(&revision, RecordKind::Data)? {
            return Err(EngineError::NothingToDo(format!(
                "#{} is already paired with snapshot {}",
                revision.short(7),
                existing
                    .snapshot_id
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            )));
        }

        let snapshot = self.snapshots.snapshot(&SnapshotScope::Full, &revision)?;

        let branch = self.repo.current_branch()?;
        let record = CommitRecord::pending(branch, message, Vec::new())
            .with_snapshot(snapshot.id.clone())
            .committed(revision.clone());
        self.records.put(&record)?;

        self.audit(
            &format!(
                "Saved data snapshot ({} unit(s)) for #{}.",
                snapshot.units.len(),
                revision.short(7)
            ),
            Category::Snapshot,
        );
        self.fire(Event::PostCommit { revision, files: 0 });

        Ok(Outcome::Committed(record))
    }
}
