//! Data models returned by the coordinator

use djiki_diff::DiffResult;
use djiki_domain::{AuthorRef, EntityKey, Revision, RevisionContent, RevisionId};
use serde::{Deserialize, Serialize};

/// Unsaved revision prepared for the edit form
///
/// Produced by undo, revert and edit; becomes a revision through
/// `RevisionCoordinator::commit`, which appends it on top of `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDraft {
    /// Entity the draft belongs to
    pub entity: EntityKey,
    /// Proposed content
    pub content: RevisionContent,
    /// Proposed edit summary
    pub description: String,
    /// Author the revision will carry
    pub author: Option<AuthorRef>,
    /// Head the draft was computed against, `None` for a new entity
    pub base: Option<RevisionId>,
}

/// Undo could not be applied automatically
///
/// Carries what a client needs to show the diff between the undone
/// revision and its predecessor for manual resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConflict {
    /// Revision whose undo failed
    pub target: RevisionId,
    /// Revision before the target, `None` when the target was the first
    pub predecessor: Option<RevisionId>,
    /// Indices of the hunks that could not be located
    pub failed_hunks: Vec<usize>,
    /// Number of hunks in the undo patch
    pub total_hunks: usize,
}

/// Result of computing an undo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum UndoOutcome {
    /// Every hunk applied; the draft is ready to commit
    Draft(RevisionDraft),
    /// At least one hunk failed; nothing was written
    Conflict(PatchConflict),
}

impl UndoOutcome {
    /// Whether the undo applied cleanly
    pub fn is_draft(&self) -> bool {
        matches!(self, UndoOutcome::Draft(_))
    }

    /// The draft, if the undo applied cleanly
    pub fn draft(&self) -> Option<&RevisionDraft> {
        match self {
            UndoOutcome::Draft(draft) => Some(draft),
            UndoOutcome::Conflict(_) => None,
        }
    }

    /// The conflict, if the undo failed
    pub fn conflict(&self) -> Option<&PatchConflict> {
        match self {
            UndoOutcome::Draft(_) => None,
            UndoOutcome::Conflict(conflict) => Some(conflict),
        }
    }
}

/// Result of undo followed by commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum UndoCommitOutcome {
    /// The undo was appended as a new revision
    Committed(Revision),
    /// The undo conflicted with the current head
    Conflict(PatchConflict),
}

/// Display diff between two revisions of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDiff {
    /// Source side
    pub from: Revision,
    /// Target side
    pub to: Revision,
    /// Spans turning `from` into `to`
    pub diff: DiffResult,
}
