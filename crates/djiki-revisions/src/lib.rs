#![warn(missing_docs)]

//! Revert and undo for djiki
//!
//! Reverting restores the content of an earlier revision as a new revision.
//! Undoing computes the inverse patch of one revision and applies it to the
//! current head, so later unrelated edits survive; when the patch no longer
//! applies the conflict is reported instead of writing anything.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;

// Re-export public API
pub use config::{CoordinatorConfig, WikiConfig, DEFAULT_TIMESTAMP_FORMAT, MAX_COMMIT_RETRIES};
pub use coordinator::RevisionCoordinator;
pub use error::{ConfigError, ConfigResult};
pub use models::{PatchConflict, RevisionDiff, RevisionDraft, UndoCommitOutcome, UndoOutcome};
