#![warn(missing_docs)]

//! Diff engine for djiki
//!
//! Computes human-readable diffs between revisions and builds
//! context-anchored patches that can be applied to text that has drifted
//! since the patch was made. Nothing in this crate fails on content: every
//! function is total over arbitrary input.

mod cleanup;
pub mod config;
pub mod diff;
mod matcher;
pub mod models;
pub mod patch;

// Re-export public API
pub use config::DiffConfig;
pub use diff::DiffEngine;
pub use models::{DiffOp, DiffResult, DiffSpan, DiffStats};
pub use patch::{Hunk, Patch, PatchResult};
