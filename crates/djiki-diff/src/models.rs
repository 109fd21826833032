//! Data models for diff results

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation tag of a diff span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    /// Present in both texts
    Equal,
    /// Present only in the target text
    Insert,
    /// Present only in the source text
    Delete,
}

impl fmt::Display for DiffOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffOp::Equal => write!(f, "equal"),
            DiffOp::Insert => write!(f, "insert"),
            DiffOp::Delete => write!(f, "delete"),
        }
    }
}

/// A run of text tagged with its diff operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpan {
    /// Operation
    pub op: DiffOp,
    /// Text of the run
    pub text: String,
}

impl DiffSpan {
    /// Create a span
    pub fn new(op: DiffOp, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    /// Unchanged span
    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Equal, text)
    }

    /// Inserted span
    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Insert, text)
    }

    /// Deleted span
    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Delete, text)
    }

    /// Length in chars
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Inserted/deleted char counts of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Inserted chars
    pub additions: usize,
    /// Deleted chars
    pub deletions: usize,
}

/// Display diff between two texts
///
/// Spans cover both inputs completely: concatenating equal and deleted
/// spans gives the source, equal and inserted spans give the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Tagged runs in document order
    pub spans: Vec<DiffSpan>,
}

impl DiffResult {
    /// Wrap a list of spans
    pub fn new(spans: Vec<DiffSpan>) -> Self {
        Self { spans }
    }

    /// True when no span inserts or deletes anything
    pub fn is_unchanged(&self) -> bool {
        self.spans.iter().all(|s| s.op == DiffOp::Equal)
    }

    /// Rebuild the source text
    pub fn source_text(&self) -> String {
        collect_text(&self.spans, DiffOp::Insert)
    }

    /// Rebuild the target text
    pub fn target_text(&self) -> String {
        collect_text(&self.spans, DiffOp::Delete)
    }

    /// Inserted and deleted char counts
    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for span in &self.spans {
            match span.op {
                DiffOp::Insert => stats.additions += span.char_len(),
                DiffOp::Delete => stats.deletions += span.char_len(),
                DiffOp::Equal => {}
            }
        }
        stats
    }
}

pub(crate) fn collect_text(spans: &[DiffSpan], skip: DiffOp) -> String {
    spans
        .iter()
        .filter(|s| s.op != skip)
        .map(|s| s.text.as_str())
        .collect()
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Append to a span list, merging with the previous span of the same op
pub(crate) fn push_span(spans: &mut Vec<DiffSpan>, op: DiffOp, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.op == op => last.text.push_str(text),
        _ => spans.push(DiffSpan::new(op, text)),
    }
}
