//! Patch data types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{collect_text, DiffOp, DiffSpan};

/// One context-anchored unit of a patch
///
/// Offsets and lengths count chars. `old_start` is where the hunk sits in
/// the text the patch was made from, `new_start` where it sits once every
/// earlier hunk has been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Offset in the source text
    pub old_start: usize,
    /// Offset in the partially patched text
    pub new_start: usize,
    /// Chars of context and deletions
    pub old_len: usize,
    /// Chars of context and insertions
    pub new_len: usize,
    /// Context, deletions and insertions in order
    pub spans: Vec<DiffSpan>,
}

impl Hunk {
    /// Text the hunk expects to find
    pub fn source_text(&self) -> String {
        collect_text(&self.spans, DiffOp::Insert)
    }

    /// Text the hunk leaves behind
    pub fn target_text(&self) -> String {
        collect_text(&self.spans, DiffOp::Delete)
    }
}

fn range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

fn escape(text: &str) -> String {
    text.replace('%', "%25").replace('\n', "%0A")
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            range(self.old_start, self.old_len),
            range(self.new_start, self.new_len)
        )?;
        for span in &self.spans {
            let prefix = match span.op {
                DiffOp::Equal => ' ',
                DiffOp::Insert => '+',
                DiffOp::Delete => '-',
            };
            writeln!(f, "{}{}", prefix, escape(&span.text))?;
        }
        Ok(())
    }
}

/// Reversible edit script between two texts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Hunks in document order
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// Patch that changes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the patch has no hunks
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Number of hunks
    pub fn len(&self) -> usize {
        self.hunks.len()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hunk in &self.hunks {
            write!(f, "{}", hunk)?;
        }
        Ok(())
    }
}

/// Outcome of applying a patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchResult {
    /// Patched text; regions of failed hunks are left untouched
    pub text: String,
    /// One flag per hunk, true when the hunk applied
    pub applied: Vec<bool>,
}

impl PatchResult {
    /// True when no hunk failed; an empty patch counts as applied
    pub fn all_applied(&self) -> bool {
        self.applied.iter().all(|ok| *ok)
    }

    /// Indices of the hunks that failed
    pub fn failed_hunks(&self) -> Vec<usize> {
        self.applied
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(i, _)| i)
            .collect()
    }
}
