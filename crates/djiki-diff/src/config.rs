//! Tuning knobs for diffing, matching and patching

use serde::{Deserialize, Serialize};

/// Diff engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Equalities shorter than this many chars between edits are folded
    /// into the edits when cleaning up for display
    pub edit_cost: usize,
    /// Context chars kept on each side of a hunk
    pub patch_margin: usize,
    /// Worst fuzzy match still accepted (0.0 exact, 1.0 anything)
    pub match_threshold: f64,
    /// How far from the expected location a match may drift before its
    /// score reaches 1.0
    pub match_distance: usize,
    /// Longest pattern the bit-parallel matcher handles in one pass
    pub match_max_bits: usize,
    /// Levenshtein ratio above which a drifted long hunk is rejected
    pub delete_threshold: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            edit_cost: 4,
            patch_margin: 4,
            match_threshold: 0.5,
            match_distance: 1000,
            match_max_bits: 32,
            delete_threshold: 0.5,
        }
    }
}

impl DiffConfig {
    /// Upper bound for `match_max_bits`, set by the 64-bit match masks
    pub const MAX_BITS_LIMIT: usize = 63;

    /// Clamp every field into its working range
    pub fn validated(mut self) -> Self {
        self.patch_margin = self.patch_margin.clamp(1, 16);
        self.match_max_bits = self
            .match_max_bits
            .clamp(2 * self.patch_margin + 1, Self::MAX_BITS_LIMIT);
        self.match_threshold = clamp_ratio(self.match_threshold);
        self.delete_threshold = clamp_ratio(self.delete_threshold);
        self
    }
}

fn clamp_ratio(value: f64) -> f64 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}
