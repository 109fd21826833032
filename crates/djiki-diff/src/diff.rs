//! Diff generation and fuzzy patch application

use similar::{Algorithm, ChangeTag, TextDiff};
use tracing::debug;

use crate::cleanup::{
    cleanup_efficiency, cleanup_merge, cleanup_semantic, levenshtein, x_index, x_index_before,
};
use crate::config::DiffConfig;
use crate::matcher::{find_from, rfind_upto, Matcher};
use crate::models::{char_len, push_span, DiffOp, DiffResult, DiffSpan};
use crate::patch::{Hunk, Patch, PatchResult};

/// Computes diffs and builds/applies patches between revisions
#[derive(Debug, Clone)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    /// Creates a DiffEngine with default tuning
    pub fn new() -> Self {
        Self::with_config(DiffConfig::default())
    }

    /// Creates a DiffEngine with the given tuning, clamped into range
    pub fn with_config(config: DiffConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Computes a display diff between two texts
    ///
    /// Lines are compared first; replaced line blocks are then compared
    /// char by char, and short equalities wedged between edits are folded
    /// away according to `edit_cost`.
    ///
    /// # Arguments
    /// * `old` - The source text
    /// * `new` - The target text
    ///
    /// # Returns
    /// Spans covering both texts; a single equal span when they match
    pub fn compute_diff(&self, old: &str, new: &str) -> DiffResult {
        let mut diffs = self.diff_main(old, new, true);
        cleanup_efficiency(&mut diffs, self.config.edit_cost);
        DiffResult::new(diffs)
    }

    /// Builds a patch that turns `old` into `new`
    ///
    /// Each hunk carries enough surrounding context to be located again in
    /// a text that has changed since.
    ///
    /// # Arguments
    /// * `old` - The text the patch applies to
    /// * `new` - The text the patch produces
    ///
    /// # Returns
    /// The patch; empty when the texts are identical
    pub fn make_patch(&self, old: &str, new: &str) -> Patch {
        let mut diffs = self.diff_main(old, new, true);
        if diffs.len() > 2 {
            cleanup_semantic(&mut diffs);
            cleanup_efficiency(&mut diffs, self.config.edit_cost);
        }
        let patch = self.patch_from_diffs(old, &diffs);
        debug!(hunks = patch.len(), "Built patch");
        patch
    }

    /// Applies a patch to a text that may differ from the one it was made from
    ///
    /// Hunks are located by exact match at their expected offset, falling
    /// back to fuzzy matching nearby. A hunk that cannot be located is
    /// skipped and reported as failed; the remaining hunks still apply.
    ///
    /// # Arguments
    /// * `patch` - The patch to apply
    /// * `text` - The text to patch
    ///
    /// # Returns
    /// The patched text and one success flag per hunk
    pub fn apply_patch(&self, patch: &Patch, text: &str) -> PatchResult {
        if patch.is_empty() {
            return PatchResult {
                text: text.to_string(),
                applied: Vec::new(),
            };
        }

        let mut hunks = patch.hunks.clone();
        let padding = self.add_padding(&mut hunks);
        let mut buffer: Vec<char> = padding
            .iter()
            .copied()
            .chain(text.chars())
            .chain(padding.iter().copied())
            .collect();

        let matcher = Matcher::new(&self.config);
        let max_bits = self.config.match_max_bits;
        let mut delta: isize = 0;
        let mut applied = Vec::with_capacity(hunks.len());

        for hunk in &hunks {
            let expected = hunk.new_start as isize + delta;
            let source: Vec<char> = hunk.source_text().chars().collect();

            let mut end_loc = None;
            let start_loc = if source.len() > max_bits {
                // too long for one pass: anchor head and tail separately
                let tail = &source[source.len() - max_bits..];
                match matcher.find(&buffer, &source[..max_bits], expected) {
                    Some(start) => {
                        let tail_expected = expected + (source.len() - max_bits) as isize;
                        match matcher.find(&buffer, tail, tail_expected) {
                            Some(end) if start < end => {
                                end_loc = Some(end);
                                Some(start)
                            }
                            _ => None,
                        }
                    }
                    None => None,
                }
            } else {
                matcher.find(&buffer, &source, expected)
            };

            let Some(start) = start_loc else {
                applied.push(false);
                // later hunks expect this one's size change, which did not happen
                delta -= hunk.new_len as isize - hunk.old_len as isize;
                continue;
            };
            delta = start as isize - expected;

            let end = match end_loc {
                Some(end) => end + max_bits,
                None => start + source.len(),
            }
            .min(buffer.len());
            let found = &buffer[start..end];

            if found == source.as_slice() {
                let target: Vec<char> = hunk.target_text().chars().collect();
                buffer.splice(start..start + source.len(), target);
                applied.push(true);
                continue;
            }

            let source_text: String = source.iter().collect();
            let found_text: String = found.iter().collect();
            let local = self.diff_main(&source_text, &found_text, false);
            if source.len() > max_bits
                && levenshtein(&local) as f64 / source.len() as f64 > self.config.delete_threshold
            {
                applied.push(false);
                continue;
            }

            let mut index1 = 0;
            for span in &hunk.spans {
                let len = span.char_len();
                match span.op {
                    DiffOp::Equal => {}
                    DiffOp::Insert => {
                        let at = (start + x_index(&local, index1)).min(buffer.len());
                        buffer.splice(at..at, span.text.chars());
                    }
                    DiffOp::Delete => {
                        let from = (start + x_index(&local, index1)).min(buffer.len());
                        let to = (start + x_index_before(&local, index1 + len))
                            .min(buffer.len())
                            .max(from);
                        buffer.drain(from..to);
                    }
                }
                if span.op != DiffOp::Delete {
                    index1 += len;
                }
            }
            applied.push(true);
        }

        let pad = padding.len().min(buffer.len());
        let tail = buffer.len().saturating_sub(padding.len()).max(pad);
        let result = PatchResult {
            text: buffer[pad..tail].iter().collect(),
            applied,
        };
        if !result.all_applied() {
            debug!(failed = ?result.failed_hunks(), total = result.applied.len(), "Patch applied partially");
        }
        result
    }

    /// Raw diff, merged but not cleaned up
    fn diff_main(&self, old: &str, new: &str, checklines: bool) -> Vec<DiffSpan> {
        if old == new {
            let mut diffs = Vec::new();
            push_span(&mut diffs, DiffOp::Equal, old);
            return diffs;
        }

        let mut diffs = if checklines {
            self.line_then_char_diff(old, new)
        } else {
            similar_diff(old, new, false)
        };
        cleanup_merge(&mut diffs);
        diffs
    }

    /// Line diff with replaced blocks re-diffed char by char
    fn line_then_char_diff(&self, old: &str, new: &str) -> Vec<DiffSpan> {
        let mut out = Vec::new();
        let mut deleted = String::new();
        let mut inserted = String::new();

        let line_diffs = similar_diff(old, new, true);
        for span in line_diffs
            .into_iter()
            .chain(std::iter::once(DiffSpan::equal("")))
        {
            match span.op {
                DiffOp::Delete => deleted.push_str(&span.text),
                DiffOp::Insert => inserted.push_str(&span.text),
                DiffOp::Equal => {
                    if !deleted.is_empty() && !inserted.is_empty() {
                        for sub in similar_diff(&deleted, &inserted, false) {
                            push_span(&mut out, sub.op, &sub.text);
                        }
                    } else {
                        push_span(&mut out, DiffOp::Delete, &deleted);
                        push_span(&mut out, DiffOp::Insert, &inserted);
                    }
                    deleted.clear();
                    inserted.clear();
                    push_span(&mut out, DiffOp::Equal, &span.text);
                }
            }
        }

        out
    }

    /// Cut a cleaned-up diff into context-padded hunks
    fn patch_from_diffs(&self, old: &str, diffs: &[DiffSpan]) -> Patch {
        let margin = self.config.patch_margin;
        let mut hunks = Vec::new();
        let mut hunk = Hunk::default();
        let mut count1 = 0;
        let mut count2 = 0;
        // text before and after the hunks cut so far; context comes from the former
        let mut prepatch: Vec<char> = old.chars().collect();
        let mut postpatch = prepatch.clone();

        for (i, span) in diffs.iter().enumerate() {
            let len = span.char_len();
            if hunk.spans.is_empty() && span.op != DiffOp::Equal {
                hunk.old_start = count1;
                hunk.new_start = count2;
            }

            match span.op {
                DiffOp::Insert => {
                    hunk.spans.push(span.clone());
                    hunk.new_len += len;
                    postpatch.splice(count2..count2, span.text.chars());
                }
                DiffOp::Delete => {
                    hunk.old_len += len;
                    hunk.spans.push(span.clone());
                    postpatch.drain(count2..count2 + len);
                }
                DiffOp::Equal => {
                    if len <= 2 * margin && !hunk.spans.is_empty() && i + 1 != diffs.len() {
                        // small equality inside a hunk
                        hunk.spans.push(span.clone());
                        hunk.old_len += len;
                        hunk.new_len += len;
                    }
                    if len >= 2 * margin && !hunk.spans.is_empty() {
                        // large equality closes the hunk
                        self.add_context(&mut hunk, &prepatch);
                        hunks.push(std::mem::take(&mut hunk));
                        prepatch = postpatch.clone();
                        count1 = count2;
                    }
                }
            }

            if span.op != DiffOp::Insert {
                count1 += len;
            }
            if span.op != DiffOp::Delete {
                count2 += len;
            }
        }

        if !hunk.spans.is_empty() {
            self.add_context(&mut hunk, &prepatch);
            hunks.push(hunk);
        }

        Patch { hunks }
    }

    /// Grow context around a hunk until it is unique in `text`
    fn add_context(&self, hunk: &mut Hunk, text: &[char]) {
        if text.is_empty() {
            return;
        }
        let margin = self.config.patch_margin;
        let max_bits = self.config.match_max_bits;
        let start = hunk.new_start;
        let end = start + hunk.old_len;

        let mut pattern = slice(text, start, end);
        let mut padding = 0;
        while find_from(text, pattern, 0) != rfind_upto(text, pattern, text.len())
            && pattern.len() < max_bits.saturating_sub(2 * margin)
        {
            padding += margin;
            pattern = slice(text, start.saturating_sub(padding), end + padding);
        }
        // one more margin so the match has room for drift
        padding += margin;

        let prefix: String = slice(text, start.saturating_sub(padding), start).iter().collect();
        let suffix: String = slice(text, end, end + padding).iter().collect();
        let prefix_len = char_len(&prefix);
        let suffix_len = char_len(&suffix);
        if !prefix.is_empty() {
            hunk.spans.insert(0, DiffSpan::equal(prefix));
        }
        if !suffix.is_empty() {
            hunk.spans.push(DiffSpan::equal(suffix));
        }

        hunk.old_start -= prefix_len;
        hunk.new_start -= prefix_len;
        hunk.old_len += prefix_len + suffix_len;
        hunk.new_len += prefix_len + suffix_len;
    }

    /// Pad the first and last hunk with sentinel context so edits at either
    /// end of the text have something to anchor on
    fn add_padding(&self, hunks: &mut [Hunk]) -> Vec<char> {
        let pad_len = self.config.patch_margin;
        let padding: Vec<char> = (1..=pad_len as u32).filter_map(char::from_u32).collect();
        let pad_text: String = padding.iter().collect();

        for hunk in hunks.iter_mut() {
            hunk.old_start += pad_len;
            hunk.new_start += pad_len;
        }

        if let Some(first) = hunks.first_mut() {
            let leading = first
                .spans
                .first()
                .filter(|s| s.op == DiffOp::Equal)
                .map(|s| s.char_len());
            match leading {
                None => {
                    first.spans.insert(0, DiffSpan::equal(pad_text.clone()));
                    first.old_start -= pad_len;
                    first.new_start -= pad_len;
                    first.old_len += pad_len;
                    first.new_len += pad_len;
                }
                Some(len) if len < pad_len => {
                    let extra = pad_len - len;
                    let head: String = padding[len..].iter().collect();
                    first.spans[0].text.insert_str(0, &head);
                    first.old_start -= extra;
                    first.new_start -= extra;
                    first.old_len += extra;
                    first.new_len += extra;
                }
                Some(_) => {}
            }
        }

        if let Some(last) = hunks.last_mut() {
            let trailing = last
                .spans
                .last()
                .filter(|s| s.op == DiffOp::Equal)
                .map(|s| s.char_len());
            match trailing {
                None => {
                    last.spans.push(DiffSpan::equal(pad_text));
                    last.old_len += pad_len;
                    last.new_len += pad_len;
                }
                Some(len) if len < pad_len => {
                    let extra = pad_len - len;
                    let tail: String = padding[..extra].iter().collect();
                    if let Some(span) = last.spans.last_mut() {
                        span.text.push_str(&tail);
                    }
                    last.old_len += extra;
                    last.new_len += extra;
                }
                Some(_) => {}
            }
        }

        padding
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamped char-slice
fn slice(text: &[char], start: usize, end: usize) -> &[char] {
    let end = end.min(text.len());
    let start = start.min(end);
    &text[start..end]
}

/// Myers diff by lines or chars, consecutive changes of one kind merged
fn similar_diff(old: &str, new: &str, by_lines: bool) -> Vec<DiffSpan> {
    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    let diff = if by_lines {
        config.diff_lines(old, new)
    } else {
        config.diff_chars(old, new)
    };

    let mut spans = Vec::new();
    for change in diff.iter_all_changes() {
        let op = match change.tag() {
            ChangeTag::Equal => DiffOp::Equal,
            ChangeTag::Insert => DiffOp::Insert,
            ChangeTag::Delete => DiffOp::Delete,
        };
        push_span(&mut spans, op, change.value());
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(result: &DiffResult) -> Vec<(DiffOp, &str)> {
        result
            .spans
            .iter()
            .map(|s| (s.op, s.text.as_str()))
            .collect()
    }

    #[test]
    fn test_compute_diff_identical() {
        let engine = DiffEngine::new();
        let result = engine.compute_diff("line 1\nline 2\n", "line 1\nline 2\n");
        assert_eq!(spans(&result), vec![(DiffOp::Equal, "line 1\nline 2\n")]);
        assert!(result.is_unchanged());

        assert!(engine.compute_diff("", "").spans.is_empty());
    }

    #[test]
    fn test_compute_diff_empty_sides() {
        let engine = DiffEngine::new();
        let created = engine.compute_diff("", "new page\n");
        assert_eq!(spans(&created), vec![(DiffOp::Insert, "new page\n")]);

        let deleted = engine.compute_diff("old page\n", "");
        assert_eq!(spans(&deleted), vec![(DiffOp::Delete, "old page\n")]);
    }

    #[test]
    fn test_compute_diff_line_then_chars() {
        let engine = DiffEngine::new();
        let old = "first line\nsecond line\nthird line\n";
        let new = "first line\nsecond lane\nthird line\n";
        let result = engine.compute_diff(old, new);
        assert_eq!(result.source_text(), old);
        assert_eq!(result.target_text(), new);
        assert_eq!(result.stats().additions, 1);
        assert_eq!(result.stats().deletions, 1);
        assert_eq!(result.spans[0], DiffSpan::equal("first line\nsecond l"));
    }

    #[test]
    fn test_compute_diff_is_deterministic() {
        let engine = DiffEngine::new();
        let a = "The quick brown fox\njumps over\nthe lazy dog.\n";
        let b = "The quick red fox\njumped over\nthe dog.\n";
        assert_eq!(engine.compute_diff(a, b), engine.compute_diff(a, b));
    }

    #[test]
    fn test_compute_diff_unicode() {
        let engine = DiffEngine::new();
        let result = engine.compute_diff("zażółć gęślą", "zażółć jaźń");
        assert_eq!(result.source_text(), "zażółć gęślą");
        assert_eq!(result.target_text(), "zażółć jaźń");
    }

    #[test]
    fn test_make_patch_identical_is_empty() {
        let engine = DiffEngine::new();
        assert!(engine.make_patch("same", "same").is_empty());
        assert!(engine.make_patch("", "").is_empty());

        let result = engine.apply_patch(&Patch::empty(), "anything");
        assert_eq!(result.text, "anything");
        assert!(result.applied.is_empty());
        assert!(result.all_applied());
    }

    #[test]
    fn test_make_patch_adds_context() {
        let engine = DiffEngine::new();
        let patch = engine.make_patch("hello world", "hello");
        assert_eq!(patch.len(), 1);
        let hunk = &patch.hunks[0];
        assert_eq!(hunk.source_text(), "ello world");
        assert_eq!(hunk.target_text(), "ello");
        assert_eq!(hunk.old_start, 1);
        assert_eq!(hunk.old_len, 10);
        assert_eq!(hunk.new_len, 4);
    }

    #[test]
    fn test_make_patch_splits_distant_edits() {
        let engine = DiffEngine::new();
        let old = "alpha\nbravo\ncharlie\ndelta\necho\nfoxtrot\ngolf\n";
        let new = "alpha\nBRAVO\ncharlie\ndelta\necho\nfoxtrot\nGOLF\n";
        let patch = engine.make_patch(old, new);
        assert_eq!(patch.len(), 2);

        let result = engine.apply_patch(&patch, old);
        assert_eq!(result.text, new);
        assert_eq!(result.applied, vec![true, true]);
    }

    #[test]
    fn test_apply_patch_exact() {
        let engine = DiffEngine::new();
        let old = "The quick brown fox jumps over the lazy dog.";
        let new = "That quick brown fox jumped over a lazy dog.";
        let patch = engine.make_patch(old, new);
        let result = engine.apply_patch(&patch, old);
        assert_eq!(result.text, new);
        assert!(result.all_applied());
    }

    #[test]
    fn test_apply_patch_create_and_clear() {
        let engine = DiffEngine::new();

        let create = engine.make_patch("", "hello");
        let result = engine.apply_patch(&create, "");
        assert_eq!(result.text, "hello");
        assert_eq!(result.applied, vec![true]);

        let clear = engine.make_patch("hello", "");
        let result = engine.apply_patch(&clear, "hello");
        assert_eq!(result.text, "");
        assert_eq!(result.applied, vec![true]);
    }

    #[test]
    fn test_apply_patch_with_drift() {
        let engine = DiffEngine::new();
        let patch = engine.make_patch("hello world", "hello");

        let result = engine.apply_patch(&patch, "hello world!");
        assert_eq!(result.text, "hello!");
        assert_eq!(result.applied, vec![true]);

        let shifted = engine.apply_patch(&patch, "Oh, hello world");
        assert_eq!(shifted.text, "Oh, hello");
        assert_eq!(shifted.applied, vec![true]);
    }

    #[test]
    fn test_apply_patch_conflict_leaves_text() {
        let engine = DiffEngine::new();
        let patch = engine.make_patch("hello world", "hello");
        let result = engine.apply_patch(&patch, "xyz");
        assert_eq!(result.text, "xyz");
        assert_eq!(result.applied, vec![false]);
        assert_eq!(result.failed_hunks(), vec![0]);
    }

    #[test]
    fn test_apply_patch_partial() {
        let engine = DiffEngine::new();
        let old = "alpha\nbravo\ncharlie\ndelta\necho\nfoxtrot\ngolf\n";
        let new = "alpha\nBRAVO\ncharlie\ndelta\necho\nfoxtrot\nGOLF\n";
        let patch = engine.make_patch(old, new);

        let drifted = "alpha\nbravo\ncharlie\ndelta\necho\nzzzzzzzzzzzz\n";
        let result = engine.apply_patch(&patch, drifted);
        assert_eq!(result.applied, vec![true, false]);
        assert_eq!(
            result.text,
            "alpha\nBRAVO\ncharlie\ndelta\necho\nzzzzzzzzzzzz\n"
        );
    }

    #[test]
    fn test_apply_patch_long_hunk() {
        let engine = DiffEngine::new();
        let removed = "a long paragraph that is much longer than the matcher bit width";
        let old = format!("intro\n{}\noutro\n", removed);
        let new = "intro\noutro\n".to_string();
        let patch = engine.make_patch(&old, &new);
        assert!(patch.hunks[0].source_text().chars().count() > 32);

        let result = engine.apply_patch(&patch, &old);
        assert_eq!(result.text, new);
        assert!(result.all_applied());

        let edited_head = format!("intro\n{}\noutro\nappendix\n", removed);
        let result = engine.apply_patch(&patch, &edited_head);
        assert_eq!(result.text, "intro\noutro\nappendix\n");
        assert!(result.all_applied());
    }
}
