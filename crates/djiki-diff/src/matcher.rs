//! Fuzzy location of a pattern near an expected offset
//!
//! Bit-parallel approximate matching (Bitap / shift-or with errors). A
//! candidate's score is its error ratio plus its distance from the expected
//! location scaled by `distance`; the best candidate under `threshold` wins.

use std::collections::HashMap;

use crate::config::DiffConfig;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Matcher {
    threshold: f64,
    distance: usize,
    max_bits: usize,
}

impl Matcher {
    pub(crate) fn new(config: &DiffConfig) -> Self {
        Self {
            threshold: config.match_threshold,
            distance: config.match_distance,
            max_bits: config.match_max_bits.min(DiffConfig::MAX_BITS_LIMIT),
        }
    }

    /// Best location of `pattern` in `text` near `loc`
    pub(crate) fn find(&self, text: &[char], pattern: &[char], loc: isize) -> Option<usize> {
        let loc = loc.clamp(0, text.len() as isize) as usize;
        if text == pattern {
            return Some(0);
        }
        if text.is_empty() {
            return None;
        }
        if loc + pattern.len() <= text.len() && &text[loc..loc + pattern.len()] == pattern {
            return Some(loc);
        }
        self.bitap(text, pattern, loc)
    }

    fn score(&self, errors: usize, x: isize, loc: usize, pattern_len: usize) -> f64 {
        let accuracy = errors as f64 / pattern_len as f64;
        let proximity = (loc as isize - x).unsigned_abs();
        if self.distance == 0 {
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / self.distance as f64
    }

    fn bitap(&self, text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
        if pattern.is_empty() || pattern.len() > self.max_bits {
            return None;
        }
        let alphabet = alphabet(pattern);
        let plen = pattern.len();

        // exact hits bound the threshold from above
        let mut threshold = self.threshold;
        if let Some(exact) = find_from(text, pattern, loc) {
            threshold = threshold.min(self.score(0, exact as isize, loc, plen));
            if let Some(exact) = rfind_upto(text, pattern, loc + plen) {
                threshold = threshold.min(self.score(0, exact as isize, loc, plen));
            }
        }

        let match_mask: u64 = 1 << (plen - 1);
        let mut best_loc = None;
        let mut bin_max = plen + text.len();
        let mut last_rd: Vec<u64> = Vec::new();

        for d in 0..plen {
            // widest window where d errors can still beat the threshold
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                if self.score(d, (loc + bin_mid) as isize, loc, plen) <= threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            bin_max = bin_mid;

            let mut start = (loc as isize - bin_mid as isize + 1).max(1) as usize;
            let finish = (loc + bin_mid).min(text.len()) + plen;

            let mut rd = vec![0u64; finish + 2];
            rd[finish + 1] = (1u64 << d) - 1;
            let mut j = finish;
            while j >= start {
                let char_match = text
                    .get(j - 1)
                    .and_then(|c| alphabet.get(c).copied())
                    .unwrap_or(0);
                rd[j] = if d == 0 {
                    ((rd[j + 1] << 1) | 1) & char_match
                } else {
                    (((rd[j + 1] << 1) | 1) & char_match)
                        | (((last_rd[j + 1] | last_rd[j]) << 1) | 1)
                        | last_rd[j + 1]
                };
                if rd[j] & match_mask != 0 {
                    let score = self.score(d, j as isize - 1, loc, plen);
                    if score <= threshold {
                        threshold = score;
                        best_loc = Some(j - 1);
                        if j - 1 > loc {
                            start = (2 * loc as isize - (j as isize - 1)).max(1) as usize;
                        } else {
                            // already past loc, can only get worse
                            break;
                        }
                    }
                }
                j -= 1;
            }

            if self.score(d + 1, loc as isize, loc, plen) > threshold {
                break;
            }
            last_rd = rd;
        }

        best_loc
    }
}

fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks = HashMap::new();
    let len = pattern.len();
    for (i, c) in pattern.iter().enumerate() {
        *masks.entry(*c).or_insert(0u64) |= 1 << (len - i - 1);
    }
    masks
}

/// First occurrence at or after `from`
pub(crate) fn find_from(text: &[char], pattern: &[char], from: usize) -> Option<usize> {
    if pattern.is_empty() {
        return (from <= text.len()).then_some(from);
    }
    if from >= text.len() {
        return None;
    }
    text[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|i| i + from)
}

/// Last occurrence starting at or before `upto`
pub(crate) fn rfind_upto(text: &[char], pattern: &[char], upto: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(upto.min(text.len()));
    }
    if pattern.len() > text.len() {
        return None;
    }
    let last_start = upto.min(text.len() - pattern.len());
    (0..=last_start)
        .rev()
        .find(|&i| &text[i..i + pattern.len()] == pattern)
}
