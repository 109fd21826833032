//! Post-processing passes over raw diffs
//!
//! All passes preserve the source and target texts the spans describe.

use crate::models::{char_len, push_span, DiffOp, DiffSpan};

/// Canonicalize a diff
///
/// Between two equalities, all deletions are joined into one span followed
/// by one insertion; text shared by the start or end of both moves into the
/// neighbouring equalities. Adjacent equalities are merged, empty spans
/// dropped.
pub(crate) fn cleanup_merge(diffs: &mut Vec<DiffSpan>) {
    let mut out: Vec<DiffSpan> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for span in diffs.drain(..).chain(std::iter::once(DiffSpan::equal(""))) {
        match span.op {
            DiffOp::Delete => deleted.push_str(&span.text),
            DiffOp::Insert => inserted.push_str(&span.text),
            DiffOp::Equal => {
                let mut trailing = span.text;
                if !deleted.is_empty() && !inserted.is_empty() {
                    let prefix = common_prefix(&inserted, &deleted);
                    if prefix > 0 {
                        push_span(&mut out, DiffOp::Equal, &inserted[..prefix]);
                        inserted.drain(..prefix);
                        deleted.drain(..prefix);
                    }
                    let suffix = common_suffix(&inserted, &deleted);
                    if suffix > 0 {
                        let split = inserted.len() - suffix;
                        trailing = format!("{}{}", &inserted[split..], trailing);
                        inserted.truncate(split);
                        deleted.truncate(deleted.len() - suffix);
                    }
                }
                push_span(&mut out, DiffOp::Delete, &deleted);
                push_span(&mut out, DiffOp::Insert, &inserted);
                push_span(&mut out, DiffOp::Equal, &trailing);
                deleted.clear();
                inserted.clear();
            }
        }
    }

    *diffs = out;
}

/// Fold equalities that are no longer than the edits on both sides of them
///
/// Produces diffs that read as "this phrase became that phrase" instead of
/// a scatter of single-letter matches.
pub(crate) fn cleanup_semantic(diffs: &mut Vec<DiffSpan>) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    // edits before (1) and after (2) the last equality
    let (mut inserted1, mut deleted1) = (0usize, 0usize);
    let (mut inserted2, mut deleted2) = (0usize, 0usize);

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].op == DiffOp::Equal {
            equalities.push(p);
            inserted1 = inserted2;
            deleted1 = deleted2;
            inserted2 = 0;
            deleted2 = 0;
            last_equality = Some(diffs[p].text.clone());
        } else {
            let len = char_len(&diffs[p].text);
            if diffs[p].op == DiffOp::Insert {
                inserted2 += len;
            } else {
                deleted2 += len;
            }

            if let (Some(equality), Some(&index)) = (last_equality.clone(), equalities.last()) {
                let eq_len = char_len(&equality);
                if eq_len > 0
                    && eq_len <= inserted1.max(deleted1)
                    && eq_len <= inserted2.max(deleted2)
                {
                    diffs.insert(index, DiffSpan::delete(equality));
                    diffs[index + 1].op = DiffOp::Insert;
                    equalities.pop();
                    equalities.pop();
                    pointer = equalities.last().map(|&i| i as isize).unwrap_or(-1);
                    inserted1 = 0;
                    deleted1 = 0;
                    inserted2 = 0;
                    deleted2 = 0;
                    last_equality = None;
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

/// Fold short equalities that sit between edits when keeping them would
/// cost more than `edit_cost` chars of edit overhead
pub(crate) fn cleanup_efficiency(diffs: &mut Vec<DiffSpan>, edit_cost: usize) {
    if edit_cost == 0 {
        return;
    }
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    let (mut pre_ins, mut pre_del) = (false, false);
    let (mut post_ins, mut post_del) = (false, false);

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].op == DiffOp::Equal {
            if char_len(&diffs[p].text) < edit_cost && (post_ins || post_del) {
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[p].text.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[p].op == DiffOp::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            if let (Some(equality), Some(&index)) = (last_equality.clone(), equalities.last()) {
                let sides = [pre_ins, pre_del, post_ins, post_del]
                    .iter()
                    .filter(|flag| **flag)
                    .count();
                let surrounded = pre_ins && pre_del && post_ins && post_del;
                if !equality.is_empty()
                    && (surrounded || (char_len(&equality) * 2 < edit_cost && sides == 3))
                {
                    diffs.insert(index, DiffSpan::delete(equality));
                    diffs[index + 1].op = DiffOp::Insert;
                    equalities.pop();
                    last_equality = None;
                    if pre_ins && pre_del {
                        // no earlier equality can be affected
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        equalities.pop();
                        pointer = equalities.last().map(|&i| i as isize).unwrap_or(-1);
                        post_ins = false;
                        post_del = false;
                    }
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

/// Byte length of the common prefix, always on a char boundary
pub(crate) fn common_prefix(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Byte length of the common suffix, always on a char boundary
pub(crate) fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Edit distance implied by a diff, in chars
pub(crate) fn levenshtein(diffs: &[DiffSpan]) -> usize {
    let mut distance = 0;
    let mut inserted = 0;
    let mut deleted = 0;
    for span in diffs {
        match span.op {
            DiffOp::Insert => inserted += span.char_len(),
            DiffOp::Delete => deleted += span.char_len(),
            DiffOp::Equal => {
                distance += inserted.max(deleted);
                inserted = 0;
                deleted = 0;
            }
        }
    }
    distance + inserted.max(deleted)
}

/// Map a char offset in the source text of `diffs` to the target text
///
/// An offset inside a deletion maps to where the deletion was; insertions
/// exactly at the offset are placed before it.
pub(crate) fn x_index(diffs: &[DiffSpan], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut stopped_in: Option<DiffOp> = None;

    for span in diffs {
        let len = span.char_len();
        if span.op != DiffOp::Insert {
            chars1 += len;
        }
        if span.op != DiffOp::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            stopped_in = Some(span.op);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    if stopped_in == Some(DiffOp::Delete) {
        return last_chars2;
    }
    last_chars2 + (loc - last_chars1)
}

/// Like [`x_index`], but insertions exactly at the offset are placed after
/// it. Used for the end of a deleted range so the range never swallows text
/// inserted right behind it.
pub(crate) fn x_index_before(diffs: &[DiffSpan], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;

    for span in diffs {
        let len = span.char_len();
        match span.op {
            DiffOp::Insert => {
                if chars1 >= loc {
                    break;
                }
                chars2 += len;
            }
            DiffOp::Equal => {
                if chars1 + len >= loc {
                    return chars2 + (loc - chars1);
                }
                chars1 += len;
                chars2 += len;
            }
            DiffOp::Delete => {
                if chars1 + len > loc {
                    return chars2;
                }
                chars1 += len;
            }
        }
    }

    chars2 + loc.saturating_sub(chars1)
}
