//! Line-oriented change sets between two texts.
//!
//! The diff is a sequence of [`DiffOp`] spans that covers both inputs
//! losslessly: reading Equal + Delete spans reconstructs the original text
//! exactly, reading Equal + Insert spans reconstructs the modified text
//! exactly. Rendering (colors, context elision) lives in the CLI crate and
//! never alters the op sequence.

use similar::{Algorithm, ChangeTag, TextDiff};

/// The change type of one [`DiffOp`] span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Present in both texts.
    Equal,
    /// Present only in the modified text.
    Insert,
    /// Present only in the original text.
    Delete,
}

/// One contiguous run of lines sharing a change type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    pub kind: DiffKind,
    /// Raw line values as sliced from the input, each keeping its trailing
    /// newline except possibly the last line of a text. Concatenating them
    /// reproduces the input bytes.
    pub lines: Vec<String>,
    /// 1-based first line number on the original side. Meaningful for
    /// `Equal` and `Delete`; for `Insert` it is the position the span
    /// applies at.
    pub old_start: usize,
    /// 1-based first line number on the modified side. Meaningful for
    /// `Equal` and `Insert`.
    pub new_start: usize,
}

/// Line counts of a computed diff, for summaries like `+12 -3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub insertions: usize,
    pub deletions: usize,
}

/// Compute the line diff between `original` and `modified`.
pub fn diff_lines(original: &str, modified: &str) -> Vec<DiffOp> {
    let text_diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(original, modified);

    let mut ops: Vec<DiffOp> = Vec::new();
    let mut old_line = 1usize;
    let mut new_line = 1usize;

    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => DiffKind::Equal,
            ChangeTag::Insert => DiffKind::Insert,
            ChangeTag::Delete => DiffKind::Delete,
        };
        let value = change.value().to_string();

        match ops.last_mut() {
            Some(op) if op.kind == kind => op.lines.push(value),
            _ => ops.push(DiffOp {
                kind,
                lines: vec![value],
                old_start: old_line,
                new_start: new_line,
            }),
        }

        // Each side's counter advances only for spans that exist on it.
        match kind {
            DiffKind::Equal => {
                old_line += 1;
                new_line += 1;
            }
            DiffKind::Delete => old_line += 1,
            DiffKind::Insert => new_line += 1,
        }
    }

    ops
}

/// Rebuild the original text from Equal + Delete spans.
pub fn reconstruct_original(ops: &[DiffOp]) -> String {
    collect_lines(ops, |kind| matches!(kind, DiffKind::Equal | DiffKind::Delete))
}

/// Rebuild the modified text from Equal + Insert spans.
pub fn reconstruct_modified(ops: &[DiffOp]) -> String {
    collect_lines(ops, |kind| matches!(kind, DiffKind::Equal | DiffKind::Insert))
}

/// Count inserted and deleted lines across the op sequence.
pub fn stats(ops: &[DiffOp]) -> DiffStats {
    let mut stats = DiffStats::default();
    for op in ops {
        match op.kind {
            DiffKind::Insert => stats.insertions += op.lines.len(),
            DiffKind::Delete => stats.deletions += op.lines.len(),
            DiffKind::Equal => {}
        }
    }
    stats
}

fn collect_lines(ops: &[DiffOp], keep: impl Fn(DiffKind) -> bool) -> String {
    let mut out = String::new();
    for op in ops.iter().filter(|op| keep(op.kind)) {
        for line in &op.lines {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_reconstructs_both_sides() {
        let original = "fn main() {\n    println!(\"hi\");\n}\n";
        let modified = "fn main() {\n    let name = \"world\";\n    println!(\"hi {name}\");\n}\n";

        let ops = diff_lines(original, modified);

        assert_eq!(reconstruct_original(&ops), original);
        assert_eq!(reconstruct_modified(&ops), modified);
    }

    #[test]
    fn test_round_trip_without_trailing_newline() {
        let original = "alpha\nbeta";
        let modified = "alpha\ngamma";

        let ops = diff_lines(original, modified);

        assert_eq!(reconstruct_original(&ops), original);
        assert_eq!(reconstruct_modified(&ops), modified);
    }

    #[test]
    fn test_identical_texts_yield_only_equal_ops() {
        let text = "one\ntwo\nthree\n";

        let ops = diff_lines(text, text);

        assert!(ops.iter().all(|op| op.kind == DiffKind::Equal));
        assert_eq!(reconstruct_modified(&ops), text);
    }

    #[test]
    fn test_new_file_is_all_inserts() {
        let ops = diff_lines("", "line one\nline two\n");

        assert!(ops.iter().all(|op| op.kind == DiffKind::Insert));
        assert_eq!(reconstruct_original(&ops), "");
        assert_eq!(reconstruct_modified(&ops), "line one\nline two\n");
    }

    #[test]
    fn test_consecutive_changes_merge_into_one_op() {
        let ops = diff_lines("keep\n", "keep\nadded one\nadded two\n");

        let inserts: Vec<&DiffOp> = ops.iter().filter(|op| op.kind == DiffKind::Insert).collect();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].lines.len(), 2);
    }

    #[test]
    fn test_line_numbers_advance_per_side() {
        let original = "a\nb\nc\n";
        let modified = "a\nx\nc\n";

        let ops = diff_lines(original, modified);

        // a (equal), b deleted, x inserted, c equal
        assert_eq!(ops[0].kind, DiffKind::Equal);
        assert_eq!(ops[0].old_start, 1);
        assert_eq!(ops[0].new_start, 1);

        let delete = ops.iter().find(|op| op.kind == DiffKind::Delete).unwrap();
        assert_eq!(delete.old_start, 2);

        let insert = ops.iter().find(|op| op.kind == DiffKind::Insert).unwrap();
        assert_eq!(insert.new_start, 2);

        let tail = ops.last().unwrap();
        assert_eq!(tail.kind, DiffKind::Equal);
        assert_eq!(tail.old_start, 3);
        assert_eq!(tail.new_start, 3);
    }

    #[test]
    fn test_stats_count_lines_not_ops() {
        let ops = diff_lines("a\nb\nc\n", "a\nx\ny\nz\n");

        let stats = stats(&ops);

        assert_eq!(stats.deletions, 2);
        assert_eq!(stats.insertions, 3);
    }

    #[test]
    fn test_empty_inputs() {
        let ops = diff_lines("", "");

        assert_eq!(reconstruct_original(&ops), "");
        assert_eq!(reconstruct_modified(&ops), "");
    }
}
