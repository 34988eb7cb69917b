//! Minimal unified diff between two texts.
//!
//! Line-level LCS over the two inputs, printed in unified format with a
//! fixed three-line context. Enough for dry-run previews and logs; not a
//! general diff library.

const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Keep,
    Remove,
    Add,
}

/// Render a unified diff of `old` against `new`. Returns an empty string
/// when the texts are identical.
pub fn unified_diff(old_label: &str, new_label: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = diff_ops(&old_lines, &new_lines);

    let mut output = format!("--- {old_label}\n+++ {new_label}\n");
    for hunk in hunks(&ops) {
        output.push_str(&render_hunk(&hunk, &ops, &old_lines, &new_lines));
    }
    output
}

/// One hunk: a range of op indices plus starting line numbers on each side.
struct Hunk {
    op_start: usize,
    op_end: usize,
    old_start: usize,
    new_start: usize,
}

/// Classic dynamic-programming LCS, emitting one op per line of either
/// side. Inputs are source files, small enough that the quadratic table
/// is not a concern.
fn diff_ops(old: &[&str], new: &[&str]) -> Vec<LineOp> {
    let rows = old.len();
    let cols = new.len();
    let mut lcs = vec![vec![0usize; cols + 1]; rows + 1];
    for i in (0..rows).rev() {
        for j in (0..cols).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(rows.max(cols));
    let (mut i, mut j) = (0usize, 0usize);
    while i < rows && j < cols {
        if old[i] == new[j] {
            ops.push(LineOp::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(LineOp::Remove);
            i += 1;
        } else {
            ops.push(LineOp::Add);
            j += 1;
        }
    }
    ops.extend(std::iter::repeat(LineOp::Remove).take(rows - i));
    ops.extend(std::iter::repeat(LineOp::Add).take(cols - j));
    ops
}

/// Group changed ops into hunks, folding in up to `CONTEXT` unchanged
/// lines on each side and merging hunks whose contexts touch.
fn hunks(ops: &[LineOp]) -> Vec<Hunk> {
    let mut result: Vec<Hunk> = Vec::new();
    let mut old_line = 0usize;
    let mut new_line = 0usize;
    // Line numbers on each side at every op boundary.
    let mut positions = Vec::with_capacity(ops.len() + 1);
    for op in ops {
        positions.push((old_line, new_line));
        match op {
            LineOp::Keep => {
                old_line += 1;
                new_line += 1;
            }
            LineOp::Remove => old_line += 1,
            LineOp::Add => new_line += 1,
        }
    }
    positions.push((old_line, new_line));

    let mut index = 0;
    while index < ops.len() {
        if ops[index] == LineOp::Keep {
            index += 1;
            continue;
        }
        let op_start = index.saturating_sub(CONTEXT);
        let mut op_end = index + 1;
        let mut unchanged = 0;
        // Extend until a run of more than 2*CONTEXT unchanged lines.
        let mut cursor = op_end;
        while cursor < ops.len() {
            if ops[cursor] == LineOp::Keep {
                unchanged += 1;
                if unchanged > CONTEXT * 2 {
                    break;
                }
            } else {
                unchanged = 0;
                op_end = cursor + 1;
            }
            cursor += 1;
        }
        let op_end_with_context = (op_end + CONTEXT).min(ops.len());
        result.push(Hunk {
            op_start,
            op_end: op_end_with_context,
            old_start: positions[op_start].0,
            new_start: positions[op_start].1,
        });
        index = op_end_with_context;
    }
    result
}

fn render_hunk(hunk: &Hunk, ops: &[LineOp], old: &[&str], new: &[&str]) -> String {
    let mut old_count = 0usize;
    let mut new_count = 0usize;
    let mut body = String::new();
    let mut old_at = hunk.old_start;
    let mut new_at = hunk.new_start;

    for op in &ops[hunk.op_start..hunk.op_end] {
        match op {
            LineOp::Keep => {
                body.push_str(&format!(" {}\n", old[old_at]));
                old_at += 1;
                new_at += 1;
                old_count += 1;
                new_count += 1;
            }
            LineOp::Remove => {
                body.push_str(&format!("-{}\n", old[old_at]));
                old_at += 1;
                old_count += 1;
            }
            LineOp::Add => {
                body.push_str(&format!("+{}\n", new[new_at]));
                new_at += 1;
                new_count += 1;
            }
        }
    }

    format!(
        "@@ -{},{} +{},{} @@\n{}",
        hunk.old_start + 1,
        old_count,
        hunk.new_start + 1,
        new_count,
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_yield_empty_diff() {
        assert_eq!(unified_diff("a", "b", "same\ntext\n", "same\ntext\n"), "");
    }

    #[test]
    fn test_single_line_change() {
        let old = "one\ntwo\nthree\n";
        let new = "one\nTWO\nthree\n";
        let diff = unified_diff("old.cls", "new.cls", old, new);
        assert!(diff.starts_with("--- old.cls\n+++ new.cls\n"));
        assert!(diff.contains("-two\n"));
        assert!(diff.contains("+TWO\n"));
        assert!(diff.contains(" one\n"));
        assert!(diff.contains(" three\n"));
    }

    #[test]
    fn test_distant_changes_make_separate_hunks() {
        let old_lines: Vec<String> = (1..=30).map(|n| format!("line{n}")).collect();
        let mut new_lines = old_lines.clone();
        new_lines[1] = "changed-early".into();
        new_lines[27] = "changed-late".into();
        let old = old_lines.join("\n");
        let new = new_lines.join("\n");

        let diff = unified_diff("a", "b", &old, &new);
        assert_eq!(diff.matches("@@").count(), 2 * 2);
        assert!(diff.contains("+changed-early"));
        assert!(diff.contains("+changed-late"));
    }

    #[test]
    fn test_pure_insertion() {
        let diff = unified_diff("a", "b", "top\nbottom\n", "top\nmiddle\nbottom\n");
        assert!(diff.contains("+middle\n"));
        let removals = diff
            .lines()
            .filter(|l| l.starts_with('-') && !l.starts_with("---"))
            .count();
        assert_eq!(removals, 0);
        assert!(diff.contains("@@ -1,2 +1,3 @@"));
    }
}
