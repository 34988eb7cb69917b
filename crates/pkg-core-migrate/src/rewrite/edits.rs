//! Token edit model.
//!
//! Edits are pure data: a byte span into the original source plus
//! replacement text. They are derived against the original token stream
//! and applied to it in a single pass, never layered on already-edited
//! text, so offsets can never drift.

use crate::error::{MigrateError, Result};

/// What kind of change an edit describes. Only used for reporting; the
/// application algorithm treats everything as a span replacement
/// (inserts are zero-width spans).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Replace everything between two tokens (inclusive span).
    ReplaceRange,
    /// Replace a single token.
    ReplaceToken,
    /// Insert text immediately after a token.
    InsertAfter,
}

/// One textual change to a source file, in original-stream byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEdit {
    pub kind: EditKind,
    /// Start byte in the original source.
    pub start: usize,
    /// End byte (exclusive) in the original source. Equal to `start` for
    /// insertions.
    pub end: usize,
    pub replacement: String,
}

impl TokenEdit {
    pub fn replace_range(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            kind: EditKind::ReplaceRange,
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn replace_token(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            kind: EditKind::ReplaceToken,
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert_after(position: usize, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::InsertAfter,
            start: position,
            end: position,
            replacement: text.into(),
        }
    }
}

/// Apply a set of edits to the original source in one pass.
///
/// Edits are sorted by source position first, so the output never depends
/// on derivation order. Overlapping or out-of-bounds edits are a logic
/// error in derivation and are rejected rather than silently merged.
pub fn apply_edits(source: &str, edits: &[TokenEdit]) -> Result<String> {
    let mut sorted: Vec<&TokenEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.start, e.end));

    let mut output = String::with_capacity(source.len());
    let mut cursor = 0usize;

    for edit in sorted {
        if edit.end > source.len() || edit.start > edit.end {
            return Err(MigrateError::Rewrite(format!(
                "edit span {}..{} out of bounds for {}-byte source",
                edit.start,
                edit.end,
                source.len()
            )));
        }
        if edit.start < cursor {
            return Err(MigrateError::Rewrite(format!(
                "overlapping edits at byte {} (cursor already at {})",
                edit.start, cursor
            )));
        }
        output.push_str(&source[cursor..edit.start]);
        output.push_str(&edit.replacement);
        cursor = edit.end;
    }

    output.push_str(&source[cursor..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_source_order_regardless_of_derivation_order() {
        let source = "alpha beta gamma";
        // Derived out of order on purpose.
        let edits = vec![
            TokenEdit::replace_token(11, 16, "GAMMA"),
            TokenEdit::replace_token(0, 5, "ALPHA"),
        ];
        assert_eq!(apply_edits(source, &edits).unwrap(), "ALPHA beta GAMMA");
    }

    #[test]
    fn test_insert_after_is_zero_width() {
        let source = "class X {}";
        let edits = vec![TokenEdit::insert_after(9, " void m() {} ")];
        assert_eq!(apply_edits(source, &edits).unwrap(), "class X { void m() {} }");
    }

    #[test]
    fn test_insert_at_replacement_boundary_is_legal() {
        let source = "ab";
        let edits = vec![
            TokenEdit::replace_token(0, 1, "A"),
            TokenEdit::insert_after(1, "-"),
        ];
        assert_eq!(apply_edits(source, &edits).unwrap(), "A-b");
    }

    #[test]
    fn test_overlap_is_rejected() {
        let source = "abcdef";
        let edits = vec![
            TokenEdit::replace_range(0, 4, "x"),
            TokenEdit::replace_token(2, 5, "y"),
        ];
        let err = apply_edits(source, &edits).unwrap_err();
        assert!(err.to_string().contains("overlapping"));
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let err = apply_edits("ab", &[TokenEdit::replace_token(1, 9, "x")]).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn test_no_edits_is_identity() {
        assert_eq!(apply_edits("unchanged", &[]).unwrap(), "unchanged");
    }
}
