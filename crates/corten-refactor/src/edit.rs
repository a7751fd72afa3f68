use serde::{Deserialize, Serialize};
use text_size::TextRange;
use thiserror::Error;

/// A single span replacement against one document snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(offset: text_size::TextSize, text: impl Into<String>) -> Self {
        Self {
            range: TextRange::empty(offset),
            replacement: text.into(),
        }
    }

    pub fn replace(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }

    pub fn delete(range: TextRange) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits { first: TextRange, second: TextRange },
    #[error("text edit range {range:?} is outside the document bounds (len={len})")]
    OutOfBounds { range: TextRange, len: usize },
}

/// Normalize an edit set in place: sort by position, drop exact duplicates,
/// and validate that no two edits overlap.
pub fn normalize_edits(edits: &mut Vec<TextEdit>) -> Result<(), EditError> {
    edits.sort_by(|a, b| {
        a.range
            .start()
            .cmp(&b.range.start())
            .then_with(|| a.range.end().cmp(&b.range.end()))
            .then_with(|| a.replacement.cmp(&b.replacement))
    });

    edits.dedup();

    let mut prev: Option<TextRange> = None;
    for edit in edits.iter() {
        if let Some(prev_range) = prev {
            if edit.range.start() < prev_range.end() {
                return Err(EditError::OverlappingEdits {
                    first: prev_range,
                    second: edit.range,
                });
            }
        }
        prev = Some(edit.range);
    }

    Ok(())
}

/// Apply a set of non-overlapping edits to `original` and return the new
/// document text.
///
/// Edits are applied in descending offset order so each edit's coordinates
/// stay valid relative to the still-unedited remainder of the document; the
/// input document is never mutated.
pub fn apply_text_edits(original: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(original.to_string());
    }

    let mut sorted = edits.to_vec();
    sorted.sort_by(|a, b| {
        b.range
            .start()
            .cmp(&a.range.start())
            .then_with(|| b.range.end().cmp(&a.range.end()))
    });

    let mut out = original.to_string();
    for edit in sorted {
        let start = usize::from(edit.range.start());
        let end = usize::from(edit.range.end());
        if end > out.len() || start > end {
            return Err(EditError::OutOfBounds {
                range: edit.range,
                len: out.len(),
            });
        }
        out.replace_range(start..end, &edit.replacement);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use text_size::TextSize;

    #[test]
    fn applies_in_reverse_offset_order() {
        let edits = vec![
            TextEdit::insert(TextSize::from(0), "let x = 1;\n"),
            TextEdit::replace(TextRange::new(4.into(), 5.into()), "x"),
        ];
        let out = apply_text_edits("foo(1);", &edits).unwrap();
        assert_eq!(out, "let x = 1;\nfoo(x);");
    }

    #[test]
    fn normalize_rejects_overlap() {
        let mut edits = vec![
            TextEdit::replace(TextRange::new(0.into(), 4.into()), "a"),
            TextEdit::replace(TextRange::new(2.into(), 6.into()), "b"),
        ];
        let err = normalize_edits(&mut edits).unwrap_err();
        assert!(matches!(err, EditError::OverlappingEdits { .. }));
    }

    #[test]
    fn normalize_dedups_identical_edits() {
        let mut edits = vec![
            TextEdit::replace(TextRange::new(0.into(), 1.into()), "x"),
            TextEdit::replace(TextRange::new(0.into(), 1.into()), "x"),
        ];
        normalize_edits(&mut edits).unwrap();
        assert_eq!(edits.len(), 1);
    }

    #[test]
    fn out_of_bounds_edit_is_reported() {
        let edits = vec![TextEdit::delete(TextRange::new(3.into(), 9.into()))];
        let err = apply_text_edits("short", &edits).unwrap_err();
        assert!(matches!(err, EditError::OutOfBounds { .. }));
    }
}
