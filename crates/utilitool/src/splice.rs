//! Range replacement over source text
//!
//! Applies a sorted, non-overlapping list of edits to a string in one pass.
//! Knows nothing about imports; the rewriter feeds it specifier ranges.

use thiserror::Error;

/// Errors raised for malformed edit lists
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpliceError {
    /// An edit's range is inverted or extends past the end of the text
    #[error("Edit range {start}..{end} is out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// An edit starts before the previous one ended
    #[error("Edit at {start}..{end} overlaps or precedes the previous edit ending at {previous_end}")]
    Unordered {
        start: usize,
        end: usize,
        previous_end: usize,
    },

    /// An edit boundary falls inside a multi-byte character
    #[error("Edit boundary {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// A single replacement of `text[start..end]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// Signed change in text length caused by this edit
    fn delta(&self) -> isize {
        self.replacement.len() as isize - (self.end - self.start) as isize
    }
}

/// Check that edits are in ascending order, do not overlap and stay inside `text`
pub fn validate(text: &str, edits: &[Edit]) -> Result<(), SpliceError> {
    let mut previous_end = 0;
    for (i, edit) in edits.iter().enumerate() {
        if edit.start > edit.end || edit.end > text.len() {
            return Err(SpliceError::OutOfBounds {
                start: edit.start,
                end: edit.end,
                len: text.len(),
            });
        }
        if i > 0 && edit.start < previous_end {
            return Err(SpliceError::Unordered {
                start: edit.start,
                end: edit.end,
                previous_end,
            });
        }
        for boundary in [edit.start, edit.end] {
            if !text.is_char_boundary(boundary) {
                return Err(SpliceError::NotCharBoundary(boundary));
            }
        }
        previous_end = edit.end;
    }
    Ok(())
}

/// Replace every `[start, end)` span with its replacement.
///
/// Offsets are relative to the original `text`. A running offset (the sum of
/// length deltas of the edits already applied) shifts every later edit, so
/// replacements may be shorter, equal or longer than the span they replace.
pub fn splice(text: &str, edits: &[Edit]) -> Result<String, SpliceError> {
    validate(text, edits)?;

    let capacity = edits
        .iter()
        .fold(text.len() as isize, |len, edit| len + edit.delta());
    let mut output = String::with_capacity(capacity.max(0) as usize);
    output.push_str(text);

    let mut offset: isize = 0;
    for edit in edits {
        let start = (edit.start as isize + offset) as usize;
        let end = (edit.end as isize + offset) as usize;
        output.replace_range(start..end, &edit.replacement);
        offset += edit.delta();
    }

    Ok(output)
}
