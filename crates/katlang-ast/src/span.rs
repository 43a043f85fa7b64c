//! Source location tracking for diagnostics.
//!
//! # Design
//!
//! - `Span`: byte range into the program text
//! - `LineIndex`: sorted newline offsets, used to turn a byte offset into a
//!   1-based line and column
//! - `TextPosition`: the resulting line/column pair
//!
//! Columns count characters, not bytes. On the first line the column is the
//! offset plus one; on later lines it is the distance from the preceding
//! newline, which puts the first character of a line at column 1 as well.
//!
//! # Examples
//!
//! ```
//! # use katlang_ast::span::*;
//! let source = "a = 1\nb";
//! let index = LineIndex::from_source(source);
//! assert_eq!(index.position(source, 6), TextPosition { line: 2, column: 1 });
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Byte range in the program text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a span from `usize` offsets.
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    /// Zero-length span at `offset`.
    pub fn point(offset: usize) -> Self {
        Self::new(offset as u32, offset as u32)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length in bytes. Inverted spans have length zero.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Span covering both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both ends by `offset` bytes.
    pub fn shifted(self, offset: usize) -> Span {
        let offset = offset as u32;
        Span::new(self.start + offset, self.end + offset)
    }
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

/// Newline offsets of one program text.
///
/// The set is filled incrementally: a restarted lexer adds the newlines it
/// skips, and offsets already recorded are never duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    newlines: BTreeSet<usize>,
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every newline of `source`.
    pub fn from_source(source: &str) -> Self {
        let mut index = Self::new();
        index.extend(source.match_indices('\n').map(|(offset, _)| offset));
        index
    }

    /// Record newline offsets.
    pub fn extend(&mut self, offsets: impl IntoIterator<Item = usize>) {
        self.newlines.extend(offsets);
    }

    /// Number of newlines recorded so far.
    pub fn newline_count(&self) -> usize {
        self.newlines.len()
    }

    /// Map a byte offset of `source` to its line and column.
    ///
    /// Offsets past the end of `source` are clamped.
    pub fn position(&self, source: &str, offset: usize) -> TextPosition {
        let offset = clamp_to_boundary(source, offset);
        match self.newlines.range(..offset).next_back() {
            Some(&newline) => {
                // everything before the newline sits on earlier lines
                let line = self.newlines.range(..=newline).count() + 1;
                let column = source
                    .get(newline..offset)
                    .map(|s| s.chars().count())
                    .unwrap_or(offset - newline);
                TextPosition {
                    line: line as u32,
                    column: column as u32,
                }
            }
            None => TextPosition {
                line: 1,
                column: source[..offset].chars().count() as u32 + 1,
            },
        }
    }

    /// Byte range of a 1-based line, newline excluded.
    pub fn line_range(&self, source: &str, line: u32) -> Option<(usize, usize)> {
        if line == 0 || line as usize > self.newlines.len() + 1 {
            return None;
        }
        let start = match line {
            1 => 0,
            n => self.newlines.iter().nth(n as usize - 2).map(|nl| nl + 1)?,
        };
        let end = self
            .newlines
            .iter()
            .nth(line as usize - 1)
            .copied()
            .unwrap_or(source.len());
        Some((start.min(source.len()), end.min(source.len())))
    }

    /// Text of a 1-based line without its line terminator.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let (start, end) = self.line_range(source, line)?;
        source
            .get(start..end)
            .map(|text| text.strip_suffix('\r').unwrap_or(text))
    }
}

fn clamp_to_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::point(4).is_empty());
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(10, 20).merge(&Span::new(15, 30));
        assert_eq!(merged, Span::new(10, 30));
    }

    #[test]
    fn test_span_shifted() {
        assert_eq!(Span::new(1, 3).shifted(5), Span::new(6, 8));
    }

    #[test]
    fn test_inverted_span_has_zero_length() {
        assert_eq!(Span::new(5, 2).len(), 0);
    }

    #[test]
    fn test_first_line_position() {
        let source = "6=";
        let index = LineIndex::from_source(source);
        assert_eq!(index.position(source, 1), TextPosition { line: 1, column: 2 });
    }

    #[test]
    fn test_later_line_position() {
        let source = "f=5\n#f()\nx";
        let index = LineIndex::from_source(source);
        // `(` after `#f` on line 2
        assert_eq!(index.position(source, 6), TextPosition { line: 2, column: 3 });
        assert_eq!(index.position(source, 9), TextPosition { line: 3, column: 1 });
    }

    #[test]
    fn test_position_counts_characters() {
        let source = "ä\nöx";
        let index = LineIndex::from_source(source);
        // 'x' follows a two-byte character
        assert_eq!(index.position(source, 5), TextPosition { line: 2, column: 2 });
    }

    #[test]
    fn test_position_past_end_is_clamped() {
        let source = "ab";
        let index = LineIndex::from_source(source);
        assert_eq!(index.position(source, 99), TextPosition { line: 1, column: 3 });
    }

    #[test]
    fn test_incremental_extend_deduplicates() {
        let mut index = LineIndex::new();
        index.extend([3, 7]);
        index.extend([7, 12]);
        assert_eq!(index.newline_count(), 3);
    }

    #[test]
    fn test_line_text() {
        let source = "one\r\ntwo\nthree";
        let index = LineIndex::from_source(source);
        assert_eq!(index.line_text(source, 1), Some("one"));
        assert_eq!(index.line_text(source, 2), Some("two"));
        assert_eq!(index.line_text(source, 3), Some("three"));
        assert_eq!(index.line_text(source, 4), None);
    }
}
