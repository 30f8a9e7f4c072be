//! Byte-offset to line/column conversion for source positions.
//!
//! A source buffer lazily indexes its own newline offsets so repeated
//! position lookups (one per diagnostic) don't re-scan the whole script.

use once_cell::unsync::OnceCell;
use std::fmt::{Display, Formatter};

/// 1-based line and column of a byte offset into a [`Source`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A script source string paired with a lazily-built newline index.
///
/// The core never mutates a script after it is handed to `compile`, so the
/// newline index is computed at most once per compilation regardless of how
/// many diagnostics end up needing a [`Position`].
pub struct Source<'s> {
    pub text: &'s str,
    line_breaks: OnceCell<Vec<usize>>,
}

impl<'s> From<&'s str> for Source<'s> {
    fn from(text: &'s str) -> Self {
        Self::new(text)
    }
}

impl<'s> Source<'s> {
    pub fn new(text: &'s str) -> Self {
        Self {
            text,
            line_breaks: OnceCell::new(),
        }
    }

    fn line_breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.text
                .bytes()
                .enumerate()
                .filter_map(|(index, b)| if b == b'\n' { Some(index) } else { None })
                .collect()
        })
    }

    /// Resolve a byte offset into the source to a 1-based line/column.
    ///
    /// Offsets past the end of the source clamp to the last valid position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line_breaks = self.line_breaks();
        let line_index = match line_breaks.binary_search(&offset) {
            Ok(index) | Err(index) => index,
        };
        if line_index == 0 {
            Position::new(1, self.text[..offset].chars().count() + 1)
        } else {
            let line_start = line_breaks[line_index - 1] + 1;
            Position::new(
                line_index + 1,
                self.text[line_start..offset].chars().count() + 1,
            )
        }
    }

    /// Extract the surrounding context of an offset, used to populate
    /// `offending_context` on a [`crate::error::ExternalDiagnostic::SyntaxError`].
    pub fn context_at(&self, offset: usize, radius: usize) -> String {
        let offset = offset.min(self.text.len());
        let start = self.text[..offset]
            .char_indices()
            .rev()
            .nth(radius)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let end = self.text[offset..]
            .char_indices()
            .nth(radius)
            .map(|(i, _)| offset + i)
            .unwrap_or(self.text.len());
        self.text[start..end].trim().to_string()
    }
}
