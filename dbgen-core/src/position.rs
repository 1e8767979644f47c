//! Source positions attached to tokens, syntax nodes and diagnostics.

use serde::Serialize;
use std::fmt;

/// A location in DSL source.
///
/// `line` and `column` are 1-based, `column` counts bytes from the start of
/// the line. `offset` is the 0-based byte offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Compute the position of `offset` by scanning `source`.
    ///
    /// Offsets past the end of the source clamp to the end.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Self {
            line,
            column: offset - line_start + 1,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_offset() {
        let source = "model user (\n  field id int64\n)";
        let pos = Position::from_offset(source, 15);
        assert_eq!(pos, Position::new(2, 3, 15));
        assert_eq!(pos.to_string(), "2:3");
    }

    #[test]
    fn test_from_offset_clamps() {
        let pos = Position::from_offset("ab", 99);
        assert_eq!(pos.offset, 2);
        assert_eq!(pos.column, 3);
    }
}
