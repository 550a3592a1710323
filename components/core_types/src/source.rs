//! Source position tracking for lexer and parser diagnostics.

use std::fmt;

/// Represents a position in source code.
///
/// Lines and columns are 1-indexed; `offset` counts characters from the start
/// of the source.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition {
///     line: 10,
///     column: 5,
///     offset: 150,
/// };
///
/// assert_eq!(pos.to_string(), "line 10, column 5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Character offset from the start of the source
    pub offset: usize,
}

impl SourcePosition {
    /// Position of the first character of a source.
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
