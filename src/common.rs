//! Shared primitives used by every pipeline stage
//!
//! - [`Mark`]: a source position attached to tokens and expressions
//! - [`Scanner`]: a forward-only cursor over a slice with bounded lookahead

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source position for diagnostics.
///
/// Lines are 1-based, columns are 0-based character offsets. A mark never
/// influences program semantics, so equality between expressions ignores it
/// only where explicitly stated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mark {
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl Mark {
    /// Sentinel for synthesized nodes
    pub const fn unknown() -> Self {
        Self {
            file: None,
            line: 0,
            column: 0,
        }
    }

    pub fn new(file: Arc<str>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file),
            line,
            column,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_none() && self.line == 0
    }
}

impl Default for Mark {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "<unknown>");
        }
        let file = self.file.as_deref().unwrap_or("<input>");
        write!(f, "{}:{}:{}", file, self.line, self.column)
    }
}

/// Cursor over a sequence of items.
///
/// The lexer scans `char`s with it and the parser scans tokens. Peeking never
/// consumes; `advance` moves past exactly one item.
#[derive(Debug, Clone)]
pub struct Scanner<T> {
    input: Vec<T>,
    index: usize,
}

impl<T> Scanner<T> {
    pub fn new(input: Vec<T>) -> Self {
        Self { input, index: 0 }
    }

    /// Item `n` positions ahead of the cursor
    pub fn peek_ahead(&self, n: usize) -> Option<&T> {
        self.input.get(self.index + n)
    }

    pub fn peek(&self) -> Option<&T> {
        self.peek_ahead(0)
    }

    /// Up to `n` items from the cursor, or `None` if fewer remain
    pub fn peek_slice(&self, n: usize) -> Option<&[T]> {
        let end = self.index.checked_add(n)?;
        self.input.get(self.index..end)
    }

    /// Consume the current item
    pub fn advance(&mut self) -> Option<&T> {
        let item = self.input.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    /// Consume `n` items, stopping early at the end of input
    pub fn skip(&mut self, n: usize) {
        self.index = (self.index + n).min(self.input.len());
    }

    pub fn is_available(&self) -> bool {
        self.index < self.input.len()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn last(&self) -> Option<&T> {
        self.input.last()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_peek_does_not_consume() {
        let scanner = Scanner::new(vec![1, 2, 3]);
        assert_eq!(scanner.peek(), Some(&1));
        assert_eq!(scanner.peek_ahead(2), Some(&3));
        assert_eq!(scanner.peek_ahead(3), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_scanner_peek_slice_bounds() {
        let mut scanner = Scanner::new(vec!['/', '/', 'x']);
        assert_eq!(scanner.peek_slice(2), Some(&['/', '/'][..]));
        scanner.advance();
        scanner.advance();
        assert_eq!(scanner.peek_slice(2), None);
        assert_eq!(scanner.peek_slice(1), Some(&['x'][..]));
    }

    #[test]
    fn test_mark_display() {
        let mark = Mark::new(Arc::from("main.bolt"), 3, 7);
        assert_eq!(mark.to_string(), "main.bolt:3:7");
        assert_eq!(Mark::unknown().to_string(), "<unknown>");
    }
}
