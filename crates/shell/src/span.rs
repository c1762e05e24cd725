// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source location tracking for the word splitter.

use serde::{Deserialize, Serialize};

/// A byte-offset range in the source text.
///
/// Uses byte offsets for efficient slicing with UTF-8 source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Extract the spanned text from source.
    ///
    /// Returns an empty string if the span is out of bounds or not on valid
    /// UTF-8 character boundaries.
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Render the input with a caret line under the span.
///
/// ```text
/// make "unterminated
///      ^^^^^^^^^^^^^
/// ```
pub fn context_snippet(input: &str, span: Span) -> String {
    let line_start = input.get(..span.start).and_then(|s| s.rfind('\n')).map(|i| i + 1).unwrap_or(0);
    let line_end = input
        .get(span.start..)
        .and_then(|s| s.find('\n'))
        .map(|i| span.start + i)
        .unwrap_or(input.len());
    let line = input.get(line_start..line_end).unwrap_or("");
    let pad = input.get(line_start..span.start).map(|s| s.chars().count()).unwrap_or(0);
    let width = input
        .get(span.start..span.end.min(line_end))
        .map(|s| s.chars().count())
        .unwrap_or(0)
        .max(1);
    format!("{}\n{}{}", line, " ".repeat(pad), "^".repeat(width))
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
