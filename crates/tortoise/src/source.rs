/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source positions for tokens, nodes and diagnostics.

use serde::{Deserialize, Serialize};

/// A location in template source (0-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in characters not bytes)
    pub column: usize,
}

impl SourceLocation {
    /// 1-based line number, for messages.
    pub fn line(&self) -> usize {
        self.row + 1
    }

    /// 1-based column number, for messages.
    pub fn display_column(&self) -> usize {
        self.column + 1
    }
}

/// Incremental offset-to-location converter.
///
/// Tokens are produced in source order, so the tracker only ever walks
/// forward. Asking for an offset behind the last one restarts the walk.
#[derive(Debug)]
pub(crate) struct LocationTracker<'a> {
    source: &'a str,
    current: SourceLocation,
}

impl<'a> LocationTracker<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            current: SourceLocation::default(),
        }
    }

    pub(crate) fn locate(&mut self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.source.len());
        if offset < self.current.offset {
            self.current = SourceLocation::default();
        }

        for ch in self.source[self.current.offset..offset].chars() {
            if ch == '\n' {
                self.current.row += 1;
                self.current.column = 0;
            } else {
                self.current.column += 1;
            }
        }
        self.current.offset = offset;
        self.current
    }
}

/// Convert a byte offset to a character offset (for ariadne spans).
pub(crate) fn char_offset(source: &str, byte_offset: usize) -> usize {
    let byte_offset = byte_offset.min(source.len());
    source
        .char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .count()
}
