//! Error types for the parser.

use std::fmt;

use thiserror::Error;

/// A position in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors produced while parsing source text.
///
/// `at` is the index the offending bracket would have had in the
/// instruction stream; `location` is where it sits in the source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `[` was never closed. Reports the earliest unclosed one.
    #[error("{location}: unmatched '[' at instruction {at}")]
    UnmatchedOpen { at: usize, location: Location },

    /// A `]` appeared with no open loop.
    #[error("{location}: unmatched ']' at instruction {at}")]
    UnmatchedClose { at: usize, location: Location },

    /// Loops nest deeper than the configured limit.
    #[error("{location}: loop nesting exceeds limit {limit} at instruction {at}")]
    NestingTooDeep {
        at: usize,
        limit: usize,
        location: Location,
    },
}

impl ParseError {
    /// Instruction index of the offending bracket.
    pub fn at(&self) -> usize {
        match *self {
            Self::UnmatchedOpen { at, .. }
            | Self::UnmatchedClose { at, .. }
            | Self::NestingTooDeep { at, .. } => at,
        }
    }

    pub fn location(&self) -> Location {
        match *self {
            Self::UnmatchedOpen { location, .. }
            | Self::UnmatchedClose { location, .. }
            | Self::NestingTooDeep { location, .. } => location,
        }
    }
}
