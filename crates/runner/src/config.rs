//! Run configuration.

use bfjit_common::{EofPolicy, DEFAULT_TAPE_CAPACITY};
use bfjit_parser::DEFAULT_MAX_NESTING_DEPTH;
use thiserror::Error;

/// Settings fixed for the lifetime of a [`Runner`](crate::Runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of tape cells.
    pub tape_capacity: usize,
    /// Deepest loop nesting the parser accepts.
    pub max_nesting_depth: usize,
    /// What `,` stores at end of input.
    pub eof: EofPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tape_capacity: DEFAULT_TAPE_CAPACITY,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            eof: EofPolicy::default(),
        }
    }
}

impl Config {
    pub fn with_tape_capacity(mut self, tape_capacity: usize) -> Self {
        self.tape_capacity = tape_capacity;
        self
    }

    pub fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    pub fn with_eof(mut self, eof: EofPolicy) -> Self {
        self.eof = eof;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tape_capacity == 0 {
            return Err(ConfigError::ZeroTapeCapacity);
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::ZeroNestingDepth);
        }
        Ok(())
    }
}

/// A configuration value out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tape capacity must be greater than zero")]
    ZeroTapeCapacity,

    #[error("maximum nesting depth must be greater than zero")]
    ZeroNestingDepth,

    #[error("cannot allocate a tape of {capacity} cells")]
    TapeTooLarge { capacity: usize },
}
