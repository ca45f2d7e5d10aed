//! Runtime errors shared by every execution backend.

use std::io;

use thiserror::Error;

/// Errors that stop a run.
///
/// Output written before the error is not retracted.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The data pointer would have left `[0, capacity)`.
    #[error("tape bounds exceeded at instruction {at} (pointer {pointer})")]
    TapeBoundsExceeded { at: usize, pointer: usize },

    /// The input or output channel failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Outcome comparison ignoring the payload of I/O errors.
    pub fn same_outcome(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::TapeBoundsExceeded { at: a, pointer: p },
                Self::TapeBoundsExceeded { at: b, pointer: q },
            ) => a == b && p == q,
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_tape_bounds() {
        assert_eq!(
            RuntimeError::TapeBoundsExceeded { at: 5, pointer: 0 }.to_string(),
            "tape bounds exceeded at instruction 5 (pointer 0)"
        );
    }

    #[test]
    fn display_io() {
        let err = RuntimeError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert_eq!(err.to_string(), "i/o error: pipe closed");
    }

    #[test]
    fn same_outcome_compares_kinds() {
        let a = RuntimeError::TapeBoundsExceeded { at: 1, pointer: 0 };
        let b = RuntimeError::TapeBoundsExceeded { at: 1, pointer: 0 };
        let c = RuntimeError::TapeBoundsExceeded { at: 2, pointer: 0 };
        assert!(a.same_outcome(&b));
        assert!(!a.same_outcome(&c));

        let io_a = RuntimeError::Io(io::ErrorKind::Other.into());
        let io_b = RuntimeError::Io(io::ErrorKind::Other.into());
        assert!(io_a.same_outcome(&io_b));
        assert!(!io_a.same_outcome(&a));
    }
}
