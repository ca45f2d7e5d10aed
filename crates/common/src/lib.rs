//! bfjit common types.
//!
//! This crate provides the data model shared by every stage of the
//! pipeline:
//!
//! - [`Instruction`]: one of the eight tape-machine operations
//! - [`Program`]: a parsed instruction list with resolved loop targets
//! - [`Tape`]: the byte memory and data pointer a program runs against
//! - [`EofPolicy`]: what `Input` stores when input is exhausted
//! - [`RuntimeError`]: faults shared by the interpreter and generated code

pub mod error;
pub mod instruction;
pub mod io;
pub mod program;
pub mod tape;

// Re-export commonly used types at the crate root.
pub use error::RuntimeError;
pub use instruction::Instruction;
pub use io::EofPolicy;
pub use program::Program;
pub use tape::{Tape, DEFAULT_TAPE_CAPACITY};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any sequence of cell additions lands on the wrapping sum.
        #[test]
        fn cell_arithmetic_wraps(deltas in prop::collection::vec(prop_oneof![Just(1i8), Just(-1i8)], 0..600)) {
            let mut tape = Tape::new(1);
            let mut expected: u8 = 0;
            for &d in &deltas {
                tape.add(d);
                expected = expected.wrapping_add_signed(d);
            }
            prop_assert_eq!(tape.get(), expected);
        }

        /// The pointer stays in range whatever sequence of moves is tried.
        #[test]
        fn pointer_never_leaves_tape(
            capacity in 1usize..32,
            moves in prop::collection::vec(prop_oneof![Just(1isize), Just(-1isize)], 0..100),
        ) {
            let mut tape = Tape::new(capacity);
            for (at, &m) in moves.iter().enumerate() {
                let before = tape.pointer();
                if tape.move_pointer(m, at).is_err() {
                    prop_assert_eq!(tape.pointer(), before);
                }
                prop_assert!(tape.pointer() < capacity);
            }
        }
    }
}
