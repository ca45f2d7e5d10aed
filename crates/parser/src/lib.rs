//! bfjit parser: source text to a validated instruction stream.
//!
//! Parsing is a single left-to-right pass. Characters other than the eight
//! commands are comments. Loop brackets are matched with a stack of pending
//! opens whose size is bounded by the nesting limit, so pathological input
//! is rejected deterministically instead of exhausting resources later in
//! the generated code.
//!
//! # Usage
//!
//! ```
//! use bfjit_common::Instruction;
//! use bfjit_parser::parse;
//!
//! let program = parse("+[-]", 256).unwrap();
//! assert_eq!(program.len(), 4);
//! assert_eq!(program[1], Instruction::LoopOpen { target: 4 });
//! assert_eq!(program[3], Instruction::LoopClose { target: 2 });
//! ```

pub mod error;

mod lexer;
mod parser;

pub use error::{Location, ParseError};

use bfjit_common::Program;
use tracing::debug;

/// Default limit on loop nesting depth.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

/// Parse source text into a program.
///
/// Fails with the first structural error found: a `]` without an open loop,
/// a `[` opened past `max_nesting_depth` pending loops, or (after the whole
/// text is scanned) the earliest `[` never closed.
pub fn parse(source: &str, max_nesting_depth: usize) -> Result<Program, ParseError> {
    let program = parser::parse_program(source, max_nesting_depth)?;
    debug!(
        instructions = program.len(),
        max_nesting_depth, "parsed program"
    );
    Ok(program)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strings of commands with some noise mixed in.
    fn arb_source() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec!['>', '<', '+', '-', ',', '.', '[', ']', ' ', 'x', '\n']),
            0..200,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        /// Parsing either fails with one error or yields consistent targets.
        #[test]
        fn parse_is_well_formed_or_fails(source in arb_source(), depth in 0usize..6) {
            match parse(&source, depth) {
                Ok(program) => prop_assert!(program.is_well_formed()),
                Err(e) => {
                    match e {
                        ParseError::UnmatchedOpen { .. }
                        | ParseError::UnmatchedClose { .. }
                        | ParseError::NestingTooDeep { .. } => {}
                    }
                }
            }
        }

        /// Comment characters never change the parsed program.
        #[test]
        fn noise_is_ignored(source in arb_source()) {
            let stripped: String = source.chars().filter(|c| "><+-,.[]".contains(*c)).collect();
            let a = parse(&source, 8).map_err(|e| e.at());
            let b = parse(&stripped, 8).map_err(|e| e.at());
            prop_assert_eq!(a, b);
        }
    }
}
