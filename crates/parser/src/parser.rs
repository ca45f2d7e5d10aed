//! Bracket matching and jump-target resolution.

use bfjit_common::{Instruction, Program};

use crate::error::{Location, ParseError};
use crate::lexer::Lexer;

/// A `[` waiting for its `]`.
struct PendingOpen {
    index: usize,
    location: Location,
}

/// Build a program from source text, resolving every loop target.
pub(crate) fn parse_program(source: &str, max_nesting_depth: usize) -> Result<Program, ParseError> {
    let mut instructions = Vec::new();
    let mut pending: Vec<PendingOpen> = Vec::new();

    for token in Lexer::new(source) {
        let index = instructions.len();

        match token.instruction {
            Instruction::LoopOpen { .. } => {
                if pending.len() >= max_nesting_depth {
                    return Err(ParseError::NestingTooDeep {
                        at: index,
                        limit: max_nesting_depth,
                        location: token.location,
                    });
                }
                pending.push(PendingOpen {
                    index,
                    location: token.location,
                });
                // Patched when the matching close is seen.
                instructions.push(Instruction::LoopOpen { target: 0 });
            }
            Instruction::LoopClose { .. } => {
                let open = pending.pop().ok_or(ParseError::UnmatchedClose {
                    at: index,
                    location: token.location,
                })?;
                instructions[open.index] = Instruction::LoopOpen { target: index + 1 };
                instructions.push(Instruction::LoopClose {
                    target: open.index + 1,
                });
            }
            other => instructions.push(other),
        }
    }

    // The bottom of the stack is the earliest loop still open.
    if let Some(open) = pending.first() {
        return Err(ParseError::UnmatchedOpen {
            at: open.index,
            location: open.location,
        });
    }

    Ok(Program::new(instructions))
}
