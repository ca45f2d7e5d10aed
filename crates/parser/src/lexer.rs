//! Tokenizer for tape-machine source text.

use bfjit_common::Instruction;

use crate::error::Location;

/// A command symbol and where it appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub instruction: Instruction,
    pub location: Location,
}

/// Iterator over the command symbols of a source text.
///
/// Every character that is not one of the eight commands is a comment and
/// is skipped. Lines and columns count characters, starting at 1.
pub(crate) struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
            line: 1,
            column: 1,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        for c in self.chars.by_ref() {
            let location = Location {
                line: self.line,
                column: self.column,
            };
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            if let Some(instruction) = Instruction::from_symbol(c) {
                return Some(Token {
                    instruction,
                    location,
                });
            }
        }
        None
    }
}
