//! Instructions of the eight-symbol tape-machine language.
//!
//! Source symbols map onto instructions one to one:
//! ```text
//! >  MovePointer(+1)      <  MovePointer(-1)
//! +  AddToCell(+1)        -  AddToCell(-1)
//! ,  Input                .  Output
//! [  LoopOpen { target }  ]  LoopClose { target }
//! ```
//!
//! Loop targets are instruction indices. `LoopOpen` at `i` matched with
//! `LoopClose` at `j` carries `target == j + 1`, and the close carries
//! `target == i + 1`, so a taken branch always lands just past its partner.

use std::fmt;

/// A single tape-machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Move the data pointer by `delta` cells.
    MovePointer(i8),
    /// Add `delta` to the current cell, wrapping modulo 256.
    AddToCell(i8),
    /// Read one byte from the input channel into the current cell.
    Input,
    /// Write the current cell to the output channel.
    Output,
    /// Jump to `target` if the current cell is zero.
    LoopOpen { target: usize },
    /// Jump to `target` if the current cell is non-zero.
    LoopClose { target: usize },
}

impl Instruction {
    /// Map a source character to its instruction.
    ///
    /// Loop brackets come back with a zero target; the parser patches the
    /// real target once the partner is known. Any other character is not a
    /// command and yields `None`.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '>' => Some(Self::MovePointer(1)),
            '<' => Some(Self::MovePointer(-1)),
            '+' => Some(Self::AddToCell(1)),
            '-' => Some(Self::AddToCell(-1)),
            ',' => Some(Self::Input),
            '.' => Some(Self::Output),
            '[' => Some(Self::LoopOpen { target: 0 }),
            ']' => Some(Self::LoopClose { target: 0 }),
            _ => None,
        }
    }

    /// Jump target for loop instructions, `None` otherwise.
    pub fn target(&self) -> Option<usize> {
        match *self {
            Self::LoopOpen { target } | Self::LoopClose { target } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MovePointer(delta) => write!(f, "MOVE {delta:+}"),
            Self::AddToCell(delta) => write!(f, "ADD {delta:+}"),
            Self::Input => f.write_str("INPUT"),
            Self::Output => f.write_str("OUTPUT"),
            Self::LoopOpen { target } => write!(f, "LOOP_OPEN -> {target}"),
            Self::LoopClose { target } => write!(f, "LOOP_CLOSE -> {target}"),
        }
    }
}
