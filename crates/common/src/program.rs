//! Program representation: an ordered, 0-indexed instruction list.

use std::fmt;
use std::ops::Index;
use std::slice;

use crate::instruction::Instruction;

/// A parsed tape-machine program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create a program from an instruction list.
    ///
    /// Loop targets are taken as given. Use [`Program::is_well_formed`] to
    /// check a hand-built list; the parser always produces well-formed ones.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// The instruction stream.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Check that every loop bracket points just past its unique partner.
    ///
    /// For each `LoopOpen` at `i` there must be a `LoopClose` at `j > i`
    /// with `open.target == j + 1` and `close.target == i + 1`, and every
    /// `LoopClose` must be claimed by exactly one open.
    pub fn is_well_formed(&self) -> bool {
        let mut claimed = vec![false; self.instructions.len()];

        for (i, instr) in self.instructions.iter().enumerate() {
            if let Instruction::LoopOpen { target } = *instr {
                let Some(j) = target.checked_sub(1) else {
                    return false;
                };
                if j <= i || j >= self.instructions.len() || claimed[j] {
                    return false;
                }
                match self.instructions[j] {
                    Instruction::LoopClose { target } if target == i + 1 => claimed[j] = true,
                    _ => return false,
                }
            }
        }

        self.instructions
            .iter()
            .zip(&claimed)
            .all(|(instr, &claimed)| !matches!(instr, Instruction::LoopClose { .. }) || claimed)
    }
}

impl Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// One instruction per line, prefixed with its index.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.instructions.iter().enumerate() {
            writeln!(f, "{i:>6}  {instr}")?;
        }
        Ok(())
    }
}
