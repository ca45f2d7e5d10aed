//! The machine's byte memory and data pointer.

use std::collections::TryReserveError;

use crate::error::RuntimeError;

/// Default number of cells on a tape.
pub const DEFAULT_TAPE_CAPACITY: usize = 65_536;

/// A fixed-capacity byte tape with a data pointer.
///
/// Cell arithmetic wraps modulo 256. The pointer never leaves
/// `[0, capacity)`: a move that would do so fails and leaves it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
}

impl Tape {
    /// Create a zeroed tape with `capacity` cells and the pointer at 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
            pointer: 0,
        }
    }

    /// Like [`Tape::new`], but reports a failed allocation instead of
    /// aborting.
    pub fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(capacity)?;
        cells.resize(capacity, 0);
        Ok(Self { cells, pointer: 0 })
    }

    /// Zero every cell and move the pointer back to 0.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.pointer = 0;
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Move the pointer by `delta`. `at` is the index of the instruction
    /// doing the move, reported in the error.
    pub fn move_pointer(&mut self, delta: isize, at: usize) -> Result<(), RuntimeError> {
        match self.pointer.checked_add_signed(delta) {
            Some(next) if next < self.cells.len() => {
                self.pointer = next;
                Ok(())
            }
            _ => Err(RuntimeError::TapeBoundsExceeded {
                at,
                pointer: self.pointer,
            }),
        }
    }

    /// Add `delta` to the current cell, wrapping.
    pub fn add(&mut self, delta: i8) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_add_signed(delta);
    }

    pub fn get(&self) -> u8 {
        self.cells[self.pointer]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Raw view of the cells and pointer for generated code.
    ///
    /// The pointer must be written back with [`Tape::set_pointer`] once the
    /// caller is done.
    pub fn raw_parts(&mut self) -> (&mut [u8], usize) {
        (&mut self.cells, self.pointer)
    }

    /// Restore the pointer after generated code ran. Out-of-range values
    /// are rejected and the pointer left unchanged.
    pub fn set_pointer(&mut self, pointer: usize) -> bool {
        if pointer < self.cells.len() {
            self.pointer = pointer;
            true
        } else {
            false
        }
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new(DEFAULT_TAPE_CAPACITY)
    }
}
