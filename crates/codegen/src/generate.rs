//! Translation of a program into x86-64 machine code.
//!
//! One linear pass emits one fragment per instruction. Every instruction
//! index `0..=len` gets a label up front, so a `LoopOpen` can branch to a
//! `LoopClose` that has not been emitted yet; the assembler patches the
//! displacements once all labels are bound.

use bfjit_common::{EofPolicy, Instruction, Program};
use tracing::debug;

use crate::asm::{Alu, Assembler, Cond, Label, Mem, Reg, Relocation, RelocationKind};
use crate::environment::{Environment, Exits, CAPACITY, CELL, POINTER};
use crate::error::CodegenError;

/// Generated code plus what a loader needs to place it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineCode {
    pub bytes: Vec<u8>,
    /// Offset of the entry point within `bytes`.
    pub entry: usize,
    pub relocations: Vec<Relocation>,
    /// Code offset of every instruction, plus one past the last.
    pub addresses: Vec<usize>,
}

impl MachineCode {
    /// Write `value` into every relocation of kind `kind`.
    pub fn patch(&mut self, kind: RelocationKind, value: u64) {
        for reloc in self.relocations.iter().filter(|r| r.kind == kind) {
            self.bytes[reloc.offset..reloc.offset + 8].copy_from_slice(&value.to_le_bytes());
        }
    }
}

/// Translates programs for one environment.
pub struct CodeGenerator<'e, E: ?Sized> {
    env: &'e E,
    eof: EofPolicy,
}

impl<'e, E: Environment + ?Sized> CodeGenerator<'e, E> {
    pub fn new(env: &'e E, eof: EofPolicy) -> Self {
        Self { env, eof }
    }

    /// Generate code for `program`.
    pub fn generate(&self, program: &Program) -> Result<MachineCode, CodegenError> {
        let mut asm = Assembler::new();
        let entry = asm.offset();
        self.env.prologue(&mut asm);

        let addresses: Vec<Label> = (0..=program.len()).map(|_| asm.new_label()).collect();
        let exits = Exits {
            ok: asm.new_label(),
            bounds: asm.new_label(),
            io: asm.new_label(),
        };
        let mut fault_stubs = Vec::new();

        for (at, instr) in program.iter().enumerate() {
            asm.bind(addresses[at]);
            match *instr {
                Instruction::MovePointer(delta) => {
                    let stub = asm.new_label();
                    fault_stubs.push((stub, at));
                    self.emit_move(&mut asm, delta, stub);
                }
                Instruction::AddToCell(delta) => {
                    if delta != 0 {
                        asm.alu_byte_imm(Alu::Add, CELL, delta as u8);
                    }
                }
                Instruction::Input => self.emit_input(&mut asm, exits.io),
                Instruction::Output => self.env.write_byte(&mut asm, exits.io),
                Instruction::LoopOpen { target } => {
                    let target = resolve(&addresses, at, target)?;
                    asm.alu_byte_imm(Alu::Cmp, CELL, 0);
                    asm.jcc(Cond::Equal, target);
                }
                Instruction::LoopClose { target } => {
                    let target = resolve(&addresses, at, target)?;
                    asm.alu_byte_imm(Alu::Cmp, CELL, 0);
                    asm.jcc(Cond::NotEqual, target);
                }
            }
        }
        asm.bind(addresses[program.len()]);
        asm.jmp(exits.ok);

        // Out of line so the straight-line path stays short.
        for (stub, at) in fault_stubs {
            asm.bind(stub);
            self.env.record_fault(&mut asm, at);
            asm.jmp(exits.bounds);
        }

        self.env.epilogue(&mut asm, &exits);

        let assembled = asm.finish()?;
        let addresses = addresses
            .iter()
            .map(|label| assembled.labels[label.id()])
            .collect();

        debug!(
            instructions = program.len(),
            bytes = assembled.code.len(),
            "generated machine code"
        );

        Ok(MachineCode {
            bytes: assembled.code,
            entry,
            relocations: assembled.relocations,
            addresses,
        })
    }

    /// Move the pointer, branching to `fault` without moving if the result
    /// would leave `[0, CAPACITY)`.
    fn emit_move(&self, asm: &mut Assembler, delta: i8, fault: Label) {
        let step = i32::from(delta).abs();
        if delta > 0 {
            asm.lea(Reg::Rax, Mem::disp(POINTER, step));
            asm.cmp(Reg::Rax, CAPACITY);
            asm.jcc(Cond::AboveOrEqual, fault);
            asm.mov(POINTER, Reg::Rax);
        } else if delta < 0 {
            asm.alu_imm(Alu::Cmp, POINTER, step);
            asm.jcc(Cond::Below, fault);
            asm.alu_imm(Alu::Sub, POINTER, step);
        }
    }

    fn emit_input(&self, asm: &mut Assembler, io_error: Label) {
        let eof = asm.new_label();
        let store = asm.new_label();
        let done = asm.new_label();

        self.env.read_byte(asm, eof, io_error);
        asm.jmp(store);

        asm.bind(eof);
        match self.eof.value() {
            Some(0) => asm.xor32(Reg::Rax, Reg::Rax),
            Some(value) => asm.mov_imm32(Reg::Rax, u32::from(value)),
            None => asm.jmp(done),
        }

        asm.bind(store);
        asm.store_byte(CELL, Reg::Rax);
        asm.bind(done);
    }
}

fn resolve(addresses: &[Label], at: usize, target: usize) -> Result<Label, CodegenError> {
    addresses
        .get(target)
        .copied()
        .ok_or(CodegenError::InvalidTarget { at, target })
}

/// Generate code for `program` in `env`.
pub fn generate<E: Environment + ?Sized>(
    program: &Program,
    env: &E,
    eof: EofPolicy,
) -> Result<MachineCode, CodegenError> {
    CodeGenerator::new(env, eof).generate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostCalls;
    use crate::linux::LinuxSyscalls;

    fn program(instrs: Vec<Instruction>) -> Program {
        Program::new(instrs)
    }

    /// Decode the rel32 branch ending at `end` and return its target.
    fn branch_target(code: &[u8], end: usize) -> usize {
        let rel = i32::from_le_bytes(code[end - 4..end].try_into().unwrap());
        (end as i64 + rel as i64) as usize
    }

    #[test]
    fn one_address_per_instruction_plus_end() {
        let p = program(vec![Instruction::AddToCell(1), Instruction::Output]);
        let code = generate(&p, &HostCalls, EofPolicy::Zero).unwrap();
        assert_eq!(code.addresses.len(), 3);
        assert!(code.addresses.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(code.entry, 0);
    }

    #[test]
    fn add_to_cell_is_one_memory_op() {
        let p = program(vec![Instruction::AddToCell(-1)]);
        let code = generate(&p, &HostCalls, EofPolicy::Zero).unwrap();
        let start = code.addresses[0];
        assert_eq!(
            &code.bytes[start..code.addresses[1]],
            &[0x42, 0x80, 0x04, 0x23, 0xFF]
        );
    }

    #[test]
    fn loop_branches_land_past_partner() {
        // [ - ]
        let p = program(vec![
            Instruction::LoopOpen { target: 3 },
            Instruction::AddToCell(-1),
            Instruction::LoopClose { target: 1 },
        ]);
        let code = generate(&p, &HostCalls, EofPolicy::Zero).unwrap();

        // cmp byte [rbx+r12], 0 ; je rel32
        let open_end = code.addresses[1];
        assert_eq!(&code.bytes[code.addresses[0]..open_end - 4], &[0x42, 0x80, 0x3C, 0x23, 0x00, 0x0F, 0x84]);
        assert_eq!(branch_target(&code.bytes, open_end), code.addresses[3]);

        let close_end = code.addresses[3];
        assert_eq!(&code.bytes[close_end - 6..close_end - 4], &[0x0F, 0x85]);
        assert_eq!(branch_target(&code.bytes, close_end), code.addresses[1]);
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let p = program(vec![Instruction::LoopOpen { target: 7 }]);
        assert!(matches!(
            generate(&p, &HostCalls, EofPolicy::Zero),
            Err(CodegenError::InvalidTarget { at: 0, target: 7 })
        ));
    }

    #[test]
    fn standalone_code_carries_tape_relocation() {
        let p = program(vec![Instruction::Output]);
        let mut code = generate(&p, &LinuxSyscalls::new(8), EofPolicy::Zero).unwrap();
        assert_eq!(code.relocations.len(), 1);
        let offset = code.relocations[0].offset;
        code.patch(RelocationKind::TapeBase, 0x0060_0000);
        assert_eq!(&code.bytes[offset..offset + 8], &0x0060_0000u64.to_le_bytes());
    }

    #[test]
    fn host_code_has_no_relocations() {
        let p = program(vec![Instruction::Input, Instruction::Output]);
        let code = generate(&p, &HostCalls, EofPolicy::Unchanged).unwrap();
        assert!(code.relocations.is_empty());
    }

    #[test]
    fn generation_is_deterministic() {
        let p = program(vec![
            Instruction::MovePointer(1),
            Instruction::LoopOpen { target: 4 },
            Instruction::Input,
            Instruction::LoopClose { target: 2 },
        ]);
        let a = generate(&p, &HostCalls, EofPolicy::Zero).unwrap();
        let b = generate(&p, &HostCalls, EofPolicy::Zero).unwrap();
        assert_eq!(a, b);
    }
}
