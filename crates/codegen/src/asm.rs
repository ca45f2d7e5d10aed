//! A minimal x86-64 assembler with forward labels.
//!
//! Only the handful of instruction forms the generator needs are encoded.
//! Branches are always emitted in their rel32 form with a zero placeholder;
//! [`Assembler::finish`] patches every displacement once all labels are
//! bound.

use crate::error::CodegenError;

/// General-purpose registers, numbered as in the ModRM encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    /// Low three bits, as placed in ModRM/SIB.
    fn low(self) -> u8 {
        self as u8 & 7
    }

    /// Whether a REX extension bit is needed.
    fn ext(self) -> bool {
        self as u8 >= 8
    }
}

/// A memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mem {
    /// `[base + disp]`
    Base { base: Reg, disp: i32 },
    /// `[base + index]`; `index` must not be `rsp`.
    Indexed { base: Reg, index: Reg },
}

impl Mem {
    pub fn at(base: Reg) -> Self {
        Mem::Base { base, disp: 0 }
    }

    pub fn disp(base: Reg, disp: i32) -> Self {
        Mem::Base { base, disp }
    }

    fn rex_x(self) -> bool {
        matches!(self, Mem::Indexed { index, .. } if index.ext())
    }

    fn rex_b(self) -> bool {
        match self {
            Mem::Base { base, .. } | Mem::Indexed { base, .. } => base.ext(),
        }
    }
}

/// Integer ALU operations that take an immediate, by their `/digit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Alu {
    Add = 0,
    Sub = 5,
    Cmp = 7,
}

/// Branch conditions, by their `Jcc` condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Cond {
    Below = 0x2,
    AboveOrEqual = 0x3,
    Equal = 0x4,
    NotEqual = 0x5,
    Sign = 0x8,
    LessOrEqual = 0xE,
}

/// A code position that branches can target before it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

impl Label {
    pub fn id(self) -> usize {
        self.0
    }
}

/// Kinds of absolute values patched in after layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationKind {
    /// 64-bit virtual address of the tape.
    TapeBase,
}

/// An 8-byte immediate to patch once the final layout is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Offset of the immediate within the code.
    pub offset: usize,
    pub kind: RelocationKind,
}

/// Finished code with every branch resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub code: Vec<u8>,
    pub relocations: Vec<Relocation>,
    /// Bound offset of every label, indexed by [`Label::id`].
    pub labels: Vec<usize>,
}

/// Pending rel32 displacement: where it sits and which label it targets.
struct Fixup {
    at: usize,
    label: Label,
}

#[derive(Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
    relocations: Vec<Relocation>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current end of the code.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current offset. Rebinding moves the label.
    pub fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    /// Patch every branch and return the code.
    pub fn finish(mut self) -> Result<Assembled, CodegenError> {
        for fixup in &self.fixups {
            let target = self.labels[fixup.label.0].ok_or(CodegenError::UnboundLabel {
                label: fixup.label.0,
            })?;
            let next = fixup.at + 4;
            let rel = i32::try_from(target as i64 - next as i64)
                .map_err(|_| CodegenError::BranchOutOfRange { at: fixup.at })?;
            self.code[fixup.at..next].copy_from_slice(&rel.to_le_bytes());
        }

        let labels = self
            .labels
            .iter()
            .enumerate()
            .map(|(id, offset)| offset.ok_or(CodegenError::UnboundLabel { label: id }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Assembled {
            code: self.code,
            relocations: self.relocations,
            labels,
        })
    }

    // --- raw encoding ---

    fn byte(&mut self, b: u8) {
        self.code.push(b);
    }

    fn bytes(&mut self, bs: &[u8]) {
        self.code.extend_from_slice(bs);
    }

    fn rex(&mut self, w: bool, r: bool, x: bool, b: bool) {
        let rex = 0x40 | (w as u8) << 3 | (r as u8) << 2 | (x as u8) << 1 | b as u8;
        if rex != 0x40 {
            self.byte(rex);
        }
    }

    fn modrm_mem(&mut self, reg: u8, mem: Mem) {
        let reg = (reg & 7) << 3;
        match mem {
            Mem::Base { base, disp } => {
                // rbp/r13 have no disp-less form.
                let (md, width) = if disp == 0 && base.low() != 5 {
                    (0b00, 0)
                } else if i8::try_from(disp).is_ok() {
                    (0b01, 1)
                } else {
                    (0b10, 4)
                };
                self.byte(md << 6 | reg | base.low());
                // rsp/r12 as base need a SIB byte.
                if base.low() == 4 {
                    self.byte(0x24);
                }
                match width {
                    1 => self.byte(disp as i8 as u8),
                    4 => self.bytes(&disp.to_le_bytes()),
                    _ => {}
                }
            }
            Mem::Indexed { base, index } => {
                debug_assert!(index != Reg::Rsp, "rsp cannot be an index");
                let md = if base.low() == 5 { 0b01 } else { 0b00 };
                self.byte(md << 6 | reg | 0b100);
                self.byte(index.low() << 3 | base.low());
                if md == 0b01 {
                    self.byte(0);
                }
            }
        }
    }

    fn op_mem(&mut self, w: bool, opcode: &[u8], reg: u8, mem: Mem) {
        self.rex(w, reg >= 8, mem.rex_x(), mem.rex_b());
        self.bytes(opcode);
        self.modrm_mem(reg, mem);
    }

    fn op_reg(&mut self, w: bool, opcode: &[u8], reg: u8, rm: Reg) {
        self.rex(w, reg >= 8, false, rm.ext());
        self.bytes(opcode);
        self.byte(0b11 << 6 | (reg & 7) << 3 | rm.low());
    }

    fn rel32(&mut self, label: Label) {
        self.fixups.push(Fixup {
            at: self.code.len(),
            label,
        });
        self.bytes(&[0; 4]);
    }

    // --- instructions ---

    pub fn push(&mut self, reg: Reg) {
        self.rex(false, false, false, reg.ext());
        self.byte(0x50 + reg.low());
    }

    pub fn pop(&mut self, reg: Reg) {
        self.rex(false, false, false, reg.ext());
        self.byte(0x58 + reg.low());
    }

    pub fn ret(&mut self) {
        self.byte(0xC3);
    }

    pub fn syscall(&mut self) {
        self.bytes(&[0x0F, 0x05]);
    }

    /// `mov dst, src` (64-bit).
    pub fn mov(&mut self, dst: Reg, src: Reg) {
        self.op_reg(true, &[0x89], src as u8, dst);
    }

    /// `mov dst, qword [mem]`.
    pub fn load(&mut self, dst: Reg, mem: Mem) {
        self.op_mem(true, &[0x8B], dst as u8, mem);
    }

    /// `mov qword [mem], src`.
    pub fn store(&mut self, mem: Mem, src: Reg) {
        self.op_mem(true, &[0x89], src as u8, mem);
    }

    /// `mov byte [mem], src8` for `al`, `cl`, `dl` or `bl`.
    pub fn store_byte(&mut self, mem: Mem, src: Reg) {
        debug_assert!((src as u8) < 4, "only legacy byte registers");
        self.op_mem(false, &[0x88], src as u8, mem);
    }

    /// `movzx dst32, byte [mem]`.
    pub fn load_byte(&mut self, dst: Reg, mem: Mem) {
        self.op_mem(false, &[0x0F, 0xB6], dst as u8, mem);
    }

    /// `mov dst32, imm32`, zero-extending into the full register.
    pub fn mov_imm32(&mut self, dst: Reg, imm: u32) {
        self.rex(false, false, false, dst.ext());
        self.byte(0xB8 + dst.low());
        self.bytes(&imm.to_le_bytes());
    }

    /// `mov dst, imm64`.
    pub fn mov_imm64(&mut self, dst: Reg, imm: u64) {
        self.rex(true, false, false, dst.ext());
        self.byte(0xB8 + dst.low());
        self.bytes(&imm.to_le_bytes());
    }

    /// `mov dst, imm64` with the immediate left for a later relocation.
    pub fn mov_reloc(&mut self, dst: Reg, kind: RelocationKind) {
        self.rex(true, false, false, dst.ext());
        self.byte(0xB8 + dst.low());
        self.relocations.push(Relocation {
            offset: self.code.len(),
            kind,
        });
        self.bytes(&[0; 8]);
    }

    /// `op dst, imm32` (64-bit, immediate sign-extended).
    pub fn alu_imm(&mut self, op: Alu, dst: Reg, imm: i32) {
        self.op_reg(true, &[0x81], op as u8, dst);
        self.bytes(&imm.to_le_bytes());
    }

    /// `op dst32, imm32`.
    pub fn alu_imm32(&mut self, op: Alu, dst: Reg, imm: i32) {
        self.op_reg(false, &[0x81], op as u8, dst);
        self.bytes(&imm.to_le_bytes());
    }

    /// `op byte [mem], imm8`.
    pub fn alu_byte_imm(&mut self, op: Alu, mem: Mem, imm: u8) {
        self.op_mem(false, &[0x80], op as u8, mem);
        self.byte(imm);
    }

    /// `cmp a, b` (64-bit): flags from `a - b`.
    pub fn cmp(&mut self, a: Reg, b: Reg) {
        self.op_reg(true, &[0x39], b as u8, a);
    }

    /// `test a, b` (64-bit).
    pub fn test(&mut self, a: Reg, b: Reg) {
        self.op_reg(true, &[0x85], b as u8, a);
    }

    /// `test a32, b32`.
    pub fn test32(&mut self, a: Reg, b: Reg) {
        self.op_reg(false, &[0x85], b as u8, a);
    }

    /// `xor dst32, src32`; with `dst == src` this zeroes the full register.
    pub fn xor32(&mut self, dst: Reg, src: Reg) {
        self.op_reg(false, &[0x31], src as u8, dst);
    }

    /// `lea dst, [mem]`.
    pub fn lea(&mut self, dst: Reg, mem: Mem) {
        self.op_mem(true, &[0x8D], dst as u8, mem);
    }

    /// `call qword [mem]`.
    pub fn call_mem(&mut self, mem: Mem) {
        self.op_mem(false, &[0xFF], 2, mem);
    }

    pub fn jmp(&mut self, label: Label) {
        self.byte(0xE9);
        self.rel32(label);
    }

    pub fn jcc(&mut self, cond: Cond, label: Label) {
        self.bytes(&[0x0F, 0x80 | cond as u8]);
        self.rel32(label);
    }
}
