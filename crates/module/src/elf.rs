//! ELF64 image layout for standalone modules.
//!
//! ```text
//! 0x000  ELF header
//! 0x040  program headers: PT_LOAD (R+X), PT_LOAD (R+W, tape), PT_NOTE
//! 0x0E8  notes: module name, code digest
//!        code (16-byte aligned)
//! ```
//!
//! The first load segment maps the whole file at [`BASE_ADDRESS`]. The tape
//! is a zero-fill segment on the next page boundary after it, with no file
//! bytes behind it.

use bfjit_codegen::{MachineCode, RelocationKind};

use crate::error::EmitError;

/// Virtual address the file is mapped at.
pub const BASE_ADDRESS: u64 = 0x40_0000;

/// Owner string of the module's notes.
pub const NOTE_OWNER: &str = "BFJIT";
/// Note type carrying the module name.
pub const NT_MODULE_NAME: u32 = 1;
/// Note type carrying the blake3 digest of the code.
pub const NT_CODE_DIGEST: u32 = 2;

const PAGE: u64 = 0x1000;
const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;
const PHNUM: usize = 3;
const HEADERS_SIZE: usize = EHDR_SIZE + PHNUM * PHDR_SIZE;
const CODE_ALIGN: usize = 16;

const ET_EXEC: u16 = 2;
const EM_X86_64: u16 = 62;
const PT_LOAD: u32 = 1;
const PT_NOTE: u32 = 4;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

/// What [`inspect`] recovers from a module file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    /// blake3 digest of the code, checked against the code on inspection.
    pub digest: blake3::Hash,
    /// Virtual address execution starts at.
    pub entry: u64,
    pub tape_capacity: u64,
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Size of one note with an owner of `NOTE_OWNER` and `desc_len` bytes of
/// payload.
fn note_size(desc_len: usize) -> usize {
    12 + align_up(NOTE_OWNER.len() + 1, 4) + align_up(desc_len, 4)
}

struct Image {
    bytes: Vec<u8>,
}

impl Image {
    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn pad_to(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }

    #[allow(clippy::too_many_arguments)]
    fn program_header(&mut self, kind: u32, flags: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64, align: u64) {
        self.u32(kind);
        self.u32(flags);
        self.u64(offset);
        self.u64(vaddr);
        self.u64(vaddr);
        self.u64(filesz);
        self.u64(memsz);
        self.u64(align);
    }

    fn note(&mut self, kind: u32, desc: &[u8]) {
        self.u32((NOTE_OWNER.len() + 1) as u32);
        self.u32(desc.len() as u32);
        self.u32(kind);
        self.bytes.extend_from_slice(NOTE_OWNER.as_bytes());
        self.bytes.push(0);
        self.pad_to(align_up(self.bytes.len(), 4));
        self.bytes.extend_from_slice(desc);
        self.pad_to(align_up(self.bytes.len(), 4));
    }
}

/// Lay out `code` (generated for `LinuxSyscalls` with the same
/// `tape_capacity`) as a complete executable image named `name`.
pub fn link(mut code: MachineCode, name: &str, tape_capacity: usize) -> Vec<u8> {
    let notes_len = note_size(name.len()) + note_size(blake3::OUT_LEN);
    let code_offset = align_up(HEADERS_SIZE + notes_len, CODE_ALIGN);
    let file_len = code_offset + code.bytes.len();
    let tape_address = (BASE_ADDRESS + file_len as u64).div_ceil(PAGE) * PAGE;

    code.patch(RelocationKind::TapeBase, tape_address);
    let digest = blake3::hash(&code.bytes);
    let entry = BASE_ADDRESS + (code_offset + code.entry) as u64;

    let mut image = Image {
        bytes: Vec::with_capacity(file_len),
    };

    // e_ident
    image.bytes.extend_from_slice(&[0x7F, b'E', b'L', b'F', 2, 1, 1, 0]);
    image.pad_to(16);
    image.u16(ET_EXEC);
    image.u16(EM_X86_64);
    image.u32(1);
    image.u64(entry);
    image.u64(EHDR_SIZE as u64);
    image.u64(0); // no section headers
    image.u32(0);
    image.u16(EHDR_SIZE as u16);
    image.u16(PHDR_SIZE as u16);
    image.u16(PHNUM as u16);
    image.u16(0);
    image.u16(0);
    image.u16(0);

    image.program_header(PT_LOAD, PF_R | PF_X, 0, BASE_ADDRESS, file_len as u64, file_len as u64, PAGE);
    image.program_header(PT_LOAD, PF_R | PF_W, 0, tape_address, 0, tape_capacity as u64, PAGE);
    image.program_header(
        PT_NOTE,
        PF_R,
        HEADERS_SIZE as u64,
        BASE_ADDRESS + HEADERS_SIZE as u64,
        notes_len as u64,
        notes_len as u64,
        4,
    );
    debug_assert_eq!(image.bytes.len(), HEADERS_SIZE);

    image.note(NT_MODULE_NAME, name.as_bytes());
    image.note(NT_CODE_DIGEST, digest.as_bytes());
    image.pad_to(code_offset);
    image.bytes.extend_from_slice(&code.bytes);

    image.bytes
}

/// `base + extra`, or `Malformed` if an offset read from the file overflows.
fn offset(base: usize, extra: usize) -> Result<usize, EmitError> {
    base.checked_add(extra).ok_or(EmitError::Malformed("truncated"))
}

fn read<const N: usize>(bytes: &[u8], at: usize) -> Result<[u8; N], EmitError> {
    bytes
        .get(at..offset(at, N)?)
        .and_then(|s| s.try_into().ok())
        .ok_or(EmitError::Malformed("truncated"))
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, EmitError> {
    read(bytes, at).map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, EmitError> {
    read(bytes, at).map(u32::from_le_bytes)
}

fn read_u64(bytes: &[u8], at: usize) -> Result<u64, EmitError> {
    read(bytes, at).map(u64::from_le_bytes)
}

fn to_usize(value: u64) -> Result<usize, EmitError> {
    usize::try_from(value).map_err(|_| EmitError::Malformed("offset out of range"))
}

/// Read back the name and digest of a module produced by [`link`].
///
/// # Errors
///
/// [`EmitError::Malformed`] if `bytes` is not an x86-64 ELF executable with
/// both notes, or if the code no longer matches its digest.
pub fn inspect(bytes: &[u8]) -> Result<ModuleInfo, EmitError> {
    if bytes.len() < EHDR_SIZE || bytes[..4] != [0x7F, b'E', b'L', b'F'] {
        return Err(EmitError::Malformed("not an ELF file"));
    }
    if bytes[4] != 2 || bytes[5] != 1 || read_u16(bytes, 18)? != EM_X86_64 {
        return Err(EmitError::Malformed("not a little-endian x86-64 ELF64 file"));
    }
    let entry = read_u64(bytes, 24)?;
    let phoff = to_usize(read_u64(bytes, 32)?)?;
    if usize::from(read_u16(bytes, 54)?) != PHDR_SIZE {
        return Err(EmitError::Malformed("unexpected program header size"));
    }
    let phnum = usize::from(read_u16(bytes, 56)?);

    let mut notes = None;
    let mut tape_capacity = None;
    for i in 0..phnum {
        let at = offset(phoff, i * PHDR_SIZE)?;
        let kind = read_u32(bytes, at)?;
        let flags = read_u32(bytes, offset(at, 4)?)?;
        if kind == PT_NOTE {
            let start = to_usize(read_u64(bytes, offset(at, 8)?)?)?;
            let size = to_usize(read_u64(bytes, offset(at, 32)?)?)?;
            notes = Some((start, size));
        } else if kind == PT_LOAD && flags & PF_W != 0 {
            tape_capacity = Some(read_u64(bytes, offset(at, 40)?)?);
        }
    }
    let (notes_offset, notes_len) = notes.ok_or(EmitError::Malformed("no note segment"))?;
    let tape_capacity = tape_capacity.ok_or(EmitError::Malformed("no tape segment"))?;
    let notes_end = notes_offset
        .checked_add(notes_len)
        .filter(|&end| end <= bytes.len())
        .ok_or(EmitError::Malformed("note segment outside the file"))?;

    let mut name = None;
    let mut digest = None;
    let mut at = notes_offset;
    while offset(at, 12)? <= notes_end {
        let namesz = read_u32(bytes, at)? as usize;
        let descsz = read_u32(bytes, at + 4)? as usize;
        let kind = read_u32(bytes, at + 8)?;
        let owner_at = at + 12;
        let desc_at = offset(owner_at, align_up(namesz, 4))?;
        let desc = bytes
            .get(desc_at..offset(desc_at, descsz)?)
            .ok_or(EmitError::Malformed("truncated note"))?;
        let owner = bytes
            .get(owner_at..owner_at + namesz)
            .ok_or(EmitError::Malformed("truncated note"))?;

        if owner.strip_suffix(&[0]) == Some(NOTE_OWNER.as_bytes()) {
            match kind {
                NT_MODULE_NAME => {
                    let text = std::str::from_utf8(desc)
                        .map_err(|_| EmitError::Malformed("module name is not UTF-8"))?;
                    name = Some(text.to_owned());
                }
                NT_CODE_DIGEST => {
                    let raw: [u8; blake3::OUT_LEN] = desc
                        .try_into()
                        .map_err(|_| EmitError::Malformed("digest has the wrong length"))?;
                    digest = Some(blake3::Hash::from_bytes(raw));
                }
                _ => {}
            }
        }
        at = offset(desc_at, align_up(descsz, 4))?;
    }

    let name = name.ok_or(EmitError::Malformed("no module name note"))?;
    let digest = digest.ok_or(EmitError::Malformed("no code digest note"))?;

    let code = &bytes[align_up(notes_end, CODE_ALIGN).min(bytes.len())..];
    if blake3::hash(code) != digest {
        return Err(EmitError::Malformed("code does not match its digest"));
    }

    Ok(ModuleInfo {
        name,
        digest,
        entry,
        tape_capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfjit_codegen::{generate, LinuxSyscalls};
    use bfjit_common::{EofPolicy, Instruction, Program};

    fn image(name: &str, capacity: usize) -> Vec<u8> {
        let program = Program::new(vec![Instruction::AddToCell(1), Instruction::Output]);
        let code = generate(&program, &LinuxSyscalls::new(capacity), EofPolicy::Zero).unwrap();
        link(code, name, capacity)
    }

    #[test]
    fn header_fields() {
        let bytes = image("hello", 64);
        assert_eq!(&bytes[..4], b"\x7FELF");
        assert_eq!(read_u16(&bytes, 16).unwrap(), ET_EXEC);
        assert_eq!(read_u16(&bytes, 18).unwrap(), EM_X86_64);
        assert_eq!(read_u64(&bytes, 32).unwrap(), 64);
        assert_eq!(read_u16(&bytes, 56).unwrap(), 3);
    }

    #[test]
    fn tape_segment_is_page_aligned_zero_fill() {
        let bytes = image("t", 30_000);
        let at = EHDR_SIZE + PHDR_SIZE;
        assert_eq!(read_u32(&bytes, at).unwrap(), PT_LOAD);
        let vaddr = read_u64(&bytes, at + 16).unwrap();
        assert_eq!(vaddr % PAGE, 0);
        assert!(vaddr >= BASE_ADDRESS + bytes.len() as u64);
        assert_eq!(read_u64(&bytes, at + 32).unwrap(), 0);
        assert_eq!(read_u64(&bytes, at + 40).unwrap(), 30_000);
    }

    #[test]
    fn tape_address_is_patched_into_code() {
        let bytes = image("t", 16);
        let vaddr = read_u64(&bytes, EHDR_SIZE + PHDR_SIZE + 16).unwrap();
        let needle = vaddr.to_le_bytes();
        assert!(bytes.windows(8).any(|w| w == needle));
    }

    #[test]
    fn entry_points_into_code() {
        let bytes = image("t", 16);
        let entry = read_u64(&bytes, 24).unwrap();
        let offset = (entry - BASE_ADDRESS) as usize;
        assert_eq!(offset % CODE_ALIGN, 0);
        // sub rsp, 16
        assert_eq!(&bytes[offset..offset + 3], &[0x48, 0x81, 0xEC]);
    }

    #[test]
    fn inspect_reads_back_name_and_digest() {
        let bytes = image("greeter", 128);
        let info = inspect(&bytes).unwrap();
        assert_eq!(info.name, "greeter");
        assert_eq!(info.tape_capacity, 128);
        assert_eq!(info.entry, read_u64(&bytes, 24).unwrap());
    }

    #[test]
    fn inspect_rejects_tampered_code() {
        let mut bytes = image("greeter", 128);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(inspect(&bytes), Err(EmitError::Malformed(_))));
    }

    #[test]
    fn inspect_rejects_non_elf() {
        assert!(matches!(inspect(b"#!/bin/sh\n"), Err(EmitError::Malformed(_))));
        assert!(matches!(inspect(&[0; 100]), Err(EmitError::Malformed(_))));
    }

    #[test]
    fn inspect_rejects_header_offsets_past_the_end() {
        let mut bytes = image("greeter", 128);
        bytes.truncate(EHDR_SIZE);
        bytes[32..40].copy_from_slice(&(u64::MAX - 3).to_le_bytes());
        bytes[56..58].copy_from_slice(&1u16.to_le_bytes());
        assert!(matches!(inspect(&bytes), Err(EmitError::Malformed(_))));
    }

    #[test]
    fn inspect_rejects_oversized_note_lengths() {
        let mut bytes = image("greeter", 128);
        let first_note = HEADERS_SIZE;
        bytes[first_note + 4..first_note + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(inspect(&bytes), Err(EmitError::Malformed(_))));
    }

    #[test]
    fn odd_name_lengths_keep_code_aligned() {
        for name in ["a", "ab", "abc", "abcd", "abcde"] {
            let bytes = image(name, 8);
            let entry = read_u64(&bytes, 24).unwrap();
            assert_eq!((entry - BASE_ADDRESS) % CODE_ALIGN as u64, 0);
            assert_eq!(inspect(&bytes).unwrap().name, name);
        }
    }
}
