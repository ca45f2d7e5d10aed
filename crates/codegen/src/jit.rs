//! Loading generated code into executable memory and calling it.
//!
//! This is the only module that executes raw machine code. The code is
//! generated for [`HostCalls`], copied into an anonymous mapping that is then
//! flipped from writable to executable, and entered through the System V
//! calling convention with a [`Context`] that routes I/O back into Rust.

use std::ffi::c_void;
use std::io::{self, Read, Write};

use bfjit_common::{EofPolicy, Program, RuntimeError, Tape};
use memmap2::{Mmap, MmapMut};
use tracing::{debug, trace};

use crate::environment::{STATUS_IO, STATUS_OK, STATUS_TAPE_BOUNDS};
use crate::error::CodegenError;
use crate::generate::generate;
use crate::host::{Context, HostCalls};

/// A program translated to native code, ready to run against any tape.
pub struct CompiledProgram {
    code: Mmap,
    entry: usize,
    eof: EofPolicy,
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("code_len", &self.code.len())
            .field("entry", &self.entry)
            .field("eof", &self.eof)
            .finish()
    }
}

/// Borrowed channels handed to the callbacks through `Context::host`.
struct HostIo<'a, R: ?Sized, W: ?Sized> {
    input: &'a mut R,
    output: &'a mut W,
    /// The error behind a `STATUS_IO` exit.
    error: Option<io::Error>,
}

impl CompiledProgram {
    /// Generate and map native code for `program`.
    ///
    /// # Errors
    ///
    /// [`CodegenError::UnsupportedHost`] on anything but x86-64, any
    /// generation error, or [`CodegenError::Map`] if executable memory
    /// cannot be obtained.
    pub fn new(program: &Program, eof: EofPolicy) -> Result<Self, CodegenError> {
        if !cfg!(target_arch = "x86_64") {
            return Err(CodegenError::UnsupportedHost);
        }

        let machine = generate(program, &HostCalls, eof)?;

        let mut map = MmapMut::map_anon(machine.bytes.len()).map_err(CodegenError::Map)?;
        map.copy_from_slice(&machine.bytes);
        let code = map.make_exec().map_err(CodegenError::Map)?;

        debug!(bytes = code.len(), "mapped compiled program");
        Ok(Self {
            code,
            entry: machine.entry,
            eof,
        })
    }

    /// Size of the generated code in bytes.
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    pub fn eof_policy(&self) -> EofPolicy {
        self.eof
    }

    /// Run the compiled code against `tape`, starting at its current
    /// pointer.
    ///
    /// Produces exactly the output and outcome the interpreter would. The
    /// tape's pointer is updated to where the code left it.
    pub fn invoke<R, W>(&self, tape: &mut Tape, input: &mut R, output: &mut W) -> Result<(), RuntimeError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut host = HostIo {
            input,
            output,
            error: None,
        };
        let (cells, pointer) = tape.raw_parts();
        let mut ctx = Context {
            host: (&mut host as *mut HostIo<'_, R, W>).cast::<c_void>(),
            pointer,
            ..Context::default()
        };

        let status = self.enter::<R, W>(cells, &mut ctx);
        trace!(status, pointer = ctx.pointer, "compiled program returned");
        tape.set_pointer(ctx.pointer);

        match status {
            STATUS_OK => Ok(()),
            STATUS_TAPE_BOUNDS => Err(RuntimeError::TapeBoundsExceeded {
                at: ctx.fault_at,
                pointer: ctx.pointer,
            }),
            STATUS_IO => Err(RuntimeError::Io(host.error.take().unwrap_or_else(|| {
                io::Error::other("compiled program reported an i/o error")
            }))),
            other => Err(RuntimeError::Io(io::Error::other(format!(
                "compiled program returned unknown status {other}"
            )))),
        }
    }

    #[cfg(target_arch = "x86_64")]
    fn enter<R, W>(&self, cells: &mut [u8], ctx: &mut Context) -> u32
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        type Entry = unsafe extern "sysv64" fn(*mut u8, usize, *mut Context) -> u32;

        let read: extern "sysv64" fn(*mut c_void) -> i32 = read_callback::<R, W>;
        let write: extern "sysv64" fn(*mut c_void, u32) -> i32 = write_callback::<R, W>;
        ctx.read = read as *const c_void;
        ctx.write = write as *const c_void;

        // SAFETY: `code` holds a complete function generated for `HostCalls`
        // with the `Entry` signature, starting at `entry`. The code touches
        // only `cells[..cells.len()]` (every move is bounds-checked against
        // the length passed in), `ctx`, and the host through the callbacks,
        // all of which outlive the call. The `HostIo` behind `ctx.host` is
        // not touched from Rust until the call returns.
        unsafe {
            let entry: Entry = std::mem::transmute(self.code.as_ptr().add(self.entry));
            entry(cells.as_mut_ptr(), cells.len(), ctx)
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn enter<R, W>(&self, _cells: &mut [u8], _ctx: &mut Context) -> u32
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        // `new` refuses to build one of these off x86-64.
        STATUS_IO
    }
}

#[cfg(target_arch = "x86_64")]
extern "sysv64" fn read_callback<R, W>(host: *mut c_void) -> i32
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    // SAFETY: `host` is the `HostIo<R, W>` that `invoke` placed in the
    // context; it is live and not otherwise borrowed during the call.
    let host = unsafe { &mut *host.cast::<HostIo<'_, R, W>>() };
    match bfjit_common::io::read_byte(&mut *host.input) {
        Ok(Some(byte)) => i32::from(byte),
        Ok(None) => crate::host::READ_EOF,
        Err(e) => {
            host.error = Some(e);
            -1
        }
    }
}

#[cfg(target_arch = "x86_64")]
extern "sysv64" fn write_callback<R, W>(host: *mut c_void, byte: u32) -> i32
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    // SAFETY: as in `read_callback`.
    let host = unsafe { &mut *host.cast::<HostIo<'_, R, W>>() };
    match bfjit_common::io::write_byte(&mut *host.output, byte as u8) {
        Ok(()) => 0,
        Err(e) => {
            host.error = Some(e);
            1
        }
    }
}
