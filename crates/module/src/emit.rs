//! Building module images and writing them to disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use bfjit_codegen::{generate, LinuxSyscalls};
use bfjit_common::{EofPolicy, Program, DEFAULT_TAPE_CAPACITY};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::elf;
use crate::error::EmitError;

/// Longest module name accepted, in bytes.
pub const MAX_MODULE_NAME_LEN: usize = 255;

/// Turns programs into standalone executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleEmitter {
    tape_capacity: usize,
    eof: EofPolicy,
}

impl Default for ModuleEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_TAPE_CAPACITY, EofPolicy::default())
    }
}

impl ModuleEmitter {
    /// An emitter whose modules own a `tape_capacity`-cell tape and follow
    /// `eof` at end of input.
    pub fn new(tape_capacity: usize, eof: EofPolicy) -> Self {
        Self { tape_capacity, eof }
    }

    pub fn tape_capacity(&self) -> usize {
        self.tape_capacity
    }

    pub fn eof_policy(&self) -> EofPolicy {
        self.eof
    }

    /// Build the image of `program` in memory.
    pub fn build(&self, program: &Program, module_name: &str) -> Result<Vec<u8>, EmitError> {
        validate_name(module_name)?;
        let env = LinuxSyscalls::new(self.tape_capacity);
        let code = generate(program, &env, self.eof)?;
        let bytes = elf::link(code, module_name, self.tape_capacity);
        debug!(module = module_name, bytes = bytes.len(), "linked module");
        Ok(bytes)
    }

    /// Build `program` and write it to `destination` as an executable.
    ///
    /// The file appears at `destination` complete or not at all.
    pub fn emit(&self, program: &Program, module_name: &str, destination: &Path) -> Result<(), EmitError> {
        validate_destination(destination)?;
        let bytes = self.build(program, module_name)?;
        write_atomically(destination, &bytes)?;
        info!(module = module_name, path = %destination.display(), "wrote module");
        Ok(())
    }
}

/// Emit `program` to `destination` with the given tape size and EOF policy.
pub fn emit(
    program: &Program,
    tape_capacity: usize,
    eof: EofPolicy,
    module_name: &str,
    destination: &Path,
) -> Result<(), EmitError> {
    ModuleEmitter::new(tape_capacity, eof).emit(program, module_name, destination)
}

fn invalid_name(name: &str, reason: &'static str) -> EmitError {
    EmitError::InvalidModuleName {
        name: name.to_owned(),
        reason,
    }
}

/// Check that `name` can be embedded in a module.
pub fn validate_name(name: &str) -> Result<(), EmitError> {
    if name.is_empty() {
        return Err(invalid_name(name, "is empty"));
    }
    if name.len() > MAX_MODULE_NAME_LEN {
        return Err(invalid_name(name, "is longer than 255 bytes"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid_name(name, "contains a control character"));
    }
    if name.contains(&['/', '\\'][..]) {
        return Err(invalid_name(name, "contains a path separator"));
    }
    Ok(())
}

fn invalid_destination(path: &Path, reason: &'static str) -> EmitError {
    EmitError::InvalidDestination {
        path: path.to_path_buf(),
        reason,
    }
}

/// Directory the destination file lives in.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn validate_destination(path: &Path) -> Result<(), EmitError> {
    if path.as_os_str().is_empty() {
        return Err(invalid_destination(path, "is empty"));
    }
    if path.is_dir() {
        return Err(invalid_destination(path, "is a directory"));
    }
    if !parent_dir(path).is_dir() {
        return Err(invalid_destination(path, "parent directory does not exist"));
    }
    Ok(())
}

fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), EmitError> {
    let mut file = NamedTempFile::new_in(parent_dir(destination))?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))?;
    }

    file.persist(destination).map_err(|e| EmitError::Write(e.error))?;
    Ok(())
}
