//! The Runner: one parsed program, its configuration, and how to execute it.

use std::io::{Read, Write};
use std::path::Path;

use bfjit_codegen::CompiledProgram;
use bfjit_common::{Program, RuntimeError, Tape};
use bfjit_module::ModuleEmitter;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::error::Error;

/// How [`Runner::run`] executes the program.
#[derive(Debug)]
enum Mode {
    Interpreted,
    Compiled(CompiledProgram),
}

/// A parsed program ready to be interpreted, compiled or emitted.
#[derive(Debug)]
pub struct Runner {
    config: Config,
    program: Program,
    tape: Tape,
    mode: Mode,
}

impl Runner {
    /// Validate `config`, parse `source` and allocate the tape.
    pub fn new(source: &str, config: Config) -> Result<Self, Error> {
        config.validate()?;
        let program = bfjit_parser::parse(source, config.max_nesting_depth)?;
        let tape = Tape::try_new(config.tape_capacity).map_err(|_| ConfigError::TapeTooLarge {
            capacity: config.tape_capacity,
        })?;
        debug!(instructions = program.len(), "runner ready");
        Ok(Self {
            tape,
            config,
            program,
            mode: Mode::Interpreted,
        })
    }

    /// Switch to native execution. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// [`Error::Codegen`] if the program cannot be compiled for this host;
    /// the runner stays interpreted.
    pub fn compile(&mut self) -> Result<(), Error> {
        if self.is_compiled() {
            return Ok(());
        }
        let compiled = CompiledProgram::new(&self.program, self.config.eof)?;
        info!(bytes = compiled.code_len(), "compiled program");
        self.mode = Mode::Compiled(compiled);
        Ok(())
    }

    /// Run the program on a zeroed tape.
    ///
    /// `output` is flushed before returning, whether or not the run
    /// succeeded.
    pub fn run<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<(), Error>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.tape.reset();
        let result = match &self.mode {
            Mode::Interpreted => bfjit_vm::run(&self.program, &mut self.tape, input, output, self.config.eof),
            Mode::Compiled(compiled) => compiled.invoke(&mut self.tape, input, output),
        };
        let flushed = output.flush();
        result?;
        flushed.map_err(RuntimeError::from)?;
        Ok(())
    }

    /// Write the program to `path` as a standalone executable named
    /// `module_name`. Does not need [`compile`](Self::compile).
    pub fn emit_to_file(&self, module_name: &str, path: &Path) -> Result<(), Error> {
        ModuleEmitter::new(self.config.tape_capacity, self.config.eof).emit(&self.program, module_name, path)?;
        Ok(())
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The tape as the last run left it.
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.mode, Mode::Compiled(_))
    }
}
