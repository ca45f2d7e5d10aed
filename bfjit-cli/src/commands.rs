//! CLI command implementations.

use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;

use bfjit::{CodegenError, Config, Error, Runner};
use tracing::{debug, warn};

use crate::Args;

/// Carry out what `args` asks for.
pub fn dispatch(args: &Args) -> Result<(), i32> {
    if args.inspect {
        return inspect(&args.source);
    }

    let source = read_source(&args.source)?;
    let config = Config::default()
        .with_tape_capacity(args.memory_size)
        .with_max_nesting_depth(args.stack_depth)
        .with_eof(args.eof);
    let mut runner = Runner::new(&source, config).map_err(report)?;

    match &args.output {
        Some(path) => emit(&runner, args.module_name.as_deref(), path),
        None => run(&mut runner, args.interpret),
    }
}

/// A path to an existing file is read; anything else is program text.
fn read_source(arg: &str) -> Result<String, i32> {
    let path = Path::new(arg);
    if !path.is_file() {
        debug!("treating argument as inline source");
        return Ok(arg.to_owned());
    }
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{arg}': {e}");
        1
    })
}

/// Print `e` and pick the exit code for it.
fn report(e: Error) -> i32 {
    match e {
        Error::Runtime(e) => {
            eprintln!("runtime error: {e}");
            3
        }
        other => {
            eprintln!("error: {other}");
            1
        }
    }
}

fn run(runner: &mut Runner, interpret: bool) -> Result<(), i32> {
    if !interpret {
        match runner.compile() {
            Ok(()) => {}
            Err(Error::Codegen(CodegenError::UnsupportedHost)) => {
                warn!("native code is not supported here; interpreting");
            }
            Err(e) => return Err(report(e)),
        }
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = BufWriter::new(stdout.lock());
    runner.run(&mut input, &mut output).map_err(report)
}

fn emit(runner: &Runner, module_name: Option<&str>, path: &Path) -> Result<(), i32> {
    let name = match module_name {
        Some(name) => name.to_owned(),
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_owned()),
    };

    eprintln!("creating module {name} -> {}", path.display());
    runner.emit_to_file(&name, path).map_err(report)
}

fn inspect(arg: &str) -> Result<(), i32> {
    let bytes = fs::read(arg).map_err(|e| {
        eprintln!("error: cannot read '{arg}': {e}");
        1
    })?;
    let info = bfjit::inspect(&bytes).map_err(|e| {
        eprintln!("error: '{arg}': {e}");
        1
    })?;

    println!("name: {}", info.name);
    println!("digest: {}", info.digest);
    println!("tape: {} cells", info.tape_capacity);
    println!("entry: {:#x}", info.entry);
    Ok(())
}
