//! bfjit CLI: interpret, JIT-compile or emit tape-machine programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/configuration/parse/emit error
//! - 3: Runtime error

mod commands;

use std::path::PathBuf;
use std::process;

use bfjit::{EofPolicy, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_TAPE_CAPACITY};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bfjit", version)]
#[command(about = "Run programs for the eight-instruction tape machine")]
pub struct Args {
    /// Source file, or program text if no such file exists
    pub source: String,

    /// Number of tape cells
    #[arg(short = 's', long = "memory-size", default_value_t = DEFAULT_TAPE_CAPACITY)]
    pub memory_size: usize,

    /// Deepest loop nesting accepted
    #[arg(short = 'd', long = "stack-depth", default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    pub stack_depth: usize,

    /// Interpret instead of compiling to native code
    #[arg(short, long)]
    pub interpret: bool,

    /// What `,` stores at end of input: zero, unchanged or minus-one
    #[arg(long, default_value = "zero", allow_hyphen_values = true)]
    pub eof: EofPolicy,

    /// Write a standalone executable here instead of running (overrides -i)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name embedded in the module (default: output file stem)
    #[arg(long, requires = "output")]
    pub module_name: Option<String>,

    /// Treat SOURCE as an emitted module and print its name and digest
    #[arg(long, conflicts_with_all = ["output", "interpret"])]
    pub inspect: bool,
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(code) = commands::dispatch(&args) {
        process::exit(code);
    }
}
