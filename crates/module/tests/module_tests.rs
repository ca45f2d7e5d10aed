//! Emitted modules run as child processes must behave like the interpreter.

use std::fs;
use std::path::Path;

use bfjit_common::EofPolicy;
use bfjit_module::{inspect, EmitError, ModuleEmitter};
use bfjit_parser::parse;
use tempfile::TempDir;

const HELLO: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.";

fn emit_to(dir: &TempDir, name: &str, source: &str, capacity: usize, eof: EofPolicy) -> std::path::PathBuf {
    let program = parse(source, 256).unwrap();
    let path = dir.path().join(name);
    ModuleEmitter::new(capacity, eof).emit(&program, name, &path).unwrap();
    path
}

#[test]
fn emitted_module_names_itself() {
    let dir = TempDir::new().unwrap();
    let path = emit_to(&dir, "hello", HELLO, 64, EofPolicy::Zero);
    let info = inspect(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(info.name, "hello");
    assert_eq!(info.tape_capacity, 64);
}

#[test]
fn same_program_same_digest() {
    let dir = TempDir::new().unwrap();
    let a = emit_to(&dir, "a", HELLO, 64, EofPolicy::Zero);
    let b = emit_to(&dir, "b", HELLO, 64, EofPolicy::Zero);
    let a = inspect(&fs::read(a).unwrap()).unwrap();
    let b = inspect(&fs::read(b).unwrap()).unwrap();
    assert_eq!(a.digest, b.digest);
}

#[test]
fn eof_policy_changes_the_code() {
    let program = parse(",.", 256).unwrap();
    let zero = ModuleEmitter::new(8, EofPolicy::Zero).build(&program, "m").unwrap();
    let unchanged = ModuleEmitter::new(8, EofPolicy::Unchanged).build(&program, "m").unwrap();
    assert_ne!(inspect(&zero).unwrap().digest, inspect(&unchanged).unwrap().digest);
}

#[test]
fn failed_emit_leaves_nothing_behind() {
    let dir = TempDir::new().unwrap();
    let program = parse("+", 256).unwrap();
    let err = ModuleEmitter::default()
        .emit(&program, "bad/name", &dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, EmitError::InvalidModuleName { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn relative_destination_needs_existing_parent() {
    let program = parse("+", 256).unwrap();
    let err = ModuleEmitter::default()
        .emit(&program, "m", Path::new("definitely-missing-dir/out"))
        .unwrap_err();
    assert!(matches!(err, EmitError::InvalidDestination { .. }));
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
mod execution {
    use super::*;

    use std::io::Write;
    use std::process::{Child, Command, Output, Stdio};
    use std::thread;
    use std::time::Duration;

    use bfjit_common::{RuntimeError, Tape};

    const ETXTBSY: i32 = 26;

    /// Start `path` with piped stdout and the given stdin.
    ///
    /// Another test thread forking while our file was open for writing makes
    /// exec fail with ETXTBSY for a moment, so that is retried.
    fn spawn(path: &Path, stdin: fn() -> Stdio) -> Child {
        let mut attempts = 0;
        loop {
            match Command::new(path)
                .stdin(stdin())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
            {
                Ok(child) => return child,
                Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempts < 50 => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => panic!("cannot start {}: {e}", path.display()),
            }
        }
    }

    /// Run `path` with `input` on stdin.
    fn run_module(path: &Path, input: &[u8]) -> Output {
        let mut child = spawn(path, Stdio::piped);
        let mut stdin = child.stdin.take().unwrap();
        let input = input.to_vec();
        let writer = thread::spawn(move || {
            // The module may exit before reading everything.
            let _ = stdin.write_all(&input);
        });
        let output = child.wait_with_output().unwrap();
        writer.join().unwrap();
        output
    }

    fn interpret(source: &str, input: &[u8], capacity: usize, eof: EofPolicy) -> (Vec<u8>, i32) {
        let program = parse(source, 256).unwrap();
        let mut tape = Tape::new(capacity);
        let mut input = input;
        let mut output = Vec::new();
        let status = match bfjit_vm::run(&program, &mut tape, &mut input, &mut output, eof) {
            Ok(()) => 0,
            Err(RuntimeError::TapeBoundsExceeded { .. }) => 1,
            Err(RuntimeError::Io(_)) => 2,
        };
        (output, status)
    }

    fn assert_module_matches(source: &str, input: &[u8], capacity: usize, eof: EofPolicy) {
        let dir = TempDir::new().unwrap();
        let path = emit_to(&dir, "module", source, capacity, eof);
        let out = run_module(&path, input);
        let (expected, status) = interpret(source, input, capacity, eof);
        assert_eq!(out.stdout, expected, "output of {source:?}");
        assert_eq!(out.status.code(), Some(status), "status of {source:?}");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn hello_prints_hello() {
        let dir = TempDir::new().unwrap();
        let path = emit_to(&dir, "hello", HELLO, 64, EofPolicy::Zero);
        let out = run_module(&path, b"");
        assert!(out.status.success());
        assert_eq!(out.stdout, b"Hello");
    }

    #[test]
    fn echo_reads_stdin() {
        assert_module_matches(",.", b"A", 8, EofPolicy::Zero);
    }

    #[test]
    fn cat_copies_stdin() {
        assert_module_matches(",[.,]", b"AB", 8, EofPolicy::Zero);
    }

    #[test]
    fn eof_policies_carry_into_module() {
        for eof in [EofPolicy::Zero, EofPolicy::Unchanged, EofPolicy::MinusOne] {
            assert_module_matches("++,.", b"", 8, eof);
        }
    }

    #[test]
    fn tape_fault_exits_with_status_1() {
        let dir = TempDir::new().unwrap();
        let path = emit_to(&dir, "fault", "+.<.", 4, EofPolicy::Zero);
        let out = run_module(&path, b"");
        assert_eq!(out.stdout, vec![1]);
        assert_eq!(out.status.code(), Some(1));
    }

    #[test]
    fn right_wall_matches_interpreter() {
        assert_module_matches("+[>+]", b"", 16, EofPolicy::Zero);
    }

    #[test]
    fn large_tape_runs_to_the_wall() {
        assert_module_matches("+[>+]", b"", 65_536, EofPolicy::Zero);
    }

    #[test]
    fn fresh_tape_cells_are_zero() {
        assert_module_matches(">>>>.<<.", b"", 4096, EofPolicy::Zero);
    }

    #[test]
    fn write_to_closed_stdout_stops_the_module() {
        let dir = TempDir::new().unwrap();
        let path = emit_to(&dir, "writer", "+[.]", 8, EofPolicy::Zero);
        let mut child = spawn(&path, Stdio::null);
        drop(child.stdout.take());
        let status = child.wait().unwrap();
        // Killed by SIGPIPE, or exit status 2 where SIGPIPE is ignored.
        assert!(matches!(status.code(), Some(2) | None), "{status:?}");
    }
}
