//! End-to-end tests of the `oolc` binary: flags, exit codes, channels.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const HELLO: &str = "CLASS Main IS METHOD main IS BEGIN WRITE 'h'; END METHOD END CLASS";

fn write_source(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).expect("write source");
    path
}

fn oolc() -> Command {
    Command::cargo_bin("oolc").expect("binary builds")
}

#[test]
fn test_successful_compile_writes_default_output() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);

    oolc().arg(&source).assert().success().stdout("");

    let output = source.with_extension("asm");
    let asm = std::fs::read_to_string(output).expect("assembly written");
    assert!(asm.contains("Main_main:"));
    assert!(asm.contains("_Main_VMT:"));
}

#[test]
fn test_explicit_output_path() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);
    let out = dir.path().join("custom.asm");

    oolc().arg(&source).arg(&out).assert().success();
    assert!(out.exists());
}

#[test]
fn test_help_exits_with_2() {
    oolc()
        .arg("-h")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Usage: oolc"));
}

#[test]
fn test_missing_source_is_usage_error() {
    oolc()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no source file given"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    oolc()
        .arg("-q")
        .arg("x.ool")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown flag '-q'"));
}

#[test]
fn test_unreadable_source_exits_2() {
    oolc()
        .arg("definitely/not/here.ool")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be found or created"));
}

#[test]
fn test_compile_error_goes_to_stdout_with_exit_1() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "bad.ool",
        "CLASS Main IS METHOD main IS BEGIN WRITE nope; END METHOD END CLASS",
    );

    oolc()
        .arg(&source)
        .assert()
        .code(1)
        .stdout(predicate::str::is_match(r"^Error at line \d+, col \d+: .*\n$").unwrap());

    // No output file on failure.
    assert!(!source.with_extension("asm").exists());
}

#[test]
fn test_token_trace() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);

    oolc()
        .arg("-l")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("'CLASS'").and(predicate::str::contains("number 104")));
}

#[test]
fn test_ast_dump() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);

    oolc()
        .arg("-s")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("ClassDecl").and(predicate::str::contains("Write")));
}

#[test]
fn test_typed_dump() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);

    oolc()
        .arg("-c")
        .arg(&source)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("CLASS Main EXTENDS Object (size 1)")
                .and(predicate::str::contains("METHOD PUBLIC main: Void")),
        );
}

#[test]
fn test_resolution_dump() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "counter.ool",
        "CLASS Main IS
           n: Integer;
           METHOD main IS BEGIN n := 'x'; END METHOD
         END CLASS",
    );

    oolc()
        .arg("-i")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("n -> attribute 'Main.n' (offset 1)"));
}

#[test]
fn test_heap_and_stack_sizing() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);
    let out = dir.path().join("sized.asm");

    oolc()
        .args(["-hs", "400", "-ss", "64"])
        .arg(&source)
        .arg(&out)
        .assert()
        .success();

    let asm = std::fs::read_to_string(out).unwrap();
    assert!(asm.contains("_heap:\n  DAT 400, 0"));
    assert!(asm.contains("_stack:\n  DAT 64, 0"));
}

#[test]
fn test_optimizer_flag_changes_output() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "sum.ool",
        "CLASS Main IS METHOD main IS BEGIN WRITE 1+2; END METHOD END CLASS",
    );
    let plain = dir.path().join("plain.asm");
    let folded = dir.path().join("folded.asm");

    oolc().arg(&source).arg(&plain).assert().success();
    oolc().arg("-o").arg(&source).arg(&folded).assert().success();

    let plain = std::fs::read_to_string(plain).unwrap();
    let folded = std::fs::read_to_string(folded).unwrap();
    assert!(main_code(&plain).contains("ADD R5, R6"));
    assert!(!main_code(&folded).contains("ADD R5, R6"));
    assert!(main_code(&folded).contains("MRI R5, 3"));
}

fn main_code(asm: &str) -> &str {
    &asm[asm.find("Main_main:").expect("main label")..]
}

#[test]
fn test_deterministic_output() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "multi.ool",
        "CLASS B EXTENDS A IS METHOD go IS BEGIN END METHOD END CLASS
         CLASS A IS x, y: Integer; END CLASS
         CLASS Main IS METHOD main IS BEGIN END METHOD END CLASS",
    );
    let out1 = dir.path().join("one.asm");
    let out2 = dir.path().join("two.asm");

    oolc().arg(&source).arg(&out1).assert().success();
    oolc().arg(&source).arg(&out2).assert().success();

    let one = std::fs::read_to_string(out1).unwrap();
    let two = std::fs::read_to_string(out2).unwrap();
    assert_eq!(one, two);
}

#[test]
fn test_output_in_missing_directory_exits_2() {
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, "hello.ool", HELLO);
    let out = Path::new("no/such/dir/out.asm");

    oolc()
        .arg(&source)
        .arg(out)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be found or created"));
}
