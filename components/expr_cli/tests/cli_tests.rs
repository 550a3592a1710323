//! End-to-end tests for the `expr` binary

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn expr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_expr"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim_end().to_string()
}

#[test]
fn eval_prints_completion_value() {
    let output = expr(&["--eval", "2 + 3 * 4"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "14");
}

#[test]
fn eval_prints_console_output_then_value() {
    let output = expr(&["-e", "console.log('hi'); [1, 2].map(x => x * 2)"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hi\n[ 2, 4 ]");
}

#[test]
fn undefined_completion_prints_nothing() {
    let output = expr(&["-e", "let unused = 1"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn file_execution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prices.js");
    fs::write(
        &path,
        "const items = [{ price: 2, qty: 3 }, { price: 5, qty: 1 }]\n\
         items.reduce((sum, item) => sum + item.price * item.qty, 0)\n",
    )
    .unwrap();

    let output = expr(&["--file", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "11");
}

#[test]
fn missing_file_fails() {
    let output = expr(&["--file", "/nonexistent/program.js"]);
    assert!(!output.status.success());
    assert!(stderr(&output).starts_with("Could not read '/nonexistent/program.js'"));
}

#[test]
fn syntax_error_reports_position() {
    let output = expr(&["-e", "let x = ;"]);
    assert!(!output.status.success());
    assert_eq!(
        stderr(&output),
        "ParseError: Expected an expression (line 1, column 9)"
    );
}

#[test]
fn uncaught_throw_fails() {
    let output = expr(&["-e", "throw 'boom'"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output), "Uncaught boom");
}

#[test]
fn print_ast_renders_source() {
    let output = expr(&["--print-ast", "-e", "a+b*c"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "a + b * c;");
}

#[test]
fn deps_lists_entries_and_events() {
    let output = expr(&["--deps", "-e", "price * quantity * (1 + tax.rate)"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "entry: price, quantity, tax\nevents: price, quantity, tax.rate"
    );
}

#[test]
fn json_form_evaluates_the_same() {
    let dir = TempDir::new().unwrap();
    let json = expr(&["--print-json", "-e", "let n = 6; n * 7"]);
    assert!(json.status.success());

    let path = dir.path().join("program.json");
    fs::write(&path, &json.stdout).unwrap();
    let output = expr(&["--from-json", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "42");
}

#[test]
fn invalid_json_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{ "type": "NoSuchNode" }"#).unwrap();
    let output = expr(&["--from-json", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("NoSuchNode"));
}

#[test]
fn timers_run_before_exit() {
    let output = expr(&[
        "-e",
        "setTimeout(() => console.log('second'), 20); setTimeout(() => console.log('first'), 10)",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("first\nsecond"));
}

#[test]
fn no_arguments_prints_usage() {
    let output = expr(&[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn conflicting_inputs_are_rejected() {
    let output = expr(&["-e", "1", "--repl"]);
    assert!(!output.status.success());
}

#[test]
fn deep_recursion_completes() {
    let output = expr(&[
        "-e",
        "function depth(n) { return n == 0 ? 0 : 1 + depth(n - 1) }\ndepth(3000)",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "3000");
}

#[test]
fn runaway_recursion_is_a_catchable_range_error() {
    let output = expr(&[
        "-e",
        "function forever() { return forever() }\n\
         try { forever() } catch (e) { e.name + ': ' + e.message }",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "RangeError: Maximum call stack size exceeded");
}

#[test]
fn deeply_nested_source_is_a_parse_error() {
    let source = format!("{}1{}", "(".repeat(3000), ")".repeat(3000));
    let output = expr(&["-e", &source]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Maximum nesting depth exceeded"));
}

#[test]
fn number_with_trailing_point() {
    let output = expr(&["-e", "1..toString() + (1. + 2)"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "13");
}
