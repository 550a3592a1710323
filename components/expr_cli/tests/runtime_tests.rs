//! Runtime tests: loading, listing and evaluating programs in-process

use builtins::ConsoleObject;
use core_types::{JsError, Value};
use expr_cli::{CliError, Outcome, Runtime};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

fn captured() -> (Runtime, Rc<RefCell<Vec<String>>>) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let console = Rc::new(ConsoleObject::new_with_output(output.clone()));
    (Runtime::with_console(console), output)
}

fn number(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Value(value) => value.to_number(),
        Outcome::Listing(lines) => panic!("unexpected listing {:?}", lines),
    }
}

#[test]
fn evaluates_arithmetic() {
    let mut runtime = Runtime::new();
    assert_eq!(number(runtime.execute_string("(2 + 3) * 4").unwrap()), 20.0);
    assert_eq!(number(runtime.execute_string("2 ** 3 ** 2").unwrap()), 512.0);
}

#[test]
fn async_program_settles_before_returning() {
    let (mut runtime, output) = captured();
    let source = r#"
        const sleep = ms => new Promise(resolve => setTimeout(resolve, ms))
        async function countdown(n) {
            while (n > 0) {
                console.log(n)
                await sleep(100)
                n--
            }
            return 'liftoff'
        }
        countdown(3)
    "#;
    let outcome = runtime.execute_string(source).unwrap();
    assert_eq!(outcome.to_string(), "liftoff");
    assert_eq!(*output.borrow(), vec!["3", "2", "1"]);
    assert_eq!(runtime.event_loop().now(), 300);
}

#[test]
fn listing_flags_combine_in_order() {
    let mut runtime = Runtime::new().with_print_ast(true).with_deps(true);
    let outcome = runtime.execute_string("user.name ?? 'anon'").unwrap();
    match outcome {
        Outcome::Listing(lines) => assert_eq!(
            lines,
            vec![
                "user.name ?? 'anon';".to_string(),
                "entry: user".to_string(),
                "events: user.name".to_string(),
            ]
        ),
        Outcome::Value(_) => panic!("expected a listing"),
    }
}

#[test]
fn json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("program.json");

    let lister = Runtime::new().with_print_json(true);
    let node = lister.parse("const xs = [1, 2, 3]; xs.length * 10").unwrap();
    let json = lister.inspect(&node).unwrap().join("\n");
    fs::write(&path, json).unwrap();

    let mut runtime = Runtime::new();
    assert_eq!(number(runtime.execute_json_file(&path).unwrap()), 30.0);
}

#[test]
fn errors_are_typed() {
    let mut runtime = Runtime::new();

    let err = runtime.execute_string("let = 5").unwrap_err();
    assert!(err.is_syntax_error());

    assert!(runtime.execute_string("missing + 1").is_ok());
    let err = runtime.execute_string("missing.total + 1").unwrap_err();
    assert!(!err.is_syntax_error());
    assert!(matches!(err, CliError::Js(JsError::Eval { .. })));

    let dir = TempDir::new().unwrap();
    let err = runtime
        .execute_file(&dir.path().join("absent.js"))
        .unwrap_err();
    assert!(matches!(err, CliError::Io { .. }));
}

#[test]
fn pending_promise_is_returned_as_is() {
    let mut runtime = Runtime::new();
    let outcome = runtime.execute_string("new Promise(() => {})").unwrap();
    assert!(matches!(outcome, Outcome::Value(Value::Promise(_))));
}
