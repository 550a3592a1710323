//! End-to-end tests through the CLI runtime

use expr_cli::{Cli, CliError, Input, Outcome, Runtime};
use std::fs;
use tempfile::TempDir;

fn runtime_for(cli: &Cli) -> Runtime {
    Runtime::new()
        .with_print_ast(cli.print_ast)
        .with_print_json(cli.print_json)
        .with_deps(cli.deps)
}

#[test]
fn test_file_workflow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invoice.js");
    fs::write(
        &path,
        "const lines = [{ qty: 2, price: 4.5 }, { qty: 1, price: 1 }]\n\
         const total = lines.reduce((t, l) => t + l.qty * l.price, 0);\n\
         `total=${total.toFixed(2)}`\n",
    )
    .unwrap();

    let cli = Cli::with_file(&path);
    let Input::File(file) = cli.input() else {
        panic!("expected a file input");
    };
    let outcome = runtime_for(&cli).execute_file(&file).unwrap();
    assert_eq!(outcome.to_string(), "total=10.00");
}

#[test]
fn test_print_json_then_from_json() {
    let dir = TempDir::new().unwrap();
    let source = "const greet = name => `hi ${name}`; greet('ada')";

    let mut lister = Runtime::new().with_print_json(true);
    let listing = lister.execute_string(source).unwrap();
    let path = dir.path().join("greet.json");
    fs::write(&path, listing.to_string()).unwrap();

    let mut runtime = Runtime::new();
    let outcome = runtime.execute_json_file(&path).unwrap();
    assert_eq!(outcome.to_string(), "hi ada");
}

#[test]
fn test_deps_listing() {
    let mut runtime = Runtime::new().with_deps(true);
    let outcome = runtime
        .execute_string("user.first + ' ' + user.last |> trim")
        .unwrap();
    match outcome {
        Outcome::Listing(lines) => {
            assert_eq!(lines[0], "entry: user, trim");
            assert_eq!(lines[1], "events: user.first, user.last, trim");
        }
        Outcome::Value(_) => panic!("expected a listing"),
    }
}

#[test]
fn test_errors_surface_with_positions() {
    let mut runtime = Runtime::new();
    let err = runtime.execute_string("let a = 1;\nlet b = (a;").unwrap_err();
    assert!(err.is_syntax_error());
    match err {
        CliError::Js(js) => assert_eq!(js.position().map(|p| p.line), Some(2)),
        other => panic!("unexpected {}", other),
    }
}
