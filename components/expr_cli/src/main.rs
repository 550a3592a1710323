//! `expr` command line entry point
//!
//! Parses CLI arguments and delegates to the Runtime for execution.

use clap::Parser as ClapParser;
use expr_cli::{Cli, CliResult, Input, Outcome, Runtime};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_usage() {
    println!("expr {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  expr --eval <CODE>        Evaluate inline code");
    println!("  expr --file <FILE>        Evaluate a source file");
    println!("  expr --from-json <FILE>   Evaluate a program serialized as JSON");
    println!("  expr --repl               Start interactive REPL");
    println!();
    println!("Add --print-ast, --print-json or --deps to list instead of evaluating.");
    println!("Run 'expr --help' for more options.");
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut runtime = Runtime::new()
        .with_print_ast(cli.print_ast)
        .with_print_json(cli.print_json)
        .with_deps(cli.deps);

    let outcome = match cli.input() {
        Input::Source(code) => runtime.execute_string(&code)?,
        Input::File(path) => runtime.execute_file(&path)?,
        Input::Json(path) => runtime.execute_json_file(&path)?,
        Input::Repl => return runtime.repl(),
        Input::Usage => {
            print_usage();
            return Ok(());
        }
    };

    match outcome {
        Outcome::Value(core_types::Value::Undefined) => {}
        outcome => println!("{}", outcome),
    }
    Ok(())
}

/// Native stack of the evaluation thread. Each nested script call costs
/// several kilobytes, far more than the main thread can hold at depth.
const EVALUATION_STACK_SIZE: usize = 512 * 1024 * 1024;

/// Script call depth allowed on the evaluation thread.
const MAX_CALL_DEPTH: usize = 10_000;

fn evaluate(cli: Cli) -> ExitCode {
    interpreter::set_max_call_depth(MAX_CALL_DEPTH);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let worker = std::thread::Builder::new()
        .name("expr".to_string())
        .stack_size(EVALUATION_STACK_SIZE)
        .spawn(move || evaluate(cli));
    match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Could not start the evaluation thread: {}", err);
            ExitCode::FAILURE
        }
    }
}
