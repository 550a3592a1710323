//! Command line arguments

use clap::{ArgGroup, Parser as ClapParser};
use std::path::PathBuf;

/// Arguments of the `expr` binary.
#[derive(ClapParser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "expr",
    version,
    about = "Evaluate, render and inspect JavaScript-like expression programs"
)]
#[command(group(ArgGroup::new("input").args(["eval", "file", "from_json", "repl"])))]
pub struct Cli {
    /// Evaluate inline source code
    #[arg(short, long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Evaluate a source file
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Evaluate a program serialized as JSON
    #[arg(long, value_name = "FILE")]
    pub from_json: Option<PathBuf>,

    /// Print the program rendered back to source instead of evaluating it
    #[arg(long)]
    pub print_ast: bool,

    /// Print the JSON form of the program instead of evaluating it
    #[arg(long)]
    pub print_json: bool,

    /// Print the entry and event dependencies instead of evaluating
    #[arg(long)]
    pub deps: bool,

    /// Start the interactive REPL
    #[arg(short, long)]
    pub repl: bool,

    /// Enable trace logging (RUST_LOG still overrides the filter)
    #[arg(long)]
    pub trace: bool,
}

/// Where the program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `--eval`
    Source(String),
    /// `--file`
    File(PathBuf),
    /// `--from-json`
    Json(PathBuf),
    /// `--repl`
    Repl,
    /// Nothing given
    Usage,
}

impl Cli {
    /// Arguments that evaluate `code`.
    pub fn with_eval(code: impl Into<String>) -> Self {
        Self {
            eval: Some(code.into()),
            ..Self::default()
        }
    }

    /// Arguments that evaluate the file at `path`.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    /// The selected input. clap guarantees at most one is present.
    pub fn input(&self) -> Input {
        if let Some(code) = &self.eval {
            Input::Source(code.clone())
        } else if let Some(path) = &self.file {
            Input::File(path.clone())
        } else if let Some(path) = &self.from_json {
            Input::Json(path.clone())
        } else if self.repl {
            Input::Repl
        } else {
            Input::Usage
        }
    }

    /// True when a listing flag replaces evaluation.
    pub fn is_inspecting(&self) -> bool {
        self.print_ast || self.print_json || self.deps
    }

    /// Default `tracing` filter directive for these arguments.
    pub fn log_filter(&self) -> &'static str {
        if self.trace {
            "trace"
        } else {
            "warn"
        }
    }
}
