//! Runtime orchestration for expression programs
//!
//! The Runtime struct coordinates the components:
//! - the parser and the JSON deserializer registry for loading programs
//! - a persistent [`Stack`] over the builtin globals for evaluation
//! - an [`EventLoop`] that the timer globals schedule on

use crate::error::{CliError, CliResult};
use async_runtime::{install_timers, EventLoop};
use builtins::ConsoleObject;
use core_types::{JsError, PromiseState, Value};
use interpreter::{DeserializerRegistry, ExprNode, Stack};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// What running a program produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Lines requested by the listing flags; the program was not evaluated
    Listing(Vec<String>),
    /// Completion value of the program
    Value(Value),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Listing(lines) => f.write_str(&lines.join("\n")),
            Outcome::Value(value) => f.write_str(&format_value(value)),
        }
    }
}

/// Text printed for a completion value: strings as-is, everything else
/// the way `console.log` shows it.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => builtins::inspect(other),
    }
}

/// Main runtime that parses, lists and evaluates programs.
pub struct Runtime {
    stack: Stack,
    event_loop: Rc<EventLoop>,
    registry: DeserializerRegistry,
    print_ast: bool,
    print_json: bool,
    print_deps: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime whose console writes to stdout and stderr.
    ///
    /// # Example
    /// ```
    /// use expr_cli::Runtime;
    ///
    /// let mut runtime = Runtime::new();
    /// let outcome = runtime.execute_string("let x = 20; x + 22").unwrap();
    /// assert_eq!(outcome.to_string(), "42");
    /// ```
    pub fn new() -> Self {
        Self::with_console(Rc::new(ConsoleObject::new()))
    }

    /// Create a runtime around a caller-supplied console.
    pub fn with_console(console: Rc<ConsoleObject>) -> Self {
        let globals = builtins::global_object_with_console(console);
        let event_loop = Rc::new(EventLoop::new());
        install_timers(&globals, &event_loop);
        Self {
            stack: Stack::with_global_object(globals),
            event_loop,
            registry: DeserializerRegistry::with_default_nodes(),
            print_ast: false,
            print_json: false,
            print_deps: false,
        }
    }

    /// List the program rendered back to source.
    pub fn with_print_ast(mut self, enabled: bool) -> Self {
        self.print_ast = enabled;
        self
    }

    /// List the JSON form of the program.
    pub fn with_print_json(mut self, enabled: bool) -> Self {
        self.print_json = enabled;
        self
    }

    /// List the entry and event dependencies of the program.
    pub fn with_deps(mut self, enabled: bool) -> Self {
        self.print_deps = enabled;
        self
    }

    /// True when a listing replaces evaluation.
    pub fn is_inspecting(&self) -> bool {
        self.print_ast || self.print_json || self.print_deps
    }

    /// The loop that timers scheduled by programs run on.
    pub fn event_loop(&self) -> &Rc<EventLoop> {
        &self.event_loop
    }

    /// Parse source text.
    pub fn parse(&self, source: &str) -> CliResult<ExprNode> {
        Ok(parser::parse(source)?)
    }

    /// Rebuild a program from its JSON form.
    pub fn load_json(&self, text: &str) -> CliResult<ExprNode> {
        Ok(self.registry.deserialize_str(text)?)
    }

    /// Lines for the enabled listing flags, in flag order.
    pub fn inspect(&self, node: &ExprNode) -> CliResult<Vec<String>> {
        let mut lines = Vec::new();
        if self.print_ast {
            lines.push(node.to_string());
        }
        if self.print_json {
            lines.push(serde_json::to_string_pretty(&node.to_json())?);
        }
        if self.print_deps {
            lines.push(format!("entry: {}", node.entry().join(", ")));
            lines.push(format!("events: {}", node.events().join(", ")));
        }
        Ok(lines)
    }

    /// Evaluate `node`, then drain the event loop.
    ///
    /// A promise completion that settled while draining is replaced by its
    /// value, and a rejected one becomes an error.
    pub fn evaluate(&mut self, node: &ExprNode) -> CliResult<Value> {
        let value = node.execute(&mut self.stack, None)?.value();
        self.event_loop.run_until_done()?;
        debug!(now = self.event_loop.now(), "program finished");
        match value {
            Value::Promise(promise) => match promise.state() {
                PromiseState::Fulfilled(value) => Ok(value),
                PromiseState::Rejected(reason) => Err(JsError::Throw(reason).into()),
                PromiseState::Pending => Ok(Value::Promise(promise)),
            },
            other => Ok(other),
        }
    }

    /// List or evaluate `node` depending on the flags.
    pub fn run(&mut self, node: &ExprNode) -> CliResult<Outcome> {
        if self.is_inspecting() {
            Ok(Outcome::Listing(self.inspect(node)?))
        } else {
            Ok(Outcome::Value(self.evaluate(node)?))
        }
    }

    /// Parse and run source text.
    pub fn execute_string(&mut self, source: &str) -> CliResult<Outcome> {
        let node = self.parse(source)?;
        self.run(&node)
    }

    /// Read, parse and run a source file.
    pub fn execute_file(&mut self, path: &Path) -> CliResult<Outcome> {
        let source = read(path)?;
        self.execute_string(&source)
    }

    /// Read, deserialize and run a JSON program.
    pub fn execute_json_file(&mut self, path: &Path) -> CliResult<Outcome> {
        let text = read(path)?;
        let node = self.load_json(&text)?;
        self.run(&node)
    }

    /// Start the REPL (Read-Eval-Print Loop)
    pub fn repl(&mut self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }
}

fn read(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn value(outcome: Outcome) -> Value {
        match outcome {
            Outcome::Value(value) => value,
            Outcome::Listing(lines) => panic!("unexpected listing {:?}", lines),
        }
    }

    #[test]
    fn test_declarations_persist_between_runs() {
        let mut runtime = Runtime::new();
        runtime.execute_string("let total = 5").unwrap();
        let result = value(runtime.execute_string("total * 2").unwrap());
        assert_eq!(result.to_number(), 10.0);
    }

    #[test]
    fn test_listing_skips_evaluation() {
        let output = Rc::new(RefCell::new(Vec::new()));
        let console = Rc::new(ConsoleObject::new_with_output(output.clone()));
        let mut runtime = Runtime::with_console(console).with_deps(true);
        let outcome = runtime
            .execute_string("console.log(order.total + tax.rate)")
            .unwrap();
        assert_eq!(
            outcome.to_string(),
            "entry: console, order, tax\nevents: console.log, order.total, tax.rate"
        );
        assert!(output.borrow().is_empty());
    }

    #[test]
    fn test_settled_promise_is_unwrapped() {
        let mut runtime = Runtime::new();
        let source = "new Promise(resolve => setTimeout(() => resolve('late'), 100))";
        let outcome = runtime.execute_string(source).unwrap();
        assert_eq!(outcome.to_string(), "late");
        assert_eq!(runtime.event_loop().now(), 100);

        let err = runtime.execute_string("Promise.reject('no')").unwrap_err();
        assert!(matches!(err, CliError::Js(JsError::Throw(_))));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::String("plain".into())), "plain");
        assert_eq!(format_value(&Value::Number(1.5)), "1.5");
        assert_eq!(format_value(&Value::Undefined), "undefined");
    }
}
