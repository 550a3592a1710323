//! Integration test suite for the expression engine
//!
//! Helpers shared by the tests that run source through the parser, the
//! interpreter, the builtins and the event loop together.

use async_runtime::{install_timers, EventLoop};
use builtins::ConsoleObject;
use core_types::{JsResult, PromiseState, Value};
use interpreter::Stack;
use std::cell::RefCell;
use std::rc::Rc;

/// Re-export components for test convenience
pub mod components {
    pub use async_runtime;
    pub use builtins;
    pub use core_types;
    pub use expr_cli;
    pub use interpreter;
    pub use parser;
}

/// A stack over fresh globals whose console output is captured, with the
/// timer functions bound to its own event loop.
pub struct Harness {
    /// Evaluation stack
    pub stack: Stack,
    /// Loop the timer globals schedule on
    pub event_loop: Rc<EventLoop>,
    /// Lines written through `console`
    pub output: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    /// Build a harness with an empty module scope.
    pub fn new() -> Self {
        let output = Rc::new(RefCell::new(Vec::new()));
        let console = Rc::new(ConsoleObject::new_with_output(output.clone()));
        let globals = builtins::global_object_with_console(console);
        let event_loop = Rc::new(EventLoop::new());
        install_timers(&globals, &event_loop);
        Self {
            stack: Stack::with_global_object(globals),
            event_loop,
            output,
        }
    }

    /// Parse and evaluate `source`, returning the completion value.
    pub fn eval(&mut self, source: &str) -> JsResult<Value> {
        let program = parser::parse(source)?;
        Ok(program.execute(&mut self.stack, None)?.value())
    }

    /// Evaluate `source`, drain the event loop, and unwrap a settled
    /// promise completion.
    pub fn eval_settled(&mut self, source: &str) -> JsResult<Value> {
        let value = self.eval(source)?;
        self.event_loop.run_until_done()?;
        match value {
            Value::Promise(promise) => match promise.state() {
                PromiseState::Fulfilled(value) => Ok(value),
                PromiseState::Rejected(reason) => Err(core_types::JsError::Throw(reason)),
                PromiseState::Pending => Ok(Value::Promise(promise)),
            },
            other => Ok(other),
        }
    }

    /// Console lines written so far.
    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate `source` on a fresh harness.
pub fn eval(source: &str) -> JsResult<Value> {
    Harness::new().eval(source)
}

/// Evaluate `source` on a fresh harness and render the result the way
/// `console.log` would.
pub fn eval_inspect(source: &str) -> String {
    match eval(source) {
        Ok(value) => builtins::inspect(&value),
        Err(err) => format!("error: {}", err),
    }
}
