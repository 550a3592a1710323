//! Error constructors
//!
//! Error objects are ordinary objects tagged with the `Error` class name and
//! carrying `name` and `message` properties, so engine errors converted by
//! `JsError::to_value` and script-created errors look the same to `catch`.

use crate::value::get_member;
use core_types::{arg, JsResult, NativeFunction, Value};
use std::rc::Rc;

/// Names of the error constructors installed as globals.
pub const ERROR_TYPES: [&str; 7] = [
    "Error",
    "TypeError",
    "ReferenceError",
    "SyntaxError",
    "RangeError",
    "EvalError",
    "AggregateError",
];

/// Error constructor
pub struct ErrorConstructor;

fn message_arg(args: &[Value], index: usize) -> String {
    match arg(args, index) {
        Value::Undefined => String::new(),
        other => other.to_string(),
    }
}

impl ErrorConstructor {
    /// Create an error object of kind `name`.
    ///
    /// `options.cause` is copied onto the error when present.
    pub fn create(name: &str, message: String, options: &Value) -> JsResult<Value> {
        let error = Value::new_error(name, message);
        Self::attach_cause(&error, options)?;
        Ok(error)
    }

    fn attach_cause(error: &Value, options: &Value) -> JsResult<()> {
        if let (Value::Object(obj), Value::Object(_)) = (error, options) {
            let cause = get_member(options, "cause")?;
            if !cause.is_undefined() {
                obj.borrow_mut().insert("cause", cause);
            }
        }
        Ok(())
    }

    /// Initialise an already allocated instance, as `super(message)` does
    /// in a class extending an error type.
    pub fn initialise(name: &str, this: &Value, args: &[Value]) -> JsResult<()> {
        let (message, options) = Self::split_args(name, args);
        if let Value::Object(obj) = this {
            let mut obj = obj.borrow_mut();
            obj.class_name = Some("Error".to_string());
            if obj.get_own("name").is_none() {
                obj.insert("name", Value::from(name));
            }
            obj.insert("message", Value::String(message));
        }
        Self::attach_cause(this, &options)
    }

    fn split_args(name: &str, args: &[Value]) -> (String, Value) {
        if name == "AggregateError" {
            (message_arg(args, 1), arg(args, 2))
        } else {
            (message_arg(args, 0), arg(args, 1))
        }
    }

    fn construct(name: &str, args: &[Value]) -> JsResult<Value> {
        let (message, options) = Self::split_args(name, args);
        let error = Self::create(name, message, &options)?;
        if name == "AggregateError" {
            let errors = crate::iterator::collect_iterable(&arg(args, 0))?;
            if let Value::Object(obj) = &error {
                obj.borrow_mut().insert("errors", Value::new_array(errors));
            }
        }
        Ok(error)
    }

    /// Build the constructor for error kind `name`.
    ///
    /// Calling it with an object receiver initialises that object in place;
    /// any other call allocates a new error.
    pub fn constructor(name: &'static str) -> Value {
        let error = NativeFunction::new(name, move |this, args| match this {
            Value::Object(_) => {
                Self::initialise(name, this, &args)?;
                Ok(this.clone())
            }
            _ => Self::construct(name, &args),
        })
        .with_constructor(move |args| Self::construct(name, &args));
        Value::Function(Rc::new(error))
    }
}
