//! Contract tests for builtins component
//!
//! These tests go through the same entry points the interpreter uses:
//! member lookup followed by a call with an explicit receiver.

mod array_prototype_tests;
mod json_object_tests;
mod member_access_tests;
mod number_prototype_tests;
mod promise_tests;
mod string_prototype_tests;

use builtins::get_member;
use core_types::{JsResult, Value};

/// Look up `name` on `target` and call it with `target` as `this`.
pub fn call_method(target: &Value, name: &str, args: Vec<Value>) -> JsResult<Value> {
    get_member(target, name)?.call(target.clone(), args)
}

/// Shorthand for a numeric array.
pub fn numbers(values: &[f64]) -> Value {
    Value::new_array(values.iter().map(|n| Value::Number(*n)).collect())
}
