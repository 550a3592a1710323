//! Function, class and suspension runtime.
//!
//! - [`machine`] steps through statements and reports suspension points
//! - [`function`] holds script functions and parameter binding
//! - [`class`] holds class values and instance construction
//! - [`driver`] resumes suspended bodies for async functions and generators

pub mod class;
pub mod driver;
pub mod function;
pub mod machine;

use core_types::{run_microtasks, ErrorKind, JsError, JsResult, PromiseRef, PromiseState, Value};

/// Wait for `promise` by draining the microtask queue.
///
/// Used where suspension is impossible: awaits in top-level code and in
/// synchronous generator bodies. A promise that depends on a timer or other
/// host task cannot settle this way and is reported as an error.
pub fn settle_now(promise: &PromiseRef) -> JsResult<Value> {
    if promise.is_pending() {
        run_microtasks();
    }
    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(value),
        PromiseState::Rejected(reason) => Err(JsError::Throw(reason)),
        PromiseState::Pending => Err(JsError::eval(
            ErrorKind::InternalError,
            "cannot wait for a pending promise outside an async function",
        )),
    }
}

/// Promise for an awaited value: promises pass through, anything else is
/// wrapped in a resolved promise.
pub fn to_promise(value: Value) -> PromiseRef {
    PromiseRef::resolved(value)
}
