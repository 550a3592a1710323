//! Contract tests for Promise

use super::call_method;
use builtins::global_object;
use core_types::{run_microtasks, Callable, NativeFunction, PromiseState, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn promise_ctor() -> Value {
    global_object().borrow().get_own("Promise").unwrap()
}

#[test]
fn test_promise_requires_new() {
    assert!(promise_ctor().call(Value::Undefined, vec![]).is_err());
}

#[test]
fn test_then_runs_after_microtasks() {
    let Value::Function(ctor) = promise_ctor() else {
        panic!("Promise should be a function");
    };
    let executor = NativeFunction::value("executor", |_, args| {
        args[0].call(Value::Undefined, vec![Value::from("done")])
    });
    let promise = ctor.construct(vec![executor]).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let record = NativeFunction::value("record", move |_, args| {
        sink.borrow_mut().push(args[0].to_string());
        Ok(Value::Undefined)
    });
    call_method(&promise, "then", vec![record]).unwrap();
    assert!(seen.borrow().is_empty());
    run_microtasks();
    assert_eq!(*seen.borrow(), vec!["done"]);
}

#[test]
fn test_catch_recovers() {
    let reject = promise_ctor().get_property("reject");
    let rejected = reject.call(Value::Undefined, vec![Value::from("bad")]).unwrap();
    let recover = NativeFunction::value("recover", |_, args| {
        Ok(Value::String(format!("recovered {}", args[0])))
    });
    let recovered = call_method(&rejected, "catch", vec![recover]).unwrap();
    run_microtasks();
    let Value::Promise(p) = recovered else {
        panic!("catch should return a promise");
    };
    assert!(matches!(p.state(), PromiseState::Fulfilled(v) if v.to_string() == "recovered bad"));
}
