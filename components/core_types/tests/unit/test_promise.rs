//! Unit tests for promises and the microtask queue

use core_types::{run_microtasks, JsObject, NativeFunction, PromiseRef, PromiseState, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_reactions_run_in_registration_order() {
    let promise = PromiseRef::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let log = log.clone();
        promise.subscribe(move |_| log.borrow_mut().push(i));
    }
    promise.resolve(Value::Undefined);
    run_microtasks();
    assert_eq!(*log.borrow(), vec![0, 1, 2]);
}

#[test]
fn test_thenable_is_adopted() {
    let mut thenable = JsObject::new();
    thenable.insert(
        "then",
        NativeFunction::value("then", |_, args| {
            core_types::arg(&args, 0).call(Value::Undefined, vec![Value::from("adopted")])
        }),
    );
    let promise = PromiseRef::resolved(Value::Object(thenable.into_ref()));
    run_microtasks();
    match promise.state() {
        PromiseState::Fulfilled(value) => assert_eq!(value.to_string(), "adopted"),
        other => panic!("unexpected state {:?}", other),
    }
}

#[test]
fn test_rejection_skips_fulfillment_handler() {
    let promise = PromiseRef::rejected(Value::from("no"));
    let handler = Rc::new(NativeFunction::new("h", |_, _| Ok(Value::from("handled"))));
    let derived = promise.then(Some(handler), None);
    run_microtasks();
    assert!(matches!(derived.state(), PromiseState::Rejected(_)));
}

#[test]
fn test_self_resolution_is_rejected() {
    let promise = PromiseRef::new();
    promise.resolve(Value::Promise(promise.clone()));
    match promise.state() {
        PromiseState::Rejected(reason) => assert!(reason.to_string().contains("cycle")),
        other => panic!("unexpected state {:?}", other),
    }
}
