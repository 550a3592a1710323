//! Promise.prototype methods and the `Promise` constructor.
//!
//! Settlement and reaction scheduling live in `core_types::PromiseRef`;
//! this module only exposes them to scripts.

use crate::iterator::collect_iterable;
use core_types::{arg, FunctionRef, JsError, JsResult, NativeFunction, PromiseRef, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Promise.prototype methods
pub struct PromisePrototype;

fn this_promise(this: &Value, method: &str) -> JsResult<PromiseRef> {
    match this {
        Value::Promise(p) => Ok(p.clone()),
        other => Err(JsError::type_error(format!(
            "Method Promise.prototype.{} called on incompatible receiver {}",
            method, other
        ))),
    }
}

fn handler(value: Value) -> Option<FunctionRef> {
    match value {
        Value::Function(f) => Some(f),
        _ => None,
    }
}

impl PromisePrototype {
    /// Look up a Promise.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "then" => NativeFunction::value(name, |this, args| {
                let promise = this_promise(this, "then")?;
                Ok(Value::Promise(promise.then(
                    handler(arg(&args, 0)),
                    handler(arg(&args, 1)),
                )))
            }),
            "catch" => NativeFunction::value(name, |this, args| {
                let promise = this_promise(this, "catch")?;
                Ok(Value::Promise(promise.then(None, handler(arg(&args, 0)))))
            }),
            "finally" => NativeFunction::value(name, |this, args| {
                let promise = this_promise(this, "finally")?;
                Ok(Value::Promise(match handler(arg(&args, 0)) {
                    Some(callback) => promise.finally(callback),
                    None => promise.then(None, None),
                }))
            }),
            _ => return None,
        };
        Some(f)
    }
}

/// Resolve and reject functions handed to an executor.
pub fn resolving_functions(promise: &PromiseRef) -> (Value, Value) {
    let on_resolve = promise.clone();
    let on_reject = promise.clone();
    let resolve = NativeFunction::value("resolve", move |_, args| {
        on_resolve.resolve(arg(&args, 0));
        Ok(Value::Undefined)
    });
    let reject = NativeFunction::value("reject", move |_, args| {
        on_reject.reject(arg(&args, 0));
        Ok(Value::Undefined)
    });
    (resolve, reject)
}

/// How a combinator reacts to each input promise.
#[derive(Clone, Copy)]
enum Combinator {
    All,
    AllSettled,
    Race,
    Any,
}

fn combine(kind: Combinator, iterable: &Value) -> JsResult<Value> {
    let inputs: Vec<PromiseRef> = collect_iterable(iterable)?
        .into_iter()
        .map(PromiseRef::resolved)
        .collect();
    let result = PromiseRef::new();
    if inputs.is_empty() {
        match kind {
            Combinator::Race => {}
            Combinator::Any => result.reject(Value::new_error(
                "AggregateError",
                "All promises were rejected",
            )),
            _ => result.resolve(Value::new_array(Vec::new())),
        }
        return Ok(Value::Promise(result));
    }

    let slots = Rc::new(RefCell::new(vec![Value::Undefined; inputs.len()]));
    let remaining = Rc::new(RefCell::new(inputs.len()));
    for (index, input) in inputs.into_iter().enumerate() {
        let result = result.clone();
        let slots = slots.clone();
        let remaining = remaining.clone();
        input.subscribe(move |settlement| {
            let record = match (kind, settlement) {
                (Combinator::Race, Ok(value)) => return result.resolve(value),
                (Combinator::Race, Err(reason)) | (Combinator::All, Err(reason)) => {
                    return result.reject(reason)
                }
                (Combinator::Any, Ok(value)) => return result.resolve(value),
                (Combinator::All, Ok(value)) | (Combinator::Any, Err(value)) => value,
                (Combinator::AllSettled, Ok(value)) => Value::object_from([
                    ("status", Value::from("fulfilled")),
                    ("value", value),
                ]),
                (Combinator::AllSettled, Err(reason)) => Value::object_from([
                    ("status", Value::from("rejected")),
                    ("reason", reason),
                ]),
            };
            slots.borrow_mut()[index] = record;
            *remaining.borrow_mut() -= 1;
            if *remaining.borrow() == 0 {
                let values = Value::new_array(slots.borrow().clone());
                match kind {
                    Combinator::Any => {
                        let error = Value::new_error("AggregateError", "All promises were rejected");
                        if let Value::Object(obj) = &error {
                            obj.borrow_mut().insert("errors", values);
                        }
                        result.reject(error);
                    }
                    _ => result.resolve(values),
                }
            }
        });
    }
    Ok(Value::Promise(result))
}

/// The `Promise` constructor with its static methods.
pub struct PromiseConstructor;

impl PromiseConstructor {
    /// Run `executor(resolve, reject)` and return the new promise.
    ///
    /// An executor that throws rejects the promise.
    pub fn construct(executor: &Value) -> JsResult<Value> {
        if !matches!(executor, Value::Function(_)) {
            return Err(JsError::type_error(format!(
                "Promise resolver {} is not a function",
                executor
            )));
        }
        let promise = PromiseRef::new();
        let (resolve, reject) = resolving_functions(&promise);
        if let Err(err) = executor.call(Value::Undefined, vec![resolve, reject]) {
            if !err.is_catchable() {
                return Err(err);
            }
            promise.reject(err.to_value());
        }
        Ok(Value::Promise(promise))
    }

    /// Build the `Promise` constructor value.
    pub fn constructor() -> Value {
        let promise = NativeFunction::new("Promise", |_, _| {
            Err(JsError::type_error(
                "Promise constructor cannot be invoked without 'new'",
            ))
        })
        .with_constructor(|args| Self::construct(&arg(&args, 0)))
        .with_static(
            "resolve",
            NativeFunction::value("resolve", |_, args| {
                Ok(Value::Promise(PromiseRef::resolved(arg(&args, 0))))
            }),
        )
        .with_static(
            "reject",
            NativeFunction::value("reject", |_, args| {
                Ok(Value::Promise(PromiseRef::rejected(arg(&args, 0))))
            }),
        )
        .with_static(
            "all",
            NativeFunction::value("all", |_, args| combine(Combinator::All, &arg(&args, 0))),
        )
        .with_static(
            "allSettled",
            NativeFunction::value("allSettled", |_, args| {
                combine(Combinator::AllSettled, &arg(&args, 0))
            }),
        )
        .with_static(
            "race",
            NativeFunction::value("race", |_, args| combine(Combinator::Race, &arg(&args, 0))),
        )
        .with_static(
            "any",
            NativeFunction::value("any", |_, args| combine(Combinator::Any, &arg(&args, 0))),
        );
        Value::Function(Rc::new(promise))
    }
}
