//! Contract tests for Array.prototype

use super::{call_method, numbers};
use core_types::{JsError, NativeFunction, Value};

#[test]
fn test_push_returns_new_length() {
    let arr = numbers(&[1.0]);
    let len = call_method(&arr, "push", vec![Value::Number(2.0), Value::Number(3.0)]).unwrap();
    assert_eq!(len.to_number(), 3.0);
    assert_eq!(arr.to_string(), "1,2,3");
}

#[test]
fn test_reduce_sums() {
    let arr = numbers(&[1.0, 2.0, 3.0, 4.0]);
    let add = NativeFunction::value("add", |_, args| {
        Ok(Value::Number(args[0].to_number() + args[1].to_number()))
    });
    let sum = call_method(&arr, "reduce", vec![add, Value::Number(0.0)]).unwrap();
    assert_eq!(sum.to_number(), 10.0);
}

#[test]
fn test_reduce_empty_without_initial_fails() {
    let add = NativeFunction::value("add", |_, args| Ok(args[0].clone()));
    let err = call_method(&numbers(&[]), "reduce", vec![add]).unwrap_err();
    assert!(err.to_string().contains("TypeError"));
}

#[test]
fn test_default_sort_is_by_string() {
    let arr = numbers(&[10.0, 9.0, 1.0]);
    call_method(&arr, "sort", vec![]).unwrap();
    assert_eq!(arr.to_string(), "1,10,9");
}

#[test]
fn test_sort_with_comparator() {
    let arr = numbers(&[10.0, 9.0, 1.0]);
    let by_value = NativeFunction::value("cmp", |_, args| {
        Ok(Value::Number(args[0].to_number() - args[1].to_number()))
    });
    call_method(&arr, "sort", vec![by_value]).unwrap();
    assert_eq!(arr.to_string(), "1,9,10");
}

#[test]
fn test_comparator_error_propagates() {
    let arr = numbers(&[2.0, 1.0]);
    let failing = NativeFunction::value("cmp", |_, _| Err(JsError::type_error("nope")));
    assert!(call_method(&arr, "sort", vec![failing]).is_err());
}

#[test]
fn test_splice_removes_and_inserts() {
    let arr = numbers(&[1.0, 2.0, 3.0, 4.0]);
    let removed = call_method(
        &arr,
        "splice",
        vec![Value::Number(1.0), Value::Number(2.0), Value::from("x")],
    )
    .unwrap();
    assert_eq!(removed.to_string(), "2,3");
    assert_eq!(arr.to_string(), "1,x,4");
}

#[test]
fn test_flat_and_includes() {
    let nested = Value::new_array(vec![
        Value::Number(1.0),
        Value::new_array(vec![Value::Number(2.0), numbers(&[3.0])]),
    ]);
    let flat = call_method(&nested, "flat", vec![Value::Number(f64::INFINITY)]).unwrap();
    assert_eq!(flat.to_string(), "1,2,3");
    let found = call_method(&numbers(&[f64::NAN]), "includes", vec![Value::Number(f64::NAN)]).unwrap();
    assert!(found.is_truthy());
}
