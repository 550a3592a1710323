//! Contract tests for String.prototype

use super::call_method;
use core_types::{JsRegExp, NativeFunction, Value};
use std::rc::Rc;

fn s(text: &str) -> Value {
    Value::from(text)
}

#[test]
fn test_slice_negative_indices() {
    let out = call_method(&s("hello"), "slice", vec![Value::Number(-3.0)]).unwrap();
    assert_eq!(out.to_string(), "llo");
}

#[test]
fn test_split_on_string() {
    let parts = call_method(&s("a,b,,c"), "split", vec![s(",")]).unwrap();
    assert_eq!(parts.get_property("length").to_number(), 4.0);
    assert_eq!(parts.get_property("2").to_string(), "");
}

#[test]
fn test_replace_first_only() {
    let out = call_method(&s("aaa"), "replace", vec![s("a"), s("b")]).unwrap();
    assert_eq!(out.to_string(), "baa");
    let out = call_method(&s("aaa"), "replaceAll", vec![s("a"), s("b")]).unwrap();
    assert_eq!(out.to_string(), "bbb");
}

#[test]
fn test_replace_with_regex_callback() {
    let re = Value::RegExp(Rc::new(JsRegExp::new("\\d+", "g").unwrap()));
    let double = NativeFunction::value("double", |_, args| {
        Ok(Value::Number(args[0].to_number() * 2.0))
    });
    let out = call_method(&s("a1 b20"), "replace", vec![re, double]).unwrap();
    assert_eq!(out.to_string(), "a2 b40");
}

#[test]
fn test_pad_and_repeat() {
    let out = call_method(&s("5"), "padStart", vec![Value::Number(3.0), s("0")]).unwrap();
    assert_eq!(out.to_string(), "005");
    let out = call_method(&s("ab"), "repeat", vec![Value::Number(3.0)]).unwrap();
    assert_eq!(out.to_string(), "ababab");
    assert!(call_method(&s("ab"), "repeat", vec![Value::Number(-1.0)]).is_err());
}

#[test]
fn test_methods_on_null_receiver_fail() {
    let upper = builtins::StringPrototype::method("toUpperCase").unwrap();
    assert!(upper.call(Value::Null, vec![]).is_err());
}
