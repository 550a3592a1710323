//! Unit tests for JsError and ErrorKind

use core_types::{ErrorKind, JsError, SourcePosition, Value};

#[test]
fn test_kind_names() {
    assert_eq!(ErrorKind::TypeError.name(), "TypeError");
    assert_eq!(ErrorKind::NotCallable.name(), "TypeError");
    assert_eq!(ErrorKind::ReferenceError.to_string(), "ReferenceError");
}

#[test]
fn test_parse_error_display_includes_position() {
    let err = JsError::parse(
        "Unexpected token ')'",
        SourcePosition {
            line: 1,
            column: 9,
            offset: 8,
        },
    );
    assert_eq!(
        err.to_string(),
        "ParseError: Unexpected token ')' (line 1, column 9)"
    );
    assert!(err.kind().is_none());
}

#[test]
fn test_not_callable() {
    let err = JsError::not_callable("foo");
    assert_eq!(err.kind(), Some(ErrorKind::NotCallable));
    assert_eq!(err.to_string(), "TypeError: foo is not a function");
}

#[test]
fn test_thrown_value_display() {
    let err = JsError::Throw(Value::from("oops"));
    assert_eq!(err.to_string(), "Uncaught oops");
    assert!(err.is_catchable());
}

#[test]
fn test_catch_value_is_error_object() {
    let value = JsError::range_error("too far").to_value();
    assert!(value.is_error());
    assert_eq!(value.to_string(), "RangeError: too far");
}
