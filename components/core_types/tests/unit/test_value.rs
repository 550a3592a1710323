//! Unit tests for Value coercions and equality

use core_types::{JsObject, NativeFunction, PreferredType, Value};
use num_bigint::BigInt;

#[test]
fn test_number_coercions() {
    assert_eq!(Value::from("  12 ").to_number(), 12.0);
    assert_eq!(Value::Boolean(true).to_number(), 1.0);
    assert_eq!(Value::Null.to_number(), 0.0);
    assert!(Value::Undefined.to_number().is_nan());
    assert_eq!(Value::new_array(vec![Value::Number(5.0)]).to_number(), 5.0);
}

#[test]
fn test_int32_conversion() {
    assert_eq!(Value::Number(2147483648.0).to_int32(), -2147483648);
    assert_eq!(Value::Number(-1.0).to_uint32(), 4294967295);
}

#[test]
fn test_bigint_loose_equality() {
    let big = Value::BigInt(BigInt::from(10));
    assert!(big.loose_equals(&Value::Number(10.0)));
    assert!(big.loose_equals(&Value::from("10")));
    assert!(!big.strict_equals(&Value::Number(10.0)));
}

#[test]
fn test_object_to_primitive_prefers_value_of_for_numbers() {
    let mut obj = JsObject::new();
    obj.insert(
        "valueOf",
        NativeFunction::value("valueOf", |_, _| Ok(Value::Number(7.0))),
    );
    obj.insert(
        "toString",
        NativeFunction::value("toString", |_, _| Ok(Value::from("seven"))),
    );
    let value = Value::Object(obj.into_ref());
    assert_eq!(value.to_primitive(PreferredType::Number).unwrap().to_number(), 7.0);
    assert_eq!(
        value.to_primitive(PreferredType::String).unwrap().to_string(),
        "seven"
    );
}

#[test]
fn test_object_from_preserves_order() {
    let value = Value::object_from([("b", Value::Number(1.0)), ("a", Value::Number(2.0))]);
    let keys = value.as_object().unwrap().borrow().keys();
    assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn test_call_non_function_fails() {
    let err = Value::Number(1.0)
        .call(Value::Undefined, vec![])
        .unwrap_err();
    assert!(err.to_string().contains("is not a function"));
}
