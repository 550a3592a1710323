//! Contract tests for Number.prototype and the Number constructor

use super::call_method;
use builtins::global_object;
use core_types::Value;

#[test]
fn test_to_fixed() {
    let out = call_method(&Value::Number(1.005e2), "toFixed", vec![Value::Number(1.0)]).unwrap();
    assert_eq!(out.to_string(), "100.5");
}

#[test]
fn test_to_string_radix() {
    let out = call_method(&Value::Number(255.0), "toString", vec![Value::Number(2.0)]).unwrap();
    assert_eq!(out.to_string(), "11111111");
}

#[test]
fn test_number_statics() {
    let number = global_object().borrow().get_own("Number").unwrap();
    let is_integer = number.get_property("isInteger");
    assert!(is_integer.call(Value::Undefined, vec![Value::Number(4.0)]).unwrap().is_truthy());
    assert!(!is_integer.call(Value::Undefined, vec![Value::from("4")]).unwrap().is_truthy());
    let converted = number.call(Value::Undefined, vec![Value::from(" 12 ")]).unwrap();
    assert_eq!(converted.to_number(), 12.0);
}

#[test]
fn test_bigint_conversion() {
    let bigint = global_object().borrow().get_own("BigInt").unwrap();
    let big = bigint.call(Value::Undefined, vec![Value::Number(42.0)]).unwrap();
    assert_eq!(big.type_of(), "bigint");
    assert!(bigint.call(Value::Undefined, vec![Value::Number(1.5)]).is_err());
}
