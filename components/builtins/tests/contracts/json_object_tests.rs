//! Contract tests for JSONObject

use super::call_method;
use builtins::JSONObject;
use core_types::{NativeFunction, Value};

#[test]
fn test_json_parse_scalars() {
    assert_eq!(JSONObject::parse("42").unwrap().to_number(), 42.0);
    assert_eq!(JSONObject::parse(r#""hello""#).unwrap().to_string(), "hello");
    assert!(JSONObject::parse("true").unwrap().is_truthy());
    assert!(matches!(JSONObject::parse("null").unwrap(), Value::Null));
}

#[test]
fn test_json_parse_invalid() {
    assert!(JSONObject::parse("invalid json").is_err());
    assert!(JSONObject::parse("[1,]").is_err());
}

#[test]
fn test_json_stringify_nested() {
    let value = Value::object_from([
        ("list", Value::new_array(vec![Value::Number(1.0), Value::Boolean(false)])),
        ("text", Value::from("q\"uote")),
    ]);
    assert_eq!(
        JSONObject::stringify(&value).unwrap().unwrap(),
        r#"{"list":[1,false],"text":"q\"uote"}"#
    );
}

#[test]
fn test_json_stringify_uses_to_json() {
    let to_json = NativeFunction::value("toJSON", |_, _| Ok(Value::from("custom")));
    let value = Value::object_from([("toJSON", to_json)]);
    assert_eq!(JSONObject::stringify(&value).unwrap().unwrap(), r#""custom""#);
}

#[test]
fn test_json_parse_reviver() {
    let json = JSONObject::object();
    let reviver = NativeFunction::value("reviver", |_, args| {
        Ok(match &args[1] {
            Value::Number(n) => Value::Number(n * 10.0),
            other => other.clone(),
        })
    });
    let parsed = call_method(&json, "parse", vec![Value::from(r#"{"a":1,"b":[2]}"#), reviver]).unwrap();
    assert_eq!(parsed.get_property("a").to_number(), 10.0);
    assert_eq!(parsed.get_property("b").to_string(), "20");
}
