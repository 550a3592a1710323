//! Contract tests for property access on arbitrary values

use builtins::{delete_member, get_member, has_property, instance_of, own_keys, set_member};
use core_types::{JsObject, NativeFunction, Value};

#[test]
fn test_getter_receives_receiver() {
    let mut obj = JsObject::new();
    obj.insert("base", Value::Number(2.0));
    obj.define_getter(
        "double",
        NativeFunction::value("double", |this, _| {
            Ok(Value::Number(this.get_property("base").to_number() * 2.0))
        }),
    );
    let value = Value::Object(obj.into_ref());
    assert_eq!(get_member(&value, "double").unwrap().to_number(), 4.0);
}

#[test]
fn test_string_length_and_index() {
    let s = Value::from("héllo");
    assert_eq!(get_member(&s, "length").unwrap().to_number(), 5.0);
    assert_eq!(get_member(&s, "1").unwrap().to_string(), "é");
    assert!(get_member(&s, "99").unwrap().is_undefined());
}

#[test]
fn test_delete_and_keys() {
    let obj = Value::object_from([("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
    assert!(delete_member(&obj, "a").unwrap());
    assert_eq!(own_keys(&obj), vec!["b"]);
    set_member(&obj, "c", Value::Null).unwrap();
    assert_eq!(own_keys(&obj), vec!["b", "c"]);
    assert!(has_property(&obj, "c").unwrap());
}

#[test]
fn test_instance_of_requires_callable() {
    let err = instance_of(&Value::new_object(), &Value::Number(1.0)).unwrap_err();
    assert!(err.to_string().contains("instanceof"));
}
