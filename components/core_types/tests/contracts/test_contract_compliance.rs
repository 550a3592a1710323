//! Contract compliance tests for core_types
//!
//! These tests pin the public surface that the parser, interpreter and
//! builtins rely on.

use core_types::{
    object_get, object_set, Callable, ErrorKind, JsError, JsObject, JsRegExp, NativeFunction,
    SourcePosition, Value,
};
use std::rc::Rc;

#[cfg(test)]
mod value_contract_tests {
    use super::*;

    #[test]
    fn test_value_variants() {
        let values = vec![
            Value::Undefined,
            Value::Null,
            Value::Boolean(true),
            Value::Number(1.5),
            Value::from("s"),
            Value::new_array(vec![]),
            Value::new_object(),
        ];
        let kinds: Vec<&str> = values.iter().map(|v| v.type_of()).collect();
        assert_eq!(
            kinds,
            vec!["undefined", "object", "boolean", "number", "string", "object", "object"]
        );
    }

    #[test]
    fn test_arrays_share_storage() {
        let a = Value::new_array(vec![Value::Number(1.0)]);
        let b = a.clone();
        b.as_array().unwrap().borrow_mut().push(Value::Number(2.0));
        assert_eq!(a.to_string(), "1,2");
        assert!(a.strict_equals(&b));
    }

    #[test]
    fn test_regexp_value_display() {
        let re = Value::RegExp(Rc::new(JsRegExp::new("a|b", "gi").unwrap()));
        assert_eq!(re.to_string(), "/a|b/gi");
        assert_eq!(re.type_of(), "object");
    }
}

#[cfg(test)]
mod object_contract_tests {
    use super::*;

    #[test]
    fn test_accessor_runs_with_receiver() {
        let obj = JsObject::new().into_ref();
        obj.borrow_mut().insert("secret", Value::Number(41.0));
        obj.borrow_mut().define_getter(
            "answer",
            NativeFunction::value("get answer", |this, _| {
                Ok(Value::Number(this.get_property("secret").to_number() + 1.0))
            }),
        );
        let receiver = Value::Object(obj.clone());
        assert_eq!(object_get(&obj, "answer", &receiver).unwrap().to_number(), 42.0);
    }

    #[test]
    fn test_setter_intercepts_write() {
        let obj = JsObject::new().into_ref();
        obj.borrow_mut().define_setter(
            "value",
            NativeFunction::value("set value", |this, args| {
                if let Value::Object(o) = this {
                    o.borrow_mut().insert("stored", core_types::arg(&args, 0));
                }
                Ok(Value::Undefined)
            }),
        );
        let receiver = Value::Object(obj.clone());
        object_set(&obj, "value", Value::from("x"), &receiver).unwrap();
        assert_eq!(obj.borrow().get_own("stored").unwrap().to_string(), "x");
    }
}

#[cfg(test)]
mod error_contract_tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_catchable() {
        assert!(JsError::type_error("x").is_catchable());
        assert!(!JsError::lex("x", SourcePosition::start()).is_catchable());
        assert_eq!(
            JsError::not_assignable("f()").kind(),
            Some(ErrorKind::NotAssignable)
        );
    }

    #[test]
    fn test_callable_default_construct_fails() {
        let f = NativeFunction::new("plain", |_, _| Ok(Value::Undefined));
        assert!(f.construct(vec![]).is_err());
    }
}
