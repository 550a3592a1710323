//! Object.prototype methods and the `Object` constructor.

use crate::value::{get_member, own_keys, set_member};
use crate::iterator::collect_iterable;
use core_types::{arg, inherits_from, JsError, JsObject, JsResult, NativeFunction, Value};
use std::rc::Rc;

/// Object.prototype methods
pub struct ObjectPrototype;

impl ObjectPrototype {
    /// Object.prototype.hasOwnProperty(prop)
    pub fn has_own_property(target: &Value, key: &str) -> bool {
        match target {
            Value::Object(obj) => obj.borrow().properties.contains_key(key),
            Value::Array(arr) => {
                key == "length" || key.parse::<usize>().map_or(false, |i| i < arr.borrow().len())
            }
            Value::String(s) => {
                key == "length" || key.parse::<usize>().map_or(false, |i| i < s.chars().count())
            }
            Value::Function(f) => f.get_static(key).is_some(),
            _ => false,
        }
    }

    /// Object.prototype.toString()
    pub fn to_string(target: &Value) -> String {
        match target {
            Value::Undefined => "[object Undefined]".to_string(),
            Value::Null => "[object Null]".to_string(),
            Value::Array(_) => "[object Array]".to_string(),
            other => other.to_string(),
        }
    }

    /// Look up an Object.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "hasOwnProperty" => NativeFunction::value(name, |this, args| {
                let key = arg(&args, 0).to_property_key();
                Ok(Value::Boolean(Self::has_own_property(this, &key)))
            }),
            "isPrototypeOf" => NativeFunction::value(name, |this, args| {
                Ok(Value::Boolean(match (this, arg(&args, 0)) {
                    (Value::Object(proto), Value::Object(obj)) => inherits_from(&obj, proto),
                    _ => false,
                }))
            }),
            "toString" | "toLocaleString" => {
                NativeFunction::value(name, |this, _| Ok(Value::String(Self::to_string(this))))
            }
            "valueOf" => NativeFunction::value(name, |this, _| Ok(this.clone())),
            _ => return None,
        };
        Some(f)
    }
}

fn object_arg(args: &[Value], method: &str) -> JsResult<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(JsError::type_error(format!(
            "Object.{} called on {}",
            method, target
        )));
    }
    Ok(target)
}

fn entries(target: &Value) -> JsResult<Vec<(String, Value)>> {
    own_keys(target)
        .into_iter()
        .map(|key| {
            let value = get_member(target, &key)?;
            Ok((key, value))
        })
        .collect()
}

/// The `Object` constructor with its static methods.
pub struct ObjectConstructor;

impl ObjectConstructor {
    /// Build the `Object` constructor value.
    pub fn constructor() -> Value {
        let object = NativeFunction::new("Object", |_, args| Ok(wrap(arg(&args, 0))))
            .with_constructor(|args| Ok(wrap(arg(&args, 0))))
            .with_static(
                "keys",
                NativeFunction::value("keys", |_, args| {
                    let target = object_arg(&args, "keys")?;
                    Ok(Value::new_array(
                        own_keys(&target).into_iter().map(Value::String).collect(),
                    ))
                }),
            )
            .with_static(
                "values",
                NativeFunction::value("values", |_, args| {
                    let target = object_arg(&args, "values")?;
                    Ok(Value::new_array(
                        entries(&target)?.into_iter().map(|(_, v)| v).collect(),
                    ))
                }),
            )
            .with_static(
                "entries",
                NativeFunction::value("entries", |_, args| {
                    let target = object_arg(&args, "entries")?;
                    Ok(Value::new_array(
                        entries(&target)?
                            .into_iter()
                            .map(|(k, v)| Value::new_array(vec![Value::String(k), v]))
                            .collect(),
                    ))
                }),
            )
            .with_static(
                "assign",
                NativeFunction::value("assign", |_, args| {
                    let target = object_arg(&args, "assign")?;
                    for source in args.iter().skip(1).filter(|s| !s.is_nullish()) {
                        for (key, value) in entries(source)? {
                            set_member(&target, &key, value)?;
                        }
                    }
                    Ok(target)
                }),
            )
            .with_static(
                "fromEntries",
                NativeFunction::value("fromEntries", |_, args| {
                    let result = Value::new_object();
                    for entry in collect_iterable(&arg(&args, 0))? {
                        let key = get_member(&entry, "0")?.to_property_key();
                        set_member(&result, &key, get_member(&entry, "1")?)?;
                    }
                    Ok(result)
                }),
            )
            .with_static(
                "create",
                NativeFunction::value("create", |_, args| match arg(&args, 0) {
                    Value::Object(proto) => Ok(Value::Object(JsObject::with_prototype(proto).into_ref())),
                    Value::Null => Ok(Value::new_object()),
                    other => Err(JsError::type_error(format!(
                        "Object prototype may only be an Object or null: {}",
                        other
                    ))),
                }),
            )
            .with_static(
                "getPrototypeOf",
                NativeFunction::value("getPrototypeOf", |_, args| {
                    Ok(match object_arg(&args, "getPrototypeOf")? {
                        Value::Object(obj) => obj
                            .borrow()
                            .prototype
                            .clone()
                            .map(Value::Object)
                            .unwrap_or(Value::Null),
                        _ => Value::Null,
                    })
                }),
            )
            .with_static(
                "setPrototypeOf",
                NativeFunction::value("setPrototypeOf", |_, args| {
                    let target = object_arg(&args, "setPrototypeOf")?;
                    if let Value::Object(obj) = &target {
                        obj.borrow_mut().prototype = match arg(&args, 1) {
                            Value::Object(proto) => Some(proto),
                            _ => None,
                        };
                    }
                    Ok(target)
                }),
            )
            .with_static(
                "defineProperty",
                NativeFunction::value("defineProperty", |_, args| {
                    let target = arg(&args, 0);
                    let Value::Object(obj) = &target else {
                        return Err(JsError::type_error(
                            "Object.defineProperty called on non-object",
                        ));
                    };
                    let key = arg(&args, 1).to_property_key();
                    let descriptor = arg(&args, 2);
                    let getter = get_member(&descriptor, "get")?;
                    let setter = get_member(&descriptor, "set")?;
                    if getter.is_undefined() && setter.is_undefined() {
                        obj.borrow_mut()
                            .insert(key, get_member(&descriptor, "value")?);
                    } else {
                        let mut obj = obj.borrow_mut();
                        if !getter.is_undefined() {
                            obj.define_getter(key.clone(), getter);
                        }
                        if !setter.is_undefined() {
                            obj.define_setter(key, setter);
                        }
                    }
                    Ok(target)
                }),
            );
        Value::Function(Rc::new(object))
    }
}

fn wrap(value: Value) -> Value {
    if value.is_nullish() {
        Value::new_object()
    } else {
        value
    }
}
