//! Property access on arbitrary values.
//!
//! Objects keep their own properties in a `JsObject`; every other kind of
//! value gets its methods from the matching prototype module here, so that
//! `"abc".toUpperCase()` or `[1, 2].map(f)` resolve without allocating
//! prototype objects for primitives.

use crate::array::ArrayPrototype;
use crate::function::FunctionPrototype;
use crate::number::NumberPrototype;
use crate::object::ObjectPrototype;
use crate::promise::PromisePrototype;
use crate::regexp::RegExpPrototype;
use crate::string::StringPrototype;
use core_types::{
    inherits_from, lookup_property, object_get, object_has, object_set, Callable, JsError,
    JsResult, Value,
};

fn array_index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<usize>().ok()
}

/// `target[key]` with access to builtin prototype methods.
///
/// # Examples
///
/// ```
/// use builtins::get_member;
/// use core_types::Value;
///
/// let upper = get_member(&Value::from("abc"), "toUpperCase").unwrap();
/// let result = upper.call(Value::from("abc"), vec![]).unwrap();
/// assert_eq!(result.to_string(), "ABC");
/// ```
pub fn get_member(target: &Value, key: &str) -> JsResult<Value> {
    match target {
        Value::Undefined | Value::Null => Err(JsError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            target, key
        ))),
        Value::Object(obj) => {
            if lookup_property(obj, key).is_some() {
                object_get(obj, key, target)
            } else {
                Ok(ObjectPrototype::method(key).unwrap_or(Value::Undefined))
            }
        }
        Value::Array(arr) => {
            if key == "length" {
                return Ok(Value::Number(arr.borrow().len() as f64));
            }
            if let Some(index) = array_index(key) {
                return Ok(arr.borrow().get(index).cloned().unwrap_or(Value::Undefined));
            }
            Ok(ArrayPrototype::method(key)
                .or_else(|| ObjectPrototype::method(key))
                .unwrap_or(Value::Undefined))
        }
        Value::String(_) => {
            if key == "length" || array_index(key).is_some() {
                return Ok(target.get_property(key));
            }
            Ok(StringPrototype::method(key)
                .or_else(|| ObjectPrototype::method(key))
                .unwrap_or(Value::Undefined))
        }
        Value::Number(_) => Ok(NumberPrototype::method(key)
            .or_else(|| ObjectPrototype::method(key))
            .unwrap_or(Value::Undefined)),
        Value::Boolean(_) | Value::BigInt(_) => {
            Ok(ObjectPrototype::method(key).unwrap_or(Value::Undefined))
        }
        Value::Function(f) => {
            if key == "prototype" {
                return Ok(f.prototype().map(Value::Object).unwrap_or(Value::Undefined));
            }
            if let Some(value) = f.get_static(key) {
                return Ok(value);
            }
            Ok(FunctionPrototype::method(key)
                .or_else(|| ObjectPrototype::method(key))
                .unwrap_or(Value::Undefined))
        }
        Value::Promise(_) => Ok(PromisePrototype::method(key)
            .or_else(|| ObjectPrototype::method(key))
            .unwrap_or(Value::Undefined)),
        Value::RegExp(re) => Ok(match key {
            "source" => Value::from(re.source()),
            "flags" => Value::from(re.flags()),
            "global" => Value::Boolean(re.is_global()),
            "lastIndex" => Value::from(re.last_index()),
            _ => RegExpPrototype::method(key)
                .or_else(|| ObjectPrototype::method(key))
                .unwrap_or(Value::Undefined),
        }),
    }
}

/// `target[key] = value`.
///
/// Writes to primitives are ignored, as in sloppy-mode scripts.
pub fn set_member(target: &Value, key: &str, value: Value) -> JsResult<()> {
    match target {
        Value::Undefined | Value::Null => Err(JsError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            target, key
        ))),
        Value::Object(obj) => object_set(obj, key, value, target),
        Value::Array(arr) => {
            if key == "length" {
                let len = value.to_number();
                if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                    return Err(JsError::range_error("Invalid array length"));
                }
                arr.borrow_mut().resize(len as usize, Value::Undefined);
            } else if let Some(index) = array_index(key) {
                let mut arr = arr.borrow_mut();
                if index >= arr.len() {
                    arr.resize(index + 1, Value::Undefined);
                }
                arr[index] = value;
            }
            Ok(())
        }
        Value::Function(f) => {
            f.set_static(key, value);
            Ok(())
        }
        Value::RegExp(re) => {
            if key == "lastIndex" {
                re.set_last_index(value.to_number().max(0.0) as usize);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// `delete target[key]`.
pub fn delete_member(target: &Value, key: &str) -> JsResult<bool> {
    match target {
        Value::Undefined | Value::Null => Err(JsError::type_error(format!(
            "Cannot convert {} to object",
            target
        ))),
        Value::Object(obj) => {
            obj.borrow_mut().remove(key);
            Ok(true)
        }
        Value::Array(arr) => {
            if let Some(index) = array_index(key) {
                if let Some(slot) = arr.borrow_mut().get_mut(index) {
                    *slot = Value::Undefined;
                }
                Ok(true)
            } else {
                Ok(key != "length")
            }
        }
        _ => Ok(true),
    }
}

/// `key in target`.
pub fn has_property(target: &Value, key: &str) -> JsResult<bool> {
    match target {
        Value::Object(obj) => Ok(object_has(obj, key) || ObjectPrototype::method(key).is_some()),
        Value::Array(arr) => Ok(key == "length"
            || array_index(key).map_or(false, |i| i < arr.borrow().len())
            || ArrayPrototype::method(key).is_some()),
        Value::Function(f) => Ok(key == "prototype" || f.get_static(key).is_some()),
        Value::Promise(_) | Value::RegExp(_) => Ok(!get_member(target, key)?.is_undefined()),
        other => Err(JsError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key, other
        ))),
    }
}

/// Own enumerable keys, used by `for…in` and `Object.keys`.
pub fn own_keys(target: &Value) -> Vec<String> {
    match target {
        Value::Object(obj) => obj.borrow().keys(),
        Value::Array(arr) => (0..arr.borrow().len()).map(|i| i.to_string()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// `value instanceof constructor`.
pub fn instance_of(value: &Value, constructor: &Value) -> JsResult<bool> {
    let constructor = match constructor {
        Value::Function(f) => f,
        other => {
            return Err(JsError::type_error(format!(
                "Right-hand side of 'instanceof' is not callable ({})",
                other.type_of()
            )))
        }
    };
    if let Some(prototype) = constructor.prototype() {
        return Ok(match value {
            Value::Object(obj) => inherits_from(obj, &prototype),
            _ => false,
        });
    }
    Ok(match constructor.name().as_str() {
        "Error" => value.is_error(),
        "Array" => matches!(value, Value::Array(_)),
        "Object" => !value.is_primitive(),
        "Function" => matches!(value, Value::Function(_)),
        "Promise" => matches!(value, Value::Promise(_)),
        "RegExp" => matches!(value, Value::RegExp(_)),
        name if name.ends_with("Error") => {
            value.is_error() && value.get_property("name").to_string() == name
        }
        _ => false,
    })
}
