//! JSON object methods

use crate::value::{get_member, own_keys};
use core_types::{arg, JsError, JsResult, NativeFunction, Value};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// JSON object with static methods
pub struct JSONObject;

/// Options accepted by `JSON.stringify` after its value argument.
#[derive(Default)]
struct Replacer {
    function: Option<Value>,
    allow_list: Option<Vec<String>>,
}

impl JSONObject {
    /// JSON.parse(text)
    pub fn parse(text: &str) -> JsResult<Value> {
        let json: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            JsError::Throw(Value::new_error(
                "SyntaxError",
                format!("JSON.parse: {}", e),
            ))
        })?;
        Ok(Self::from_json(&json))
    }

    /// JSON.stringify(value) with no replacer or indentation.
    ///
    /// Returns `None` when the value has no JSON representation
    /// (`undefined`, functions).
    pub fn stringify(value: &Value) -> JsResult<Option<String>> {
        Self::stringify_with(value, &Replacer::default(), "")
    }

    fn stringify_with(value: &Value, replacer: &Replacer, indent: &str) -> JsResult<Option<String>> {
        let holder = Value::object_from([("", value.clone())]);
        let mut seen = Vec::new();
        let Some(json) = Self::to_json(&holder, "", value.clone(), replacer, &mut seen)? else {
            return Ok(None);
        };
        if indent.is_empty() {
            return Ok(Some(json.to_string()));
        }
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut serializer)
            .map_err(|e| JsError::type_error(e.to_string()))?;
        Ok(Some(String::from_utf8_lossy(&out).into_owned()))
    }

    /// Convert parsed JSON into a runtime value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::new_array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                Value::object_from(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))))
            }
        }
    }

    /// Convert a finite number to JSON, keeping integers integral.
    pub fn number_to_json(n: f64) -> serde_json::Value {
        if !n.is_finite() {
            return serde_json::Value::Null;
        }
        if n.fract() == 0.0 && n.abs() < 9007199254740992.0 {
            return serde_json::Value::from(n as i64);
        }
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }

    fn to_json(
        holder: &Value,
        key: &str,
        mut value: Value,
        replacer: &Replacer,
        seen: &mut Vec<Value>,
    ) -> JsResult<Option<serde_json::Value>> {
        if !value.is_primitive() && !matches!(value, Value::Function(_)) {
            let to_json = get_member(&value, "toJSON")?;
            if let Value::Function(_) = to_json {
                value = to_json.call(value.clone(), vec![Value::from(key)])?;
            }
        }
        if let Some(function) = &replacer.function {
            value = function.call(holder.clone(), vec![Value::from(key), value])?;
        }

        let json = match &value {
            Value::Undefined | Value::Function(_) => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => Self::number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::BigInt(_) => {
                return Err(JsError::type_error("Do not know how to serialize a BigInt"))
            }
            Value::RegExp(_) | Value::Promise(_) => serde_json::Value::Object(Default::default()),
            Value::Array(items) => {
                Self::enter(&value, seen)?;
                let items = items.borrow().clone();
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let converted =
                        Self::to_json(&value, &index.to_string(), item, replacer, seen)?;
                    out.push(converted.unwrap_or(serde_json::Value::Null));
                }
                seen.pop();
                serde_json::Value::Array(out)
            }
            Value::Object(_) => {
                Self::enter(&value, seen)?;
                let keys = match &replacer.allow_list {
                    Some(list) => list.clone(),
                    None => own_keys(&value),
                };
                let mut map = serde_json::Map::new();
                for key in keys {
                    let item = get_member(&value, &key)?;
                    if let Some(converted) = Self::to_json(&value, &key, item, replacer, seen)? {
                        map.insert(key, converted);
                    }
                }
                seen.pop();
                serde_json::Value::Object(map)
            }
        };
        Ok(Some(json))
    }

    fn enter(value: &Value, seen: &mut Vec<Value>) -> JsResult<()> {
        if seen.iter().any(|v| v.same_reference(value)) {
            return Err(JsError::type_error("Converting circular structure to JSON"));
        }
        seen.push(value.clone());
        Ok(())
    }

    fn revive(holder: &Value, key: &str, reviver: &Value) -> JsResult<Value> {
        let value = get_member(holder, key)?;
        match &value {
            Value::Array(_) | Value::Object(_) => {
                for child in own_keys(&value) {
                    let revived = Self::revive(&value, &child, reviver)?;
                    if revived.is_undefined() {
                        crate::value::delete_member(&value, &child)?;
                    } else {
                        crate::value::set_member(&value, &child, revived)?;
                    }
                }
            }
            _ => {}
        }
        reviver.call(holder.clone(), vec![Value::from(key), value])
    }

    /// Build the `JSON` object.
    pub fn object() -> Value {
        let parse = NativeFunction::value("parse", |_, args| {
            let value = Self::parse(&arg(&args, 0).to_string())?;
            match arg(&args, 1) {
                reviver @ Value::Function(_) => {
                    let holder = Value::object_from([("", value)]);
                    Self::revive(&holder, "", &reviver)
                }
                _ => Ok(value),
            }
        });
        let stringify = NativeFunction::value("stringify", |_, args| {
            let replacer = match arg(&args, 1) {
                f @ Value::Function(_) => Replacer {
                    function: Some(f),
                    allow_list: None,
                },
                Value::Array(keys) => Replacer {
                    function: None,
                    allow_list: Some(keys.borrow().iter().map(|k| k.to_string()).collect()),
                },
                _ => Replacer::default(),
            };
            let indent = match arg(&args, 2) {
                Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
                Value::String(s) => s.chars().take(10).collect(),
                _ => String::new(),
            };
            Ok(Self::stringify_with(&arg(&args, 0), &replacer, &indent)?
                .map(Value::String)
                .unwrap_or(Value::Undefined))
        });
        let mut json = core_types::JsObject::new();
        json.class_name = Some("JSON".to_string());
        json.insert("parse", parse);
        json.insert("stringify", stringify);
        Value::Object(json.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stringify_call(args: Vec<Value>) -> Value {
        JSONObject::object()
            .get_property("stringify")
            .call(Value::Undefined, args)
            .unwrap()
    }

    #[test]
    fn test_parse_preserves_key_order() {
        let value = JSONObject::parse(r#"{"b": 1, "a": [true, null, "x"]}"#).unwrap();
        assert_eq!(own_keys(&value), vec!["b", "a"]);
        assert_eq!(value.get_property("a").to_string(), "true,,x");
    }

    #[test]
    fn test_parse_error_is_syntax_error() {
        let err = JSONObject::parse("{oops").unwrap_err();
        assert_eq!(err.to_value().get_property("name").to_string(), "SyntaxError");
    }

    #[test]
    fn test_stringify_integers_and_skips() {
        let value = Value::object_from([
            ("n", Value::Number(3.0)),
            ("f", Value::Number(1.5)),
            ("u", Value::Undefined),
            ("a", Value::new_array(vec![Value::Undefined, Value::Number(f64::NAN)])),
        ]);
        assert_eq!(
            JSONObject::stringify(&value).unwrap().unwrap(),
            r#"{"n":3,"f":1.5,"a":[null,null]}"#
        );
        assert!(JSONObject::stringify(&Value::Undefined).unwrap().is_none());
    }

    #[test]
    fn test_stringify_indent() {
        let value = Value::object_from([("a", Value::new_array(vec![Value::Number(1.0)]))]);
        let out = stringify_call(vec![value, Value::Undefined, Value::Number(2.0)]);
        assert_eq!(out.to_string(), "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn test_stringify_allow_list() {
        let value = Value::object_from([("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let keys = Value::new_array(vec![Value::from("b")]);
        assert_eq!(stringify_call(vec![value, keys]).to_string(), r#"{"b":2}"#);
    }

    #[test]
    fn test_circular_structure() {
        let value = Value::new_object();
        crate::value::set_member(&value, "self", value.clone()).unwrap();
        let err = JSONObject::stringify(&value).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }
}
