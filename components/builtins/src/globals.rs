//! The global object: constructors, namespaces and global functions.

use crate::array::ArrayPrototype;
use crate::console::ConsoleObject;
use crate::error::{ErrorConstructor, ERROR_TYPES};
use crate::json::JSONObject;
use crate::math::MathObject;
use crate::number::{bigint_function, parse_float_function, parse_int_function, NumberConstructor};
use crate::object::ObjectConstructor;
use crate::promise::PromiseConstructor;
use crate::value::get_member;
use core_types::{arg, JsError, JsObject, JsRegExp, NativeFunction, ObjectRef, Value};
use std::rc::Rc;

fn string_constructor() -> Value {
    let string = NativeFunction::new("String", |_, args| {
        Ok(Value::String(match args.first() {
            None => String::new(),
            Some(value) => value.to_string(),
        }))
    })
    .with_constructor(|args| Ok(Value::String(args.first().map(|v| v.to_string()).unwrap_or_default())))
    .with_static(
        "fromCharCode",
        NativeFunction::value("fromCharCode", |_, args| {
            let units: Vec<u16> = args.iter().map(|v| v.to_uint32() as u16).collect();
            Ok(Value::String(String::from_utf16_lossy(&units)))
        }),
    )
    .with_static(
        "raw",
        NativeFunction::value("raw", |_, args| {
            let strings = arg(&args, 0);
            let raw = match get_member(&strings, "raw")? {
                Value::Undefined => strings,
                raw => raw,
            };
            let parts = crate::iterator::collect_iterable(&raw)?;
            let mut out = String::new();
            for (i, part) in parts.iter().enumerate() {
                out.push_str(&part.to_string());
                if i + 1 < parts.len() {
                    if let Some(sub) = args.get(i + 1) {
                        out.push_str(&sub.to_string());
                    }
                }
            }
            Ok(Value::String(out))
        }),
    );
    Value::Function(Rc::new(string))
}

fn boolean_constructor() -> Value {
    NativeFunction::value("Boolean", |_, args| {
        Ok(Value::Boolean(arg(&args, 0).is_truthy()))
    })
}

fn regexp_constructor() -> Value {
    fn build(args: &[Value]) -> Result<Value, JsError> {
        let (pattern, flags) = match (arg(args, 0), arg(args, 1)) {
            (Value::RegExp(re), Value::Undefined) => {
                (re.source().to_string(), re.flags().to_string())
            }
            (Value::RegExp(re), flags) => (re.source().to_string(), flags.to_string()),
            (Value::Undefined, flags) => ("(?:)".to_string(), flags_string(&flags)),
            (pattern, flags) => (pattern.to_string(), flags_string(&flags)),
        };
        let re = JsRegExp::new(&pattern, &flags).map_err(|err| {
            let message = err.to_value().get_property("message");
            JsError::Throw(Value::new_error("SyntaxError", message.to_string()))
        })?;
        Ok(Value::RegExp(Rc::new(re)))
    }
    fn flags_string(flags: &Value) -> String {
        match flags {
            Value::Undefined => String::new(),
            other => other.to_string(),
        }
    }
    let regexp = NativeFunction::new("RegExp", |_, args| build(&args))
        .with_constructor(|args| build(&args));
    Value::Function(Rc::new(regexp))
}

fn global_number_predicate(name: &'static str, test: fn(f64) -> bool) -> Value {
    NativeFunction::value(name, move |_, args| {
        Ok(Value::Boolean(test(arg(&args, 0).to_number())))
    })
}

/// Build a fresh global object whose `console` prints to stdout/stderr.
///
/// # Examples
///
/// ```
/// let globals = builtins::global_object();
/// assert!(globals.borrow().get_own("Math").is_some());
/// assert!(globals.borrow().get_own("undefined").unwrap().is_undefined());
/// ```
pub fn global_object() -> ObjectRef {
    global_object_with_console(Rc::new(ConsoleObject::new()))
}

/// Build a fresh global object around a caller-supplied console.
pub fn global_object_with_console(console: Rc<ConsoleObject>) -> ObjectRef {
    let mut globals = JsObject::new();
    globals.insert("undefined", Value::Undefined);
    globals.insert("NaN", Value::Number(f64::NAN));
    globals.insert("Infinity", Value::Number(f64::INFINITY));

    globals.insert("Object", ObjectConstructor::constructor());
    globals.insert("Array", ArrayPrototype::constructor());
    globals.insert("String", string_constructor());
    globals.insert("Number", NumberConstructor::constructor());
    globals.insert("Boolean", boolean_constructor());
    globals.insert("BigInt", bigint_function());
    globals.insert("RegExp", regexp_constructor());
    globals.insert("Promise", PromiseConstructor::constructor());
    for name in ERROR_TYPES {
        globals.insert(name, ErrorConstructor::constructor(name));
    }

    globals.insert("Math", MathObject::object());
    globals.insert("JSON", JSONObject::object());
    globals.insert("console", console.object());

    globals.insert("parseInt", parse_int_function());
    globals.insert("parseFloat", parse_float_function());
    globals.insert("isNaN", global_number_predicate("isNaN", f64::is_nan));
    globals.insert("isFinite", global_number_predicate("isFinite", f64::is_finite));

    globals.into_ref()
}
