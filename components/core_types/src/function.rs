//! Callable values.
//!
//! Script functions, classes and native functions all implement [`Callable`]
//! so that call sites can invoke them without knowing where they came from.

use crate::{JsError, JsResult, ObjectRef, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a callable value.
pub type FunctionRef = Rc<dyn Callable>;

/// Anything that can be called like a function.
pub trait Callable {
    /// Function name, empty for anonymous functions.
    fn name(&self) -> String;

    /// Invoke with an explicit `this` value.
    fn call(&self, this: Value, args: Vec<Value>) -> JsResult<Value>;

    /// Invoke as a constructor (`new f(...)`).
    fn construct(&self, _args: Vec<Value>) -> JsResult<Value> {
        Err(JsError::type_error(format!(
            "{} is not a constructor",
            display_name(&self.name())
        )))
    }

    /// Run the constructor against an already allocated `this`.
    ///
    /// Used by `super(...)` in derived classes, where the instance is
    /// created by the outermost constructor.
    fn construct_with_this(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        self.call(this.clone(), args)?;
        Ok(this)
    }

    /// Prototype object given to instances created by [`Callable::construct`].
    fn prototype(&self) -> Option<ObjectRef> {
        None
    }

    /// Read a property stored on the function itself (statics).
    fn get_static(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Write a property on the function itself.
    fn set_static(&self, _key: &str, _value: Value) -> bool {
        false
    }

    /// Source text shown by `String(fn)`.
    fn source(&self) -> String {
        format!("function {}() {{ [native code] }}", self.name())
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "anonymous"
    } else {
        name
    }
}

type NativeFn = dyn Fn(&Value, Vec<Value>) -> JsResult<Value>;
type NativeCtor = dyn Fn(Vec<Value>) -> JsResult<Value>;

/// A function implemented in Rust.
///
/// # Examples
///
/// ```
/// use core_types::{NativeFunction, Value};
///
/// let double = NativeFunction::value("double", |_this, args| {
///     Ok(Value::Number(args.first().map(|v| v.to_number()).unwrap_or(0.0) * 2.0))
/// });
/// let result = double.call(Value::Undefined, vec![Value::Number(21.0)]).unwrap();
/// assert_eq!(result.to_number(), 42.0);
/// ```
pub struct NativeFunction {
    name: String,
    func: Box<NativeFn>,
    ctor: Option<Box<NativeCtor>>,
    statics: RefCell<IndexMap<String, Value>>,
}

impl NativeFunction {
    /// Create a native function.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, Vec<Value>) -> JsResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
            ctor: None,
            statics: RefCell::new(IndexMap::new()),
        }
    }

    /// Create a native function already wrapped as a [`Value`].
    pub fn value<F>(name: impl Into<String>, func: F) -> Value
    where
        F: Fn(&Value, Vec<Value>) -> JsResult<Value> + 'static,
    {
        Value::Function(Rc::new(Self::new(name, func)))
    }

    /// Make the function usable with `new`.
    pub fn with_constructor<F>(mut self, ctor: F) -> Self
    where
        F: Fn(Vec<Value>) -> JsResult<Value> + 'static,
    {
        self.ctor = Some(Box::new(ctor));
        self
    }

    /// Attach a static property (e.g. `Promise.resolve`).
    pub fn with_static(self, key: impl Into<String>, value: Value) -> Self {
        self.statics.borrow_mut().insert(key.into(), value);
        self
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn call(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        (self.func)(&this, args)
    }

    fn construct(&self, args: Vec<Value>) -> JsResult<Value> {
        match &self.ctor {
            Some(ctor) => ctor(args),
            None => Err(JsError::type_error(format!(
                "{} is not a constructor",
                display_name(&self.name)
            ))),
        }
    }

    fn get_static(&self, key: &str) -> Option<Value> {
        if key == "name" {
            return Some(Value::String(self.name.clone()));
        }
        self.statics.borrow().get(key).cloned()
    }

    fn set_static(&self, key: &str, value: Value) -> bool {
        self.statics.borrow_mut().insert(key.to_string(), value);
        true
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Fetch the argument at `index`, or `undefined` if missing.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_function_receives_this() {
        let f = NativeFunction::new("self", |this, _args| Ok(this.clone()));
        let result = f.call(Value::from("me"), vec![]).unwrap();
        assert_eq!(result.to_string(), "me");
    }

    #[test]
    fn test_native_function_is_not_constructor() {
        let f = NativeFunction::new("plain", |_, _| Ok(Value::Undefined));
        let err = f.construct(vec![]).unwrap_err();
        assert!(err.to_string().contains("plain is not a constructor"));
    }

    #[test]
    fn test_statics() {
        let f = NativeFunction::new("Thing", |_, _| Ok(Value::Undefined))
            .with_static("answer", Value::Number(42.0));
        assert!(matches!(f.get_static("answer"), Some(Value::Number(n)) if n == 42.0));
        assert!(f.get_static("missing").is_none());
    }

    #[test]
    fn test_native_constructor() {
        let f = NativeFunction::new("Box", |_, _| Ok(Value::Undefined))
            .with_constructor(|args| Ok(Value::new_array(args)));
        let made = f.construct(vec![Value::Number(1.0)]).unwrap();
        assert_eq!(made.to_string(), "1");
    }

    #[test]
    fn test_arg_defaults_to_undefined() {
        assert!(arg(&[], 3).is_undefined());
    }
}
