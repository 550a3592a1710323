//! Runtime value representation.

use crate::number::{self, number_to_string, string_to_number};
use crate::object::{object_get, ArrayRef, JsObject, ObjectRef};
use crate::{Callable, FunctionRef, JsError, JsRegExp, JsResult, PromiseRef};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A value produced by evaluating an expression.
///
/// Primitives are stored inline; arrays, objects, functions and promises
/// are reference-counted handles so that copies alias the same storage.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let num = Value::Number(42.0);
/// assert!(num.is_truthy());
/// assert_eq!(num.type_of(), "number");
///
/// let text = Value::from("hello");
/// assert_eq!(text.to_string(), "hello");
/// assert!(Value::Null.loose_equals(&Value::Undefined));
/// ```
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// IEEE-754 double
    Number(f64),
    /// String value
    String(String),
    /// Arbitrary precision integer (`10n`)
    BigInt(BigInt),
    /// Array
    Array(ArrayRef),
    /// Ordinary object (including error objects and class instances)
    Object(ObjectRef),
    /// Function, class or native function
    Function(FunctionRef),
    /// Promise
    Promise(PromiseRef),
    /// Regular expression
    RegExp(Rc<JsRegExp>),
}

/// Preferred type for [`Value::to_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// No preference (`+`, `==`)
    Default,
    /// Numeric context
    Number,
    /// String context (template literals, `String(x)`)
    String,
}

impl Value {
    /// Create an empty object.
    pub fn new_object() -> Value {
        Value::Object(JsObject::new().into_ref())
    }

    /// Create an object from key/value pairs, preserving their order.
    pub fn object_from<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut object = JsObject::new();
        for (key, value) in entries {
            object.insert(key, value);
        }
        Value::Object(object.into_ref())
    }

    /// Create an array from its elements.
    pub fn new_array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Create an error object with `name` and `message` properties.
    pub fn new_error(name: &str, message: impl Into<String>) -> Value {
        let mut object = JsObject::new();
        object.class_name = Some("Error".to_string());
        object.insert("name", Value::from(name));
        object.insert("message", Value::String(message.into()));
        Value::Object(object.into_ref())
    }

    /// `typeof` operator result.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::BigInt(_) => "bigint",
            Value::Function(_) => "function",
            Value::Array(_) | Value::Object(_) | Value::Promise(_) | Value::RegExp(_) => "object",
        }
    }

    /// `ToBoolean`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::BigInt(n) => !n.is_zero(),
            _ => true,
        }
    }

    /// True for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// True for `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for values that are not objects, arrays or functions.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Boolean(_)
                | Value::Number(_)
                | Value::String(_)
                | Value::BigInt(_)
        )
    }

    /// True for error objects.
    pub fn is_error(&self) -> bool {
        match self {
            Value::Object(obj) => obj.borrow().class_name.as_deref() == Some("Error"),
            _ => false,
        }
    }

    /// Numeric payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Object handle, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Array handle, if this is an array.
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Function handle, if this is callable.
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// `ToNumber` without invoking user code.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::BigInt(n) => n.to_f64().unwrap_or(f64::NAN),
            Value::Array(_) => string_to_number(&self.to_string()),
            _ => f64::NAN,
        }
    }

    /// `ToInt32`.
    pub fn to_int32(&self) -> i32 {
        number::to_int32(self.to_number())
    }

    /// `ToUint32`.
    pub fn to_uint32(&self) -> u32 {
        number::to_uint32(self.to_number())
    }

    /// `ToString`, same as the `Display` rendering.
    pub fn to_js_string(&self) -> String {
        self.to_string()
    }

    /// `ToPropertyKey`.
    pub fn to_property_key(&self) -> String {
        self.to_string()
    }

    /// `ToPrimitive`: objects try `valueOf`/`toString` methods found on
    /// themselves or their prototype chain before falling back to their
    /// default rendering.
    pub fn to_primitive(&self, hint: PreferredType) -> JsResult<Value> {
        match self {
            Value::Object(obj) => {
                let order = if hint == PreferredType::String {
                    ["toString", "valueOf"]
                } else {
                    ["valueOf", "toString"]
                };
                for name in order {
                    let method = object_get(obj, name, self)?;
                    if let Value::Function(f) = method {
                        let result = f.call(self.clone(), Vec::new())?;
                        if result.is_primitive() {
                            return Ok(result);
                        }
                    }
                }
                Ok(Value::String(self.to_string()))
            }
            Value::Array(_) | Value::Function(_) | Value::Promise(_) | Value::RegExp(_) => {
                Ok(Value::String(self.to_string()))
            }
            _ => Ok(self.clone()),
        }
    }

    /// Read a property without access to builtin prototype methods.
    ///
    /// Covers own and inherited object properties, array indices and
    /// `length`, string indices and `length`, and function statics.
    /// Getter failures read as `undefined`.
    pub fn get_property(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => object_get(obj, key, self).unwrap_or(Value::Undefined),
            Value::Array(arr) => {
                let arr = arr.borrow();
                if key == "length" {
                    return Value::Number(arr.len() as f64);
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|index| arr.get(index).cloned())
                    .unwrap_or(Value::Undefined)
            }
            Value::String(s) => {
                if key == "length" {
                    return Value::Number(s.chars().count() as f64);
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined)
            }
            Value::Function(f) => f.get_static(key).unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Call this value as a function.
    pub fn call(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        match self {
            Value::Function(f) => f.call(this, args),
            other => Err(JsError::not_callable(other.type_of())),
        }
    }

    /// `===`.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            _ => self.same_reference(other),
        }
    }

    /// `==`.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::BigInt(a), Value::Number(b)) | (Value::Number(b), Value::BigInt(a)) => {
                a.to_f64().map(|a| a == *b).unwrap_or(false)
            }
            (Value::BigInt(a), Value::String(s)) | (Value::String(s), Value::BigInt(a)) => {
                s.trim().parse::<BigInt>().map(|b| &b == a).unwrap_or(false)
            }
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (a, b) if !a.is_primitive() && b.is_primitive() => {
                match a.to_primitive(PreferredType::Default) {
                    Ok(prim) => prim.loose_equals(b),
                    Err(_) => false,
                }
            }
            (a, b) if a.is_primitive() && !b.is_primitive() => b.loose_equals(a),
            _ => self.strict_equals(other),
        }
    }

    /// `SameValue`: like `===` but `NaN` equals itself and `+0` differs
    /// from `-0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self.strict_equals(other),
        }
    }

    /// True if both values are handles to the same allocation.
    pub fn same_reference(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::RegExp(a), Value::RegExp(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => f.write_str(s),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Array(arr) => {
                let arr = match arr.try_borrow() {
                    Ok(arr) => arr,
                    Err(_) => return Ok(()),
                };
                for (i, element) in arr.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !element.is_nullish() {
                        write!(f, "{}", element)?;
                    }
                }
                Ok(())
            }
            Value::Object(obj) => {
                if self.is_error() {
                    let name = self.get_property("name");
                    let message = self.get_property("message").to_string();
                    if message.is_empty() {
                        write!(f, "{}", name)
                    } else {
                        write!(f, "{}: {}", name, message)
                    }
                } else {
                    match obj.try_borrow().ok().and_then(|o| o.class_name.clone()) {
                        Some(class) => write!(f, "[object {}]", class),
                        None => f.write_str("[object Object]"),
                    }
                }
            }
            Value::Function(func) => f.write_str(&func.source()),
            Value::Promise(_) => f.write_str("[object Promise]"),
            Value::RegExp(re) => write!(f, "{}", re),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Array(arr) => match arr.try_borrow() {
                Ok(arr) => f.debug_list().entries(arr.iter()).finish(),
                Err(_) => f.write_str("[...]"),
            },
            Value::Object(obj) if !self.is_error() => match obj.try_borrow() {
                Ok(obj) => {
                    let mut map = f.debug_map();
                    for (key, property) in &obj.properties {
                        match property {
                            crate::Property::Data(value) => map.entry(key, value),
                            crate::Property::Accessor { .. } => map.entry(key, &"[accessor]"),
                        };
                    }
                    map.finish()
                }
                Err(_) => f.write_str("{...}"),
            },
            Value::Function(func) => write!(f, "[Function: {}]", func.name()),
            Value::Promise(p) => write!(f, "{:?}", p),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::new_array(elements)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<PromiseRef> for Value {
    fn from(promise: PromiseRef) -> Self {
        Value::Promise(promise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeFunction;

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Undefined.type_of(), "undefined");
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::BigInt(BigInt::from(1)).type_of(), "bigint");
        assert_eq!(Value::new_array(vec![]).type_of(), "object");
        let f = NativeFunction::value("f", |_, _| Ok(Value::Undefined));
        assert_eq!(f.type_of(), "function");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::new_object().is_truthy());
        assert!(!Value::BigInt(BigInt::from(0)).is_truthy());
    }

    #[test]
    fn test_display() {
        let arr = Value::new_array(vec![Value::Number(1.0), Value::Null, Value::from("x")]);
        assert_eq!(arr.to_string(), "1,,x");
        assert_eq!(Value::new_object().to_string(), "[object Object]");
        assert_eq!(Value::new_error("TypeError", "bad").to_string(), "TypeError: bad");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_equality() {
        assert!(Value::from("1").loose_equals(&Value::Number(1.0)));
        assert!(!Value::from("1").strict_equals(&Value::Number(1.0)));
        assert!(Value::Boolean(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        let obj = Value::new_object();
        assert!(obj.strict_equals(&obj.clone()));
        assert!(!obj.strict_equals(&Value::new_object()));
    }

    #[test]
    fn test_same_value() {
        let nan = Value::Number(f64::NAN);
        assert!(nan.same_value(&nan));
        assert!(!nan.strict_equals(&nan));
        assert!(!Value::Number(0.0).same_value(&Value::Number(-0.0)));
    }

    #[test]
    fn test_to_primitive_uses_to_string_method() {
        let obj = Value::new_object();
        if let Value::Object(o) = &obj {
            o.borrow_mut().insert(
                "toString",
                NativeFunction::value("toString", |_, _| Ok(Value::from("custom"))),
            );
        }
        let prim = obj.to_primitive(PreferredType::String).unwrap();
        assert_eq!(prim.to_string(), "custom");
    }

    #[test]
    fn test_get_property_on_primitives() {
        assert_eq!(Value::from("abc").get_property("length").to_number(), 3.0);
        assert_eq!(Value::from("abc").get_property("1").to_string(), "b");
        let arr = Value::new_array(vec![Value::Number(7.0)]);
        assert_eq!(arr.get_property("0").to_number(), 7.0);
        assert!(arr.get_property("5").is_undefined());
    }
}
