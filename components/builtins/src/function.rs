//! Function.prototype methods

use crate::iterator::collect_iterable;
use core_types::{arg, Callable, FunctionRef, JsError, JsResult, NativeFunction, ObjectRef, Value};
use std::rc::Rc;

/// Function.prototype methods
pub struct FunctionPrototype;

fn this_function(this: &Value, method: &str) -> JsResult<FunctionRef> {
    match this {
        Value::Function(f) => Ok(f.clone()),
        other => Err(JsError::type_error(format!(
            "Function.prototype.{} called on {}",
            method,
            other.type_of()
        ))),
    }
}

/// A function with a fixed `this` and leading arguments.
pub struct BoundFunction {
    target: FunctionRef,
    this: Value,
    args: Vec<Value>,
}

impl BoundFunction {
    /// Bind `target` to `this` and `args`.
    pub fn new(target: FunctionRef, this: Value, args: Vec<Value>) -> Self {
        Self { target, this, args }
    }

    fn full_args(&self, args: Vec<Value>) -> Vec<Value> {
        let mut all = self.args.clone();
        all.extend(args);
        all
    }
}

impl Callable for BoundFunction {
    fn name(&self) -> String {
        format!("bound {}", self.target.name())
    }

    fn call(&self, _this: Value, args: Vec<Value>) -> JsResult<Value> {
        self.target.call(self.this.clone(), self.full_args(args))
    }

    fn construct(&self, args: Vec<Value>) -> JsResult<Value> {
        self.target.construct(self.full_args(args))
    }

    fn prototype(&self) -> Option<ObjectRef> {
        self.target.prototype()
    }

    fn get_static(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(Value::String(self.name())),
            _ => self.target.get_static(key),
        }
    }
}

impl FunctionPrototype {
    /// Look up a Function.prototype method by name.
    pub fn method(name: &str) -> Option<Value> {
        let f = match name {
            "call" => NativeFunction::value(name, |this, args| {
                let f = this_function(this, "call")?;
                let mut args = args.into_iter();
                let receiver = args.next().unwrap_or(Value::Undefined);
                f.call(receiver, args.collect())
            }),
            "apply" => NativeFunction::value(name, |this, args| {
                let f = this_function(this, "apply")?;
                let list = match arg(&args, 1) {
                    Value::Undefined | Value::Null => Vec::new(),
                    list => collect_iterable(&list)?,
                };
                f.call(arg(&args, 0), list)
            }),
            "bind" => NativeFunction::value(name, |this, args| {
                let f = this_function(this, "bind")?;
                let mut args = args.into_iter();
                let receiver = args.next().unwrap_or(Value::Undefined);
                Ok(Value::Function(Rc::new(BoundFunction::new(
                    f,
                    receiver,
                    args.collect(),
                ))))
            }),
            "toString" => NativeFunction::value(name, |this, _| {
                Ok(Value::String(this_function(this, "toString")?.source()))
            }),
            _ => return None,
        };
        Some(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum() -> Value {
        NativeFunction::value("sum", |this, args| {
            let base = if this.is_undefined() { 0.0 } else { this.to_number() };
            Ok(Value::Number(
                base + args.iter().map(Value::to_number).sum::<f64>(),
            ))
        })
    }

    #[test]
    fn test_call_and_apply() {
        let call = FunctionPrototype::method("call").unwrap();
        let result = call
            .call(sum(), vec![Value::Number(10.0), Value::Number(1.0), Value::Number(2.0)])
            .unwrap();
        assert_eq!(result.to_number(), 13.0);

        let apply = FunctionPrototype::method("apply").unwrap();
        let list = Value::new_array(vec![Value::Number(5.0)]);
        let result = apply.call(sum(), vec![Value::Number(1.0), list]).unwrap();
        assert_eq!(result.to_number(), 6.0);
    }

    #[test]
    fn test_bind_prepends_arguments() {
        let bind = FunctionPrototype::method("bind").unwrap();
        let bound = bind
            .call(sum(), vec![Value::Number(100.0), Value::Number(1.0)])
            .unwrap();
        let result = bound.call(Value::Undefined, vec![Value::Number(2.0)]).unwrap();
        assert_eq!(result.to_number(), 103.0);
        assert_eq!(bound.get_property("name").to_string(), "bound sum");
    }

    #[test]
    fn test_call_on_non_function() {
        let call = FunctionPrototype::method("call").unwrap();
        assert!(call.call(Value::Number(1.0), vec![]).is_err());
    }
}
