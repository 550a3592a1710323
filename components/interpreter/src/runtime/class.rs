//! Class values.
//!
//! A class is a callable that only works with `new`. Instances get the
//! class prototype; instance fields are initialized either before the
//! constructor body (base classes) or right after `super(...)` returns
//! (derived classes). The constructor body reaches the field initializer
//! and the parent class through the hidden `%fields%` and `%parent%`
//! bindings used by `super(...)`.

use crate::node::ExprNode;
use crate::runtime::function::ScriptFunction;
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use core_types::{object_get, Callable, JsError, JsObject, JsResult, NativeFunction, ObjectRef, Value};
use std::rc::{Rc, Weak};
use tracing::trace;

/// An instance field: key and optional initializer.
pub struct FieldInit {
    /// Property key, already evaluated for computed keys
    pub key: String,
    /// Initializer expression
    pub value: Option<ExprNode>,
}

/// Parts of a class collected while evaluating its body.
pub struct ClassParts {
    /// Class name, empty for anonymous classes
    pub name: String,
    /// Evaluated `extends` value
    pub parent: Option<Value>,
    /// Instance prototype
    pub prototype: ObjectRef,
    /// Static members
    pub statics: ObjectRef,
    /// Explicit constructor
    pub constructor: Option<Rc<ScriptFunction>>,
    /// Instance fields in declaration order
    pub fields: Vec<FieldInit>,
    /// Stack the class body closes over
    pub closure: Stack,
    /// Source text
    pub source: String,
}

/// A class created by a class declaration or expression.
pub struct ClassValue {
    name: String,
    parent: Option<Value>,
    prototype: ObjectRef,
    statics: ObjectRef,
    constructor: Option<Rc<ScriptFunction>>,
    fields: Vec<FieldInit>,
    closure: Stack,
    source: String,
    this_ref: Weak<ClassValue>,
}

impl ClassValue {
    /// Build the class and link `prototype.constructor` back to it.
    pub fn new(parts: ClassParts) -> Rc<Self> {
        let class = Rc::new_cyclic(|this_ref| Self {
            name: parts.name,
            parent: parts.parent,
            prototype: parts.prototype,
            statics: parts.statics,
            constructor: parts.constructor,
            fields: parts.fields,
            closure: parts.closure,
            source: parts.source,
            this_ref: this_ref.clone(),
        });
        let value: Rc<dyn Callable> = class.clone();
        class
            .prototype
            .borrow_mut()
            .insert("constructor", Value::Function(value));
        class
    }

    /// The `extends` value, if any.
    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_ref()
    }

    /// Store a static member.
    pub fn define_static(&self, key: impl Into<String>, value: Value) {
        self.statics.borrow_mut().insert(key, value);
    }

    /// Run the instance field initializers against `this`.
    pub fn initialize_fields(&self, this: &Value) -> JsResult<()> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let mut stack = self.closure.copy_stack();
        stack.push_function_scope();
        stack.declare_variable("this", this.clone(), DeclarationKind::Let)?;
        stack.declare_variable(
            "%home%",
            Value::Object(self.prototype.clone()),
            DeclarationKind::Let,
        )?;
        for field in &self.fields {
            let value = match &field.value {
                Some(init) => init.get_named(&mut stack, Some(this), &field.key)?,
                None => Value::Undefined,
            };
            match this {
                Value::Object(object) => object.borrow_mut().insert(field.key.clone(), value),
                other => builtins::set_member(other, &field.key, value)?,
            }
        }
        Ok(())
    }

    fn fields_initializer(&self) -> Value {
        let class = self.this_ref.clone();
        NativeFunction::value("%fields%", move |this, _args| {
            if let Some(class) = class.upgrade() {
                class.initialize_fields(this)?;
            }
            Ok(Value::Undefined)
        })
    }
}

fn is_object_like(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_) | Value::Function(_))
}

impl Callable for ClassValue {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn call(&self, _this: Value, _args: Vec<Value>) -> JsResult<Value> {
        Err(JsError::type_error(format!(
            "Class constructor {} cannot be invoked without 'new'",
            self.name
        )))
    }

    fn construct(&self, args: Vec<Value>) -> JsResult<Value> {
        trace!(class = %self.name, "construct");
        let instance = Value::Object(JsObject::with_prototype(self.prototype.clone()).into_ref());
        self.construct_with_this(instance, args)
    }

    fn construct_with_this(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        let Some(constructor) = &self.constructor else {
            let this = match &self.parent {
                Some(Value::Function(parent)) => parent.construct_with_this(this, args)?,
                _ => this,
            };
            self.initialize_fields(&this)?;
            return Ok(this);
        };
        if self.parent.is_none() {
            self.initialize_fields(&this)?;
        }
        let bindings = vec![
            ("%fields%", self.fields_initializer()),
            ("%parent%", self.parent.clone().unwrap_or(Value::Undefined)),
        ];
        let result = constructor.invoke(this.clone(), args, bindings)?;
        Ok(if is_object_like(&result) { result } else { this })
    }

    fn prototype(&self) -> Option<ObjectRef> {
        Some(self.prototype.clone())
    }

    fn get_static(&self, key: &str) -> Option<Value> {
        if self.statics.borrow().properties.contains_key(key) {
            let receiver = self
                .this_ref
                .upgrade()
                .map(|class| Value::Function(class as Rc<dyn Callable>))
                .unwrap_or(Value::Undefined);
            return object_get(&self.statics, key, &receiver).ok();
        }
        if key == "name" {
            return Some(Value::String(self.name.clone()));
        }
        match &self.parent {
            Some(Value::Function(parent)) => parent.get_static(key),
            _ => None,
        }
    }

    fn set_static(&self, key: &str, value: Value) -> bool {
        self.statics.borrow_mut().insert(key, value);
        true
    }

    fn source(&self) -> String {
        self.source.clone()
    }
}
