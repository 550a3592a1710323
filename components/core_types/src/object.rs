//! Ordinary objects: ordered property maps with an optional prototype.
//!
//! Objects are shared through [`ObjectRef`] handles so that mutations are
//! visible to every holder, mirroring reference semantics of the language.

use crate::{JsResult, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to an object.
pub type ObjectRef = Rc<RefCell<JsObject>>;

/// Shared handle to an array's element list.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A single property slot.
#[derive(Debug, Clone)]
pub enum Property {
    /// Plain value property
    Data(Value),
    /// Getter/setter pair; either side may be missing
    Accessor {
        /// Function called on read
        getter: Option<Value>,
        /// Function called on write
        setter: Option<Value>,
    },
}

/// An object: insertion-ordered properties plus a prototype link.
#[derive(Debug, Default)]
pub struct JsObject {
    /// Own properties in insertion order
    pub properties: IndexMap<String, Property>,
    /// Prototype consulted when an own property is missing
    pub prototype: Option<ObjectRef>,
    /// Set for error objects and class instances, used by `toString`
    pub class_name: Option<String>,
}

impl JsObject {
    /// Create an empty object without a prototype.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object inheriting from `prototype`.
    pub fn with_prototype(prototype: ObjectRef) -> Self {
        Self {
            prototype: Some(prototype),
            ..Self::default()
        }
    }

    /// Wrap this object into a shared handle.
    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Read an own data property, ignoring accessors and the prototype.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match self.properties.get(key) {
            Some(Property::Data(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Define or overwrite an own data property.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), Property::Data(value));
    }

    /// Define a getter, keeping an existing setter for the same key.
    pub fn define_getter(&mut self, key: impl Into<String>, getter: Value) {
        let key = key.into();
        let setter = match self.properties.get(&key) {
            Some(Property::Accessor { setter, .. }) => setter.clone(),
            _ => None,
        };
        self.properties.insert(
            key,
            Property::Accessor {
                getter: Some(getter),
                setter,
            },
        );
    }

    /// Define a setter, keeping an existing getter for the same key.
    pub fn define_setter(&mut self, key: impl Into<String>, setter: Value) {
        let key = key.into();
        let getter = match self.properties.get(&key) {
            Some(Property::Accessor { getter, .. }) => getter.clone(),
            _ => None,
        };
        self.properties.insert(
            key,
            Property::Accessor {
                getter,
                setter: Some(setter),
            },
        );
    }

    /// Own enumerable keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Remove an own property, preserving the order of the others.
    pub fn remove(&mut self, key: &str) -> bool {
        self.properties.shift_remove(key).is_some()
    }
}

/// Find the property slot for `key` on `object` or its prototype chain.
pub fn lookup_property(object: &ObjectRef, key: &str) -> Option<Property> {
    let mut current = Some(object.clone());
    while let Some(obj) = current {
        let borrowed = obj.borrow();
        if let Some(property) = borrowed.properties.get(key) {
            return Some(property.clone());
        }
        current = borrowed.prototype.clone();
    }
    None
}

/// `[[Get]]`: read `key`, running a getter with `receiver` as `this`.
pub fn object_get(object: &ObjectRef, key: &str, receiver: &Value) -> JsResult<Value> {
    match lookup_property(object, key) {
        Some(Property::Data(value)) => Ok(value),
        Some(Property::Accessor {
            getter: Some(getter),
            ..
        }) => getter.call(receiver.clone(), Vec::new()),
        _ => Ok(Value::Undefined),
    }
}

/// `[[Set]]`: write `key`, running an inherited or own setter when present.
pub fn object_set(object: &ObjectRef, key: &str, value: Value, receiver: &Value) -> JsResult<()> {
    if let Some(Property::Accessor { setter, .. }) = lookup_property(object, key) {
        if let Some(setter) = setter {
            setter.call(receiver.clone(), vec![value])?;
        }
        return Ok(());
    }
    object.borrow_mut().insert(key, value);
    Ok(())
}

/// `HasProperty`: own property or inherited.
pub fn object_has(object: &ObjectRef, key: &str) -> bool {
    lookup_property(object, key).is_some()
}

/// True if `prototype` appears on the prototype chain of `object`.
pub fn inherits_from(object: &ObjectRef, prototype: &ObjectRef) -> bool {
    let mut current = object.borrow().prototype.clone();
    while let Some(proto) = current {
        if Rc::ptr_eq(&proto, prototype) {
            return true;
        }
        current = proto.borrow().prototype.clone();
    }
    false
}
