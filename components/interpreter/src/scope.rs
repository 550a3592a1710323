//! Variable environments.
//!
//! A scope maps names to values through a single context object. Writes go
//! straight to that object, so a host can hand its own data object to a
//! scope and see script assignments reflected in it.

use crate::reactive::ReactiveScope;
use core_types::{object_get, object_has, object_set, JsError, JsObject, JsResult, ObjectRef, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a scope.
pub type ScopeRef = Rc<dyn Scope>;

/// Which construct created a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeType {
    /// `{ … }` blocks, loop iterations, `catch` clauses
    Block,
    /// Function bodies; target of `var` declarations
    Function,
    /// Class bodies
    Class,
    /// Top level of a program
    Module,
    /// The read-only builtins scope
    Global,
}

impl ScopeType {
    /// True if `var` declarations land in scopes of this type.
    pub fn is_var_target(&self) -> bool {
        matches!(self, ScopeType::Function | ScopeType::Module | ScopeType::Global)
    }
}

/// Binding form used by a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

impl DeclarationKind {
    /// Source keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Var => "var",
            DeclarationKind::Let => "let",
            DeclarationKind::Const => "const",
        }
    }

    /// Parse a source keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "var" => Some(DeclarationKind::Var),
            "let" => Some(DeclarationKind::Let),
            "const" => Some(DeclarationKind::Const),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key-value environment bound to one context object.
pub trait Scope {
    /// Read `key`; missing keys read as `undefined`.
    fn get(&self, key: &str) -> JsResult<Value>;

    /// Write `key`, creating it when missing.
    fn set(&self, key: &str, value: Value) -> JsResult<()>;

    /// True if `key` is defined on the context object or its prototype.
    fn has(&self, key: &str) -> bool;

    /// Remove `key`.
    fn delete(&self, key: &str) -> JsResult<bool>;

    /// Define `key` in this scope.
    fn declare(&self, key: &str, value: Value, kind: DeclarationKind) -> JsResult<()>;

    /// The object holding this scope's bindings.
    fn context(&self) -> ObjectRef;

    /// Construct that created this scope.
    fn scope_type(&self) -> ScopeType;

    /// Child scope over the object stored at `key`, created on first use
    /// and cached while the property keeps pointing at the same object.
    fn inner_scope(&self, key: &str) -> JsResult<Option<ScopeRef>>;

    /// Downcast used by hosts that subscribe through a stack.
    fn as_reactive(&self) -> Option<&ReactiveScope> {
        None
    }
}

/// Cache of child scopes keyed by property name.
#[derive(Default)]
pub(crate) struct ChildScopes {
    entries: RefCell<HashMap<String, (ObjectRef, ScopeRef)>>,
}

impl ChildScopes {
    pub(crate) fn get_or_insert(
        &self,
        key: &str,
        object: &ObjectRef,
        create: impl FnOnce() -> ScopeRef,
    ) -> ScopeRef {
        if let Some((cached, scope)) = self.entries.borrow().get(key) {
            if Rc::ptr_eq(cached, object) {
                return scope.clone();
            }
        }
        let scope = create();
        self.entries
            .borrow_mut()
            .insert(key.to_string(), (object.clone(), scope.clone()));
        scope
    }

    pub(crate) fn scopes(&self) -> Vec<(String, ScopeRef)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, (_, scope))| (key.clone(), scope.clone()))
            .collect()
    }
}

/// Plain scope over a context object.
///
/// # Examples
///
/// ```
/// use interpreter::{DeclarationKind, ObjectScope, Scope, ScopeType};
/// use core_types::Value;
///
/// let scope = ObjectScope::new(ScopeType::Block);
/// scope.declare("x", Value::Number(1.0), DeclarationKind::Let).unwrap();
/// assert!(scope.has("x"));
/// assert_eq!(scope.get("x").unwrap().to_number(), 1.0);
/// assert!(scope.get("missing").unwrap().is_undefined());
/// ```
pub struct ObjectScope {
    context: ObjectRef,
    scope_type: ScopeType,
    constants: RefCell<HashSet<String>>,
    children: ChildScopes,
}

impl ObjectScope {
    /// Scope over a fresh, empty context object.
    pub fn new(scope_type: ScopeType) -> Self {
        Self::with_context(JsObject::new().into_ref(), scope_type)
    }

    /// Scope over a caller-supplied context object.
    pub fn with_context(context: ObjectRef, scope_type: ScopeType) -> Self {
        Self {
            context,
            scope_type,
            constants: RefCell::new(HashSet::new()),
            children: ChildScopes::default(),
        }
    }

    pub(crate) fn check_writable(&self, key: &str) -> JsResult<()> {
        if self.constants.borrow().contains(key) {
            return Err(JsError::type_error("Assignment to constant variable."));
        }
        Ok(())
    }
}

impl Scope for ObjectScope {
    fn get(&self, key: &str) -> JsResult<Value> {
        object_get(&self.context, key, &Value::Object(self.context.clone()))
    }

    fn set(&self, key: &str, value: Value) -> JsResult<()> {
        self.check_writable(key)?;
        object_set(&self.context, key, value, &Value::Object(self.context.clone()))
    }

    fn has(&self, key: &str) -> bool {
        object_has(&self.context, key)
    }

    fn delete(&self, key: &str) -> JsResult<bool> {
        self.check_writable(key)?;
        Ok(self.context.borrow_mut().remove(key))
    }

    fn declare(&self, key: &str, value: Value, kind: DeclarationKind) -> JsResult<()> {
        {
            let mut constants = self.constants.borrow_mut();
            if kind == DeclarationKind::Const {
                constants.insert(key.to_string());
            } else {
                constants.remove(key);
            }
        }
        self.context.borrow_mut().insert(key, value);
        Ok(())
    }

    fn context(&self) -> ObjectRef {
        self.context.clone()
    }

    fn scope_type(&self) -> ScopeType {
        self.scope_type
    }

    fn inner_scope(&self, key: &str) -> JsResult<Option<ScopeRef>> {
        match self.get(key)? {
            Value::Object(object) => Ok(Some(self.children.get_or_insert(key, &object, || {
                Rc::new(ObjectScope::with_context(object.clone(), ScopeType::Block))
            }))),
            _ => Ok(None),
        }
    }
}

/// Scope that rejects every write; holds the builtins.
pub struct ReadOnlyScope {
    inner: ObjectScope,
}

impl ReadOnlyScope {
    /// Wrap an existing context object.
    pub fn new(context: ObjectRef) -> Self {
        Self {
            inner: ObjectScope::with_context(context, ScopeType::Global),
        }
    }

    /// Read-only scope holding a fresh set of builtins.
    pub fn globals() -> Self {
        Self::new(builtins::global_object())
    }

    fn read_only(key: &str) -> JsError {
        JsError::type_error(format!("Cannot assign to read only global '{}'", key))
    }
}

impl Scope for ReadOnlyScope {
    fn get(&self, key: &str) -> JsResult<Value> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, _value: Value) -> JsResult<()> {
        Err(Self::read_only(key))
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    fn delete(&self, key: &str) -> JsResult<bool> {
        Err(Self::read_only(key))
    }

    fn declare(&self, key: &str, _value: Value, _kind: DeclarationKind) -> JsResult<()> {
        Err(Self::read_only(key))
    }

    fn context(&self) -> ObjectRef {
        self.inner.context()
    }

    fn scope_type(&self) -> ScopeType {
        ScopeType::Global
    }

    fn inner_scope(&self, _key: &str) -> JsResult<Option<ScopeRef>> {
        // Builtin namespaces are mutated through member access, never
        // through a child scope.
        Ok(None)
    }
}
