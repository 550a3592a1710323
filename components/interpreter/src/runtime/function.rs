//! Script functions.
//!
//! A [`FunctionDef`] is the immutable part of a function literal shared by
//! every closure created from it. [`ScriptFunction`] pairs a definition
//! with the stack captured where the literal was evaluated.

use crate::node::{fmt_list, Node, ReturnStatement};
use crate::runtime::driver;
use crate::runtime::machine::Machine;
use crate::node::{Completion, ExprNode};
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use core_types::{Callable, JsError, JsObject, JsResult, ObjectRef, Value};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Nested script calls allowed per thread unless changed with
/// [`set_max_call_depth`].
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
    static MAX_CALL_DEPTH: Cell<usize> = const { Cell::new(DEFAULT_MAX_CALL_DEPTH) };
}

/// Change how many script calls may be nested on the current thread.
///
/// Every call uses native stack, so the limit has to fit the thread it runs
/// on; the `expr` binary raises it on a thread with a large stack.
pub fn set_max_call_depth(limit: usize) {
    MAX_CALL_DEPTH.with(|max| max.set(limit));
}

/// The call depth limit of the current thread.
pub fn max_call_depth() -> usize {
    MAX_CALL_DEPTH.with(Cell::get)
}

/// One active script call.
struct CallGuard;

impl CallGuard {
    fn enter(name: &str) -> JsResult<Self> {
        let depth = CALL_DEPTH.with(Cell::get) + 1;
        if depth > max_call_depth() {
            debug!(name, depth, "call depth exceeded");
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        CALL_DEPTH.with(|current| current.set(depth));
        Ok(CallGuard)
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// How a function literal was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionForm {
    /// `function f() {}` as a statement
    Declaration,
    /// `function () {}` in expression position
    Expression,
    /// `() => {}`
    Arrow,
    /// Object or class method
    Method,
}

impl FunctionForm {
    /// Name used in the JSON form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionForm::Declaration => "declaration",
            FunctionForm::Expression => "expression",
            FunctionForm::Arrow => "arrow",
            FunctionForm::Method => "method",
        }
    }

    /// Parse the JSON name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "declaration" => Some(FunctionForm::Declaration),
            "expression" => Some(FunctionForm::Expression),
            "arrow" => Some(FunctionForm::Arrow),
            "method" => Some(FunctionForm::Method),
            _ => None,
        }
    }
}

/// The static part of a function literal.
pub struct FunctionDef {
    /// Declared name, empty when anonymous
    pub name: String,
    /// Parameter patterns
    pub params: Vec<ExprNode>,
    /// `BlockStatement`, or an expression for concise arrow bodies
    pub body: ExprNode,
    /// Syntactic form
    pub form: FunctionForm,
    /// `async`
    pub is_async: bool,
    /// `function*`
    pub is_generator: bool,
}

impl FunctionDef {
    /// True when the body is an expression rather than a block.
    pub fn has_expression_body(&self) -> bool {
        !matches!(*self.body, Node::BlockStatement(_))
    }

    /// Statements of the body. A concise body becomes a single `return`.
    pub fn statements(&self) -> Vec<ExprNode> {
        match &*self.body {
            Node::BlockStatement(block) => block.body.clone(),
            _ => vec![Node::new(ReturnStatement {
                argument: Some(self.body.clone()),
            })],
        }
    }

    /// Number of parameters before the first default or rest parameter.
    pub fn length(&self) -> usize {
        self.params
            .iter()
            .take_while(|param| {
                !matches!(***param, Node::AssignmentPattern(_) | Node::RestElement(_))
            })
            .count()
    }

    /// Write `(params) body`.
    pub(crate) fn fmt_signature(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        fmt_list(f, &self.params, ", ")?;
        write!(f, ") {}", self.body)
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_async {
            f.write_str("async ")?;
        }
        match self.form {
            FunctionForm::Arrow => {
                f.write_str("(")?;
                fmt_list(f, &self.params, ", ")?;
                f.write_str(") => ")?;
                if matches!(*self.body, Node::ObjectExpression(_)) {
                    write!(f, "({})", self.body)
                } else {
                    write!(f, "{}", self.body)
                }
            }
            FunctionForm::Method => {
                if self.is_generator {
                    f.write_str("*")?;
                }
                f.write_str(&self.name)?;
                self.fmt_signature(f)
            }
            FunctionForm::Declaration | FunctionForm::Expression => {
                f.write_str("function")?;
                if self.is_generator {
                    f.write_str("*")?;
                }
                if !self.name.is_empty() {
                    write!(f, " {}", self.name)?;
                }
                self.fmt_signature(f)
            }
        }
    }
}

/// A closure over a [`FunctionDef`].
pub struct ScriptFunction {
    def: Rc<FunctionDef>,
    name: String,
    closure: Stack,
    lexical_this: Option<Value>,
    home: Option<Value>,
    this_ref: Weak<ScriptFunction>,
    prototype: RefCell<Option<ObjectRef>>,
    statics: RefCell<IndexMap<String, Value>>,
}

impl ScriptFunction {
    /// Create a closure.
    ///
    /// `lexical_this` is the `this` seen by arrow functions created outside
    /// any function body. `home` is the object `super` resolves against in
    /// methods.
    pub fn new(
        def: Rc<FunctionDef>,
        name: impl Into<String>,
        closure: Stack,
        lexical_this: Option<Value>,
        home: Option<Value>,
    ) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this_ref| Self {
            def,
            name,
            closure,
            lexical_this,
            home,
            this_ref: this_ref.clone(),
            prototype: RefCell::new(None),
            statics: RefCell::new(IndexMap::new()),
        })
    }

    /// The shared definition.
    pub fn def(&self) -> &Rc<FunctionDef> {
        &self.def
    }

    fn is_constructor(&self) -> bool {
        matches!(
            self.def.form,
            FunctionForm::Declaration | FunctionForm::Expression
        ) && !self.def.is_async
            && !self.def.is_generator
    }

    /// Run the body with `this`, `args` and extra hidden bindings.
    pub(crate) fn invoke(
        &self,
        this: Value,
        args: Vec<Value>,
        bindings: Vec<(&'static str, Value)>,
    ) -> JsResult<Value> {
        trace!(name = %self.name, args = args.len(), "invoke");
        let _call = CallGuard::enter(&self.name)?;
        let mut stack = self.closure.copy_stack();
        stack.push_function_scope();
        let arrow = self.def.form == FunctionForm::Arrow;
        let this = if arrow {
            self.lexical_this.clone().unwrap_or(Value::Undefined)
        } else {
            stack.declare_variable("this", this.clone(), DeclarationKind::Let)?;
            stack.declare_variable(
                "arguments",
                Value::new_array(args.clone()),
                DeclarationKind::Var,
            )?;
            this
        };
        if let Some(home) = &self.home {
            stack.declare_variable("%home%", home.clone(), DeclarationKind::Let)?;
        }
        for (key, value) in bindings {
            stack.declare_variable(key, value, DeclarationKind::Let)?;
        }
        self.bind_params(&mut stack, args)?;

        let this_for_body = if arrow && self.lexical_this.is_none() {
            None
        } else {
            Some(this)
        };
        match (self.def.is_async, self.def.is_generator) {
            (false, true) => Ok(driver::generator_object(
                Machine::for_body(self.def.statements(), this_for_body),
                stack,
            )),
            (true, false) => Ok(driver::run_async(
                Machine::for_body(self.def.statements(), this_for_body).suspending(),
                stack,
            )),
            (true, true) => Ok(driver::async_generator_object(
                Machine::for_body(self.def.statements(), this_for_body).suspending(),
                stack,
            )),
            (false, false) if self.def.has_expression_body() => {
                self.def.body.get(&mut stack, this_for_body.as_ref())
            }
            (false, false) => {
                let mut machine = Machine::for_body(self.def.statements(), this_for_body);
                Ok(match machine.run_blocking(&mut stack)? {
                    Completion::Return(value) => value,
                    _ => Value::Undefined,
                })
            }
        }
    }

    fn bind_params(&self, stack: &mut Stack, args: Vec<Value>) -> JsResult<()> {
        for (index, param) in self.def.params.iter().enumerate() {
            match &**param {
                Node::RestElement(rest) => {
                    let remaining = args.get(index..).map(<[Value]>::to_vec).unwrap_or_default();
                    rest.argument
                        .declare(stack, Value::new_array(remaining), DeclarationKind::Let)?;
                }
                _ => {
                    let value = args.get(index).cloned().unwrap_or(Value::Undefined);
                    param.declare(stack, value, DeclarationKind::Let)?;
                }
            }
        }
        Ok(())
    }

    fn prototype_object(&self) -> ObjectRef {
        if let Some(prototype) = self.prototype.borrow().as_ref() {
            return prototype.clone();
        }
        let mut object = JsObject::new();
        if let Some(this) = self.this_ref.upgrade() {
            object.insert("constructor", Value::Function(this));
        }
        let prototype = object.into_ref();
        *self.prototype.borrow_mut() = Some(prototype.clone());
        prototype
    }
}

impl Callable for ScriptFunction {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn call(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        self.invoke(this, args, Vec::new())
    }

    fn construct(&self, args: Vec<Value>) -> JsResult<Value> {
        if !self.is_constructor() {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                if self.name.is_empty() { "anonymous" } else { &self.name }
            )));
        }
        let instance = Value::Object(JsObject::with_prototype(self.prototype_object()).into_ref());
        self.construct_with_this(instance, args)
    }

    fn construct_with_this(&self, this: Value, args: Vec<Value>) -> JsResult<Value> {
        let result = self.invoke(this.clone(), args, Vec::new())?;
        Ok(match result {
            Value::Object(_) | Value::Array(_) | Value::Function(_) => result,
            _ => this,
        })
    }

    fn prototype(&self) -> Option<ObjectRef> {
        if self.is_constructor() {
            Some(self.prototype_object())
        } else {
            self.prototype.borrow().clone()
        }
    }

    fn get_static(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.statics.borrow().get(key) {
            return Some(value.clone());
        }
        match key {
            "name" => Some(Value::String(self.name.clone())),
            "length" => Some(Value::from(self.def.length())),
            _ => None,
        }
    }

    fn set_static(&self, key: &str, value: Value) -> bool {
        if key == "prototype" {
            if let Value::Object(object) = value {
                *self.prototype.borrow_mut() = Some(object);
            }
            return true;
        }
        self.statics.borrow_mut().insert(key.to_string(), value);
        true
    }

    fn source(&self) -> String {
        self.def.to_string()
    }
}
