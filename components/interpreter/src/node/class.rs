//! Class declarations and expressions.

use super::function::fmt_method;
use super::statement::{fmt_block, fmt_lines};
use super::{
    bool_field, fmt_key, list_json, node_field, node_list, opt_json, opt_node_field,
    opt_str_field, property_key, str_field, union, ExprNode, ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::runtime::class::{ClassParts, ClassValue, FieldInit};
use crate::runtime::machine::Machine;
use crate::scope::{DeclarationKind, ObjectScope, Scope, ScopeRef, ScopeType};
use crate::stack::Stack;
use core_types::{Callable, ErrorKind, JsError, JsObject, JsResult, Value};
use serde_json::json;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Kind of a class method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// `constructor(...) {}`
    Constructor,
    /// Plain method
    Method,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

impl MethodKind {
    /// Name used in the JSON form.
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Constructor => "constructor",
            MethodKind::Method => "method",
            MethodKind::Get => "get",
            MethodKind::Set => "set",
        }
    }

    fn from_name(name: &str) -> JsResult<Self> {
        match name {
            "constructor" => Ok(MethodKind::Constructor),
            "method" => Ok(MethodKind::Method),
            "get" => Ok(MethodKind::Get),
            "set" => Ok(MethodKind::Set),
            other => Err(JsError::deserialize(format!("unknown method kind '{}'", other))),
        }
    }
}

/// Static members run once the class value exists.
enum StaticInit {
    Field(String, Option<ExprNode>),
    Block(Vec<ExprNode>),
}

fn member_error(node: &impl fmt::Display) -> JsError {
    JsError::eval(
        ErrorKind::InternalError,
        format!("class member {} evaluated outside its class", node),
    )
}

/// `class Name extends Parent { members }`.
pub struct Class {
    /// Class name
    pub name: Option<String>,
    /// `extends` expression
    pub super_class: Option<ExprNode>,
    /// `MethodDefinition`, `PropertyDefinition` and `StaticBlock` nodes
    pub members: Vec<ExprNode>,
    /// Written as a statement; binds its name in the enclosing scope
    pub declaration: bool,
}

impl Class {
    /// Build the class value. `name` names an anonymous class after the
    /// binding it is assigned to.
    pub fn evaluate(&self, stack: &mut Stack, this: Option<&Value>, name: Option<&str>) -> JsResult<Value> {
        let class_name = self
            .name
            .clone()
            .or_else(|| name.map(str::to_string))
            .unwrap_or_default();
        debug!(class = %class_name, "defining class");

        let parent = match &self.super_class {
            None => None,
            Some(node) => match node.get(stack, this)? {
                Value::Null => None,
                value @ Value::Function(_) => Some(value),
                other => {
                    return Err(JsError::type_error(format!(
                        "Class extends value {} is not a constructor or null",
                        other
                    )))
                }
            },
        };

        let prototype = match &parent {
            Some(Value::Function(parent)) => match parent.prototype() {
                Some(parent_prototype) => JsObject::with_prototype(parent_prototype),
                None => JsObject::new(),
            },
            _ => JsObject::new(),
        }
        .into_ref();
        let statics = JsObject::new().into_ref();

        let mut closure = stack.copy_stack();
        let class_scope: ScopeRef = Rc::new(ObjectScope::new(ScopeType::Class));
        closure.push_scope(class_scope.clone());

        let instance_home = Value::Object(prototype.clone());
        let static_home = parent.clone().unwrap_or(Value::Undefined);
        let mut constructor = None;
        let mut fields = Vec::new();
        let mut static_inits = Vec::new();

        for member in &self.members {
            match &**member {
                Node::MethodDefinition(method) => {
                    let key = property_key(&method.key, method.computed, &mut closure, None)?;
                    let Node::Function(function) = &*method.value else {
                        return Err(member_error(&method.value));
                    };
                    let home = if method.is_static {
                        static_home.clone()
                    } else {
                        instance_home.clone()
                    };
                    if method.kind == MethodKind::Constructor {
                        constructor = Some(function.closure(&mut closure, None, Some(&class_name), Some(home))?);
                        continue;
                    }
                    let value = Value::Function(function.closure(&mut closure, None, Some(&key), Some(home))?);
                    let target = if method.is_static { &statics } else { &prototype };
                    let mut target = target.borrow_mut();
                    match method.kind {
                        MethodKind::Get => target.define_getter(key, value),
                        MethodKind::Set => target.define_setter(key, value),
                        _ => target.insert(key, value),
                    }
                }
                Node::PropertyDefinition(field) => {
                    let key = property_key(&field.key, field.computed, &mut closure, None)?;
                    if field.is_static {
                        static_inits.push(StaticInit::Field(key, field.value.clone()));
                    } else {
                        fields.push(FieldInit {
                            key,
                            value: field.value.clone(),
                        });
                    }
                }
                Node::StaticBlock(block) => static_inits.push(StaticInit::Block(block.body.clone())),
                other => return Err(member_error(other)),
            }
        }

        let class = ClassValue::new(ClassParts {
            name: class_name.clone(),
            parent,
            prototype,
            statics,
            constructor,
            fields,
            closure: closure.copy_stack(),
            source: self.to_string(),
        });
        let class_value = Value::Function(class.clone() as Rc<dyn Callable>);
        if !class_name.is_empty() {
            class_scope.declare(&class_name, class_value.clone(), DeclarationKind::Const)?;
        }

        if !static_inits.is_empty() {
            let mut static_stack = closure.copy_stack();
            static_stack.push_function_scope();
            static_stack.declare_variable("this", class_value.clone(), DeclarationKind::Let)?;
            static_stack.declare_variable("%home%", static_home, DeclarationKind::Let)?;
            for init in static_inits {
                match init {
                    StaticInit::Field(key, value) => {
                        let value = match value {
                            Some(node) => node.get_named(&mut static_stack, Some(&class_value), &key)?,
                            None => Value::Undefined,
                        };
                        class.define_static(key, value);
                    }
                    StaticInit::Block(body) => {
                        let depth = static_stack.depth();
                        static_stack.push_block_scope();
                        let mut machine = Machine::for_body(body, Some(class_value.clone()));
                        let outcome = machine.run_blocking(&mut static_stack);
                        static_stack.clear_to(depth);
                        outcome?;
                    }
                }
            }
        }

        if self.declaration && !class_name.is_empty() {
            stack.declare_variable(&class_name, class_value.clone(), DeclarationKind::Let)?;
        }
        Ok(class_value)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("class")?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if let Some(parent) = &self.super_class {
            write!(f, " extends {}", parent)?;
        }
        if self.members.is_empty() {
            return f.write_str(" {}");
        }
        f.write_str(" {\n")?;
        fmt_lines(f, &self.members, "  ")?;
        f.write_str("}")
    }
}

impl ExpressionNode for Class {
    const TYPE: &'static str = "Class";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.evaluate(stack, this, None)
    }

    fn entry(&self) -> Vec<String> {
        union(self.super_class.iter().chain(&self.members), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(self.super_class.iter().chain(&self.members), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "name": self.name,
            "superClass": opt_json(&self.super_class),
            "members": list_json(&self.members),
            "declaration": self.declaration,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let members = node_list(json, "members", registry)?;
        for member in &members {
            if !matches!(
                **member,
                Node::MethodDefinition(_) | Node::PropertyDefinition(_) | Node::StaticBlock(_)
            ) {
                return Err(JsError::deserialize(format!(
                    "class member expected, found {}",
                    member.type_tag()
                )));
            }
        }
        Ok(Self {
            name: opt_str_field(json, "name"),
            super_class: opt_node_field(json, "superClass", registry)?,
            members,
            declaration: bool_field(json, "declaration"),
        })
    }
}

/// A method, accessor or constructor in a class body.
pub struct MethodDefinition {
    /// Method name
    pub key: ExprNode,
    /// `[key]` form
    pub computed: bool,
    /// `Function` node with the method form
    pub value: ExprNode,
    /// Constructor, method or accessor
    pub kind: MethodKind,
    /// `static`
    pub is_static: bool,
}

impl fmt::Display for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match (self.is_static, self.kind) {
            (true, MethodKind::Get) => "static get ",
            (true, MethodKind::Set) => "static set ",
            (true, _) => "static ",
            (false, MethodKind::Get) => "get ",
            (false, MethodKind::Set) => "set ",
            (false, _) => "",
        };
        fmt_method(f, prefix, &self.key, self.computed, &self.value)
    }
}

impl ExpressionNode for MethodDefinition {
    const TYPE: &'static str = "MethodDefinition";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(member_error(self))
    }

    fn entry(&self) -> Vec<String> {
        self.value.entry()
    }

    fn events(&self) -> Vec<String> {
        self.value.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "key": self.key.to_json(),
            "computed": self.computed,
            "value": self.value.to_json(),
            "kind": self.kind.as_str(),
            "static": self.is_static,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            key: node_field(json, "key", registry)?,
            computed: bool_field(json, "computed"),
            value: node_field(json, "value", registry)?,
            kind: MethodKind::from_name(&str_field(json, "kind")?)?,
            is_static: bool_field(json, "static"),
        })
    }
}

/// A field declaration in a class body.
pub struct PropertyDefinition {
    /// Field name
    pub key: ExprNode,
    /// `[key]` form
    pub computed: bool,
    /// Initializer, evaluated per instance (or once for static fields)
    pub value: Option<ExprNode>,
    /// `static`
    pub is_static: bool,
}

impl fmt::Display for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            f.write_str("static ")?;
        }
        fmt_key(f, &self.key, self.computed)?;
        if let Some(value) = &self.value {
            write!(f, " = {}", value)?;
        }
        Ok(())
    }
}

impl ExpressionNode for PropertyDefinition {
    const TYPE: &'static str = "PropertyDefinition";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(member_error(self))
    }

    fn entry(&self) -> Vec<String> {
        self.value.iter().flat_map(|v| v.entry()).collect()
    }

    fn events(&self) -> Vec<String> {
        self.value.iter().flat_map(|v| v.events()).collect()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "key": self.key.to_json(),
            "computed": self.computed,
            "value": opt_json(&self.value),
            "static": self.is_static,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            key: node_field(json, "key", registry)?,
            computed: bool_field(json, "computed"),
            value: opt_node_field(json, "value", registry)?,
            is_static: bool_field(json, "static"),
        })
    }
}

/// `static { … }`.
pub struct StaticBlock {
    /// Statements, run once with `this` bound to the class
    pub body: Vec<ExprNode>,
}

impl fmt::Display for StaticBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("static ")?;
        fmt_block(f, &self.body)
    }
}

impl ExpressionNode for StaticBlock {
    const TYPE: &'static str = "StaticBlock";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(member_error(self))
    }

    fn entry(&self) -> Vec<String> {
        union(&self.body, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.body, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "body": list_json(&self.body) })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            body: node_list(json, "body", registry)?,
        })
    }
}
