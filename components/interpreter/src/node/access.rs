//! Member access, calls, `new` and `super`.

use super::{
    bool_field, evaluate_arguments, fmt_list, list_json, node_field, node_list, property_key,
    union, ExprNode, ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::stack::Stack;
use builtins::{delete_member, get_member, set_member};
use core_types::{object_get, JsError, JsResult, Value};
use serde_json::json;
use std::fmt;
use std::rc::Rc;

/// Evaluate a link of an optional chain. `None` means an earlier `?.`
/// found a nullish value and the rest of the chain is skipped.
fn chain_value(node: &Node, stack: &mut Stack, this: Option<&Value>) -> JsResult<Option<Value>> {
    match node {
        Node::MemberExpression(member) => member.chain_get(stack, this),
        Node::CallExpression(call) => call.chain_call(stack, this),
        other => other.get(stack, this).map(Some),
    }
}

fn current_this(stack: &Stack, this: Option<&Value>) -> JsResult<Value> {
    if stack.has("this") {
        stack.get("this")
    } else {
        Ok(this.cloned().unwrap_or(Value::Undefined))
    }
}

/// Evaluate a callee together with the `this` value for the call:
/// the object for member callees, `undefined` otherwise.
pub(crate) fn resolve_callee(
    callee: &Node,
    stack: &mut Stack,
    this: Option<&Value>,
) -> JsResult<(Value, Value)> {
    match callee {
        Node::MemberExpression(member) => {
            let object = member.object.get(stack, this)?;
            let key = property_key(&member.property, member.computed, stack, this)?;
            Ok((get_member(&object, &key)?, object))
        }
        Node::SuperMember(member) => {
            let function = member.get(stack, this)?;
            Ok((function, current_this(stack, this)?))
        }
        other => Ok((other.get(stack, this)?, Value::Undefined)),
    }
}

/// `object.property`, `object[property]`, `object?.property`.
pub struct MemberExpression {
    /// Object expression
    pub object: ExprNode,
    /// Identifier for `a.b`, any expression for `a[b]`
    pub property: ExprNode,
    /// `a[b]` form
    pub computed: bool,
    /// `?.` form
    pub optional: bool,
}

impl MemberExpression {
    fn reference(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Option<(Value, String)>> {
        let Some(object) = chain_value(&self.object, stack, this)? else {
            return Ok(None);
        };
        if self.optional && object.is_nullish() {
            return Ok(None);
        }
        let key = property_key(&self.property, self.computed, stack, this)?;
        Ok(Some((object, key)))
    }

    fn chain_get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Option<Value>> {
        match self.reference(stack, this)? {
            Some((object, key)) => get_member(&object, &key).map(Some),
            None => Ok(None),
        }
    }

    /// Scope tracking `object` when the object expression is a plain
    /// variable path, so writes reach reactive subscribers.
    fn tracking_scope(&self, stack: &Stack, object: &Value) -> JsResult<Option<crate::scope::ScopeRef>> {
        let (Some(path), Value::Object(target)) = (self.object.path(), object) else {
            return Ok(None);
        };
        Ok(stack
            .scope_for_path(&path)?
            .filter(|scope| Rc::ptr_eq(&scope.context(), target)))
    }

    /// `delete object.property`.
    pub(crate) fn delete(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<bool> {
        let Some((object, key)) = self.reference(stack, this)? else {
            return Ok(true);
        };
        match self.tracking_scope(stack, &object)? {
            Some(scope) => scope.delete(&key),
            None => delete_member(&object, &key),
        }
    }
}

impl fmt::Display for MemberExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object)?;
        match (self.computed, self.optional) {
            (true, true) => write!(f, "?.[{}]", self.property),
            (true, false) => write!(f, "[{}]", self.property),
            (false, true) => write!(f, "?.{}", self.property),
            (false, false) => write!(f, ".{}", self.property),
        }
    }
}

impl ExpressionNode for MemberExpression {
    const TYPE: &'static str = "MemberExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(self.chain_get(stack, this)?.unwrap_or(Value::Undefined))
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        if self.optional {
            return Err(JsError::not_assignable(self));
        }
        let object = self.object.get(stack, None)?;
        let key = property_key(&self.property, self.computed, stack, None)?;
        match self.tracking_scope(stack, &object)? {
            Some(scope) => scope.set(&key, value),
            None => set_member(&object, &key, value),
        }
    }

    fn declare(&self, stack: &mut Stack, value: Value, _kind: crate::scope::DeclarationKind) -> JsResult<()> {
        // Destructuring targets such as `[obj.a] = list` assign through.
        self.set(stack, value)
    }

    fn entry(&self) -> Vec<String> {
        if self.computed {
            union([&self.object, &self.property], Node::entry)
        } else {
            self.object.entry()
        }
    }

    fn events(&self) -> Vec<String> {
        if self.computed {
            return union([&self.object, &self.property], Node::events);
        }
        match self.object.path() {
            Some(mut path) => {
                if let Some(name) = self.property.as_identifier() {
                    path.push(name.to_string());
                }
                vec![path.join(".")]
            }
            None => self.object.events(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "object": self.object.to_json(),
            "property": self.property.to_json(),
            "computed": self.computed,
            "optional": self.optional,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            object: node_field(json, "object", registry)?,
            property: node_field(json, "property", registry)?,
            computed: bool_field(json, "computed"),
            optional: bool_field(json, "optional"),
        })
    }
}

/// `callee(args)` and `callee?.(args)`.
pub struct CallExpression {
    /// Function expression
    pub callee: ExprNode,
    /// Arguments, possibly including spread elements
    pub arguments: Vec<ExprNode>,
    /// `?.()` form
    pub optional: bool,
}

impl CallExpression {
    fn chain_call(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Option<Value>> {
        let (callee, receiver) = match &*self.callee {
            Node::MemberExpression(member) => match member.reference(stack, this)? {
                Some((object, key)) => (get_member(&object, &key)?, object),
                None => return Ok(None),
            },
            Node::SuperMember(_) => resolve_callee(&self.callee, stack, this)?,
            other => match chain_value(other, stack, this)? {
                Some(callee) => (callee, Value::Undefined),
                None => return Ok(None),
            },
        };
        if self.optional && callee.is_nullish() {
            return Ok(None);
        }
        let args = evaluate_arguments(&self.arguments, stack, this)?;
        match callee {
            Value::Function(function) => function.call(receiver, args).map(Some),
            _ => Err(JsError::not_callable(&self.callee)),
        }
    }
}

impl fmt::Display for CallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}(", self.callee, if self.optional { "?." } else { "" })?;
        fmt_list(f, &self.arguments, ", ")?;
        f.write_str(")")
    }
}

impl ExpressionNode for CallExpression {
    const TYPE: &'static str = "CallExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(self.chain_call(stack, this)?.unwrap_or(Value::Undefined))
    }

    fn entry(&self) -> Vec<String> {
        union(std::iter::once(&self.callee).chain(&self.arguments), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(std::iter::once(&self.callee).chain(&self.arguments), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "callee": self.callee.to_json(),
            "arguments": list_json(&self.arguments),
            "optional": self.optional,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            callee: node_field(json, "callee", registry)?,
            arguments: node_list(json, "arguments", registry)?,
            optional: bool_field(json, "optional"),
        })
    }
}

/// `new Callee(args)`.
pub struct NewExpression {
    /// Constructor expression
    pub callee: ExprNode,
    /// Arguments
    pub arguments: Vec<ExprNode>,
}

impl fmt::Display for NewExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new {}(", self.callee)?;
        fmt_list(f, &self.arguments, ", ")?;
        f.write_str(")")
    }
}

impl ExpressionNode for NewExpression {
    const TYPE: &'static str = "NewExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let callee = self.callee.get(stack, this)?;
        let args = evaluate_arguments(&self.arguments, stack, this)?;
        match callee {
            Value::Function(function) => function.construct(args),
            _ => Err(JsError::type_error(format!("{} is not a constructor", self.callee))),
        }
    }

    fn entry(&self) -> Vec<String> {
        union(std::iter::once(&self.callee).chain(&self.arguments), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(std::iter::once(&self.callee).chain(&self.arguments), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "callee": self.callee.to_json(),
            "arguments": list_json(&self.arguments),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            callee: node_field(json, "callee", registry)?,
            arguments: node_list(json, "arguments", registry)?,
        })
    }
}

fn super_outside_class() -> JsError {
    JsError::Throw(Value::new_error(
        "SyntaxError",
        "'super' keyword unexpected here",
    ))
}

/// `super.name` / `super[expr]` inside class methods.
pub struct SuperMember {
    /// Property name or expression
    pub property: ExprNode,
    /// `super[expr]` form
    pub computed: bool,
}

impl fmt::Display for SuperMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.computed {
            write!(f, "super[{}]", self.property)
        } else {
            write!(f, "super.{}", self.property)
        }
    }
}

impl ExpressionNode for SuperMember {
    const TYPE: &'static str = "SuperMember";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        if !stack.has("%home%") {
            return Err(super_outside_class());
        }
        let home = stack.get("%home%")?;
        let key = property_key(&self.property, self.computed, stack, this)?;
        let receiver = current_this(stack, this)?;
        match &home {
            Value::Object(object) => {
                let parent = object.borrow().prototype.clone();
                match parent {
                    Some(parent) => object_get(&parent, &key, &receiver),
                    None => get_member(&home, &key),
                }
            }
            Value::Function(_) => get_member(&home, &key),
            _ => Err(super_outside_class()),
        }
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        let key = property_key(&self.property, self.computed, stack, None)?;
        let receiver = current_this(stack, None)?;
        set_member(&receiver, &key, value)
    }

    fn entry(&self) -> Vec<String> {
        if self.computed {
            self.property.entry()
        } else {
            Vec::new()
        }
    }

    fn events(&self) -> Vec<String> {
        if self.computed {
            self.property.events()
        } else {
            Vec::new()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "property": self.property.to_json(),
            "computed": self.computed,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            property: node_field(json, "property", registry)?,
            computed: bool_field(json, "computed"),
        })
    }
}

/// `super(args)` inside a derived class constructor.
pub struct SuperCall {
    /// Arguments
    pub arguments: Vec<ExprNode>,
}

impl fmt::Display for SuperCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("super(")?;
        fmt_list(f, &self.arguments, ", ")?;
        f.write_str(")")
    }
}

impl ExpressionNode for SuperCall {
    const TYPE: &'static str = "SuperCall";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let parent = if stack.has("%parent%") {
            stack.get("%parent%")?
        } else {
            Value::Undefined
        };
        let Value::Function(parent) = parent else {
            return Err(super_outside_class());
        };
        let receiver = current_this(stack, this)?;
        let args = evaluate_arguments(&self.arguments, stack, this)?;
        parent.construct_with_this(receiver.clone(), args)?;
        if let fields @ Value::Function(_) = stack.get("%fields%")? {
            fields.call(receiver, Vec::new())?;
        }
        Ok(Value::Undefined)
    }

    fn entry(&self) -> Vec<String> {
        union(&self.arguments, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.arguments, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "arguments": list_json(&self.arguments) })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            arguments: node_list(json, "arguments", registry)?,
        })
    }
}
