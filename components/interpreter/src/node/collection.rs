//! Array and object literals, spread and rest elements.

use super::function::fmt_method;
use super::{
    bool_field, fmt_key, hole_list, list_json, node_field, node_list, opt_json, property_key,
    str_field, union, ExprNode, ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use builtins::{collect_iterable, get_member, own_keys};
use core_types::{JsError, JsObject, JsResult, ObjectRef, Value};
use serde_json::json;
use std::fmt;

/// `[a, , ...rest]`.
pub struct ArrayExpression {
    /// Elements; `None` marks a hole
    pub elements: Vec<Option<ExprNode>>,
}

impl fmt::Display for ArrayExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(element) = element {
                write!(f, "{}", element)?;
            }
        }
        if matches!(self.elements.last(), Some(None)) {
            f.write_str(",")?;
        }
        f.write_str("]")
    }
}

impl ExpressionNode for ArrayExpression {
    const TYPE: &'static str = "ArrayExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let mut values = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            match element.as_deref() {
                None => values.push(Value::Undefined),
                Some(Node::SpreadElement(spread)) => {
                    let iterable = spread.argument.get(stack, this)?;
                    values.extend(collect_iterable(&iterable)?);
                }
                Some(node) => values.push(node.get(stack, this)?),
            }
        }
        Ok(Value::new_array(values))
    }

    fn entry(&self) -> Vec<String> {
        union(self.elements.iter().flatten(), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(self.elements.iter().flatten(), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        let elements: Vec<_> = self.elements.iter().map(opt_json).collect();
        json!({ "type": Self::TYPE, "elements": elements })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            elements: hole_list(json, "elements", registry)?,
        })
    }
}

/// `{ a: 1, b, [key]: v, ...rest, get x() {} }`.
pub struct ObjectExpression {
    /// `Property` and `SpreadElement` nodes
    pub properties: Vec<ExprNode>,
}

impl fmt::Display for ObjectExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        super::fmt_list(f, &self.properties, ", ")?;
        f.write_str(" }")
    }
}

impl ExpressionNode for ObjectExpression {
    const TYPE: &'static str = "ObjectExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let object = JsObject::new().into_ref();
        for property in &self.properties {
            match &**property {
                Node::Property(prop) => prop.define_on(&object, stack, this)?,
                Node::SpreadElement(spread) => {
                    let source = spread.argument.get(stack, this)?;
                    if source.is_nullish() {
                        continue;
                    }
                    for key in own_keys(&source) {
                        let value = get_member(&source, &key)?;
                        object.borrow_mut().insert(key, value);
                    }
                }
                other => {
                    return Err(JsError::deserialize(format!(
                        "{} cannot appear in an object literal",
                        other.type_tag()
                    )))
                }
            }
        }
        Ok(Value::Object(object))
    }

    fn entry(&self) -> Vec<String> {
        union(&self.properties, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.properties, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "properties": list_json(&self.properties) })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            properties: node_list(json, "properties", registry)?,
        })
    }
}

/// Kind of an object literal property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Plain value (including methods)
    Init,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

impl PropertyKind {
    /// JSON name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Init => "init",
            PropertyKind::Get => "get",
            PropertyKind::Set => "set",
        }
    }

    fn from_name(name: &str) -> JsResult<Self> {
        match name {
            "init" => Ok(PropertyKind::Init),
            "get" => Ok(PropertyKind::Get),
            "set" => Ok(PropertyKind::Set),
            other => Err(JsError::deserialize(format!("unknown property kind '{}'", other))),
        }
    }
}

/// One entry of an object literal or object pattern.
pub struct Property {
    /// Key: identifier or literal, or any expression when computed
    pub key: ExprNode,
    /// `[key]` form
    pub computed: bool,
    /// Value expression, or binding target inside patterns
    pub value: ExprNode,
    /// Plain value, getter or setter
    pub kind: PropertyKind,
    /// `{ a }` form
    pub shorthand: bool,
    /// `{ a() {} }` form
    pub method: bool,
}

impl Property {
    /// Resolve the key.
    pub(crate) fn key(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<String> {
        property_key(&self.key, self.computed, stack, this)
    }

    fn define_on(&self, object: &ObjectRef, stack: &mut Stack, this: Option<&Value>) -> JsResult<()> {
        let key = self.key(stack, this)?;
        let value = self.value.get_named(stack, this, &key)?;
        let mut object = object.borrow_mut();
        match self.kind {
            PropertyKind::Init => object.insert(key, value),
            PropertyKind::Get => object.define_getter(key, value),
            PropertyKind::Set => object.define_setter(key, value),
        }
        Ok(())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PropertyKind::Get => fmt_method(f, "get ", &self.key, self.computed, &self.value),
            PropertyKind::Set => fmt_method(f, "set ", &self.key, self.computed, &self.value),
            PropertyKind::Init if self.method => {
                fmt_method(f, "", &self.key, self.computed, &self.value)
            }
            PropertyKind::Init if self.shorthand => write!(f, "{}", self.value),
            PropertyKind::Init => {
                fmt_key(f, &self.key, self.computed)?;
                write!(f, ": {}", self.value)
            }
        }
    }
}

impl ExpressionNode for Property {
    const TYPE: &'static str = "Property";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.value.get(stack, this)
    }

    fn entry(&self) -> Vec<String> {
        if self.computed {
            union([&self.key, &self.value], Node::entry)
        } else {
            self.value.entry()
        }
    }

    fn events(&self) -> Vec<String> {
        if self.computed {
            union([&self.key, &self.value], Node::events)
        } else {
            self.value.events()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "key": self.key.to_json(),
            "computed": self.computed,
            "value": self.value.to_json(),
            "kind": self.kind.as_str(),
            "shorthand": self.shorthand,
            "method": self.method,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let kind = match json.get("kind") {
            Some(_) => PropertyKind::from_name(&str_field(json, "kind")?)?,
            None => PropertyKind::Init,
        };
        Ok(Self {
            key: node_field(json, "key", registry)?,
            computed: bool_field(json, "computed"),
            value: node_field(json, "value", registry)?,
            kind,
            shorthand: bool_field(json, "shorthand"),
            method: bool_field(json, "method"),
        })
    }
}

/// `...expr` in array literals, object literals and call arguments.
pub struct SpreadElement {
    /// Spread operand
    pub argument: ExprNode,
}

impl fmt::Display for SpreadElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...{}", self.argument)
    }
}

impl ExpressionNode for SpreadElement {
    const TYPE: &'static str = "SpreadElement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.argument.get(stack, this)
    }

    fn entry(&self) -> Vec<String> {
        self.argument.entry()
    }

    fn events(&self) -> Vec<String> {
        self.argument.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "argument": self.argument.to_json() })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            argument: node_field(json, "argument", registry)?,
        })
    }
}

/// `...name` in parameter lists and destructuring patterns.
pub struct RestElement {
    /// Binding target for the collected rest
    pub argument: ExprNode,
}

impl fmt::Display for RestElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...{}", self.argument)
    }
}

impl ExpressionNode for RestElement {
    const TYPE: &'static str = "RestElement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.argument.get(stack, this)
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        self.argument.set(stack, value)
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        self.argument.declare(stack, value, kind)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "argument": self.argument.to_json() })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            argument: node_field(json, "argument", registry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Identifier, NumberLiteral, StringLiteral};

    fn num(n: f64) -> ExprNode {
        Node::new(NumberLiteral::new(n))
    }

    fn ident(name: &str) -> ExprNode {
        Node::new(Identifier::new(name))
    }

    fn init(key: &str, value: ExprNode) -> ExprNode {
        Node::new(Property {
            key: ident(key),
            computed: false,
            value,
            kind: PropertyKind::Init,
            shorthand: false,
            method: false,
        })
    }

    #[test]
    fn test_array_with_spread_and_hole() {
        let mut stack = Stack::with_globals();
        stack
            .set("rest", Value::new_array(vec![Value::Number(2.0), Value::Number(3.0)]))
            .unwrap();
        let node = ArrayExpression {
            elements: vec![
                Some(num(1.0)),
                None,
                Some(Node::new(SpreadElement { argument: ident("rest") })),
            ],
        };
        let value = node.get(&mut stack, None).unwrap();
        assert_eq!(value.get_property("length").to_number(), 4.0);
        assert!(value.get_property("1").is_undefined());
        assert_eq!(node.to_string(), "[1, , ...rest]");
    }

    #[test]
    fn test_object_literal_keys_and_spread() {
        let mut stack = Stack::with_globals();
        stack
            .set("base", Value::object_from([("a", Value::Number(1.0))]))
            .unwrap();
        let node = ObjectExpression {
            properties: vec![
                Node::new(SpreadElement { argument: ident("base") }),
                init("b", Node::new(StringLiteral::new("two"))),
                Node::new(Property {
                    key: Node::new(StringLiteral::new("c")),
                    computed: true,
                    value: num(3.0),
                    kind: PropertyKind::Init,
                    shorthand: false,
                    method: false,
                }),
            ],
        };
        let value = node.get(&mut stack, None).unwrap();
        assert_eq!(builtins::own_keys(&value), vec!["a", "b", "c"]);
        assert_eq!(node.to_string(), r#"{ ...base, b: "two", ["c"]: 3 }"#);
        assert_eq!(node.events(), vec!["base"]);
    }

    #[test]
    fn test_shorthand_renders_value() {
        let node = ObjectExpression {
            properties: vec![Node::new(Property {
                key: ident("x"),
                computed: false,
                value: ident("x"),
                kind: PropertyKind::Init,
                shorthand: true,
                method: false,
            })],
        };
        assert_eq!(node.to_string(), "{ x }");
    }
}
