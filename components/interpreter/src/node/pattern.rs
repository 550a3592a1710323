//! Destructuring patterns.
//!
//! Patterns only bind: `declare` introduces new variables and `set`
//! assigns existing ones. Both walk the pattern the same way and differ
//! only in what happens at the leaves.

use super::{hole_list, list_json, node_field, node_list, opt_json, ExprNode, ExpressionNode, Node};
use crate::registry::DeserializerRegistry;
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use builtins::{get_member, own_keys, ValueIterator};
use core_types::{ErrorKind, JsError, JsObject, JsResult, Value};
use serde_json::json;
use std::fmt;

fn bind(target: &Node, stack: &mut Stack, value: Value, kind: Option<DeclarationKind>) -> JsResult<()> {
    match kind {
        Some(kind) => target.declare(stack, value, kind),
        None => target.set(stack, value),
    }
}

fn not_an_expression(node: &impl fmt::Display) -> JsError {
    JsError::eval(
        ErrorKind::InternalError,
        format!("binding pattern {} cannot be evaluated", node),
    )
}

/// Names read while binding a pattern: default values and computed keys,
/// never the bound names themselves.
fn pattern_reads(node: &Node, select: fn(&Node) -> Vec<String>) -> Vec<String> {
    match node {
        Node::Identifier(_) => Vec::new(),
        Node::AssignmentPattern(pattern) => pattern.reads(select),
        Node::ObjectPattern(pattern) => collect_reads(pattern.properties.iter(), select),
        Node::ArrayPattern(pattern) => collect_reads(pattern.elements.iter().flatten(), select),
        Node::Property(property) => {
            let mut names = if property.computed {
                select(&property.key)
            } else {
                Vec::new()
            };
            for name in pattern_reads(&property.value, select) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        }
        Node::RestElement(rest) => pattern_reads(&rest.argument, select),
        other => select(other),
    }
}

fn collect_reads<'a>(
    nodes: impl Iterator<Item = &'a ExprNode>,
    select: fn(&Node) -> Vec<String>,
) -> Vec<String> {
    let mut names = Vec::new();
    for node in nodes {
        for name in pattern_reads(node, select) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// `{ a, b: c, d = 1, ...rest }`.
pub struct ObjectPattern {
    /// `Property` nodes whose values are binding targets, optionally
    /// followed by a `RestElement`
    pub properties: Vec<ExprNode>,
}

impl ObjectPattern {
    fn bind_all(&self, stack: &mut Stack, value: Value, kind: Option<DeclarationKind>) -> JsResult<()> {
        if value.is_nullish() {
            return Err(JsError::type_error(format!(
                "Cannot destructure '{}' as it is {}.",
                value, value
            )));
        }
        let mut used = Vec::new();
        for property in &self.properties {
            match &**property {
                Node::Property(prop) => {
                    let key = prop.key(stack, None)?;
                    let item = get_member(&value, &key)?;
                    bind(&prop.value, stack, item, kind)?;
                    used.push(key);
                }
                Node::RestElement(rest) => {
                    let mut remaining = JsObject::new();
                    for key in own_keys(&value) {
                        if !used.contains(&key) {
                            let item = get_member(&value, &key)?;
                            remaining.insert(key, item);
                        }
                    }
                    bind(&rest.argument, stack, Value::Object(remaining.into_ref()), kind)?;
                }
                other => return Err(JsError::not_assignable(other)),
            }
        }
        Ok(())
    }
}

impl fmt::Display for ObjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        super::fmt_list(f, &self.properties, ", ")?;
        f.write_str(" }")
    }
}

impl ExpressionNode for ObjectPattern {
    const TYPE: &'static str = "ObjectPattern";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(not_an_expression(self))
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        self.bind_all(stack, value, None)
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        self.bind_all(stack, value, Some(kind))
    }

    fn entry(&self) -> Vec<String> {
        collect_reads(self.properties.iter(), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        collect_reads(self.properties.iter(), Node::events)
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

/// `[a, , b = 2, ...rest]`.
pub struct ArrayPattern {
    /// Targets; `None` skips an element
    pub elements: Vec<Option<ExprNode>>,
}

impl ArrayPattern {
    fn bind_all(&self, stack: &mut Stack, value: Value, kind: Option<DeclarationKind>) -> JsResult<()> {
        let mut iter = ValueIterator::new(&value)?;
        let mut exhausted = false;
        for element in &self.elements {
            match element.as_deref() {
                Some(Node::RestElement(rest)) => {
                    let mut remaining = Vec::new();
                    while let Some(item) = iter.next_value()? {
                        remaining.push(item);
                    }
                    exhausted = true;
                    bind(&rest.argument, stack, Value::new_array(remaining), kind)?;
                }
                other => {
                    let item = if exhausted {
                        None
                    } else {
                        iter.next_value()?
                    };
                    if item.is_none() {
                        exhausted = true;
                    }
                    if let Some(target) = other {
                        bind(target, stack, item.unwrap_or(Value::Undefined), kind)?;
                    }
                }
            }
        }
        if !exhausted {
            iter.close()?;
        }
        Ok(())
    }
}

impl fmt::Display for ArrayPattern {
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
        f.write_str("]")
    }
}

impl ExpressionNode for ArrayPattern {
    const TYPE: &'static str = "ArrayPattern";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(not_an_expression(self))
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        self.bind_all(stack, value, None)
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        self.bind_all(stack, value, Some(kind))
    }

    fn entry(&self) -> Vec<String> {
        collect_reads(self.elements.iter().flatten(), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        collect_reads(self.elements.iter().flatten(), Node::events)
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

/// `target = default` inside patterns and parameter lists.
pub struct AssignmentPattern {
    /// Binding target
    pub left: ExprNode,
    /// Default used when the incoming value is `undefined`
    pub right: ExprNode,
}

impl AssignmentPattern {
    fn bind_default(&self, stack: &mut Stack, value: Value, kind: Option<DeclarationKind>) -> JsResult<()> {
        let value = if value.is_undefined() {
            match self.left.as_identifier() {
                Some(name) => self.right.get_named(stack, None, name)?,
                None => self.right.get(stack, None)?,
            }
        } else {
            value
        };
        bind(&self.left, stack, value, kind)
    }
}

impl AssignmentPattern {
    fn reads(&self, select: fn(&Node) -> Vec<String>) -> Vec<String> {
        let mut names = pattern_reads(&self.left, select);
        for name in select(&self.right) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl fmt::Display for AssignmentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

impl ExpressionNode for AssignmentPattern {
    const TYPE: &'static str = "AssignmentPattern";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(not_an_expression(self))
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        self.bind_default(stack, value, None)
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        self.bind_default(stack, value, Some(kind))
    }

    fn entry(&self) -> Vec<String> {
        self.reads(Node::entry)
    }

    fn events(&self) -> Vec<String> {
        self.reads(Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "left": self.left.to_json(),
            "right": self.right.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            left: node_field(json, "left", registry)?,
            right: node_field(json, "right", registry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Identifier, NumberLiteral, Property, PropertyKind, RestElement};

    fn ident(name: &str) -> ExprNode {
        Node::new(Identifier::new(name))
    }

    fn shorthand(name: &str, default: Option<f64>) -> ExprNode {
        let value = match default {
            Some(n) => Node::new(AssignmentPattern {
                left: ident(name),
                right: Node::new(NumberLiteral::new(n)),
            }),
            None => ident(name),
        };
        Node::new(Property {
            key: ident(name),
            computed: false,
            value,
            kind: PropertyKind::Init,
            shorthand: true,
            method: false,
        })
    }

    #[test]
    fn test_object_pattern_with_default_and_rest() {
        let mut stack = Stack::with_globals();
        let pattern = ObjectPattern {
            properties: vec![
                shorthand("a", None),
                shorthand("b", Some(10.0)),
                Node::new(RestElement { argument: ident("others") }),
            ],
        };
        let source = Value::object_from([("a", Value::Number(1.0)), ("z", Value::Number(26.0))]);
        pattern.declare(&mut stack, source, DeclarationKind::Const).unwrap();
        assert_eq!(stack.get("a").unwrap().to_number(), 1.0);
        assert_eq!(stack.get("b").unwrap().to_number(), 10.0);
        assert_eq!(builtins::own_keys(&stack.get("others").unwrap()), vec!["z"]);
        assert_eq!(pattern.to_string(), "{ a, b = 10, ...others }");
        assert!(pattern.events().is_empty());
    }

    #[test]
    fn test_array_pattern_swap() {
        let mut stack = Stack::with_globals();
        stack.set("x", Value::Number(1.0)).unwrap();
        stack.set("y", Value::Number(2.0)).unwrap();
        let pattern = ArrayPattern {
            elements: vec![Some(ident("x")), Some(ident("y"))],
        };
        let swapped = Value::new_array(vec![stack.get("y").unwrap(), stack.get("x").unwrap()]);
        pattern.set(&mut stack, swapped).unwrap();
        assert_eq!(stack.get("x").unwrap().to_number(), 2.0);
        assert_eq!(stack.get("y").unwrap().to_number(), 1.0);
    }

    #[test]
    fn test_array_pattern_holes_and_rest() {
        let mut stack = Stack::with_globals();
        let pattern = ArrayPattern {
            elements: vec![
                None,
                Some(ident("second")),
                Some(Node::new(RestElement { argument: ident("tail") })),
            ],
        };
        let list = Value::new_array((1..=4).map(|n| Value::Number(n as f64)).collect());
        pattern.declare(&mut stack, list, DeclarationKind::Let).unwrap();
        assert_eq!(stack.get("second").unwrap().to_number(), 2.0);
        assert_eq!(stack.get("tail").unwrap().get_property("length").to_number(), 2.0);
        assert_eq!(pattern.to_string(), "[, second, ...tail]");
    }

    #[test]
    fn test_destructuring_null_fails() {
        let mut stack = Stack::with_globals();
        let pattern = ObjectPattern {
            properties: vec![shorthand("a", None)],
        };
        assert!(pattern.declare(&mut stack, Value::Null, DeclarationKind::Let).is_err());
    }
}
