//! Operator expressions.

use super::access::resolve_callee;
use super::{
    bool_field, evaluate_arguments, fmt_list, list_json, node_field, node_list, str_field, union,
    ExprNode, ExpressionNode, Node,
};
use crate::ops;
use crate::registry::DeserializerRegistry;
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use core_types::{JsError, JsResult, Value};
use serde_json::json;
use std::fmt;

const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "!=", "===", "!==", "<", ">", "<=", ">=", "<<", ">>",
    ">>>", "&", "|", "^", "in", "instanceof",
];

const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "??"];

const UNARY_OPERATORS: &[&str] = &["!", "~", "+", "-", "typeof", "void", "delete"];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

fn operator_field(json: &serde_json::Value, allowed: &[&str]) -> JsResult<String> {
    let operator = str_field(json, "operator")?;
    if allowed.contains(&operator.as_str()) {
        Ok(operator)
    } else {
        Err(JsError::deserialize(format!("unknown operator '{}'", operator)))
    }
}

/// `left op right` for arithmetic, comparison, bitwise and relational
/// operators.
pub struct BinaryExpression {
    /// Operator spelling
    pub operator: String,
    /// Left operand
    pub left: ExprNode,
    /// Right operand
    pub right: ExprNode,
}

impl fmt::Display for BinaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl ExpressionNode for BinaryExpression {
    const TYPE: &'static str = "BinaryExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let left = self.left.get(stack, this)?;
        let right = self.right.get(stack, this)?;
        ops::binary(&self.operator, &left, &right)
    }

    fn entry(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "operator": self.operator,
            "left": self.left.to_json(),
            "right": self.right.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            operator: operator_field(json, BINARY_OPERATORS)?,
            left: node_field(json, "left", registry)?,
            right: node_field(json, "right", registry)?,
        })
    }
}

/// Short-circuiting `&&`, `||` and `??`.
pub struct LogicalExpression {
    /// Operator spelling
    pub operator: String,
    /// Left operand
    pub left: ExprNode,
    /// Right operand, evaluated only when needed
    pub right: ExprNode,
}

/// Apply a short-circuit operator given the evaluated left side. Returns
/// `None` when the right side has to be evaluated.
fn short_circuit(operator: &str, left: &Value) -> Option<Value> {
    let keep = match operator {
        "&&" | "&&=" => !left.is_truthy(),
        "||" | "||=" => left.is_truthy(),
        _ => !left.is_nullish(),
    };
    keep.then(|| left.clone())
}

impl fmt::Display for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl ExpressionNode for LogicalExpression {
    const TYPE: &'static str = "LogicalExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let left = self.left.get(stack, this)?;
        match short_circuit(&self.operator, &left) {
            Some(value) => Ok(value),
            None => self.right.get(stack, this),
        }
    }

    fn entry(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "operator": self.operator,
            "left": self.left.to_json(),
            "right": self.right.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            operator: operator_field(json, LOGICAL_OPERATORS)?,
            left: node_field(json, "left", registry)?,
            right: node_field(json, "right", registry)?,
        })
    }
}

/// Prefix operators other than `++`/`--` and `await`.
pub struct UnaryExpression {
    /// Operator spelling
    pub operator: String,
    /// Operand
    pub argument: ExprNode,
}

impl fmt::Display for UnaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let argument = self.argument.to_string();
        // `- -x` must not render as `--x`
        let clash = matches!(self.operator.as_str(), "+" | "-") && argument.starts_with(self.operator.as_str());
        if clash || self.operator.chars().all(char::is_alphabetic) {
            write!(f, "{} {}", self.operator, argument)
        } else {
            write!(f, "{}{}", self.operator, self.argument)
        }
    }
}

impl ExpressionNode for UnaryExpression {
    const TYPE: &'static str = "UnaryExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        if self.operator == "delete" {
            let deleted = match &*self.argument {
                Node::MemberExpression(member) => member.delete(stack, this)?,
                Node::Identifier(id) => stack.delete(&id.name)?,
                other => {
                    other.get(stack, this)?;
                    true
                }
            };
            return Ok(Value::Boolean(deleted));
        }
        let value = self.argument.get(stack, this)?;
        ops::unary(&self.operator, &value)
    }

    fn entry(&self) -> Vec<String> {
        self.argument.entry()
    }

    fn events(&self) -> Vec<String> {
        self.argument.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "operator": self.operator,
            "argument": self.argument.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            operator: operator_field(json, UNARY_OPERATORS)?,
            argument: node_field(json, "argument", registry)?,
        })
    }
}

/// `++x`, `x++`, `--x`, `x--`.
pub struct UpdateExpression {
    /// `++` or `--`
    pub operator: String,
    /// Prefix form
    pub prefix: bool,
    /// Assignment target
    pub argument: ExprNode,
}

impl fmt::Display for UpdateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix {
            write!(f, "{}{}", self.operator, self.argument)
        } else {
            write!(f, "{}{}", self.argument, self.operator)
        }
    }
}

impl ExpressionNode for UpdateExpression {
    const TYPE: &'static str = "UpdateExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let current = self.argument.get(stack, this)?;
        let delta = if self.operator == "++" { 1 } else { -1 };
        let (old, new) = ops::increment(&current, delta)?;
        self.argument.set(stack, new.clone())?;
        Ok(if self.prefix { new } else { old })
    }

    fn entry(&self) -> Vec<String> {
        self.argument.entry()
    }

    fn events(&self) -> Vec<String> {
        self.argument.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "operator": self.operator,
            "prefix": self.prefix,
            "argument": self.argument.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            operator: operator_field(json, &["++", "--"])?,
            prefix: bool_field(json, "prefix"),
            argument: node_field(json, "argument", registry)?,
        })
    }
}

/// `target = value` and compound assignments.
pub struct AssignmentExpression {
    /// Operator spelling, e.g. `=` or `+=`
    pub operator: String,
    /// Assignment target (identifier, member or pattern)
    pub left: ExprNode,
    /// Value
    pub right: ExprNode,
}

impl AssignmentExpression {
    /// Evaluate the right side for a plain `=`, naming anonymous functions
    /// after a simple identifier target.
    pub(crate) fn evaluate_right(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        match self.left.as_identifier() {
            Some(name) => self.right.get_named(stack, this, name),
            None => self.right.get(stack, this),
        }
    }
}

impl fmt::Display for AssignmentExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl ExpressionNode for AssignmentExpression {
    const TYPE: &'static str = "AssignmentExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        if self.operator == "=" {
            let value = self.evaluate_right(stack, this)?;
            self.left.set(stack, value.clone())?;
            return Ok(value);
        }
        let current = self.left.get(stack, this)?;
        let value = match self.operator.as_str() {
            "&&=" | "||=" | "??=" => match short_circuit(&self.operator, &current) {
                Some(value) => return Ok(value),
                None => self.evaluate_right(stack, this)?,
            },
            operator => {
                let right = self.right.get(stack, this)?;
                ops::binary(operator.trim_end_matches('='), &current, &right)?
            }
        };
        self.left.set(stack, value.clone())?;
        Ok(value)
    }

    fn entry(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.left, &self.right], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "operator": self.operator,
            "left": self.left.to_json(),
            "right": self.right.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            operator: operator_field(json, ASSIGNMENT_OPERATORS)?,
            left: node_field(json, "left", registry)?,
            right: node_field(json, "right", registry)?,
        })
    }
}

/// `test ? consequent : alternate`.
pub struct ConditionalExpression {
    /// Condition
    pub test: ExprNode,
    /// Value when truthy
    pub consequent: ExprNode,
    /// Value when falsy
    pub alternate: ExprNode,
}

impl fmt::Display for ConditionalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ? {} : {}", self.test, self.consequent, self.alternate)
    }
}

impl ExpressionNode for ConditionalExpression {
    const TYPE: &'static str = "ConditionalExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        if self.test.get(stack, this)?.is_truthy() {
            self.consequent.get(stack, this)
        } else {
            self.alternate.get(stack, this)
        }
    }

    fn entry(&self) -> Vec<String> {
        union([&self.test, &self.consequent, &self.alternate], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.test, &self.consequent, &self.alternate], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "test": self.test.to_json(),
            "consequent": self.consequent.to_json(),
            "alternate": self.alternate.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            test: node_field(json, "test", registry)?,
            consequent: node_field(json, "consequent", registry)?,
            alternate: node_field(json, "alternate", registry)?,
        })
    }
}

/// `a, b, c`.
pub struct SequenceExpression {
    /// Expressions evaluated left to right
    pub expressions: Vec<ExprNode>,
}

impl fmt::Display for SequenceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, &self.expressions, ", ")
    }
}

impl ExpressionNode for SequenceExpression {
    const TYPE: &'static str = "SequenceExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let mut last = Value::Undefined;
        for expression in &self.expressions {
            last = expression.get(stack, this)?;
        }
        Ok(last)
    }

    fn entry(&self) -> Vec<String> {
        union(&self.expressions, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.expressions, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "expressions": list_json(&self.expressions) })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            expressions: node_list(json, "expressions", registry)?,
        })
    }
}

/// `value |> f` and `value |> f:arg1:arg2`, calling `f(value, arg1, arg2)`.
pub struct PipelineExpression {
    /// Piped value
    pub left: ExprNode,
    /// Function to call
    pub callee: ExprNode,
    /// Extra arguments after the piped value
    pub arguments: Vec<ExprNode>,
}

impl fmt::Display for PipelineExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} |> {}", self.left, self.callee)?;
        for argument in &self.arguments {
            write!(f, ":{}", argument)?;
        }
        Ok(())
    }
}

impl ExpressionNode for PipelineExpression {
    const TYPE: &'static str = "PipelineExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let input = self.left.get(stack, this)?;
        let (callee, receiver) = resolve_callee(&self.callee, stack, this)?;
        let mut args = vec![input];
        args.extend(evaluate_arguments(&self.arguments, stack, this)?);
        match callee {
            Value::Function(function) => function.call(receiver, args),
            _ => Err(JsError::not_callable(&self.callee)),
        }
    }

    fn entry(&self) -> Vec<String> {
        union([&self.left, &self.callee].into_iter().chain(&self.arguments), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.left, &self.callee].into_iter().chain(&self.arguments), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "left": self.left.to_json(),
            "callee": self.callee.to_json(),
            "arguments": list_json(&self.arguments),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            left: node_field(json, "left", registry)?,
            callee: node_field(json, "callee", registry)?,
            arguments: node_list(json, "arguments", registry)?,
        })
    }
}

/// `( expression )`, kept so rendering preserves the source grouping.
pub struct ParenthesizedExpression {
    /// Inner expression
    pub expression: ExprNode,
}

impl fmt::Display for ParenthesizedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.expression)
    }
}

impl ExpressionNode for ParenthesizedExpression {
    const TYPE: &'static str = "ParenthesizedExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.expression.get(stack, this)
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        match &*self.expression {
            Node::Identifier(_) | Node::MemberExpression(_) => self.expression.set(stack, value),
            _ => Err(JsError::not_assignable(self)),
        }
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        self.expression.declare(stack, value, kind)
    }

    fn entry(&self) -> Vec<String> {
        self.expression.entry()
    }

    fn events(&self) -> Vec<String> {
        self.expression.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "expression": self.expression.to_json() })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            expression: node_field(json, "expression", registry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Identifier, NumberLiteral, StringLiteral};
    use core_types::ErrorKind;

    fn num(n: f64) -> ExprNode {
        Node::new(NumberLiteral::new(n))
    }

    fn ident(name: &str) -> ExprNode {
        Node::new(Identifier::new(name))
    }

    fn binary(operator: &str, left: ExprNode, right: ExprNode) -> ExprNode {
        Node::new(BinaryExpression {
            operator: operator.to_string(),
            left,
            right,
        })
    }

    #[test]
    fn test_precedence_is_structural() {
        let mut stack = Stack::with_globals();
        let product = binary("*", num(3.0), num(4.0));
        let sum = binary("+", num(2.0), product);
        assert_eq!(sum.get(&mut stack, None).unwrap().to_number(), 14.0);
        let grouped = binary(
            "*",
            Node::new(ParenthesizedExpression {
                expression: binary("+", num(2.0), num(3.0)),
            }),
            num(4.0),
        );
        assert_eq!(grouped.get(&mut stack, None).unwrap().to_number(), 20.0);
        assert_eq!(grouped.to_string(), "(2 + 3) * 4");
    }

    #[test]
    fn test_logical_short_circuit() {
        let mut stack = Stack::with_globals();
        let never = Node::new(crate::node::CallExpression {
            callee: ident("missing"),
            arguments: vec![],
            optional: false,
        });
        let and = LogicalExpression {
            operator: "&&".to_string(),
            left: Node::new(crate::node::BooleanLiteral { value: false }),
            right: never.clone(),
        };
        assert!(!and.get(&mut stack, None).unwrap().is_truthy());
        let nullish = LogicalExpression {
            operator: "??".to_string(),
            left: Node::new(crate::node::NullLiteral),
            right: num(7.0),
        };
        assert_eq!(nullish.get(&mut stack, None).unwrap().to_number(), 7.0);
    }

    #[test]
    fn test_compound_and_logical_assignment() {
        let mut stack = Stack::with_globals();
        stack.set("x", Value::Number(5.0)).unwrap();
        let add = AssignmentExpression {
            operator: "+=".to_string(),
            left: ident("x"),
            right: num(2.0),
        };
        assert_eq!(add.get(&mut stack, None).unwrap().to_number(), 7.0);
        let or = AssignmentExpression {
            operator: "||=".to_string(),
            left: ident("x"),
            right: num(100.0),
        };
        assert_eq!(or.get(&mut stack, None).unwrap().to_number(), 7.0);
        assert_eq!(stack.get("x").unwrap().to_number(), 7.0);
    }

    #[test]
    fn test_update_expression() {
        let mut stack = Stack::with_globals();
        stack.set("i", Value::Number(1.0)).unwrap();
        let post = UpdateExpression {
            operator: "++".to_string(),
            prefix: false,
            argument: ident("i"),
        };
        assert_eq!(post.get(&mut stack, None).unwrap().to_number(), 1.0);
        assert_eq!(stack.get("i").unwrap().to_number(), 2.0);
        assert_eq!(post.to_string(), "i++");
    }

    #[test]
    fn test_assign_to_call_is_rejected() {
        let mut stack = Stack::with_globals();
        let target = Node::new(crate::node::CallExpression {
            callee: ident("foo"),
            arguments: vec![],
            optional: false,
        });
        let assign = AssignmentExpression {
            operator: "=".to_string(),
            left: target,
            right: num(1.0),
        };
        stack
            .set("foo", core_types::NativeFunction::value("foo", |_, _| Ok(Value::Undefined)))
            .unwrap();
        let err = assign.get(&mut stack, None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotAssignable));
    }

    #[test]
    fn test_pipeline_passes_extra_arguments() {
        let mut stack = Stack::with_globals();
        let pad = PipelineExpression {
            left: Node::new(StringLiteral::new("7")),
            callee: Node::new(crate::node::MemberExpression {
                object: Node::new(StringLiteral::new("")),
                property: ident("concat"),
                computed: false,
                optional: false,
            }),
            arguments: vec![Node::new(StringLiteral::new("!"))],
        };
        assert_eq!(pad.get(&mut stack, None).unwrap().to_string(), "7!");
        assert_eq!(pad.to_string(), r#""7" |> "".concat:"!""#);
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let registry = DeserializerRegistry::with_default_nodes();
        let json = json!({
            "type": "BinaryExpression",
            "operator": "<=>",
            "left": { "type": "NumberLiteral", "value": 1 },
            "right": { "type": "NumberLiteral", "value": 2 },
        });
        assert!(registry.deserialize(&json).is_err());
    }
}
