//! Function literals, `await` and `yield`.

use super::{
    bool_field, fmt_key, list_json, node_field, node_list, opt_json, opt_node_field, str_field,
    union, ExprNode, ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::runtime::function::{FunctionDef, ScriptFunction};
use crate::runtime::{settle_now, to_promise};
use crate::scope::{DeclarationKind, Scope};
use crate::stack::{AwaitPromiseInfo, Stack, YieldInfo};
use core_types::{JsError, JsResult, Value};
use serde_json::json;
use std::fmt;
use std::rc::Rc;

pub use crate::runtime::function::FunctionForm;

/// Names bound by a parameter or declaration target.
pub(crate) fn bound_names(node: &Node) -> Vec<String> {
    match node {
        Node::Identifier(id) => vec![id.name.clone()],
        Node::AssignmentPattern(pattern) => bound_names(&pattern.left),
        Node::RestElement(rest) => bound_names(&rest.argument),
        Node::Property(property) => bound_names(&property.value),
        Node::ObjectPattern(pattern) => pattern.properties.iter().flat_map(|p| bound_names(p)).collect(),
        Node::ArrayPattern(pattern) => pattern
            .elements
            .iter()
            .flatten()
            .flat_map(|element| bound_names(element))
            .collect(),
        _ => Vec::new(),
    }
}

/// Write a method as `prefix key(params) body`, used by object literals
/// and class bodies.
pub(crate) fn fmt_method(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    key: &Node,
    computed: bool,
    value: &Node,
) -> fmt::Result {
    match value {
        Node::Function(function) => {
            f.write_str(prefix)?;
            if function.def.is_async {
                f.write_str("async ")?;
            }
            if function.def.is_generator {
                f.write_str("*")?;
            }
            fmt_key(f, key, computed)?;
            function.def.fmt_signature(f)
        }
        other => {
            f.write_str(prefix)?;
            fmt_key(f, key, computed)?;
            write!(f, ": {}", other)
        }
    }
}

/// Any function literal: declaration, expression, arrow or method.
pub struct Function {
    /// Shared definition
    pub def: Rc<FunctionDef>,
}

impl Function {
    /// Create a closure over `stack`.
    ///
    /// `name` names anonymous literals after the binding they are assigned
    /// to. A named function expression sees its own name in a scope of
    /// its own, and a declaration binds its name in `stack`.
    pub fn instantiate(&self, stack: &mut Stack, this: Option<&Value>, name: Option<&str>) -> JsResult<Value> {
        Ok(Value::Function(self.closure(stack, this, name, None)?))
    }

    pub(crate) fn closure(
        &self,
        stack: &mut Stack,
        this: Option<&Value>,
        name: Option<&str>,
        home: Option<Value>,
    ) -> JsResult<Rc<ScriptFunction>> {
        let def = &self.def;
        let display_name = if def.name.is_empty() {
            name.unwrap_or_default().to_string()
        } else {
            def.name.clone()
        };
        let mut closure = stack.copy_stack();
        let own_scope = match def.form {
            FunctionForm::Expression if !def.name.is_empty() => Some(closure.push_block_scope()),
            _ => None,
        };
        let lexical_this = match def.form {
            FunctionForm::Arrow if !stack.has("this") => this.cloned(),
            _ => None,
        };
        let function = ScriptFunction::new(def.clone(), display_name, closure, lexical_this, home);
        if let Some(scope) = own_scope {
            scope.declare(&def.name, Value::Function(function.clone()), DeclarationKind::Let)?;
        }
        if def.form == FunctionForm::Declaration && !def.name.is_empty() {
            stack.declare_variable(&def.name, Value::Function(function.clone()), DeclarationKind::Var)?;
        }
        Ok(function)
    }

    fn params(&self) -> Vec<String> {
        self.def.params.iter().flat_map(|param| bound_names(param)).collect()
    }

    fn free(&self, select: fn(&Node) -> Vec<String>) -> Vec<String> {
        let params = self.params();
        let mut nodes: Vec<&ExprNode> = self.def.params.iter().collect();
        nodes.push(&self.def.body);
        union(nodes, select)
            .into_iter()
            .filter(|name| {
                let root = name.split('.').next().unwrap_or(name);
                !params.iter().any(|param| param == root) && root != "this" && root != "arguments"
            })
            .collect()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.def, f)
    }
}

impl ExpressionNode for Function {
    const TYPE: &'static str = "Function";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.instantiate(stack, this, None)
    }

    fn entry(&self) -> Vec<String> {
        self.free(Node::entry)
    }

    fn events(&self) -> Vec<String> {
        self.free(Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "name": self.def.name,
            "params": list_json(&self.def.params),
            "body": self.def.body.to_json(),
            "form": self.def.form.as_str(),
            "async": self.def.is_async,
            "generator": self.def.is_generator,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let form_name = str_field(json, "form")?;
        let form = FunctionForm::from_name(&form_name)
            .ok_or_else(|| JsError::deserialize(format!("unknown function form '{}'", form_name)))?;
        let def = FunctionDef {
            name: json.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            params: node_list(json, "params", registry)?,
            body: node_field(json, "body", registry)?,
            form,
            is_async: bool_field(json, "async"),
            is_generator: bool_field(json, "generator"),
        };
        if form == FunctionForm::Arrow && def.is_generator {
            return Err(JsError::deserialize("arrow functions cannot be generators"));
        }
        Ok(Self { def: Rc::new(def) })
    }
}

/// `await argument`.
///
/// Statement-level awaits are recorded on the stack and suspended by the
/// machine; this evaluation path only runs for awaits nested inside a
/// larger expression. Inside an async body such an await either returns
/// the result cached for it by an earlier run of the statement or records
/// its promise and stops the statement with [`JsError::Suspended`].
/// Elsewhere the promise must settle from the microtask queue alone.
pub struct AwaitExpression {
    /// Awaited value
    pub argument: ExprNode,
}

impl fmt::Display for AwaitExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "await {}", self.argument)
    }
}

impl ExpressionNode for AwaitExpression {
    const TYPE: &'static str = "AwaitExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        if !stack.replay.is_enabled() {
            let value = self.argument.get(stack, this)?;
            return settle_now(&to_promise(value));
        }
        let (index, settled) = stack.replay.claim();
        if let Some(settled) = settled {
            return settled.map_err(JsError::Throw);
        }
        let promise = to_promise(self.argument.get(stack, this)?);
        let scope_type = stack.current().scope_type();
        stack.await_promise.push(AwaitPromiseInfo {
            promise,
            node: None,
            declare_variable: None,
            scope_type,
            is_return: false,
            replay: true,
        });
        stack.replay.suspend(index);
        Err(JsError::Suspended)
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

/// `yield argument` and `yield* argument`.
///
/// A yield nested inside a larger expression buffers its value and reads
/// as `undefined`; only statement-level yields receive the value sent by
/// the next `next(v)` call.
pub struct YieldExpression {
    /// Yielded value; `None` yields `undefined`
    pub argument: Option<ExprNode>,
    /// `yield*`
    pub delegate: bool,
}

impl fmt::Display for YieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.delegate { "yield*" } else { "yield" })?;
        match &self.argument {
            Some(argument) => write!(f, " {}", argument),
            None => Ok(()),
        }
    }
}

impl ExpressionNode for YieldExpression {
    const TYPE: &'static str = "YieldExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let value = match &self.argument {
            Some(argument) => argument.get(stack, this)?,
            None => Value::Undefined,
        };
        if self.delegate {
            for item in builtins::collect_iterable(&value)? {
                stack.yields.push(YieldInfo::value(item));
            }
        } else {
            stack.yields.push(YieldInfo::value(value));
        }
        Ok(Value::Undefined)
    }

    fn entry(&self) -> Vec<String> {
        self.argument.as_ref().map(|a| a.entry()).unwrap_or_default()
    }

    fn events(&self) -> Vec<String> {
        self.argument.as_ref().map(|a| a.events()).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "argument": opt_json(&self.argument),
            "delegate": self.delegate,
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            argument: opt_node_field(json, "argument", registry)?,
            delegate: bool_field(json, "delegate"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BinaryExpression, BlockStatement, Identifier, NumberLiteral, ReturnStatement};

    fn ident(name: &str) -> ExprNode {
        Node::new(Identifier::new(name))
    }

    fn adder(form: FunctionForm, name: &str) -> Function {
        let sum = Node::new(BinaryExpression {
            operator: "+".to_string(),
            left: ident("a"),
            right: ident("offset"),
        });
        let body = match form {
            FunctionForm::Arrow => sum,
            _ => Node::new(BlockStatement {
                body: vec![Node::new(ReturnStatement { argument: Some(sum) })],
            }),
        };
        Function {
            def: Rc::new(FunctionDef {
                name: name.to_string(),
                params: vec![ident("a")],
                body,
                form,
                is_async: false,
                is_generator: false,
            }),
        }
    }

    #[test]
    fn test_arrow_closes_over_stack() {
        let mut stack = Stack::with_globals();
        stack.set("offset", Value::Number(10.0)).unwrap();
        let f = adder(FunctionForm::Arrow, "").get(&mut stack, None).unwrap();
        let result = f.call(Value::Undefined, vec![Value::Number(5.0)]).unwrap();
        assert_eq!(result.to_number(), 15.0);
        stack.set("offset", Value::Number(20.0)).unwrap();
        let result = f.call(Value::Undefined, vec![Value::Number(5.0)]).unwrap();
        assert_eq!(result.to_number(), 25.0);
    }

    #[test]
    fn test_declaration_binds_its_name() {
        let mut stack = Stack::with_globals();
        stack.set("offset", Value::Number(1.0)).unwrap();
        adder(FunctionForm::Declaration, "inc").get(&mut stack, None).unwrap();
        let inc = stack.get("inc").unwrap();
        assert_eq!(inc.call(Value::Undefined, vec![Value::Number(1.0)]).unwrap().to_number(), 2.0);
        assert_eq!(inc.get_property("name").to_string(), "inc");
    }

    #[test]
    fn test_named_expression_does_not_leak_name() {
        let mut stack = Stack::with_globals();
        adder(FunctionForm::Expression, "hidden").get(&mut stack, None).unwrap();
        assert!(!stack.has("hidden"));
    }

    #[test]
    fn test_display_and_events() {
        let arrow = adder(FunctionForm::Arrow, "");
        assert_eq!(arrow.to_string(), "(a) => a + offset");
        assert_eq!(arrow.events(), vec!["offset"]);
        let declaration = adder(FunctionForm::Declaration, "inc");
        assert_eq!(declaration.to_string(), "function inc(a) {\n  return a + offset;\n}");
    }

    #[test]
    fn test_nested_await_settles_resolved_promise() {
        let mut stack = Stack::with_globals();
        let await_node = AwaitExpression {
            argument: Node::new(NumberLiteral::new(7.0)),
        };
        assert_eq!(await_node.get(&mut stack, None).unwrap().to_number(), 7.0);
        assert_eq!(await_node.to_string(), "await 7");
    }

    #[test]
    fn test_nested_yield_buffers_value() {
        let mut stack = Stack::with_globals();
        let node = YieldExpression {
            argument: Some(Node::new(NumberLiteral::new(1.0))),
            delegate: false,
        };
        assert!(node.get(&mut stack, None).unwrap().is_undefined());
        assert_eq!(stack.yields.len(), 1);
    }
}
