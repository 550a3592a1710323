//! Loops, `switch` and `try`.
//!
//! Each statement here only pushes a frame; the iteration itself lives in
//! the machine so that a loop body can suspend on `await` or `yield` and
//! pick up where it left off.

use super::statement::{fmt_lines, needs_semicolon};
use super::{
    list_json, node_field, node_list, opt_json, opt_node_field, union, Completion, ExprNode,
    ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::runtime::machine::{
    Frame, IterateFrame, ListFrame, LoopFrame, LoopKind, Machine, StatementNode, TryFrame, TryState,
};
use crate::stack::{ForAwaitInfo, Stack};
use builtins::{own_keys, ValueIterator};
use core_types::{ErrorKind, JsError, JsResult, Value};
use serde_json::json;
use std::fmt;

fn write_body(f: &mut fmt::Formatter<'_>, body: &Node) -> fmt::Result {
    write!(f, "{}", body)?;
    if needs_semicolon(body) {
        f.write_str(";")?;
    }
    Ok(())
}

fn blocking(statement: &dyn StatementNode, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
    Ok(Machine::run_blocking_statement(statement, stack, this)?.value())
}

/// `for (init; test; update) body`.
pub struct ForStatement {
    /// Declaration or expression run once
    pub init: Option<ExprNode>,
    /// Checked before each iteration; missing means `true`
    pub test: Option<ExprNode>,
    /// Run after each iteration
    pub update: Option<ExprNode>,
    /// Loop body
    pub body: ExprNode,
}

impl StatementNode for ForStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let labels = machine.take_labels();
        let this = machine.this();
        let outer = stack.depth();
        stack.push_block_scope();
        let initialized = match self.init.as_deref() {
            Some(Node::VariableDeclaration(decl)) => decl.run(stack, this.as_ref()),
            Some(init) => init.get(stack, this.as_ref()).map(|_| ()),
            None => Ok(()),
        };
        if let Err(err) = initialized {
            stack.clear_to(outer);
            return machine.finish(stack, Err(err));
        }
        machine.push(Frame::Loop(LoopFrame {
            kind: LoopKind::For {
                test: self.test.clone(),
                update: self.update.clone(),
            },
            body: self.body.clone(),
            labels,
            depth: stack.depth(),
            outer,
            started: false,
            updated: false,
            last: Value::Undefined,
        }));
    }
}

impl fmt::Display for ForStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("for (")?;
        if let Some(init) = &self.init {
            write!(f, "{}", init)?;
        }
        f.write_str(";")?;
        if let Some(test) = &self.test {
            write!(f, " {}", test)?;
        }
        f.write_str(";")?;
        if let Some(update) = &self.update {
            write!(f, " {}", update)?;
        }
        f.write_str(") ")?;
        write_body(f, &self.body)
    }
}

impl ExpressionNode for ForStatement {
    const TYPE: &'static str = "ForStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        blocking(self, stack, this)
    }

    fn entry(&self) -> Vec<String> {
        let nodes = self.init.iter().chain(&self.test).chain(&self.update);
        union(nodes.chain(std::iter::once(&self.body)), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        let nodes = self.init.iter().chain(&self.test).chain(&self.update);
        union(nodes.chain(std::iter::once(&self.body)), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "init": opt_json(&self.init),
            "test": opt_json(&self.test),
            "update": opt_json(&self.update),
            "body": self.body.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            init: opt_node_field(json, "init", registry)?,
            test: opt_node_field(json, "test", registry)?,
            update: opt_node_field(json, "update", registry)?,
            body: node_field(json, "body", registry)?,
        })
    }
}

macro_rules! iteration_statement {
    ($name:ident, $keyword:literal, $doc:literal) => {
        #[doc = $doc]
        pub struct $name {
            /// Loop variable: a declaration or an assignment target
            pub left: ExprNode,
            /// Iterated value
            pub right: ExprNode,
            /// Loop body
            pub body: ExprNode,
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($keyword, " ({} {} {}) "), self.left, Self::OPERATOR, self.right)?;
                write_body(f, &self.body)
            }
        }

        impl ExpressionNode for $name {
            const TYPE: &'static str = stringify!($name);

            fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
                blocking(self, stack, this)
            }

            fn entry(&self) -> Vec<String> {
                union([&self.right, &self.body], Node::entry)
            }

            fn events(&self) -> Vec<String> {
                union([&self.right, &self.body], Node::events)
            }

            fn to_json(&self) -> serde_json::Value {
                json!({
                    "type": Self::TYPE,
                    "left": self.left.to_json(),
                    "right": self.right.to_json(),
                    "body": self.body.to_json(),
                })
            }

            fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
                Ok(Self {
                    left: node_field(json, "left", registry)?,
                    right: node_field(json, "right", registry)?,
                    body: node_field(json, "body", registry)?,
                })
            }
        }
    };
}

iteration_statement!(ForOfStatement, "for", "`for (left of right) body`.");
iteration_statement!(ForInStatement, "for", "`for (left in right) body`, over own enumerable keys.");
iteration_statement!(
    ForAwaitStatement,
    "for await",
    "`for await (left of right) body`. Consumption is left to the enclosing async driver."
);

impl ForOfStatement {
    const OPERATOR: &'static str = "of";
}

impl ForInStatement {
    const OPERATOR: &'static str = "in";
}

impl ForAwaitStatement {
    const OPERATOR: &'static str = "of";
}

fn push_iteration(
    machine: &mut Machine,
    stack: &mut Stack,
    iterable: JsResult<Value>,
    left: &ExprNode,
    body: &ExprNode,
) {
    let labels = machine.take_labels();
    let iter = iterable.and_then(|value| ValueIterator::new(&value));
    match iter {
        Ok(iter) => machine.push(Frame::Iterate(IterateFrame {
            iter,
            left: left.clone(),
            body: body.clone(),
            labels,
            depth: stack.depth(),
            last: Value::Undefined,
        })),
        Err(err) => machine.finish(stack, Err(err)),
    }
}

impl StatementNode for ForOfStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let iterable = self.right.get(stack, this.as_ref());
        push_iteration(machine, stack, iterable, &self.left, &self.body);
    }
}

impl StatementNode for ForInStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let keys = self.right.get(stack, this.as_ref()).map(|target| {
            if target.is_nullish() {
                Value::new_array(Vec::new())
            } else {
                Value::new_array(own_keys(&target).into_iter().map(Value::String).collect())
            }
        });
        push_iteration(machine, stack, keys, &self.left, &self.body);
    }
}

impl StatementNode for ForAwaitStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let labels = machine.take_labels();
        match self.right.get(stack, this.as_ref()) {
            Ok(iterable) => {
                stack.for_await = Some(ForAwaitInfo {
                    iterable,
                    node: Node::new(ForAwaitStatement {
                        left: self.left.clone(),
                        right: self.right.clone(),
                        body: self.body.clone(),
                    }),
                    labels,
                });
                machine.finish(stack, Ok(Completion::Normal(Value::Undefined)));
            }
            Err(err) => machine.finish(stack, Err(err)),
        }
    }
}

/// `while (test) body`.
pub struct WhileStatement {
    /// Checked before each iteration
    pub test: ExprNode,
    /// Loop body
    pub body: ExprNode,
}

impl StatementNode for WhileStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let labels = machine.take_labels();
        let depth = stack.depth();
        machine.push(Frame::Loop(LoopFrame {
            kind: LoopKind::While(self.test.clone()),
            body: self.body.clone(),
            labels,
            depth,
            outer: depth,
            started: false,
            updated: false,
            last: Value::Undefined,
        }));
    }
}

impl fmt::Display for WhileStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "while ({}) ", self.test)?;
        write_body(f, &self.body)
    }
}

impl ExpressionNode for WhileStatement {
    const TYPE: &'static str = "WhileStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        blocking(self, stack, this)
    }

    fn entry(&self) -> Vec<String> {
        union([&self.test, &self.body], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.test, &self.body], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "test": self.test.to_json(),
            "body": self.body.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            test: node_field(json, "test", registry)?,
            body: node_field(json, "body", registry)?,
        })
    }
}

/// `do body while (test)`.
pub struct DoWhileStatement {
    /// Loop body, run at least once
    pub body: ExprNode,
    /// Checked after each iteration
    pub test: ExprNode,
}

impl StatementNode for DoWhileStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let labels = machine.take_labels();
        let depth = stack.depth();
        machine.push(Frame::Loop(LoopFrame {
            kind: LoopKind::DoWhile(self.test.clone()),
            body: self.body.clone(),
            labels,
            depth,
            outer: depth,
            started: false,
            updated: false,
            last: Value::Undefined,
        }));
    }
}

impl fmt::Display for DoWhileStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("do ")?;
        write_body(f, &self.body)?;
        write!(f, " while ({})", self.test)
    }
}

impl ExpressionNode for DoWhileStatement {
    const TYPE: &'static str = "DoWhileStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        blocking(self, stack, this)
    }

    fn entry(&self) -> Vec<String> {
        union([&self.body, &self.test], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.body, &self.test], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "body": self.body.to_json(),
            "test": self.test.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            body: node_field(json, "body", registry)?,
            test: node_field(json, "test", registry)?,
        })
    }
}

/// `switch (discriminant) { cases }`.
pub struct SwitchStatement {
    /// Compared against each case test with strict equality
    pub discriminant: ExprNode,
    /// `SwitchCase` nodes
    pub cases: Vec<ExprNode>,
}

impl SwitchStatement {
    /// Index of the case to start from, if any.
    fn entry_case(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Option<usize>> {
        let value = self.discriminant.get(stack, this)?;
        let mut default = None;
        for (index, case) in self.cases.iter().enumerate() {
            let Node::SwitchCase(case) = &**case else {
                return Err(JsError::eval(
                    ErrorKind::InternalError,
                    format!("switch holds a {}", case.type_tag()),
                ));
            };
            match &case.test {
                Some(test) => {
                    if test.get(stack, this)?.strict_equals(&value) {
                        return Ok(Some(index));
                    }
                }
                None => default = Some(index),
            }
        }
        Ok(default)
    }
}

impl StatementNode for SwitchStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let start = match self.entry_case(stack, this.as_ref()) {
            Ok(Some(start)) => start,
            Ok(None) => return machine.finish(stack, Ok(Completion::Normal(Value::Undefined))),
            Err(err) => return machine.finish(stack, Err(err)),
        };
        let statements: Vec<ExprNode> = self.cases[start..]
            .iter()
            .filter_map(|case| match &**case {
                Node::SwitchCase(case) => Some(case.consequent.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        let depth = stack.depth();
        stack.push_block_scope();
        let mut list = ListFrame::new(statements, Some(depth));
        list.breakable = true;
        machine.push(Frame::List(list));
    }
}

impl fmt::Display for SwitchStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "switch ({}) ", self.discriminant)?;
        if self.cases.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{\n")?;
        fmt_lines(f, &self.cases, "  ")?;
        f.write_str("}")
    }
}

impl ExpressionNode for SwitchStatement {
    const TYPE: &'static str = "SwitchStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        blocking(self, stack, this)
    }

    fn entry(&self) -> Vec<String> {
        union(std::iter::once(&self.discriminant).chain(&self.cases), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(std::iter::once(&self.discriminant).chain(&self.cases), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "discriminant": self.discriminant.to_json(),
            "cases": list_json(&self.cases),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let cases = node_list(json, "cases", registry)?;
        if let Some(bad) = cases.iter().find(|case| !matches!(***case, Node::SwitchCase(_))) {
            return Err(JsError::deserialize(format!(
                "switch case expected, found {}",
                bad.type_tag()
            )));
        }
        Ok(Self {
            discriminant: node_field(json, "discriminant", registry)?,
            cases,
        })
    }
}

/// `case test:` or `default:` with its statements.
pub struct SwitchCase {
    /// `None` for `default`
    pub test: Option<ExprNode>,
    /// Statements up to the next case
    pub consequent: Vec<ExprNode>,
}

impl fmt::Display for SwitchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.test {
            Some(test) => write!(f, "case {}:", test)?,
            None => f.write_str("default:")?,
        }
        if !self.consequent.is_empty() {
            f.write_str("\n")?;
            fmt_lines(f, &self.consequent, "  ")?;
        }
        Ok(())
    }
}

impl ExpressionNode for SwitchCase {
    const TYPE: &'static str = "SwitchCase";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Err(JsError::eval(
            ErrorKind::InternalError,
            "switch case evaluated outside its switch",
        ))
    }

    fn entry(&self) -> Vec<String> {
        union(self.test.iter().chain(&self.consequent), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(self.test.iter().chain(&self.consequent), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "test": opt_json(&self.test),
            "consequent": list_json(&self.consequent),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            test: opt_node_field(json, "test", registry)?,
            consequent: node_list(json, "consequent", registry)?,
        })
    }
}

/// `try block catch (param) handler finally finalizer`.
pub struct TryStatement {
    /// Guarded block
    pub block: ExprNode,
    /// `CatchClause`
    pub handler: Option<ExprNode>,
    /// Always runs; an abrupt completion here replaces the pending one
    pub finalizer: Option<ExprNode>,
}

impl StatementNode for TryStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let (param, handler) = match self.handler.as_deref() {
            Some(Node::CatchClause(clause)) => (clause.param.clone(), Some(clause.body.clone())),
            Some(_) => (None, self.handler.clone()),
            None => (None, None),
        };
        machine.push(Frame::Try(TryFrame {
            param,
            handler,
            finalizer: self.finalizer.clone(),
            state: TryState::Block,
            pending: None,
            depth: stack.depth(),
        }));
        machine.push_statement(self.block.clone());
    }
}

impl fmt::Display for TryStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "try {}", self.block)?;
        if let Some(handler) = &self.handler {
            write!(f, " {}", handler)?;
        }
        if let Some(finalizer) = &self.finalizer {
            write!(f, " finally {}", finalizer)?;
        }
        Ok(())
    }
}

impl ExpressionNode for TryStatement {
    const TYPE: &'static str = "TryStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        blocking(self, stack, this)
    }

    fn entry(&self) -> Vec<String> {
        union(std::iter::once(&self.block).chain(&self.handler).chain(&self.finalizer), Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(std::iter::once(&self.block).chain(&self.handler).chain(&self.finalizer), Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "block": self.block.to_json(),
            "handler": opt_json(&self.handler),
            "finalizer": opt_json(&self.finalizer),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let node = Self {
            block: node_field(json, "block", registry)?,
            handler: opt_node_field(json, "handler", registry)?,
            finalizer: opt_node_field(json, "finalizer", registry)?,
        };
        if node.handler.is_none() && node.finalizer.is_none() {
            return Err(JsError::deserialize("try statement needs a catch or finally clause"));
        }
        if let Some(handler) = &node.handler {
            if !matches!(**handler, Node::CatchClause(_)) {
                return Err(JsError::deserialize(format!(
                    "catch clause expected, found {}",
                    handler.type_tag()
                )));
            }
        }
        Ok(node)
    }
}

/// `catch (param) body`.
pub struct CatchClause {
    /// Binding for the caught value; `catch {}` has none
    pub param: Option<ExprNode>,
    /// Handler block
    pub body: ExprNode,
}

impl fmt::Display for CatchClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "catch ({}) {}", param, self.body),
            None => write!(f, "catch {}", self.body),
        }
    }
}

impl ExpressionNode for CatchClause {
    const TYPE: &'static str = "CatchClause";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(self.body.execute(stack, this)?.value())
    }

    fn entry(&self) -> Vec<String> {
        self.body.entry()
    }

    fn events(&self) -> Vec<String> {
        self.body.events()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "param": opt_json(&self.param),
            "body": self.body.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            param: opt_node_field(json, "param", registry)?,
            body: node_field(json, "body", registry)?,
        })
    }
}
