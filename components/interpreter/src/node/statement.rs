//! Simple statements: blocks, declarations, jumps and `if`.

use super::{
    list_json, node_field, node_list, opt_json, opt_node_field, opt_str_field, str_field, union,
    Completion, ExprNode, ExpressionNode, Node,
};
use crate::registry::DeserializerRegistry;
use crate::runtime::machine::{DeclarationFrame, Frame, ListFrame, Machine, StatementNode};
use crate::scope::DeclarationKind;
use crate::stack::{AwaitPromiseInfo, Stack, YieldInfo};
use crate::runtime::to_promise;
use core_types::{JsError, JsResult, Value};
use serde_json::json;
use std::fmt;

/// False for statements that end in a block.
pub(crate) fn needs_semicolon(node: &Node) -> bool {
    match node {
        Node::BlockStatement(_)
        | Node::IfStatement(_)
        | Node::ForStatement(_)
        | Node::ForOfStatement(_)
        | Node::ForInStatement(_)
        | Node::ForAwaitStatement(_)
        | Node::WhileStatement(_)
        | Node::SwitchStatement(_)
        | Node::SwitchCase(_)
        | Node::TryStatement(_)
        | Node::LabeledStatement(_)
        | Node::EmptyStatement(_)
        | Node::StaticBlock(_)
        | Node::MethodDefinition(_) => false,
        Node::Function(f) => f.def.form != super::FunctionForm::Declaration,
        Node::Class(c) => !c.declaration,
        _ => true,
    }
}

/// Write one statement per line, each indented by two spaces.
pub(crate) fn fmt_lines(f: &mut fmt::Formatter<'_>, items: &[ExprNode], indent: &str) -> fmt::Result {
    for item in items {
        let text = if needs_semicolon(item) {
            format!("{};", item)
        } else {
            item.to_string()
        };
        for line in text.lines() {
            if line.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, "{}{}", indent, line)?;
            }
        }
    }
    Ok(())
}

/// Write `{ … }` with one statement per line.
pub(crate) fn fmt_block(f: &mut fmt::Formatter<'_>, items: &[ExprNode]) -> fmt::Result {
    if items.is_empty() {
        return f.write_str("{}");
    }
    f.write_str("{\n")?;
    fmt_lines(f, items, "  ")?;
    f.write_str("}")
}

/// Record a statement-level `await` or `yield` on the stack so the machine
/// can suspend on it. Returns false when `value` is neither.
pub(crate) fn record_marker(
    value: &Node,
    target: Option<ExprNode>,
    declare: Option<DeclarationKind>,
    stack: &mut Stack,
    this: Option<&Value>,
) -> JsResult<bool> {
    match value {
        Node::AwaitExpression(await_node) => {
            let awaited = await_node.argument.get(stack, this)?;
            let scope_type = stack.current().scope_type();
            stack.await_promise.push(AwaitPromiseInfo {
                promise: to_promise(awaited),
                node: target,
                declare_variable: declare,
                scope_type,
                is_return: false,
                replay: false,
            });
            Ok(true)
        }
        Node::YieldExpression(yield_node) => {
            let yielded = match &yield_node.argument {
                Some(argument) => argument.get(stack, this)?,
                None => Value::Undefined,
            };
            stack.yields.push(YieldInfo {
                value: yielded,
                node: target,
                declare_variable: declare,
                delegate: yield_node.delegate,
            });
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn normal(value: Value) -> JsResult<Completion> {
    Ok(Completion::Normal(value))
}

/// A whole script.
pub struct Program {
    /// Top-level statements
    pub body: Vec<ExprNode>,
}

impl StatementNode for Program {
    fn enter(&self, machine: &mut Machine, _stack: &mut Stack) {
        machine.push(Frame::List(ListFrame::new(self.body.clone(), None)));
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", item)?;
            if needs_semicolon(item) {
                f.write_str(";")?;
            }
        }
        Ok(())
    }
}

impl ExpressionNode for Program {
    const TYPE: &'static str = "Program";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(Machine::run_blocking_statement(self, stack, this)?.value())
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

/// `{ … }`.
pub struct BlockStatement {
    /// Statements
    pub body: Vec<ExprNode>,
}

impl StatementNode for BlockStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let depth = stack.depth();
        stack.push_block_scope();
        machine.push(Frame::List(ListFrame::new(self.body.clone(), Some(depth))));
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_block(f, &self.body)
    }
}

impl ExpressionNode for BlockStatement {
    const TYPE: &'static str = "BlockStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(Machine::run_blocking_statement(self, stack, this)?.value())
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

/// An expression in statement position.
///
/// `await x`, `yield x`, `target = await x` and `target = yield x` are
/// recorded as markers instead of being evaluated in place, so the
/// enclosing body can suspend.
pub struct ExpressionStatement {
    /// The expression
    pub expression: ExprNode,
}

impl ExpressionStatement {
    fn run(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Completion> {
        if record_marker(&self.expression, None, None, stack, this)? {
            return normal(Value::Undefined);
        }
        if let Node::AssignmentExpression(assign) = &*self.expression {
            if assign.operator == "="
                && record_marker(&assign.right, Some(assign.left.clone()), None, stack, this)?
            {
                return normal(Value::Undefined);
            }
        }
        normal(self.expression.get(stack, this)?)
    }
}

impl StatementNode for ExpressionStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let outcome = self.run(stack, this.as_ref());
        machine.finish(stack, outcome);
    }
}

impl fmt::Display for ExpressionStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.expression {
            Node::ObjectExpression(_) => write!(f, "({})", self.expression),
            _ => write!(f, "{}", self.expression),
        }
    }
}

impl ExpressionNode for ExpressionStatement {
    const TYPE: &'static str = "ExpressionStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.expression.get(stack, this)
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

/// `let a = 1, b;`.
pub struct VariableDeclaration {
    /// `var`, `let` or `const`
    pub kind: DeclarationKind,
    /// `VariableDeclarator` nodes
    pub declarations: Vec<ExprNode>,
}

impl StatementNode for VariableDeclaration {
    fn enter(&self, machine: &mut Machine, _stack: &mut Stack) {
        machine.push(Frame::Declarations(DeclarationFrame {
            declarators: self.declarations.clone(),
            index: 0,
            kind: self.kind,
        }));
    }
}

impl VariableDeclaration {
    /// Declare every binding in place, without suspending.
    pub(crate) fn run(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<()> {
        for declarator in &self.declarations {
            match &**declarator {
                Node::VariableDeclarator(decl) => decl.run(stack, this, self.kind, false)?,
                other => return Err(JsError::not_assignable(other)),
            }
        }
        Ok(())
    }
}

impl fmt::Display for VariableDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind)?;
        super::fmt_list(f, &self.declarations, ", ")
    }
}

impl ExpressionNode for VariableDeclaration {
    const TYPE: &'static str = "VariableDeclaration";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.run(stack, this)?;
        Ok(Value::Undefined)
    }

    fn entry(&self) -> Vec<String> {
        union(&self.declarations, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.declarations, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "kind": self.kind.as_str(),
            "declarations": list_json(&self.declarations),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let keyword = str_field(json, "kind")?;
        let kind = DeclarationKind::from_keyword(&keyword)
            .ok_or_else(|| JsError::deserialize(format!("unknown declaration kind '{}'", keyword)))?;
        Ok(Self {
            kind,
            declarations: node_list(json, "declarations", registry)?,
        })
    }
}

/// One `id = init` binding of a declaration.
pub struct VariableDeclarator {
    /// Identifier or pattern
    pub id: ExprNode,
    /// Initializer
    pub init: Option<ExprNode>,
}

impl VariableDeclarator {
    /// Bind `id`. With `markers`, an `await` or `yield` initializer is
    /// recorded for the machine and bound when it resumes.
    pub(crate) fn run(
        &self,
        stack: &mut Stack,
        this: Option<&Value>,
        kind: DeclarationKind,
        markers: bool,
    ) -> JsResult<()> {
        let Some(init) = &self.init else {
            // `var x;` leaves an existing binding alone
            if kind == DeclarationKind::Var {
                if let Some(name) = self.id.as_identifier() {
                    if stack.has(name) && !stack.get(name)?.is_undefined() {
                        return Ok(());
                    }
                }
            }
            return self.id.declare(stack, Value::Undefined, kind);
        };
        if markers && record_marker(init, Some(self.id.clone()), Some(kind), stack, this)? {
            return Ok(());
        }
        let value = match self.id.as_identifier() {
            Some(name) => init.get_named(stack, this, name)?,
            None => init.get(stack, this)?,
        };
        self.id.declare(stack, value, kind)
    }
}

impl fmt::Display for VariableDeclarator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(init) = &self.init {
            write!(f, " = {}", init)?;
        }
        Ok(())
    }
}

impl ExpressionNode for VariableDeclarator {
    const TYPE: &'static str = "VariableDeclarator";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        self.run(stack, this, DeclarationKind::Let, false)?;
        Ok(Value::Undefined)
    }

    fn entry(&self) -> Vec<String> {
        self.init.iter().flat_map(|init| init.entry()).collect()
    }

    fn events(&self) -> Vec<String> {
        self.init.iter().flat_map(|init| init.events()).collect()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "id": self.id.to_json(),
            "init": opt_json(&self.init),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            id: node_field(json, "id", registry)?,
            init: opt_node_field(json, "init", registry)?,
        })
    }
}

/// `if (test) consequent else alternate`.
pub struct IfStatement {
    /// Condition
    pub test: ExprNode,
    /// Runs when the test is truthy
    pub consequent: ExprNode,
    /// Runs otherwise
    pub alternate: Option<ExprNode>,
}

impl StatementNode for IfStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        match self.test.get(stack, this.as_ref()) {
            Ok(test) if test.is_truthy() => machine.push_statement(self.consequent.clone()),
            Ok(_) => match &self.alternate {
                Some(alternate) => machine.push_statement(alternate.clone()),
                None => machine.finish(stack, normal(Value::Undefined)),
            },
            Err(err) => machine.finish(stack, Err(err)),
        }
    }
}

impl fmt::Display for IfStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if ({}) {}", self.test, self.consequent)?;
        if needs_semicolon(&self.consequent) {
            f.write_str(";")?;
        }
        if let Some(alternate) = &self.alternate {
            write!(f, " else {}", alternate)?;
            if needs_semicolon(alternate) {
                f.write_str(";")?;
            }
        }
        Ok(())
    }
}

impl ExpressionNode for IfStatement {
    const TYPE: &'static str = "IfStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(Machine::run_blocking_statement(self, stack, this)?.value())
    }

    fn entry(&self) -> Vec<String> {
        let mut nodes = vec![&self.test, &self.consequent];
        nodes.extend(self.alternate.iter());
        union(nodes, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        let mut nodes = vec![&self.test, &self.consequent];
        nodes.extend(self.alternate.iter());
        union(nodes, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "test": self.test.to_json(),
            "consequent": self.consequent.to_json(),
            "alternate": opt_json(&self.alternate),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            test: node_field(json, "test", registry)?,
            consequent: node_field(json, "consequent", registry)?,
            alternate: opt_node_field(json, "alternate", registry)?,
        })
    }
}

/// `throw argument`.
pub struct ThrowStatement {
    /// Thrown value
    pub argument: ExprNode,
}

impl StatementNode for ThrowStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let outcome = self
            .argument
            .get(stack, this.as_ref())
            .and_then(|value| Err(JsError::Throw(value)));
        machine.finish(stack, outcome);
    }
}

impl fmt::Display for ThrowStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "throw {}", self.argument)
    }
}

impl ExpressionNode for ThrowStatement {
    const TYPE: &'static str = "ThrowStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Err(JsError::Throw(self.argument.get(stack, this)?))
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

/// `return argument`.
pub struct ReturnStatement {
    /// Returned value; `None` returns `undefined`
    pub argument: Option<ExprNode>,
}

impl ReturnStatement {
    fn run(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Completion> {
        let Some(argument) = &self.argument else {
            return Ok(Completion::Return(Value::Undefined));
        };
        if let Node::AwaitExpression(await_node) = &**argument {
            let awaited = await_node.argument.get(stack, this)?;
            let scope_type = stack.current().scope_type();
            stack.await_promise.push(AwaitPromiseInfo {
                promise: to_promise(awaited),
                node: None,
                declare_variable: None,
                scope_type,
                is_return: true,
                replay: false,
            });
            return normal(Value::Undefined);
        }
        Ok(Completion::Return(argument.get(stack, this)?))
    }
}

impl StatementNode for ReturnStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        let this = machine.this();
        let outcome = self.run(stack, this.as_ref());
        machine.finish(stack, outcome);
    }
}

impl fmt::Display for ReturnStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "return {}", argument),
            None => f.write_str("return"),
        }
    }
}

impl ExpressionNode for ReturnStatement {
    const TYPE: &'static str = "ReturnStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        match &self.argument {
            Some(argument) => argument.get(stack, this),
            None => Ok(Value::Undefined),
        }
    }

    fn entry(&self) -> Vec<String> {
        self.argument.iter().flat_map(|a| a.entry()).collect()
    }

    fn events(&self) -> Vec<String> {
        self.argument.iter().flat_map(|a| a.events()).collect()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "argument": opt_json(&self.argument) })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            argument: opt_node_field(json, "argument", registry)?,
        })
    }
}

macro_rules! jump_statement {
    ($name:ident, $keyword:literal, $variant:ident) => {
        #[doc = concat!("`", $keyword, "`, optionally with a label.")]
        pub struct $name {
            /// Target label
            pub label: Option<String>,
        }

        impl StatementNode for $name {
            fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
                machine.finish(stack, Ok(Completion::$variant(self.label.clone())));
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match &self.label {
                    Some(label) => write!(f, "{} {}", $keyword, label),
                    None => f.write_str($keyword),
                }
            }
        }

        impl ExpressionNode for $name {
            const TYPE: &'static str = stringify!($name);

            fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
                Err(JsError::Throw(Value::new_error(
                    "SyntaxError",
                    concat!("Illegal ", $keyword, " statement"),
                )))
            }

            fn to_json(&self) -> serde_json::Value {
                json!({ "type": Self::TYPE, "label": self.label })
            }

            fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
                Ok(Self {
                    label: opt_str_field(json, "label"),
                })
            }
        }
    };
}

jump_statement!(BreakStatement, "break", Break);
jump_statement!(ContinueStatement, "continue", Continue);

/// `;`.
pub struct EmptyStatement;

impl StatementNode for EmptyStatement {
    fn enter(&self, machine: &mut Machine, stack: &mut Stack) {
        machine.finish(stack, normal(Value::Undefined));
    }
}

impl fmt::Display for EmptyStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(";")
    }
}

impl ExpressionNode for EmptyStatement {
    const TYPE: &'static str = "EmptyStatement";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::Undefined)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE })
    }

    fn from_json(_json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self)
    }
}

/// `label: body`.
pub struct LabeledStatement {
    /// Label name
    pub label: String,
    /// Labeled statement
    pub body: ExprNode,
}

impl StatementNode for LabeledStatement {
    fn enter(&self, machine: &mut Machine, _stack: &mut Stack) {
        let mut labels = machine.take_labels();
        labels.push(self.label.clone());
        machine.push(Frame::Label(self.label.clone()));
        machine.push_labeled(self.body.clone(), labels);
    }
}

impl fmt::Display for LabeledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.body)?;
        if needs_semicolon(&self.body) {
            f.write_str(";")?;
        }
        Ok(())
    }
}

impl ExpressionNode for LabeledStatement {
    const TYPE: &'static str = "LabeledStatement";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        Ok(Machine::run_blocking_statement(self, stack, this)?.value())
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
            "label": self.label,
            "body": self.body.to_json(),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            label: str_field(json, "label")?,
            body: node_field(json, "body", registry)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AssignmentExpression, BinaryExpression, Identifier, NumberLiteral};

    fn ident(name: &str) -> ExprNode {
        Node::new(Identifier::new(name))
    }

    fn num(n: f64) -> ExprNode {
        Node::new(NumberLiteral::new(n))
    }

    fn declare(kind: DeclarationKind, name: &str, init: ExprNode) -> ExprNode {
        Node::new(VariableDeclaration {
            kind,
            declarations: vec![Node::new(VariableDeclarator {
                id: ident(name),
                init: Some(init),
            })],
        })
    }

    #[test]
    fn test_block_scopes_let() {
        let mut stack = Stack::with_globals();
        let program = Node::new(Program {
            body: vec![
                declare(DeclarationKind::Let, "x", num(1.0)),
                Node::new(BlockStatement {
                    body: vec![declare(DeclarationKind::Let, "x", num(2.0))],
                }),
                Node::new(ExpressionStatement { expression: ident("x") }),
            ],
        });
        let completion = program.execute(&mut stack, None).unwrap();
        assert_eq!(completion.value().to_number(), 1.0);
    }

    #[test]
    fn test_if_else_and_completion_value() {
        let mut stack = Stack::with_globals();
        stack.set("n", Value::Number(3.0)).unwrap();
        let node = Node::new(IfStatement {
            test: Node::new(BinaryExpression {
                operator: ">".to_string(),
                left: ident("n"),
                right: num(5.0),
            }),
            consequent: Node::new(ExpressionStatement { expression: num(1.0) }),
            alternate: Some(Node::new(ExpressionStatement { expression: num(2.0) })),
        });
        assert_eq!(node.execute(&mut stack, None).unwrap().value().to_number(), 2.0);
        assert_eq!(node.to_string(), "if (n > 5) 1; else 2;");
    }

    #[test]
    fn test_throw_is_catchable_error() {
        let mut stack = Stack::with_globals();
        let node = Node::new(ThrowStatement { argument: num(42.0) });
        match node.execute(&mut stack, None) {
            Err(JsError::Throw(value)) => assert_eq!(value.to_number(), 42.0),
            other => panic!("expected a throw, got {:?}", other.map(|c| c.value())),
        }
    }

    #[test]
    fn test_const_rejects_reassignment() {
        let mut stack = Stack::with_globals();
        let program = Node::new(Program {
            body: vec![
                declare(DeclarationKind::Const, "c", num(1.0)),
                Node::new(ExpressionStatement {
                    expression: Node::new(AssignmentExpression {
                        operator: "=".to_string(),
                        left: ident("c"),
                        right: num(2.0),
                    }),
                }),
            ],
        });
        assert!(program.execute(&mut stack, None).is_err());
    }

    #[test]
    fn test_program_display() {
        let program = Program {
            body: vec![
                declare(DeclarationKind::Let, "x", num(1.0)),
                Node::new(BlockStatement {
                    body: vec![Node::new(ReturnStatement { argument: Some(ident("x")) })],
                }),
            ],
        };
        assert_eq!(program.to_string(), "let x = 1;\n{\n  return x;\n}");
    }
}
