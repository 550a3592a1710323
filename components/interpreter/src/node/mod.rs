//! AST node set.
//!
//! Every node kind is a struct implementing [`ExpressionNode`]; [`Node`] is
//! the closed enum over all of them and forwards each operation to the
//! wrapped struct. Nodes are immutable once built and shared through
//! [`ExprNode`] handles, so a parsed or deserialized tree can be evaluated
//! any number of times against different stacks.

mod access;
mod class;
mod collection;
mod control;
mod function;
mod literal;
mod operator;
mod pattern;
mod statement;

pub use access::{CallExpression, MemberExpression, NewExpression, SuperCall, SuperMember};
pub use class::{Class, MethodDefinition, MethodKind, PropertyDefinition, StaticBlock};
pub use collection::{ArrayExpression, ObjectExpression, Property, PropertyKind, RestElement, SpreadElement};
pub use control::{
    CatchClause, DoWhileStatement, ForAwaitStatement, ForInStatement, ForOfStatement,
    ForStatement, SwitchCase, SwitchStatement, TryStatement, WhileStatement,
};
pub use function::{AwaitExpression, Function, FunctionForm, YieldExpression};
pub use literal::{
    BigIntLiteral, BooleanLiteral, Identifier, NullLiteral, NumberLiteral, RegExpLiteral,
    StringLiteral, TaggedTemplateExpression, TemplateLiteral, ThisExpression,
};
pub use operator::{
    AssignmentExpression, BinaryExpression, ConditionalExpression, LogicalExpression,
    ParenthesizedExpression, PipelineExpression, SequenceExpression, UnaryExpression,
    UpdateExpression,
};
pub use pattern::{ArrayPattern, AssignmentPattern, ObjectPattern};
pub use statement::{
    BlockStatement, BreakStatement, ContinueStatement, EmptyStatement, ExpressionStatement,
    IfStatement, LabeledStatement, Program, ReturnStatement, ThrowStatement,
    VariableDeclaration, VariableDeclarator,
};

use crate::registry::DeserializerRegistry;
use crate::runtime::machine::{Machine, StatementNode};
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use core_types::{JsError, JsResult, Value};
use std::fmt;
use std::rc::Rc;

/// Shared handle to an AST node.
pub type ExprNode = Rc<Node>;

/// Result of running a statement.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Ran to the end, producing a value
    Normal(Value),
    /// `return`
    Return(Value),
    /// `break`, with an optional label
    Break(Option<String>),
    /// `continue`, with an optional label
    Continue(Option<String>),
}

impl Completion {
    /// Value carried by a normal or return completion.
    pub fn value(self) -> Value {
        match self {
            Completion::Normal(value) | Completion::Return(value) => value,
            Completion::Break(_) | Completion::Continue(_) => Value::Undefined,
        }
    }
}

/// Operations shared by every node kind.
pub trait ExpressionNode: fmt::Display {
    /// Tag written to the `type` field of the JSON form.
    const TYPE: &'static str;

    /// Evaluate the node.
    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value>;

    /// Assign `value` to the location this node names.
    fn set(&self, _stack: &mut Stack, _value: Value) -> JsResult<()> {
        Err(JsError::not_assignable(self))
    }

    /// Bind `value` to the names this node introduces.
    fn declare(&self, _stack: &mut Stack, _value: Value, _kind: DeclarationKind) -> JsResult<()> {
        Err(JsError::not_assignable(self))
    }

    /// Root identifier names read by this node.
    fn entry(&self) -> Vec<String> {
        Vec::new()
    }

    /// Dotted dependency paths read by this node, e.g. `user.name`.
    fn events(&self) -> Vec<String> {
        Vec::new()
    }

    /// JSON form, including the `type` tag.
    fn to_json(&self) -> serde_json::Value;

    /// Rebuild from the JSON form, using `registry` for child nodes.
    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self>
    where
        Self: Sized;
}

macro_rules! define_nodes {
    ($($variant:ident),* $(,)?) => {
        /// Every kind of AST node.
        pub enum Node {
            $(
                #[allow(missing_docs)]
                $variant($variant),
            )*
        }

        impl Node {
            /// The node's type tag.
            pub fn type_tag(&self) -> &'static str {
                match self {
                    $(Node::$variant(_) => <$variant as ExpressionNode>::TYPE,)*
                }
            }

            /// Evaluate the node.
            pub fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
                match self {
                    $(Node::$variant(node) => node.get(stack, this),)*
                }
            }

            /// Assign through the node.
            pub fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
                match self {
                    $(Node::$variant(node) => node.set(stack, value),)*
                }
            }

            /// Bind the names introduced by the node.
            pub fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
                match self {
                    $(Node::$variant(node) => node.declare(stack, value, kind),)*
                }
            }

            /// Root identifier names read by the node.
            pub fn entry(&self) -> Vec<String> {
                match self {
                    $(Node::$variant(node) => node.entry(),)*
                }
            }

            /// Dotted dependency paths read by the node.
            pub fn events(&self) -> Vec<String> {
                match self {
                    $(Node::$variant(node) => node.events(),)*
                }
            }

            /// JSON form of the node.
            pub fn to_json(&self) -> serde_json::Value {
                match self {
                    $(Node::$variant(node) => node.to_json(),)*
                }
            }
        }

        impl fmt::Display for Node {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Node::$variant(node) => fmt::Display::fmt(node, f),)*
                }
            }
        }

        $(
            impl From<$variant> for Node {
                fn from(node: $variant) -> Self {
                    Node::$variant(node)
                }
            }
        )*

        pub(crate) fn register_defaults(registry: &mut DeserializerRegistry) {
            $(
                registry.register(<$variant as ExpressionNode>::TYPE, |json, registry| {
                    Ok(Rc::new(Node::$variant($variant::from_json(json, registry)?)))
                });
            )*
        }
    };
}

define_nodes! {
    StringLiteral,
    NumberLiteral,
    BigIntLiteral,
    BooleanLiteral,
    NullLiteral,
    RegExpLiteral,
    TemplateLiteral,
    TaggedTemplateExpression,
    Identifier,
    ThisExpression,
    ArrayExpression,
    ObjectExpression,
    Property,
    SpreadElement,
    RestElement,
    ParenthesizedExpression,
    BinaryExpression,
    LogicalExpression,
    UnaryExpression,
    UpdateExpression,
    AssignmentExpression,
    ConditionalExpression,
    SequenceExpression,
    PipelineExpression,
    MemberExpression,
    CallExpression,
    NewExpression,
    SuperMember,
    SuperCall,
    ObjectPattern,
    ArrayPattern,
    AssignmentPattern,
    Program,
    BlockStatement,
    ExpressionStatement,
    VariableDeclaration,
    VariableDeclarator,
    IfStatement,
    ForStatement,
    ForOfStatement,
    ForInStatement,
    ForAwaitStatement,
    WhileStatement,
    DoWhileStatement,
    SwitchStatement,
    SwitchCase,
    TryStatement,
    CatchClause,
    ThrowStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    EmptyStatement,
    LabeledStatement,
    Function,
    Class,
    MethodDefinition,
    PropertyDefinition,
    StaticBlock,
    AwaitExpression,
    YieldExpression,
}

impl Node {
    /// Wrap a node struct into a shared handle.
    pub fn new(node: impl Into<Node>) -> ExprNode {
        Rc::new(node.into())
    }

    /// Run the node as a statement.
    pub fn execute(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Completion> {
        match self.as_statement() {
            Some(statement) => Machine::run_blocking_statement(statement, stack, this),
            None => Ok(Completion::Normal(self.get(stack, this)?)),
        }
    }

    /// Dependency paths as seen from a binding nested under `parent`: each
    /// path from [`Node::events`] gets the `parent.` prefix.
    pub fn events_under(&self, parent: Option<&str>) -> Vec<String> {
        let events = self.events();
        match parent {
            Some(parent) if !parent.is_empty() => events
                .into_iter()
                .map(|path| format!("{}.{}", parent, path))
                .collect(),
            _ => events,
        }
    }

    /// The node as a statement the machine can step through, if it is one.
    pub(crate) fn as_statement(&self) -> Option<&dyn StatementNode> {
        let statement: &dyn StatementNode = match self {
            Node::Program(node) => node,
            Node::BlockStatement(node) => node,
            Node::ExpressionStatement(node) => node,
            Node::VariableDeclaration(node) => node,
            Node::IfStatement(node) => node,
            Node::ForStatement(node) => node,
            Node::ForOfStatement(node) => node,
            Node::ForInStatement(node) => node,
            Node::ForAwaitStatement(node) => node,
            Node::WhileStatement(node) => node,
            Node::DoWhileStatement(node) => node,
            Node::SwitchStatement(node) => node,
            Node::TryStatement(node) => node,
            Node::ThrowStatement(node) => node,
            Node::ReturnStatement(node) => node,
            Node::BreakStatement(node) => node,
            Node::ContinueStatement(node) => node,
            Node::EmptyStatement(node) => node,
            Node::LabeledStatement(node) => node,
            _ => return None,
        };
        Some(statement)
    }

    /// Name of an identifier node.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Node::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }

    /// Static dotted path for identifier and non-computed member chains,
    /// e.g. `["user", "address", "city"]` for `user.address.city`.
    pub fn path(&self) -> Option<Vec<String>> {
        match self {
            Node::Identifier(id) => Some(vec![id.name.clone()]),
            Node::ThisExpression(_) => Some(vec!["this".to_string()]),
            Node::MemberExpression(member) if !member.computed => {
                let mut path = member.object.path()?;
                path.push(member.property.as_identifier()?.to_string());
                Some(path)
            }
            _ => None,
        }
    }

    /// True for anonymous function and class expressions, which take
    /// their name from the binding they are assigned to.
    pub fn is_anonymous_definition(&self) -> bool {
        match self {
            Node::Function(f) => f.def.name.is_empty() && f.def.form != FunctionForm::Method,
            Node::Class(c) => c.name.is_none(),
            _ => false,
        }
    }

    /// Evaluate, naming anonymous functions and classes after `name`.
    pub fn get_named(&self, stack: &mut Stack, this: Option<&Value>, name: &str) -> JsResult<Value> {
        match self {
            Node::Function(f) if self.is_anonymous_definition() => f.instantiate(stack, this, Some(name)),
            Node::Class(c) if self.is_anonymous_definition() => c.evaluate(stack, this, Some(name)),
            _ => self.get(stack, this),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_tag(), self)
    }
}

// ----------------------------------------------------------------------------
// JSON helpers
// ----------------------------------------------------------------------------

pub(crate) fn node_field(
    json: &serde_json::Value,
    key: &str,
    registry: &DeserializerRegistry,
) -> JsResult<ExprNode> {
    match json.get(key) {
        Some(child) if !child.is_null() => registry.deserialize(child),
        _ => Err(missing(json, key)),
    }
}

pub(crate) fn opt_node_field(
    json: &serde_json::Value,
    key: &str,
    registry: &DeserializerRegistry,
) -> JsResult<Option<ExprNode>> {
    match json.get(key) {
        Some(child) if !child.is_null() => registry.deserialize(child).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn node_list(
    json: &serde_json::Value,
    key: &str,
    registry: &DeserializerRegistry,
) -> JsResult<Vec<ExprNode>> {
    match json.get(key) {
        Some(serde_json::Value::Array(items)) => {
            items.iter().map(|item| registry.deserialize(item)).collect()
        }
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(_) => Err(JsError::deserialize(format!(
            "field '{}' of {} must be an array",
            key,
            tag_of(json)
        ))),
    }
}

pub(crate) fn hole_list(
    json: &serde_json::Value,
    key: &str,
    registry: &DeserializerRegistry,
) -> JsResult<Vec<Option<ExprNode>>> {
    match json.get(key) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                if item.is_null() {
                    Ok(None)
                } else {
                    registry.deserialize(item).map(Some)
                }
            })
            .collect(),
        _ => Ok(Vec::new()),
    }
}

pub(crate) fn str_field(json: &serde_json::Value, key: &str) -> JsResult<String> {
    json.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(json, key))
}

pub(crate) fn opt_str_field(json: &serde_json::Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

pub(crate) fn bool_field(json: &serde_json::Value, key: &str) -> bool {
    json.get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

pub(crate) fn list_json(nodes: &[ExprNode]) -> serde_json::Value {
    serde_json::Value::Array(nodes.iter().map(|node| node.to_json()).collect())
}

pub(crate) fn opt_json(node: &Option<ExprNode>) -> serde_json::Value {
    node.as_ref()
        .map_or(serde_json::Value::Null, |node| node.to_json())
}

fn tag_of(json: &serde_json::Value) -> &str {
    json.get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("node")
}

fn missing(json: &serde_json::Value, key: &str) -> JsError {
    JsError::deserialize(format!("{} is missing field '{}'", tag_of(json), key))
}

// ----------------------------------------------------------------------------
// Evaluation helpers
// ----------------------------------------------------------------------------

/// Evaluate call arguments, expanding spread elements.
pub(crate) fn evaluate_arguments(
    args: &[ExprNode],
    stack: &mut Stack,
    this: Option<&Value>,
) -> JsResult<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match &**arg {
            Node::SpreadElement(spread) => {
                let iterable = spread.argument.get(stack, this)?;
                values.extend(builtins::collect_iterable(&iterable)?);
            }
            _ => values.push(arg.get(stack, this)?),
        }
    }
    Ok(values)
}

/// Property name for a member or object key.
///
/// Non-computed keys are identifiers or literals written in the source;
/// computed keys are evaluated and converted with `ToPropertyKey`.
pub(crate) fn property_key(
    key: &Node,
    computed: bool,
    stack: &mut Stack,
    this: Option<&Value>,
) -> JsResult<String> {
    if !computed {
        match key {
            Node::Identifier(id) => return Ok(id.name.clone()),
            Node::StringLiteral(s) => return Ok(s.value.clone()),
            Node::NumberLiteral(n) => return Ok(core_types::number_to_string(n.value)),
            _ => {}
        }
    }
    let value = key.get(stack, this)?;
    Ok(value
        .to_primitive(core_types::PreferredType::String)?
        .to_property_key())
}

/// Render a non-computed key, or `[key]` for computed ones.
pub(crate) fn fmt_key(f: &mut fmt::Formatter<'_>, key: &Node, computed: bool) -> fmt::Result {
    if computed {
        write!(f, "[{}]", key)
    } else {
        write!(f, "{}", key)
    }
}

/// Write `items` separated by `separator`.
pub(crate) fn fmt_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Ordered union of names, without duplicates.
pub(crate) fn union<'a>(
    nodes: impl IntoIterator<Item = &'a ExprNode>,
    select: fn(&Node) -> Vec<String>,
) -> Vec<String> {
    let mut names = Vec::new();
    for node in nodes {
        for name in select(node) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
