//! Contract tests for interpreter API
//!
//! Laws every node kind keeps: the JSON form rebuilds an equivalent tree,
//! invalid targets refuse assignment and unknown tags fail to deserialize.

use core_types::{ErrorKind, JsError, Value};
use interpreter::{DeserializerRegistry, ExprNode, Scope, Stack};
use serde_json::{json, Value as Json};

fn build(tree: &Json) -> ExprNode {
    DeserializerRegistry::with_default_nodes()
        .deserialize(tree)
        .unwrap()
}

fn ident(name: &str) -> Json {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: f64) -> Json {
    json!({ "type": "NumberLiteral", "value": value })
}

fn samples() -> Vec<Json> {
    vec![
        json!({ "type": "BinaryExpression", "operator": "+", "left": ident("a"), "right": num(1.0) }),
        json!({
            "type": "ConditionalExpression",
            "test": ident("ready"),
            "consequent": { "type": "StringLiteral", "value": "yes" },
            "alternate": { "type": "NullLiteral" },
        }),
        json!({
            "type": "CallExpression",
            "callee": { "type": "MemberExpression", "object": ident("Math"), "property": ident("max") },
            "arguments": [ident("x"), { "type": "SpreadElement", "argument": ident("rest") }],
        }),
        json!({
            "type": "ArrayExpression",
            "elements": [num(1.0), null, { "type": "BooleanLiteral", "value": true }],
        }),
        json!({
            "type": "Function",
            "name": "",
            "params": [ident("n")],
            "body": { "type": "BinaryExpression", "operator": "*", "left": ident("n"), "right": ident("factor") },
            "form": "arrow",
        }),
        json!({
            "type": "Program",
            "body": [
                {
                    "type": "VariableDeclaration",
                    "kind": "let",
                    "declarations": [{ "type": "VariableDeclarator", "id": ident("total"), "init": num(0.0) }],
                },
                {
                    "type": "IfStatement",
                    "test": ident("flag"),
                    "consequent": {
                        "type": "BlockStatement",
                        "body": [{ "type": "ReturnStatement", "argument": ident("total") }],
                    },
                },
            ],
        }),
    ]
}

// ============================================================================
// Serialization contracts
// ============================================================================

/// Rebuilding a tree from its JSON form preserves its source rendering.
#[test]
fn test_json_round_trip_preserves_rendering() {
    for sample in samples() {
        let node = build(&sample);
        let rebuilt = build(&node.to_json());
        assert_eq!(rebuilt.to_string(), node.to_string());
        assert_eq!(rebuilt.to_json(), node.to_json());
    }
}

/// Dependencies survive a round trip.
#[test]
fn test_json_round_trip_preserves_dependencies() {
    for sample in samples() {
        let node = build(&sample);
        let rebuilt = build(&node.to_json());
        assert_eq!(rebuilt.entry(), node.entry());
        assert_eq!(rebuilt.events(), node.events());
    }
}

/// An unregistered tag is a deserialization error.
#[test]
fn test_unknown_tag_fails() {
    let err = DeserializerRegistry::with_default_nodes()
        .deserialize(&json!({ "type": "Teleport", "target": "mars" }))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Deserialize));
}

/// A missing child field is reported, not defaulted.
#[test]
fn test_missing_required_child_fails() {
    let err = DeserializerRegistry::with_default_nodes()
        .deserialize(&json!({ "type": "BinaryExpression", "operator": "+", "left": num(1.0) }))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Deserialize));
}

// ============================================================================
// Evaluation contracts
// ============================================================================

/// `foo() = 1` refuses assignment.
#[test]
fn test_call_is_not_assignable() {
    let node = build(&json!({
        "type": "AssignmentExpression",
        "operator": "=",
        "left": { "type": "CallExpression", "callee": ident("foo"), "arguments": [] },
        "right": num(1.0),
    }));
    let mut stack = Stack::with_globals();
    let err = node.get(&mut stack, None).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotAssignable));
}

/// Literals are not assignment targets either.
#[test]
fn test_literal_set_fails() {
    let node = build(&num(3.0));
    let mut stack = Stack::with_globals();
    let err = node.set(&mut stack, Value::Number(4.0)).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotAssignable));
}

/// Undeclared names read as `undefined` and writes land in the innermost scope.
#[test]
fn test_undeclared_names_are_implicit() {
    let node = build(&ident("ghost"));
    let mut stack = Stack::with_globals();
    assert!(node.get(&mut stack, None).unwrap().is_undefined());

    let scope = stack.push_block_scope();
    node.set(&mut stack, Value::Number(1.0)).unwrap();
    assert!(scope.has("ghost"));
}

/// An uncaught `throw` surfaces the thrown value unchanged.
#[test]
fn test_uncaught_throw_carries_value() {
    let node = build(&json!({
        "type": "Program",
        "body": [{ "type": "ThrowStatement", "argument": { "type": "StringLiteral", "value": "boom" } }],
    }));
    let mut stack = Stack::with_globals();
    match node.execute(&mut stack, None) {
        Err(JsError::Throw(value)) => assert_eq!(value.to_string(), "boom"),
        _ => panic!("expected a thrown value"),
    }
}

/// Evaluation is repeatable: the same tree gives the same result twice.
#[test]
fn test_get_is_repeatable() {
    let node = build(&json!({
        "type": "BinaryExpression",
        "operator": "*",
        "left": ident("price"),
        "right": ident("quantity"),
    }));
    let mut stack = Stack::with_globals();
    stack.set("price", Value::Number(2.5)).unwrap();
    stack.set("quantity", Value::Number(4.0)).unwrap();
    assert_eq!(node.get(&mut stack, None).unwrap().to_number(), 10.0);
    assert_eq!(node.get(&mut stack, None).unwrap().to_number(), 10.0);
    assert_eq!(node.events(), vec!["price", "quantity"]);
}
