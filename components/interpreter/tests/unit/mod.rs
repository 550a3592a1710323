//! Unit tests for interpreter components

use core_types::{JsObject, Value};
use interpreter::{
    DeclarationKind, DeserializerRegistry, ObjectScope, ReactiveScope, ReadOnlyScope, Scope,
    ScopeType, Stack,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn eval(tree: serde_json::Value, stack: &mut Stack) -> Value {
    let registry = DeserializerRegistry::with_default_nodes();
    let node = registry.deserialize(&tree).unwrap();
    node.get(stack, None).unwrap()
}

fn ident(name: &str) -> serde_json::Value {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: f64) -> serde_json::Value {
    json!({ "type": "NumberLiteral", "value": value })
}

fn binary(operator: &str, left: serde_json::Value, right: serde_json::Value) -> serde_json::Value {
    json!({ "type": "BinaryExpression", "operator": operator, "left": left, "right": right })
}

// ============================================================================
// Scope Tests
// ============================================================================

#[test]
fn test_object_scope_writes_through_to_context() {
    let context = JsObject::new().into_ref();
    let scope = ObjectScope::with_context(context.clone(), ScopeType::Block);
    scope.set("answer", Value::Number(42.0)).unwrap();
    assert_eq!(context.borrow().get_own("answer").unwrap().to_number(), 42.0);
}

#[test]
fn test_const_declaration_is_not_writable() {
    let scope = ObjectScope::new(ScopeType::Block);
    scope
        .declare("limit", Value::Number(1.0), DeclarationKind::Const)
        .unwrap();
    assert!(scope.set("limit", Value::Number(2.0)).is_err());
    assert_eq!(scope.get("limit").unwrap().to_number(), 1.0);
}

#[test]
fn test_read_only_scope_rejects_writes() {
    let scope = ReadOnlyScope::globals();
    assert!(scope.has("Math"));
    assert!(scope.set("Math", Value::Null).is_err());
    assert!(scope.delete("Math").is_err());
}

#[test]
fn test_inner_scope_is_cached_per_object() {
    let scope = ObjectScope::new(ScopeType::Module);
    scope
        .set("user", Value::object_from([("name", Value::from("Ada"))]))
        .unwrap();
    let first = scope.inner_scope("user").unwrap().unwrap();
    let second = scope.inner_scope("user").unwrap().unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    scope
        .set("user", Value::object_from([("name", Value::from("Grace"))]))
        .unwrap();
    let replaced = scope.inner_scope("user").unwrap().unwrap();
    assert!(!Rc::ptr_eq(&first, &replaced));
    assert_eq!(replaced.get("name").unwrap().to_string(), "Grace");
}

// ============================================================================
// Stack Tests
// ============================================================================

#[test]
fn test_shadowed_binding_and_clear_to() {
    let mut stack = Stack::with_globals();
    stack.set("x", Value::Number(1.0)).unwrap();
    let depth = stack.depth();

    stack.push_block_scope();
    stack
        .declare_variable("x", Value::Number(2.0), DeclarationKind::Let)
        .unwrap();
    assert_eq!(eval(ident("x"), &mut stack).to_number(), 2.0);

    stack.clear_to(depth);
    assert_eq!(eval(ident("x"), &mut stack).to_number(), 1.0);
}

#[test]
fn test_find_scope_falls_back_to_innermost() {
    let mut stack = Stack::with_globals();
    let block = stack.push_block_scope();
    let found = stack.find_scope("never_declared");
    assert!(Rc::ptr_eq(&found, &block));
}

#[test]
fn test_copy_stack_is_a_separate_frame_list() {
    let stack = Stack::with_globals();
    let mut copy = stack.copy_stack();
    copy.push_block_scope();
    assert_eq!(copy.depth(), stack.depth() + 1);
}

#[test]
fn test_reactive_scope_on_stack_sees_assignments() {
    let mut stack = Stack::with_globals();
    let model = JsObject::new().into_ref();
    let scope = stack.push_reactive_scope(model.clone());
    scope.set("count", Value::Number(1.0)).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = scope.subscribe("count", move |new, old| {
        sink.borrow_mut().push((new.to_number(), old.to_number()));
    });

    let increment = json!({
        "type": "AssignmentExpression",
        "operator": "+=",
        "left": ident("count"),
        "right": num(2.0),
    });
    eval(increment, &mut stack);
    assert_eq!(*seen.borrow(), vec![(3.0, 1.0)]);
    assert_eq!(model.borrow().get_own("count").unwrap().to_number(), 3.0);
}

// ============================================================================
// ReactiveScope Tests
// ============================================================================

#[test]
fn test_same_value_set_still_emits() {
    let scope = ReactiveScope::new_root();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let _subscription = scope.subscribe("flag", move |_, _| *counter.borrow_mut() += 1);
    scope.set("flag", Value::Boolean(true)).unwrap();
    scope.set("flag", Value::Boolean(true)).unwrap();
    assert_eq!(*calls.borrow(), 2);
}

#[test]
fn test_paused_subscription_is_skipped() {
    let scope = ReactiveScope::new_root();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let subscription = scope.subscribe("x", move |_, _| *counter.borrow_mut() += 1);

    subscription.pause();
    scope.set("x", Value::Number(1.0)).unwrap();
    subscription.resume();
    scope.set("x", Value::Number(2.0)).unwrap();
    assert_eq!(*calls.borrow(), 1);

    subscription.unsubscribe();
    subscription.unsubscribe();
    scope.set("x", Value::Number(3.0)).unwrap();
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(scope.subscriber_count("x"), 0);
}

#[test]
fn test_detect_changes_only_emits_real_changes() {
    let scope = ReactiveScope::new_root();
    scope.set("a", Value::Number(1.0)).unwrap();
    scope.set("b", Value::Number(2.0)).unwrap();

    let changed = Rc::new(RefCell::new(Vec::new()));
    for key in ["a", "b"] {
        let sink = changed.clone();
        let _ = scope.subscribe(key, move |new, _| {
            sink.borrow_mut().push(new.to_number());
        });
    }

    scope.clone_context();
    scope
        .context()
        .borrow_mut()
        .insert("b", Value::Number(5.0));
    scope.detect_changes();
    assert_eq!(*changed.borrow(), vec![5.0]);

    // The snapshot is gone after one pass.
    scope.context().borrow_mut().insert("a", Value::Number(9.0));
    scope.detect_changes();
    assert_eq!(*changed.borrow(), vec![5.0]);
}

#[test]
fn test_reentrant_emission_is_dropped() {
    let scope = ReactiveScope::new_root();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let weak = Rc::downgrade(&scope);
    let _subscription = scope.subscribe("ping", move |new, _| {
        *counter.borrow_mut() += 1;
        if let Some(scope) = weak.upgrade() {
            scope.set("ping", Value::Number(new.to_number() + 1.0)).unwrap();
        }
    });
    scope.set("ping", Value::Number(0.0)).unwrap();
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(scope.get("ping").unwrap().to_number(), 1.0);
}

// ============================================================================
// Operator Tests
// ============================================================================

#[test]
fn test_arithmetic_precedence_through_tree_shape() {
    let mut stack = Stack::with_globals();
    let tree = binary("+", num(2.0), binary("*", num(3.0), num(4.0)));
    assert_eq!(eval(tree, &mut stack).to_number(), 14.0);
}

#[test]
fn test_string_concatenation_and_comparison() {
    let mut stack = Stack::with_globals();
    let joined = binary(
        "+",
        json!({ "type": "StringLiteral", "value": "a" }),
        num(1.0),
    );
    assert_eq!(eval(joined, &mut stack).to_string(), "a1");

    let loose = binary("==", json!({ "type": "StringLiteral", "value": "1" }), num(1.0));
    assert!(eval(loose, &mut stack).is_truthy());
    let strict = binary("===", json!({ "type": "StringLiteral", "value": "1" }), num(1.0));
    assert!(!eval(strict, &mut stack).is_truthy());
}

#[test]
fn test_unsigned_shift_and_bitwise() {
    let mut stack = Stack::with_globals();
    assert_eq!(
        eval(binary(">>>", num(-1.0), num(28.0)), &mut stack).to_number(),
        15.0
    );
    assert_eq!(eval(binary("|", num(5.0), num(2.0)), &mut stack).to_number(), 7.0);
    assert_eq!(eval(binary("^", num(6.0), num(3.0)), &mut stack).to_number(), 5.0);
}

#[test]
fn test_nullish_and_logical_short_circuit() {
    let mut stack = Stack::with_globals();
    let tree = json!({
        "type": "LogicalExpression",
        "operator": "??",
        "left": { "type": "NullLiteral" },
        "right": num(8.0),
    });
    assert_eq!(eval(tree, &mut stack).to_number(), 8.0);

    // The right side would throw if evaluated.
    let guarded = json!({
        "type": "LogicalExpression",
        "operator": "&&",
        "left": { "type": "BooleanLiteral", "value": false },
        "right": {
            "type": "CallExpression",
            "callee": ident("missing"),
            "arguments": [],
        },
    });
    assert!(!eval(guarded, &mut stack).is_truthy());
}

#[test]
fn test_typeof_undeclared_is_undefined() {
    let mut stack = Stack::with_globals();
    let tree = json!({
        "type": "UnaryExpression",
        "operator": "typeof",
        "argument": ident("nothing_here"),
    });
    assert_eq!(eval(tree, &mut stack).to_string(), "undefined");
}

// ============================================================================
// Dependency Tests
// ============================================================================

#[test]
fn test_events_under_parent_path() {
    let registry = DeserializerRegistry::with_default_nodes();
    let tree = binary(
        "+",
        json!({
            "type": "MemberExpression",
            "object": ident("item"),
            "property": ident("price"),
            "computed": false,
            "optional": false,
        }),
        ident("shipping"),
    );
    let node = registry.deserialize(&tree).unwrap();
    assert_eq!(node.events_under(None), vec!["item.price", "shipping"]);
    assert_eq!(node.events_under(Some("")), node.events());
    assert_eq!(
        node.events_under(Some("cart")),
        vec!["cart.item.price", "cart.shipping"]
    );
}
