//! Reactive binding tests
//!
//! Expressions parsed from source run over a ReactiveScope; their entry
//! dependencies decide which subscriptions mark them stale.

use core_types::{JsObject, Value};
use interpreter::{ExprNode, ReactiveScope, Scope, Stack};
use std::cell::RefCell;
use std::rc::Rc;

fn model() -> core_types::ObjectRef {
    let mut tax = JsObject::new();
    tax.insert("rate", Value::Number(0.5));
    let mut model = JsObject::new();
    model.insert("price", Value::Number(10.0));
    model.insert("quantity", Value::Number(2.0));
    model.insert("tax", Value::Object(tax.into_ref()));
    model.into_ref()
}

fn run(stack: &mut Stack, source: &str) {
    parser::parse(source)
        .unwrap()
        .execute(stack, None)
        .unwrap();
}

/// Subscribe to every entry of `expr`; the returned log collects the keys
/// that fired.
fn watch(
    scope: &ReactiveScope,
    expr: &ExprNode,
) -> (Vec<interpreter::ScopeSubscription>, Rc<RefCell<Vec<String>>>) {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = expr
        .entry()
        .into_iter()
        .map(|key| {
            let sink = fired.clone();
            let name = key.clone();
            scope.subscribe(key, move |_, _| sink.borrow_mut().push(name.clone()))
        })
        .collect();
    (subscriptions, fired)
}

#[test]
fn test_binding_recomputes_after_dependency_changes() {
    let mut stack = Stack::with_globals();
    let scope = stack.push_reactive_scope(model());
    let total = parser::parse_expression("price * quantity * (1 + tax.rate)").unwrap();
    assert_eq!(total.get(&mut stack, None).unwrap().to_number(), 30.0);

    let (_subscriptions, fired) = watch(&scope, &total);

    run(&mut stack, "quantity = 3");
    assert_eq!(*fired.borrow(), vec!["quantity"]);
    assert_eq!(total.get(&mut stack, None).unwrap().to_number(), 45.0);

    run(&mut stack, "tax.rate = 1");
    assert_eq!(*fired.borrow(), vec!["quantity", "tax"]);
    assert_eq!(total.get(&mut stack, None).unwrap().to_number(), 60.0);
}

#[test]
fn test_unrelated_writes_do_not_fire() {
    let mut stack = Stack::with_globals();
    let scope = stack.push_reactive_scope(model());
    let expr = parser::parse_expression("price + 1").unwrap();
    let (_subscriptions, fired) = watch(&scope, &expr);

    run(&mut stack, "quantity += 1; tax.rate = 0");
    assert!(fired.borrow().is_empty());
}

#[test]
fn test_subscriber_sees_new_and_old_values() {
    let mut stack = Stack::with_globals();
    let scope = stack.push_reactive_scope(model());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = scope.subscribe("price", move |new, old| {
        sink.borrow_mut().push((new.to_number(), old.to_number()));
    });

    run(&mut stack, "price = price * 2; price = price");
    assert_eq!(*seen.borrow(), vec![(20.0, 10.0), (20.0, 20.0)]);
}

#[test]
fn test_detect_changes_after_script() {
    let context = model();
    let scope = ReactiveScope::new(context.clone());
    let count = Rc::new(RefCell::new(0));
    let counter = count.clone();
    let _subscription = scope.subscribe("price", move |_, _| *counter.borrow_mut() += 1);

    scope.clone_context();
    context.borrow_mut().insert("price", Value::Number(10.0));
    scope.detect_changes();
    assert_eq!(*count.borrow(), 0);

    scope.clone_context();
    context.borrow_mut().insert("price", Value::Number(11.0));
    scope.detect_changes();
    assert_eq!(*count.borrow(), 1);
    assert_eq!(scope.get("price").unwrap().to_number(), 11.0);
}

#[test]
fn test_clear_to_drops_inner_bindings() {
    let mut stack = Stack::with_globals();
    run(&mut stack, "var x = 1");
    let depth = stack.depth();
    stack.push_block_scope();
    stack
        .declare_variable("x", Value::Number(2.0), interpreter::DeclarationKind::Let)
        .unwrap();
    assert_eq!(stack.get("x").unwrap().to_number(), 2.0);
    stack.clear_to(depth);
    assert_eq!(stack.get("x").unwrap().to_number(), 1.0);
}
