//! Integration tests for interpreter
//!
//! Whole programs built from their JSON form and run against a fresh
//! stack: functions and closures, async bodies, generators and classes.

use builtins::get_member;
use core_types::{run_microtasks, PromiseRef, PromiseState, Value};
use interpreter::{Completion, DeserializerRegistry, Stack};
use serde_json::{json, Value as Json};

fn run(program: Json, stack: &mut Stack) -> Completion {
    let registry = DeserializerRegistry::with_default_nodes();
    let node = registry.deserialize(&program).unwrap();
    node.execute(stack, None).unwrap()
}

fn program(body: Vec<Json>) -> Json {
    json!({ "type": "Program", "body": body })
}

fn ident(name: &str) -> Json {
    json!({ "type": "Identifier", "name": name })
}

fn num(value: f64) -> Json {
    json!({ "type": "NumberLiteral", "value": value })
}

fn string(value: &str) -> Json {
    json!({ "type": "StringLiteral", "value": value })
}

fn expr(expression: Json) -> Json {
    json!({ "type": "ExpressionStatement", "expression": expression })
}

fn block(body: Vec<Json>) -> Json {
    json!({ "type": "BlockStatement", "body": body })
}

fn declare(kind: &str, name: &str, init: Json) -> Json {
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{ "type": "VariableDeclarator", "id": ident(name), "init": init }],
    })
}

fn assign(operator: &str, target: Json, value: Json) -> Json {
    json!({ "type": "AssignmentExpression", "operator": operator, "left": target, "right": value })
}

fn call(callee: Json, arguments: Vec<Json>) -> Json {
    json!({ "type": "CallExpression", "callee": callee, "arguments": arguments })
}

fn member(object: Json, property: &str) -> Json {
    json!({ "type": "MemberExpression", "object": object, "property": ident(property) })
}

fn ret(argument: Json) -> Json {
    json!({ "type": "ReturnStatement", "argument": argument })
}

fn function(name: &str, params: Vec<Json>, body: Vec<Json>, is_async: bool, generator: bool) -> Json {
    json!({
        "type": "Function",
        "name": name,
        "params": params,
        "body": block(body),
        "form": "declaration",
        "async": is_async,
        "generator": generator,
    })
}

fn await_(argument: Json) -> Json {
    json!({ "type": "AwaitExpression", "argument": argument })
}

fn yield_(argument: Json) -> Json {
    json!({ "type": "YieldExpression", "argument": argument, "delegate": false })
}

fn next(generator: &Value, sent: Value) -> (Value, bool) {
    let next = get_member(generator, "next").unwrap();
    let result = next.call(generator.clone(), vec![sent]).unwrap();
    (
        get_member(&result, "value").unwrap(),
        get_member(&result, "done").unwrap().is_truthy(),
    )
}

// ============================================================================
// Functions and closures
// ============================================================================

#[test]
fn test_counter_closure_keeps_state() {
    let mut stack = Stack::with_globals();
    let make_counter = function(
        "makeCounter",
        vec![],
        vec![
            declare("let", "count", num(0.0)),
            ret(json!({
                "type": "Function",
                "name": "",
                "params": [],
                "body": assign("+=", ident("count"), num(1.0)),
                "form": "arrow",
            })),
        ],
        false,
        false,
    );
    run(
        program(vec![
            make_counter,
            declare("const", "tick", call(ident("makeCounter"), vec![])),
            expr(call(ident("tick"), vec![])),
            expr(call(ident("tick"), vec![])),
        ]),
        &mut stack,
    );
    let tick = stack.get("tick").unwrap();
    assert_eq!(tick.call(Value::Undefined, vec![]).unwrap().to_number(), 3.0);
    assert!(!stack.has("count"));
}

#[test]
fn test_hoisted_declaration_is_callable_before_definition() {
    let mut stack = Stack::with_globals();
    let completion = run(
        program(vec![
            expr(call(ident("double"), vec![num(21.0)])),
            function(
                "double",
                vec![ident("n")],
                vec![ret(json!({
                    "type": "BinaryExpression",
                    "operator": "*",
                    "left": ident("n"),
                    "right": num(2.0),
                }))],
                false,
                false,
            ),
        ]),
        &mut stack,
    );
    assert_eq!(completion.value().to_number(), 42.0);
}

#[test]
fn test_default_and_rest_parameters() {
    let mut stack = Stack::with_globals();
    let f = function(
        "collect",
        vec![
            json!({ "type": "AssignmentPattern", "left": ident("first"), "right": num(10.0) }),
            json!({ "type": "RestElement", "argument": ident("rest") }),
        ],
        vec![ret(json!({
            "type": "BinaryExpression",
            "operator": "+",
            "left": ident("first"),
            "right": member(ident("rest"), "length"),
        }))],
        false,
        false,
    );
    run(program(vec![f]), &mut stack);
    let collect = stack.get("collect").unwrap();
    assert_eq!(collect.call(Value::Undefined, vec![]).unwrap().to_number(), 10.0);
    let args = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
    assert_eq!(collect.call(Value::Undefined, args).unwrap().to_number(), 3.0);
}

#[test]
fn test_for_break_leaves_counter() {
    let mut stack = Stack::with_globals();
    run(
        program(vec![
            declare("let", "i", num(0.0)),
            json!({
                "type": "ForStatement",
                "init": assign("=", ident("i"), num(0.0)),
                "test": { "type": "BinaryExpression", "operator": "<", "left": ident("i"), "right": num(5.0) },
                "update": { "type": "UpdateExpression", "operator": "++", "prefix": false, "argument": ident("i") },
                "body": block(vec![json!({
                    "type": "IfStatement",
                    "test": { "type": "BinaryExpression", "operator": "==", "left": ident("i"), "right": num(3.0) },
                    "consequent": { "type": "BreakStatement" },
                })]),
            }),
        ]),
        &mut stack,
    );
    assert_eq!(stack.get("i").unwrap().to_number(), 3.0);
}

// ============================================================================
// Async functions
// ============================================================================

#[test]
fn test_awaits_assign_in_declaration_order() {
    let mut stack = Stack::with_globals();
    let first = PromiseRef::new();
    let second = PromiseRef::new();
    stack.set("first", Value::Promise(first.clone())).unwrap();
    stack.set("second", Value::Promise(second.clone())).unwrap();
    stack.set("order", Value::from("")).unwrap();

    let body = vec![
        declare("const", "a", await_(ident("first"))),
        expr(assign("+=", ident("order"), ident("a"))),
        declare("const", "b", await_(ident("second"))),
        expr(assign("+=", ident("order"), ident("b"))),
        ret(ident("order")),
    ];
    run(
        program(vec![
            function("load", vec![], body, true, false),
            declare("const", "result", call(ident("load"), vec![])),
        ]),
        &mut stack,
    );

    second.resolve(Value::from("B"));
    run_microtasks();
    assert_eq!(stack.get("order").unwrap().to_string(), "");

    first.resolve(Value::from("A"));
    run_microtasks();
    assert_eq!(stack.get("order").unwrap().to_string(), "AB");

    let Value::Promise(result) = stack.get("result").unwrap() else {
        panic!("async function must return a promise");
    };
    match result.state() {
        PromiseState::Fulfilled(value) => assert_eq!(value.to_string(), "AB"),
        _ => panic!("result should be fulfilled"),
    }
}

#[test]
fn test_rejected_await_is_caught() {
    let mut stack = Stack::with_globals();
    let failing = PromiseRef::new();
    stack.set("failing", Value::Promise(failing.clone())).unwrap();

    let body = vec![json!({
        "type": "TryStatement",
        "block": block(vec![expr(await_(ident("failing")))]),
        "handler": {
            "type": "CatchClause",
            "param": ident("reason"),
            "body": block(vec![ret(ident("reason"))]),
        },
    })];
    run(
        program(vec![
            function("guarded", vec![], body, true, false),
            declare("const", "result", call(ident("guarded"), vec![])),
        ]),
        &mut stack,
    );
    failing.reject(Value::from("offline"));
    run_microtasks();

    let Value::Promise(result) = stack.get("result").unwrap() else {
        panic!("async function must return a promise");
    };
    match result.state() {
        PromiseState::Fulfilled(value) => assert_eq!(value.to_string(), "offline"),
        _ => panic!("the rejection should have been caught"),
    }
}

#[test]
fn test_for_await_over_promises() {
    let mut stack = Stack::with_globals();
    stack.set("total", Value::Number(0.0)).unwrap();
    let items = Value::new_array(vec![
        Value::Promise(PromiseRef::resolved(Value::Number(1.0))),
        Value::Number(2.0),
        Value::Promise(PromiseRef::resolved(Value::Number(3.0))),
    ]);
    stack.set("items", items).unwrap();

    let body = vec![json!({
        "type": "ForAwaitStatement",
        "left": {
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{ "type": "VariableDeclarator", "id": ident("item") }],
        },
        "right": ident("items"),
        "body": expr(assign("+=", ident("total"), ident("item"))),
    })];
    run(
        program(vec![
            function("sum", vec![], body, true, false),
            expr(call(ident("sum"), vec![])),
        ]),
        &mut stack,
    );
    run_microtasks();
    assert_eq!(stack.get("total").unwrap().to_number(), 6.0);
}

// ============================================================================
// Generators
// ============================================================================

#[test]
fn test_generator_yields_lazily() {
    let mut stack = Stack::with_globals();
    stack.set("steps", Value::Number(0.0)).unwrap();
    let body = vec![
        expr(assign("+=", ident("steps"), num(1.0))),
        expr(yield_(num(1.0))),
        expr(assign("+=", ident("steps"), num(1.0))),
        expr(yield_(num(2.0))),
    ];
    run(
        program(vec![
            function("counter", vec![], body, false, true),
            declare("const", "gen", call(ident("counter"), vec![])),
        ]),
        &mut stack,
    );
    assert_eq!(stack.get("steps").unwrap().to_number(), 0.0);

    let gen = stack.get("gen").unwrap();
    let (value, done) = next(&gen, Value::Undefined);
    assert_eq!((value.to_number(), done), (1.0, false));
    assert_eq!(stack.get("steps").unwrap().to_number(), 1.0);
    let (value, done) = next(&gen, Value::Undefined);
    assert_eq!((value.to_number(), done), (2.0, false));
    let (value, done) = next(&gen, Value::Undefined);
    assert!(value.is_undefined());
    assert!(done);
}

#[test]
fn test_generator_receives_sent_values() {
    let mut stack = Stack::with_globals();
    let body = vec![
        declare("const", "x", yield_(string("first"))),
        ret(json!({
            "type": "BinaryExpression",
            "operator": "*",
            "left": ident("x"),
            "right": num(2.0),
        })),
    ];
    run(
        program(vec![
            function("echo", vec![], body, false, true),
            declare("const", "gen", call(ident("echo"), vec![])),
        ]),
        &mut stack,
    );
    let gen = stack.get("gen").unwrap();
    assert_eq!(next(&gen, Value::Undefined).0.to_string(), "first");
    let (value, done) = next(&gen, Value::Number(21.0));
    assert_eq!((value.to_number(), done), (42.0, true));
}

#[test]
fn test_spread_of_generator() {
    let mut stack = Stack::with_globals();
    let body = vec![
        expr(yield_(num(1.0))),
        expr(json!({ "type": "YieldExpression", "argument": { "type": "ArrayExpression", "elements": [num(2.0), num(3.0)] }, "delegate": true })),
    ];
    let completion = run(
        program(vec![
            function("numbers", vec![], body, false, true),
            expr(member(
                json!({
                    "type": "ArrayExpression",
                    "elements": [{ "type": "SpreadElement", "argument": call(ident("numbers"), vec![]) }],
                }),
                "length",
            )),
        ]),
        &mut stack,
    );
    assert_eq!(completion.value().to_number(), 3.0);
}

// ============================================================================
// Destructuring
// ============================================================================

#[test]
fn test_nested_destructuring_declaration() {
    let mut stack = Stack::with_globals();
    let pattern = json!({
        "type": "ObjectPattern",
        "properties": [
            {
                "type": "Property",
                "key": ident("user"),
                "value": {
                    "type": "ObjectPattern",
                    "properties": [{ "type": "Property", "key": ident("name"), "value": ident("name"), "shorthand": true }],
                },
            },
            {
                "type": "Property",
                "key": ident("tags"),
                "value": { "type": "ArrayPattern", "elements": [ident("firstTag")] },
            },
        ],
    });
    let source = json!({
        "type": "ObjectExpression",
        "properties": [
            {
                "type": "Property",
                "key": ident("user"),
                "value": {
                    "type": "ObjectExpression",
                    "properties": [{ "type": "Property", "key": ident("name"), "value": string("Ada") }],
                },
            },
            {
                "type": "Property",
                "key": ident("tags"),
                "value": { "type": "ArrayExpression", "elements": [string("math"), string("code")] },
            },
        ],
    });
    run(
        program(vec![json!({
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{ "type": "VariableDeclarator", "id": pattern, "init": source }],
        })]),
        &mut stack,
    );
    assert_eq!(stack.get("name").unwrap().to_string(), "Ada");
    assert_eq!(stack.get("firstTag").unwrap().to_string(), "math");
}
