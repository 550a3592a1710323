//! Serialization tests
//!
//! Programs parsed from source are written to JSON, rebuilt through a
//! DeserializerRegistry, and must evaluate identically.

use core_types::{ErrorKind, JsError};
use integration_tests::Harness;
use interpreter::DeserializerRegistry;
use serde_json::json;

const PROGRAMS: &[(&str, &str)] = &[
    ("1 + 2 * 3", "7"),
    ("let s = 0; for (const n of [1, 2, 3]) s += n; s", "6"),
    ("const o = { a: 1, ['b' + 1]: 2 }; Object.keys(o).join()", "a,b1"),
    ("class P { #x = 4; get x() { return this.#x } } new P().x", "4"),
    ("function* g() { yield 1; yield 2 } [...g()].length", "2"),
    ("let r; try { null.x } catch ({ name }) { r = name } r", "TypeError"),
    ("`${typeof 1}:${void 0}`", "number:undefined"),
    ("const f = (a, ...b) => b.length; f(1, 2, 3)", "2"),
    ("let i = 0; do { i++ } while (i < 4); i", "4"),
    ("/b+/.test('abbc') ? 'hit' : 'miss'", "hit"),
];

fn rebuilt(source: &str) -> interpreter::ExprNode {
    let program = parser::parse(source).unwrap();
    let text = serde_json::to_string(&program.to_json()).unwrap();
    DeserializerRegistry::with_default_nodes()
        .deserialize_str(&text)
        .unwrap()
}

#[test]
fn test_rebuilt_programs_evaluate_identically() {
    for (source, expected) in PROGRAMS {
        let node = rebuilt(source);
        assert_eq!(node.to_string(), parser::parse(source).unwrap().to_string());

        let mut harness = Harness::new();
        let value = node.execute(&mut harness.stack, None).unwrap().value();
        assert_eq!(value.to_string(), *expected, "{}", source);
    }
}

#[test]
fn test_rebuilt_dependencies_match() {
    let source = "order.items.length > limit ? warn(order.id) : null";
    let original = parser::parse_expression(source).unwrap();
    let node = rebuilt(source);
    assert_eq!(node.entry(), original.entry());
    assert_eq!(node.events(), original.events());
    assert_eq!(node.entry(), vec!["order", "limit", "warn"]);
}

#[test]
fn test_registry_rejects_unknown_tags() {
    let registry = DeserializerRegistry::with_default_nodes();
    let err = registry
        .deserialize(&json!({ "type": "Teleport", "to": "mars" }))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Deserialize));

    let err = DeserializerRegistry::new()
        .deserialize(&json!({ "type": "NumberLiteral", "value": 1 }))
        .unwrap_err();
    assert!(matches!(err, JsError::Eval { .. }));
}

#[test]
fn test_hand_written_json_program() {
    let program = json!({
        "type": "Program",
        "body": [{
            "type": "ExpressionStatement",
            "expression": {
                "type": "BinaryExpression",
                "operator": "*",
                "left": { "type": "Identifier", "name": "width" },
                "right": { "type": "NumberLiteral", "value": 3 }
            }
        }]
    });
    let node = DeserializerRegistry::with_default_nodes()
        .deserialize(&program)
        .unwrap();
    let mut harness = Harness::new();
    harness.eval("var width = 14").unwrap();
    let value = node.execute(&mut harness.stack, None).unwrap().value();
    assert_eq!(value.to_number(), 42.0);
    assert_eq!(node.to_string(), "width * 3;");
}
