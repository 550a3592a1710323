//! Rendering and serialization round trips
//!
//! Rendering a parsed tree gives source that parses back to the same
//! rendering, and the JSON form rebuilds an equivalent tree.

use interpreter::DeserializerRegistry;
use parser::parse;

const SOURCES: &[&str] = &[
    "a + b * c",
    "(a + b) * c",
    "f(x, ...rest)[0].y",
    "cond ? 'yes' : \"no\"",
    "x => x * 2",
    "a?.b ?? c",
    "value |> format:2",
    "`total: ${price * qty}`",
    "let { a, b: [c] } = obj;",
    "function add(a, b = 1) { return a + b; }",
    "class Point extends Base { constructor(x) { super(); this.x = x; } get norm() { return this.x; } }",
    "for (const item of items) { total += item; }",
    "if (a) { b(); } else c();",
    "[1, , 3, ]",
    "try { risky(); } catch (e) { log(e); } finally { done(); }",
    "async function load() { const data = await fetch(url); return data; }",
    "function* ids() { let i = 0; while (true) yield i++; }",
];

#[test]
fn test_rendering_is_stable() {
    for source in SOURCES {
        let once = parse(source).unwrap().to_string();
        let twice = parse(&once)
            .unwrap_or_else(|err| panic!("{:?} rendered as {:?}: {}", source, once, err))
            .to_string();
        assert_eq!(once, twice, "rendering of {:?} is not stable", source);
    }
}

#[test]
fn test_json_rebuilds_tree() {
    let registry = DeserializerRegistry::with_default_nodes();
    for source in SOURCES {
        let tree = parse(source).unwrap();
        let rebuilt = registry.deserialize(&tree.to_json()).unwrap();
        assert_eq!(rebuilt.to_string(), tree.to_string());
        assert_eq!(rebuilt.events(), tree.events());
    }
}

#[test]
fn test_trailing_hole_survives_rendering() {
    let tree = parse("[1, ,]").unwrap();
    let again = parse(&tree.to_string()).unwrap();
    assert_eq!(again.to_string(), tree.to_string());
}
