//! Full Pipeline Integration Tests
//!
//! Source -> parser -> typed AST -> interpreter over the builtin globals.

use core_types::{ErrorKind, JsError, Value};
use integration_tests::{eval, eval_inspect, Harness};

fn number(source: &str) -> f64 {
    match eval(source) {
        Ok(value) => value.to_number(),
        Err(err) => panic!("{} failed: {}", source, err),
    }
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(number("2 + 3 * 4"), 14.0);
    assert_eq!(number("(2 + 3) * 4"), 20.0);
    assert_eq!(number("2 ** 3 ** 2"), 512.0);
    assert_eq!(number("10 % 4 ? 7 : 0"), 7.0);
    assert_eq!(eval_inspect("1 < 2 && 2 < 3"), "true");
}

#[test]
fn test_strings_and_templates() {
    assert_eq!(eval_inspect("'ab' + 1 + 2"), "ab12");
    assert_eq!(eval_inspect("const n = 3; `n=${n * 2}!`"), "n=6!");
    assert_eq!(eval_inspect("'a-b-c'.split('-').join('+')"), "a+b+c");
}

#[test]
fn test_shadowed_block_scope() {
    let source = r#"
        let x = 1
        let seen
        { let x = 2; seen = x }
        [seen, x]
    "#;
    assert_eq!(eval_inspect(source), "[ 2, 1 ]");
}

#[test]
fn test_break_leaves_loop_variable() {
    let source = "let i; for (i = 0; i < 5; i++) { if (i == 3) break; } i";
    assert_eq!(number(source), 3.0);
}

#[test]
fn test_continue_in_for_of() {
    let source = r#"
        const kept = []
        for (const n of [1, 2, 3, 4]) {
            if (n % 2) continue
            kept.push(n)
        }
        kept
    "#;
    assert_eq!(eval_inspect(source), "[ 2, 4 ]");
}

#[test]
fn test_labelled_continue() {
    let source = r#"
        let pairs = 0
        outer: for (let a = 0; a < 3; a++) {
            for (let b = 0; b < 3; b++) {
                if (b > a) continue outer
                pairs++
            }
        }
        pairs
    "#;
    assert_eq!(number(source), 6.0);
}

#[test]
fn test_closures_and_defaults() {
    let source = r#"
        function counter(start = 10) {
            let n = start
            return { next: () => ++n, reset() { n = start } }
        }
        const c = counter()
        c.next(); c.next(); c.reset()
        c.next()
    "#;
    assert_eq!(number(source), 11.0);
}

#[test]
fn test_destructuring_and_spread() {
    let source = r#"
        const { a, b: [first, ...rest], c = 'dflt' } = { a: 1, b: [2, 3, 4] }
        const merged = { ...{ x: 1 }, y: a + first };
        [a, first, rest.length, c, merged.y]
    "#;
    assert_eq!(eval_inspect(source), "[ 1, 2, 2, 'dflt', 3 ]");
}

#[test]
fn test_classes() {
    let source = r#"
        class Shape {
            static count = 0
            #name
            constructor(name) { this.#name = name; Shape.count++ }
            get name() { return this.#name }
            area() { return 0 }
        }
        class Square extends Shape {
            constructor(side) { super('square'); this.side = side }
            area() { return this.side ** 2 + super.area() }
        }
        const sq = new Square(3);
        [sq.name, sq.area(), Shape.count, sq instanceof Shape]
    "#;
    assert_eq!(eval_inspect(source), "[ 'square', 9, 1, true ]");
}

#[test]
fn test_switch_falls_through() {
    let source = r#"
        function grade(n) {
            let out = ''
            switch (true) {
                case n > 90: out += 'A'
                case n > 80: out += 'B'; break
                default: out = 'C'
            }
            return out
        }
        [grade(95), grade(85), grade(10)].join(',')
    "#;
    assert_eq!(eval_inspect(source), "AB,B,C");
}

#[test]
fn test_try_catch_finally() {
    let source = r#"
        const log = []
        function risky(n) {
            try {
                if (n > 1) throw new RangeError('too big: ' + n)
                log.push('ok')
                return n
            } catch (e) {
                log.push(e.name)
                return -1
            } finally {
                log.push('done')
            }
        }
        [risky(1), risky(5), log.join(' ')]
    "#;
    assert_eq!(eval_inspect(source), "[ 1, -1, 'ok done RangeError done' ]");
}

#[test]
fn test_runtime_errors_are_catchable() {
    let source = "try { missing.value } catch (e) { e.name }";
    assert_eq!(eval_inspect(source), "TypeError");
    assert_eq!(eval_inspect("try { null.x } catch (e) { e.message.length > 0 }"), "true");
}

#[test]
fn test_generators() {
    let source = r#"
        function* range(from, to) {
            for (let i = from; i < to; i++) yield i
        }
        function* both() { yield* range(0, 2); yield 'end' }
        [...both()]
    "#;
    assert_eq!(eval_inspect(source), "[ 0, 1, 'end' ]");
}

#[test]
fn test_optional_chaining_and_nullish() {
    let source = r#"
        const cfg = { db: { port: 0 } };
        [cfg.db?.port ?? 5432, cfg.cache?.port ?? 6379, cfg.nope?.()]
    "#;
    assert_eq!(eval_inspect(source), "[ 0, 6379, undefined ]");
}

#[test]
fn test_bigint_arithmetic() {
    assert_eq!(eval_inspect("2n ** 64n"), "18446744073709551616n");
}

#[test]
fn test_json_builtins() {
    let source = r#"JSON.stringify(JSON.parse('{"a":[1,2],"b":"x"}'))"#;
    assert_eq!(eval_inspect(source), r#"{"a":[1,2],"b":"x"}"#);
}

#[test]
fn test_not_assignable_target() {
    let err = eval("function foo() {} foo() = 1").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotAssignable));
}

#[test]
fn test_uncaught_throw() {
    match eval("throw { code: 7 }") {
        Err(JsError::Throw(Value::Object(obj))) => {
            assert_eq!(obj.borrow().get_own("code").unwrap().to_number(), 7.0);
        }
        other => panic!("expected a thrown object, got {:?}", other.map(|v| v.to_string())),
    }
}

#[test]
fn test_console_output_is_captured() {
    let mut harness = Harness::new();
    harness
        .eval("console.log('total:', [1, 2, 3].reduce((a, b) => a + b))")
        .unwrap();
    assert_eq!(harness.output(), vec!["total: 6"]);
}

#[test]
fn test_state_persists_on_one_stack() {
    let mut harness = Harness::new();
    harness.eval("var hits = 0; function hit() { return ++hits }").unwrap();
    harness.eval("hit(); hit()").unwrap();
    assert_eq!(harness.eval("hits").unwrap().to_number(), 2.0);
}

fn on_large_stack<T: Send + 'static>(run: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(run)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_runaway_recursion_is_a_catchable_range_error() {
    let caught = on_large_stack(|| {
        interpreter::set_max_call_depth(64);
        let source = r#"
            function down(n) { return down(n + 1) }
            let message
            try { down(0) } catch (e) { message = e.name + ': ' + e.message }
            function depth(n) { return n === 0 ? 0 : 1 + depth(n - 1) }
            message + ' / ' + depth(60)
        "#;
        eval_inspect(source)
    });
    assert_eq!(caught, "RangeError: Maximum call stack size exceeded / 60");
}

#[test]
fn test_call_depth_limit_is_per_thread() {
    let limits = on_large_stack(|| {
        interpreter::set_max_call_depth(8);
        let lowered = eval("function f(n) { return n ? f(n - 1) : 'ok' } f(20)").unwrap_err();
        let within = eval("function g(n) { return n ? g(n - 1) : 'ok' } g(5)").unwrap();
        (lowered.to_string(), within.to_string())
    });
    assert!(limits.0.starts_with("RangeError"), "{}", limits.0);
    assert_eq!(limits.1, "ok");
    assert_eq!(interpreter::max_call_depth(), interpreter::DEFAULT_MAX_CALL_DEPTH);
}
