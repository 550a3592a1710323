//! Async pipeline tests
//!
//! Async functions, generators and `for await` driven by the event loop
//! and the timer globals.

use core_types::JsError;
use integration_tests::Harness;

#[test]
fn test_sequential_awaits_keep_declaration_order() {
    let mut harness = Harness::new();
    let source = r#"
        const later = (ms, v) => new Promise(r => setTimeout(() => r(v), ms));
        async function pair() {
            const slow = later(50, 'slow')
            const fast = later(10, 'fast')
            const first = await slow
            const second = await fast
            return [first, second].join(' then ')
        }
        pair()
    "#;
    let value = harness.eval_settled(source).unwrap();
    assert_eq!(value.to_string(), "slow then fast");
    assert_eq!(harness.event_loop.now(), 50);
}

#[test]
fn test_rejected_await_is_catchable() {
    let mut harness = Harness::new();
    let source = r#"
        async function load() {
            try {
                await Promise.reject(new Error('offline'))
                return 'loaded'
            } catch (e) {
                return 'fallback: ' + e.message
            }
        }
        load()
    "#;
    let value = harness.eval_settled(source).unwrap();
    assert_eq!(value.to_string(), "fallback: offline");
}

#[test]
fn test_unhandled_rejection_surfaces() {
    let mut harness = Harness::new();
    let err = harness
        .eval_settled("(async () => { throw 'late failure' })()")
        .unwrap_err();
    assert!(matches!(err, JsError::Throw(_)));
}

#[test]
fn test_microtasks_before_timers() {
    let mut harness = Harness::new();
    let source = r#"
        setTimeout(() => console.log('timeout'), 0)
        Promise.resolve().then(() => console.log('then'))
        queueMicrotask(() => console.log('microtask'))
        console.log('sync')
    "#;
    harness.eval_settled(source).unwrap();
    assert_eq!(harness.output(), vec!["sync", "then", "microtask", "timeout"]);
}

#[test]
fn test_for_await_over_async_values() {
    let mut harness = Harness::new();
    let source = r#"
        const tick = v => new Promise(r => setTimeout(() => r(v), 5));
        async function sum() {
            let total = 0
            for await (const n of [tick(1), 2, tick(3)]) total += n
            return total
        }
        sum()
    "#;
    assert_eq!(harness.eval_settled(source).unwrap().to_number(), 6.0);
}

#[test]
fn test_generator_receives_sent_values() {
    let mut harness = Harness::new();
    let source = r#"
        function* accumulate() {
            let total = 0
            while (true) {
                const n = yield total
                if (n === undefined) return total
                total += n
            }
        }
        const it = accumulate();
        it.next(); it.next(5); it.next(7);
        const done = it.next();
        `${done.value}/${done.done}`
    "#;
    assert_eq!(harness.eval(source).unwrap().to_string(), "12/true");
}

#[test]
fn test_promise_all_with_timers() {
    let mut harness = Harness::new();
    let source = r#"
        const delay = (ms, v) => new Promise(r => setTimeout(r, ms, v));
        Promise.all([delay(30, 'a'), delay(10, 'b'), 'c']).then(xs => xs.join(''))
    "#;
    assert_eq!(harness.eval_settled(source).unwrap().to_string(), "abc");
    assert_eq!(harness.event_loop.now(), 30);
}

const LATER: &str = r#"
    let calls = 0;
    const later = (ms, v) => { calls++; return new Promise(r => setTimeout(() => r(v), ms)) };
"#;

#[test]
fn test_awaits_nested_in_expressions() {
    let mut harness = Harness::new();
    let source = format!(
        r#"{LATER}
        const seen = [];
        function note(v) {{ seen.push('note:' + v); return v }}
        async function run() {{
            const log = [];
            log.push(await later(5, 'a'));
            if ((await later(5, 1)) === 1) log.push('if');
            note(await later(5, 'b'));
            log.push((await later(5, 4)) + 1);
            return log.join(',') + '|' + seen.join(',') + '|' + calls;
        }}
        run()
    "#
    );
    let value = harness.eval_settled(&source).unwrap();
    assert_eq!(value.to_string(), "a,if,5|note:b|4");
    assert_eq!(harness.event_loop.now(), 20);
}

#[test]
fn test_await_in_return_expression() {
    let mut harness = Harness::new();
    let source = format!(
        r#"{LATER}
        async function total() {{ return 1 + await later(10, 2) }}
        total()
    "#
    );
    let value = harness.eval_settled(&source).unwrap();
    assert_eq!(value.to_string(), "3");
    assert_eq!(harness.event_loop.now(), 10);
}

#[test]
fn test_awaits_in_destructured_initializer_run_in_order() {
    let mut harness = Harness::new();
    let source = format!(
        r#"{LATER}
        async function pair() {{
            const [x, y] = [await later(30, 'x'), await later(5, 'y')];
            return x + y + calls;
        }}
        pair()
    "#
    );
    let value = harness.eval_settled(&source).unwrap();
    assert_eq!(value.to_string(), "xy2");
    assert_eq!(harness.event_loop.now(), 35);
}

#[test]
fn test_nested_await_rejection_reaches_catch() {
    let mut harness = Harness::new();
    let source = format!(
        r#"{LATER}
        async function guarded() {{
            const log = [];
            try {{
                log.push(await later(5, 'first'));
                log.push('never ' + await Promise.reject(new Error('offline')));
            }} catch (e) {{
                log.push(e.message);
            }}
            return log.join(',');
        }}
        guarded()
    "#
    );
    let value = harness.eval_settled(&source).unwrap();
    assert_eq!(value.to_string(), "first,offline");
}

#[test]
fn test_awaits_in_loop_conditions() {
    let mut harness = Harness::new();
    let source = format!(
        r#"{LATER}
        async function poll() {{
            let n = 0;
            while ((await later(5, n)) < 3) n++;
            for (let i = 0; i < await later(5, 2); i++) n += 10;
            return n;
        }}
        poll()
    "#
    );
    let value = harness.eval_settled(&source).unwrap();
    assert_eq!(value.to_string(), "23");
    assert_eq!(harness.event_loop.now(), 35);
}
