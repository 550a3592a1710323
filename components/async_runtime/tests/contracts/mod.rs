//! Contract tests for async_runtime
//!
//! Scripts evaluated by the interpreter schedule work through the timer
//! globals, and the host settles the resulting promises on the loop.

use async_runtime::{install_timers, EventLoop};
use core_types::{JsError, Value};
use interpreter::Stack;
use std::rc::Rc;

fn evaluate(source: &str) -> (Value, Rc<EventLoop>) {
    let globals = builtins::global_object();
    let event_loop = Rc::new(EventLoop::new());
    install_timers(&globals, &event_loop);
    let mut stack = Stack::with_global_object(globals);
    let program = parser::parse(source).unwrap();
    let value = program.execute(&mut stack, None).unwrap().value();
    (value, event_loop)
}

fn settle(source: &str) -> Result<Value, JsError> {
    let (value, event_loop) = evaluate(source);
    match value {
        Value::Promise(promise) => event_loop.run_until_settled(&promise),
        other => panic!("expected a promise, got {}", other),
    }
}

#[test]
fn async_function_settles_after_timers() {
    let source = r#"
        const wait = (ms, value) => new Promise(resolve => setTimeout(resolve, ms, value))
        async function run() {
            const a = await wait(20, 'a')
            const b = await wait(10, 'b')
            return a + b
        }
        run()
    "#;
    assert_eq!(settle(source).unwrap().to_string(), "ab");
}

#[test]
fn timers_fire_in_due_order() {
    let source = r#"
        const order = []
        setTimeout(() => order.push('slow'), 30)
        setTimeout(() => order.push('fast'), 10)
        queueMicrotask(() => order.push('micro'))
        new Promise(resolve => setTimeout(() => resolve(order.join(' ')), 50))
    "#;
    assert_eq!(settle(source).unwrap().to_string(), "micro fast slow");
}

#[test]
fn cleared_timer_never_fires() {
    let source = r#"
        let fired = false
        const id = setTimeout(() => { fired = true }, 5)
        clearTimeout(id)
        new Promise(resolve => setTimeout(() => resolve(fired), 10))
    "#;
    assert_eq!(settle(source).unwrap().to_string(), "false");
}

#[test]
fn rejection_surfaces_as_throw() {
    let source = r#"
        new Promise((_, reject) => setTimeout(() => reject('nope'), 1))
    "#;
    match settle(source) {
        Err(JsError::Throw(reason)) => assert_eq!(reason.to_string(), "nope"),
        other => panic!("expected a rejection, got {:?}", other.map(|v| v.to_string())),
    }
}

#[test]
fn throwing_timer_callback_stops_the_loop() {
    let (_, event_loop) = evaluate("setTimeout(() => { throw 'bad' }, 1)");
    let err = event_loop.run_until_done().unwrap_err();
    assert!(matches!(err, JsError::Throw(_)));
}
