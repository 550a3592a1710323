//! Timer globals backed by an [`EventLoop`].
//!
//! `setTimeout`, `clearTimeout` and `queueMicrotask` are installed on a
//! global object so that scripts can schedule work on the host's loop.

use crate::event_loop::EventLoop;
use crate::task_queue::{Task, TimerId};
use core_types::{enqueue_microtask, JsError, JsResult, NativeFunction, ObjectRef, Value};
use std::rc::{Rc, Weak};
use tracing::warn;

fn callback(args: &[Value], caller: &str) -> JsResult<Value> {
    match args.first() {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        _ => Err(JsError::type_error(format!(
            "{}: callback must be a function",
            caller
        ))),
    }
}

fn upgrade(event_loop: &Weak<EventLoop>) -> JsResult<Rc<EventLoop>> {
    event_loop
        .upgrade()
        .ok_or_else(|| JsError::type_error("The event loop has shut down"))
}

/// Milliseconds from a script value; NaN and negatives mean zero.
fn delay_ms(value: Option<&Value>) -> u64 {
    let ms = value.map(Value::to_number).unwrap_or(0.0);
    if ms.is_finite() && ms > 0.0 {
        ms as u64
    } else {
        0
    }
}

/// Define the timer functions on `globals`. The functions hold a weak
/// reference, so dropping the loop disables them.
pub fn install_timers(globals: &ObjectRef, event_loop: &Rc<EventLoop>) {
    let weak = Rc::downgrade(event_loop);
    let set_timeout = NativeFunction::value("setTimeout", move |_this, args| {
        let event_loop = upgrade(&weak)?;
        let Value::Function(function) = callback(&args, "setTimeout")? else {
            return Ok(Value::Undefined);
        };
        let delay = delay_ms(args.get(1));
        let extra: Vec<Value> = args.into_iter().skip(2).collect();
        let id = event_loop.set_timeout(
            delay,
            Task::new(move || function.call(Value::Undefined, extra).map(|_| ())),
        );
        Ok(Value::Number(id.0 as f64))
    });

    let weak = Rc::downgrade(event_loop);
    let clear_timeout = NativeFunction::value("clearTimeout", move |_this, args| {
        let event_loop = upgrade(&weak)?;
        let id = args.first().map(Value::to_number).unwrap_or(f64::NAN);
        if id.is_finite() && id >= 1.0 {
            event_loop.clear_timeout(TimerId(id as u64));
        }
        Ok(Value::Undefined)
    });

    let queue_microtask = NativeFunction::value("queueMicrotask", |_this, args| {
        let Value::Function(function) = callback(&args, "queueMicrotask")? else {
            return Ok(Value::Undefined);
        };
        enqueue_microtask(move || {
            if let Err(err) = function.call(Value::Undefined, Vec::new()) {
                warn!(error = %err, "uncaught error in microtask");
            }
        });
        Ok(Value::Undefined)
    });

    let mut globals = globals.borrow_mut();
    globals.insert("setTimeout", set_timeout);
    globals.insert("clearTimeout", clear_timeout);
    globals.insert("queueMicrotask", queue_microtask);
}
