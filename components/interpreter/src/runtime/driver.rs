//! Drivers for suspending bodies.
//!
//! A driver owns a [`Machine`] and its [`Stack`] and decides what a
//! suspension means:
//! - async functions wait on the awaited promise and resume from its
//!   reaction, settling their own result promise at the end
//! - generators hand each yielded value to the caller of `next`
//! - async generators queue `next`/`return`/`throw` requests and answer
//!   each one with a promise

use crate::node::Completion;
use crate::runtime::machine::{Machine, Resume, Step};
use crate::runtime::settle_now;
use crate::stack::Stack;
use builtins::iter_result;
use core_types::{arg, ErrorKind, JsError, JsObject, JsResult, NativeFunction, PromiseRef, Settlement, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace};

fn settlement_to_resume(settlement: Settlement) -> Resume {
    match settlement {
        Ok(value) => Resume::Next(value),
        Err(reason) => Resume::Throw(reason),
    }
}

fn step_machine(machine: &mut Machine, stack: &mut Stack, input: Option<Resume>) -> JsResult<Step> {
    match input {
        None => machine.run(stack),
        Some(input) => machine.resume(stack, input),
    }
}

// ----------------------------------------------------------------------------
// Async functions
// ----------------------------------------------------------------------------

/// Runs an async function body against its result promise.
pub struct AsyncDriver {
    machine: Machine,
    stack: Stack,
    promise: PromiseRef,
}

/// Start an async body. It runs synchronously up to its first suspension;
/// the returned promise settles when the body completes.
pub fn run_async(machine: Machine, stack: Stack) -> Value {
    let promise = PromiseRef::new();
    let driver = Rc::new(RefCell::new(AsyncDriver {
        machine,
        stack,
        promise: promise.clone(),
    }));
    AsyncDriver::step(&driver, None);
    Value::Promise(promise)
}

impl AsyncDriver {
    fn step(driver: &Rc<RefCell<Self>>, input: Option<Resume>) {
        let (result, promise) = {
            let mut guard = driver.borrow_mut();
            let AsyncDriver {
                machine,
                stack,
                promise,
            } = &mut *guard;
            (step_machine(machine, stack, input), promise.clone())
        };
        match result {
            Ok(Step::Await(awaited)) => {
                trace!("async body suspended");
                let driver = driver.clone();
                awaited.subscribe(move |settlement| {
                    AsyncDriver::step(&driver, Some(settlement_to_resume(settlement)));
                });
            }
            Ok(Step::Done(Completion::Return(value))) => promise.resolve(value),
            Ok(Step::Done(_)) => promise.resolve(Value::Undefined),
            Ok(Step::Yield(_)) => promise.reject(Value::new_error(
                "SyntaxError",
                "yield is only valid inside generator functions",
            )),
            Err(err) => {
                debug!(error = %err, "async body rejected");
                promise.reject(err.to_value());
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Generators
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratorStatus {
    Start,
    Suspended,
    Done,
}

struct GeneratorState {
    machine: Machine,
    stack: Stack,
    status: GeneratorStatus,
}

type Request<F> = fn(&Rc<RefCell<F>>, Resume) -> JsResult<Value>;

fn generator_method<F: 'static>(
    name: &'static str,
    state: Rc<RefCell<F>>,
    call: Request<F>,
    input: fn(Value) -> Resume,
) -> Value {
    NativeFunction::value(name, move |_this, args| call(&state, input(arg(&args, 0))))
}

fn iterator_object<F: 'static>(
    class_name: &str,
    state: Rc<RefCell<F>>,
    call: Request<F>,
) -> Value {
    let mut object = JsObject::new();
    object.class_name = Some(class_name.to_string());
    object.insert("next", generator_method("next", state.clone(), call, Resume::Next));
    object.insert("return", generator_method("return", state.clone(), call, Resume::Return));
    object.insert("throw", generator_method("throw", state, call, Resume::Throw));
    Value::Object(object.into_ref())
}

/// Wrap a generator body in an iterator object with `next`, `return` and
/// `throw` methods. Nothing runs until the first `next` call.
pub fn generator_object(machine: Machine, stack: Stack) -> Value {
    let state = Rc::new(RefCell::new(GeneratorState {
        machine,
        stack,
        status: GeneratorStatus::Start,
    }));
    iterator_object("Generator", state, resume_generator)
}

fn resume_generator(state: &Rc<RefCell<GeneratorState>>, input: Resume) -> JsResult<Value> {
    let mut guard = state
        .try_borrow_mut()
        .map_err(|_| JsError::type_error("Generator is already running"))?;
    let GeneratorState {
        machine,
        stack,
        status,
    } = &mut *guard;
    let step = match (*status, input) {
        (GeneratorStatus::Done, Resume::Next(_)) => return Ok(iter_result(Value::Undefined, true)),
        (GeneratorStatus::Start | GeneratorStatus::Done, Resume::Return(value)) => {
            *status = GeneratorStatus::Done;
            return Ok(iter_result(value, true));
        }
        (GeneratorStatus::Start | GeneratorStatus::Done, Resume::Throw(reason)) => {
            *status = GeneratorStatus::Done;
            return Err(JsError::Throw(reason));
        }
        (GeneratorStatus::Start, Resume::Next(_)) => machine.run(stack),
        (GeneratorStatus::Suspended, input) => machine.resume(stack, input),
    };
    match settle_awaits(machine, stack, step) {
        Ok(Step::Yield(value)) => {
            *status = GeneratorStatus::Suspended;
            Ok(iter_result(value, false))
        }
        Ok(Step::Done(completion)) => {
            *status = GeneratorStatus::Done;
            let value = match completion {
                Completion::Return(value) => value,
                _ => Value::Undefined,
            };
            Ok(iter_result(value, true))
        }
        Ok(Step::Await(_)) => {
            *status = GeneratorStatus::Done;
            Err(JsError::eval(
                ErrorKind::InternalError,
                "generator stopped on an unsettled await",
            ))
        }
        Err(err) => {
            *status = GeneratorStatus::Done;
            Err(err)
        }
    }
}

/// Await inside a synchronous generator blocks on the microtask queue.
fn settle_awaits(machine: &mut Machine, stack: &mut Stack, mut step: JsResult<Step>) -> JsResult<Step> {
    while let Ok(Step::Await(promise)) = &step {
        let input = match settle_now(promise) {
            Ok(value) => Resume::Next(value),
            Err(JsError::Throw(reason)) => Resume::Throw(reason),
            Err(err) => return Err(err),
        };
        step = machine.resume(stack, input);
    }
    step
}

// ----------------------------------------------------------------------------
// Async generators
// ----------------------------------------------------------------------------

struct AsyncGeneratorState {
    machine: Machine,
    stack: Stack,
    status: GeneratorStatus,
    queue: VecDeque<(Resume, PromiseRef)>,
    current: Option<PromiseRef>,
}

/// Wrap an async generator body. Each method call returns a promise of an
/// iterator result; requests are served one at a time in call order.
pub fn async_generator_object(machine: Machine, stack: Stack) -> Value {
    let state = Rc::new(RefCell::new(AsyncGeneratorState {
        machine,
        stack,
        status: GeneratorStatus::Start,
        queue: VecDeque::new(),
        current: None,
    }));
    iterator_object("AsyncGenerator", state, enqueue_request)
}

fn enqueue_request(state: &Rc<RefCell<AsyncGeneratorState>>, input: Resume) -> JsResult<Value> {
    let promise = PromiseRef::new();
    state
        .try_borrow_mut()
        .map_err(|_| JsError::type_error("Generator is already running"))?
        .queue
        .push_back((input, promise.clone()));
    drain(state);
    Ok(Value::Promise(promise))
}

fn drain(state: &Rc<RefCell<AsyncGeneratorState>>) {
    loop {
        let (input, status) = {
            let Ok(mut s) = state.try_borrow_mut() else {
                return;
            };
            if s.current.is_some() {
                return;
            }
            let Some((input, promise)) = s.queue.pop_front() else {
                return;
            };
            let status = s.status;
            match (&input, status) {
                (Resume::Next(_), GeneratorStatus::Done) => {
                    promise.resolve(iter_result(Value::Undefined, true));
                    continue;
                }
                (Resume::Return(value), GeneratorStatus::Start | GeneratorStatus::Done) => {
                    s.status = GeneratorStatus::Done;
                    promise.resolve(iter_result(value.clone(), true));
                    continue;
                }
                (Resume::Throw(reason), GeneratorStatus::Start | GeneratorStatus::Done) => {
                    s.status = GeneratorStatus::Done;
                    promise.reject(reason.clone());
                    continue;
                }
                _ => {}
            }
            s.current = Some(promise);
            (input, status)
        };
        let input = if status == GeneratorStatus::Start {
            None
        } else {
            Some(input)
        };
        step_async_generator(state, input);
    }
}

fn step_async_generator(state: &Rc<RefCell<AsyncGeneratorState>>, input: Option<Resume>) {
    let result = {
        let mut guard = state.borrow_mut();
        let AsyncGeneratorState { machine, stack, .. } = &mut *guard;
        step_machine(machine, stack, input)
    };
    match result {
        Ok(Step::Await(awaited)) => {
            let state = state.clone();
            awaited.subscribe(move |settlement| {
                step_async_generator(&state, Some(settlement_to_resume(settlement)));
                drain(&state);
            });
        }
        Ok(Step::Yield(Value::Promise(yielded))) => {
            let state = state.clone();
            yielded.subscribe(move |settlement| {
                match settlement {
                    Ok(value) => answer(&state, Ok(iter_result(value, false)), GeneratorStatus::Suspended),
                    Err(reason) => answer(&state, Err(reason), GeneratorStatus::Done),
                }
                drain(&state);
            });
        }
        Ok(Step::Yield(value)) => answer(state, Ok(iter_result(value, false)), GeneratorStatus::Suspended),
        Ok(Step::Done(completion)) => {
            let value = match completion {
                Completion::Return(value) => value,
                _ => Value::Undefined,
            };
            answer(state, Ok(iter_result(value, true)), GeneratorStatus::Done);
        }
        Err(err) => answer(state, Err(err.to_value()), GeneratorStatus::Done),
    }
}

fn answer(state: &Rc<RefCell<AsyncGeneratorState>>, outcome: Settlement, status: GeneratorStatus) {
    let promise = {
        let mut s = state.borrow_mut();
        s.status = status;
        s.current.take()
    };
    if let Some(promise) = promise {
        match outcome {
            Ok(value) => promise.resolve(value),
            Err(reason) => promise.reject(reason),
        }
    }
}
