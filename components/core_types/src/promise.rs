//! Promise implementation and the per-thread microtask queue.
//!
//! Settling a promise never runs reactions inline: each reaction is queued
//! as a microtask and runs when the host drains the queue (see
//! `async_runtime::EventLoop`). This keeps resumption of awaiting code
//! strictly after the current synchronous evaluation completes.

use crate::{Callable, FunctionRef, NativeFunction, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Outcome of a settled promise: fulfilled value or rejection reason.
pub type Settlement = Result<Value, Value>;

type Reaction = Box<dyn FnOnce(Settlement)>;
type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Queue a microtask on the current thread.
pub fn enqueue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run queued microtasks until the queue is empty, including microtasks
/// queued while draining. Returns the number of microtasks run.
pub fn run_microtasks() -> usize {
    let mut count = 0;
    loop {
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        match next {
            Some(task) => {
                task();
                count += 1;
            }
            None => return count,
        }
    }
}

/// True if microtasks are waiting to run on the current thread.
pub fn has_pending_microtasks() -> bool {
    MICROTASKS.with(|queue| !queue.borrow().is_empty())
}

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone)]
pub enum PromiseState {
    /// Neither fulfilled nor rejected yet
    Pending,
    /// Resolved with a value
    Fulfilled(Value),
    /// Rejected with a reason
    Rejected(Value),
}

struct Promise {
    state: PromiseState,
    reactions: Vec<Reaction>,
}

/// Shared handle to a promise.
///
/// # Examples
///
/// ```
/// use core_types::{run_microtasks, PromiseRef, PromiseState, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let promise = PromiseRef::new();
/// let seen = Rc::new(RefCell::new(None));
/// let sink = seen.clone();
/// promise.subscribe(move |result| *sink.borrow_mut() = Some(result));
///
/// promise.resolve(Value::Number(42.0));
/// assert!(seen.borrow().is_none());
/// run_microtasks();
/// assert!(matches!(promise.state(), PromiseState::Fulfilled(_)));
/// assert!(seen.borrow().is_some());
/// ```
#[derive(Clone)]
pub struct PromiseRef(Rc<RefCell<Promise>>);

impl PromiseRef {
    /// Create a pending promise.
    pub fn new() -> Self {
        PromiseRef(Rc::new(RefCell::new(Promise {
            state: PromiseState::Pending,
            reactions: Vec::new(),
        })))
    }

    /// `Promise.resolve(value)`: promises pass through unchanged.
    pub fn resolved(value: Value) -> Self {
        if let Value::Promise(promise) = value {
            return promise;
        }
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    /// `Promise.reject(reason)`.
    pub fn rejected(reason: Value) -> Self {
        let promise = Self::new();
        promise.reject(reason);
        promise
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.0.borrow().state.clone()
    }

    /// True until the promise settles.
    pub fn is_pending(&self) -> bool {
        matches!(self.0.borrow().state, PromiseState::Pending)
    }

    /// True if both handles point at the same promise.
    pub fn ptr_eq(&self, other: &PromiseRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolve the promise. Promises and thenables are adopted: this promise
    /// settles the same way once they do.
    pub fn resolve(&self, value: Value) {
        if !self.is_pending() {
            return;
        }
        match &value {
            Value::Promise(other) if other.ptr_eq(self) => {
                self.settle(Err(Value::new_error(
                    "TypeError",
                    "Chaining cycle detected for promise",
                )));
            }
            Value::Promise(other) => {
                let target = self.clone();
                other.subscribe(move |result| target.settle(result));
            }
            Value::Object(_) => {
                let then = value.get_property("then");
                if let Value::Function(then) = then {
                    let on_fulfilled = self.clone();
                    let on_rejected = self.clone();
                    let resolve = NativeFunction::value("", move |_, args| {
                        on_fulfilled.resolve(crate::arg(&args, 0));
                        Ok(Value::Undefined)
                    });
                    let reject = NativeFunction::value("", move |_, args| {
                        on_rejected.reject(crate::arg(&args, 0));
                        Ok(Value::Undefined)
                    });
                    if let Err(err) = then.call(value.clone(), vec![resolve, reject]) {
                        self.reject(err.to_value());
                    }
                } else {
                    self.settle(Ok(value));
                }
            }
            _ => self.settle(Ok(value)),
        }
    }

    /// Reject the promise with `reason`.
    pub fn reject(&self, reason: Value) {
        self.settle(Err(reason));
    }

    fn settle(&self, result: Settlement) {
        let reactions = {
            let mut promise = self.0.borrow_mut();
            if !matches!(promise.state, PromiseState::Pending) {
                return;
            }
            promise.state = match &result {
                Ok(value) => PromiseState::Fulfilled(value.clone()),
                Err(reason) => PromiseState::Rejected(reason.clone()),
            };
            std::mem::take(&mut promise.reactions)
        };
        for reaction in reactions {
            let result = result.clone();
            enqueue_microtask(move || reaction(result));
        }
    }

    /// Register a reaction that runs (as a microtask) once the promise settles.
    pub fn subscribe(&self, reaction: impl FnOnce(Settlement) + 'static) {
        let settled = {
            let mut promise = self.0.borrow_mut();
            match &promise.state {
                PromiseState::Pending => {
                    promise.reactions.push(Box::new(reaction));
                    return;
                }
                PromiseState::Fulfilled(value) => Ok(value.clone()),
                PromiseState::Rejected(reason) => Err(reason.clone()),
            }
        };
        enqueue_microtask(move || reaction(settled));
    }

    /// `Promise.prototype.then`: returns the derived promise.
    pub fn then(&self, on_fulfilled: Option<FunctionRef>, on_rejected: Option<FunctionRef>) -> PromiseRef {
        let derived = PromiseRef::new();
        let target = derived.clone();
        self.subscribe(move |result| {
            let handler = match &result {
                Ok(_) => on_fulfilled,
                Err(_) => on_rejected,
            };
            match (handler, result) {
                (Some(handler), Ok(value)) | (Some(handler), Err(value)) => {
                    match handler.call(Value::Undefined, vec![value]) {
                        Ok(next) => target.resolve(next),
                        Err(err) => target.reject(err.to_value()),
                    }
                }
                (None, Ok(value)) => target.resolve(value),
                (None, Err(reason)) => target.reject(reason),
            }
        });
        derived
    }

    /// `Promise.prototype.finally`: runs `callback` and passes the
    /// settlement through.
    pub fn finally(&self, callback: FunctionRef) -> PromiseRef {
        let derived = PromiseRef::new();
        let target = derived.clone();
        self.subscribe(move |result| {
            if let Err(err) = callback.call(Value::Undefined, Vec::new()) {
                target.reject(err.to_value());
                return;
            }
            match result {
                Ok(value) => target.resolve(value),
                Err(reason) => target.reject(reason),
            }
        });
        derived
    }
}

impl Default for PromiseRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PromiseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            PromiseState::Pending => write!(f, "Promise {{ <pending> }}"),
            PromiseState::Fulfilled(value) => write!(f, "Promise {{ {:?} }}", value),
            PromiseState::Rejected(reason) => write!(f, "Promise {{ <rejected> {:?} }}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_settles_only_once() {
        let promise = PromiseRef::new();
        promise.resolve(Value::Number(1.0));
        promise.reject(Value::Number(2.0));
        assert!(matches!(promise.state(), PromiseState::Fulfilled(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn test_reactions_run_as_microtasks() {
        let promise = PromiseRef::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        promise.subscribe(move |_| counter.set(counter.get() + 1));
        promise.resolve(Value::Undefined);
        assert_eq!(hits.get(), 0);
        assert!(has_pending_microtasks());
        run_microtasks();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_adopts_other_promise() {
        let inner = PromiseRef::new();
        let outer = PromiseRef::new();
        outer.resolve(Value::Promise(inner.clone()));
        assert!(outer.is_pending());
        inner.reject(Value::from("nope"));
        run_microtasks();
        assert!(matches!(outer.state(), PromiseState::Rejected(_)));
    }

    #[test]
    fn test_then_maps_value() {
        let promise = PromiseRef::resolved(Value::Number(2.0));
        let doubled = NativeFunction::new("double", |_, args| {
            Ok(Value::Number(crate::arg(&args, 0).to_number() * 2.0))
        });
        let derived = promise.then(Some(Rc::new(doubled)), None);
        run_microtasks();
        assert!(matches!(derived.state(), PromiseState::Fulfilled(Value::Number(n)) if n == 4.0));
    }

    #[test]
    fn test_resolved_passes_promise_through() {
        let promise = PromiseRef::new();
        let same = PromiseRef::resolved(Value::Promise(promise.clone()));
        assert!(same.ptr_eq(&promise));
    }
}
