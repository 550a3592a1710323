//! Event loop implementation.
//!
//! The loop coordinates macrotasks, timers and the per-thread microtask queue
//! that promise reactions are queued on.

use crate::task_queue::{Task, TaskQueue, TimerId, TimerQueue};
use core_types::{
    enqueue_microtask, has_pending_microtasks, run_microtasks, JsError, JsResult, PromiseRef,
    PromiseState, Value,
};
use std::cell::{Cell, RefCell};
use tracing::{debug, trace};

/// The event loop.
///
/// Each turn takes the oldest task (or, when none is queued, advances the
/// virtual clock to the earliest timer) and runs it, then drains every
/// microtask, including microtasks queued while draining.
///
/// All methods take `&self` so that running tasks can schedule more work
/// on the same loop.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
///
/// let event_loop = EventLoop::new();
/// event_loop.enqueue_task(Task::new(|| Ok(())));
/// event_loop.run_until_done().unwrap();
/// assert!(event_loop.is_idle());
/// ```
#[derive(Debug, Default)]
pub struct EventLoop {
    tasks: RefCell<TaskQueue>,
    timers: RefCell<TimerQueue>,
    now: Cell<u64>,
    next_timer: Cell<u64>,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.tasks.borrow_mut().enqueue(task);
    }

    /// Adds a microtask to the shared microtask queue.
    pub fn enqueue_microtask(&self, microtask: impl FnOnce() + 'static) {
        enqueue_microtask(microtask);
    }

    /// Schedule `task` to run `delay` virtual milliseconds from now.
    pub fn set_timeout(&self, delay: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_timer.get() + 1);
        self.next_timer.set(id.0);
        let due = self.now.get().saturating_add(delay);
        trace!(timer = id.0, due, "timer scheduled");
        self.timers.borrow_mut().schedule(due, id, task);
        id
    }

    /// Cancel a pending timer.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().cancel(id)
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Returns true if no timer is pending.
    pub fn is_timer_queue_empty(&self) -> bool {
        self.timers.borrow().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        !has_pending_microtasks()
    }

    /// Returns true when there is nothing left to run.
    pub fn is_idle(&self) -> bool {
        self.is_task_queue_empty() && self.is_timer_queue_empty() && self.is_microtask_queue_empty()
    }

    /// Runs all microtasks until the queue is empty. Returns how many ran.
    pub fn run_all_microtasks(&self) -> usize {
        run_microtasks()
    }

    /// Take the next macrotask, advancing the clock to a timer if needed.
    fn next_task(&self) -> Option<Task> {
        if let Some(task) = self.tasks.borrow_mut().dequeue() {
            return Some(task);
        }
        let (due, task) = self.timers.borrow_mut().pop()?;
        if due > self.now.get() {
            self.now.set(due);
        }
        Some(task)
    }

    /// Processes one complete cycle: one task followed by all microtasks.
    ///
    /// Returns false when there was nothing to do.
    pub fn process_one_cycle(&self) -> JsResult<bool> {
        let ran_microtasks = self.run_all_microtasks() > 0;
        let Some(task) = self.next_task() else {
            return Ok(ran_microtasks);
        };
        // The borrow on the queues is released before the task runs
        task.run()?;
        self.run_all_microtasks();
        Ok(true)
    }

    /// Runs the event loop until all tasks, timers and microtasks are
    /// processed. The first failing task aborts the run.
    pub fn run_until_done(&self) -> JsResult<()> {
        let mut turns = 0usize;
        while self.process_one_cycle()? {
            turns += 1;
        }
        debug!(turns, now = self.now(), "event loop drained");
        Ok(())
    }

    /// Run until `promise` settles and return its value. A rejection comes
    /// back as [`JsError::Throw`] carrying the reason.
    pub fn run_until_settled(&self, promise: &PromiseRef) -> JsResult<Value> {
        loop {
            match promise.state() {
                PromiseState::Fulfilled(value) => return Ok(value),
                PromiseState::Rejected(reason) => return Err(JsError::Throw(reason)),
                PromiseState::Pending => {}
            }
            if !self.process_one_cycle()? {
                return Err(JsError::eval(
                    core_types::ErrorKind::InternalError,
                    "Promise never settled: the event loop ran out of work",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_new_event_loop() {
        let el = EventLoop::new();
        assert!(el.is_task_queue_empty());
        assert!(el.is_timer_queue_empty());
        assert_eq!(el.now(), 0);
    }

    #[test]
    fn test_run_until_done_with_tasks() {
        let el = EventLoop::new();
        let counter = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let c = counter.clone();
            el.enqueue_task(Task::new(move || {
                c.set(c.get() + 1);
                Ok(())
            }));
        }
        el.run_until_done().unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_microtasks_drain_between_tasks() {
        let el = Rc::new(EventLoop::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let (o, inner) = (order.clone(), el.clone());
        el.enqueue_task(Task::new(move || {
            o.borrow_mut().push("task 1");
            let o = o.clone();
            inner.enqueue_microtask(move || o.borrow_mut().push("micro"));
            Ok(())
        }));
        let o = order.clone();
        el.enqueue_task(Task::new(move || {
            o.borrow_mut().push("task 2");
            Ok(())
        }));

        el.run_until_done().unwrap();
        assert_eq!(*order.borrow(), vec!["task 1", "micro", "task 2"]);
    }

    #[test]
    fn test_timers_advance_virtual_clock() {
        let el = EventLoop::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        for delay in [30, 10, 20] {
            let f = fired.clone();
            el.set_timeout(delay, Task::new(move || {
                f.borrow_mut().push(delay);
                Ok(())
            }));
        }
        let cancelled = el.set_timeout(5, Task::new(|| Ok(())));
        assert!(el.clear_timeout(cancelled));

        el.run_until_done().unwrap();
        assert_eq!(*fired.borrow(), vec![10, 20, 30]);
        assert_eq!(el.now(), 30);
    }

    #[test]
    fn test_failing_task_stops_the_loop() {
        let el = EventLoop::new();
        el.enqueue_task(Task::new(|| Err(JsError::type_error("boom"))));
        el.enqueue_task(Task::new(|| Ok(())));
        assert!(el.run_until_done().is_err());
        assert!(!el.is_task_queue_empty());
    }

    #[test]
    fn test_run_until_settled() {
        let el = Rc::new(EventLoop::new());
        let promise = PromiseRef::new();
        let p = promise.clone();
        el.set_timeout(100, Task::new(move || {
            p.resolve(Value::Number(7.0));
            Ok(())
        }));
        let value = el.run_until_settled(&promise).unwrap();
        assert_eq!(value.to_number(), 7.0);

        let never = PromiseRef::new();
        assert!(el.run_until_settled(&never).is_err());

        let rejected = PromiseRef::rejected(Value::String("no".into()));
        assert!(matches!(el.run_until_settled(&rejected), Err(JsError::Throw(_))));
    }
}
