//! Task and timer queue management.
//!
//! Macrotasks run one at a time, and the microtask queue drains after each
//! one. Timers are macrotasks with a due time on the loop's virtual clock.

use core_types::JsResult;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// A task to be executed by the event loop.
///
/// Tasks represent work for a later turn of the loop, such as timer
/// callbacks or host-injected events.
pub struct Task {
    callback: Box<dyn FnOnce() -> JsResult<()>>,
}

impl Task {
    /// Creates a new Task from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> JsResult<()> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    pub fn run(self) -> JsResult<()> {
        (self.callback)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A FIFO queue for tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Handle returned when a timer is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Timers ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BTreeMap<(u64, TimerId), Task>,
}

impl TimerQueue {
    /// Creates a new empty TimerQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run at virtual time `due`.
    pub fn schedule(&mut self, due: u64, id: TimerId, task: Task) {
        self.timers.insert((due, id), task);
    }

    /// Cancel a timer. Returns false if it already ran or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, timer)| *timer == id).copied();
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Due time of the earliest timer.
    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    /// Remove the earliest timer.
    pub fn pop(&mut self) -> Option<(u64, Task)> {
        self.timers.pop_first().map(|((due, _), task)| (due, task))
    }

    /// Returns true if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_task_queue_fifo() {
        let mut queue = TaskQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 1..=2 {
            let sink = order.clone();
            queue.enqueue(Task::new(move || {
                sink.borrow_mut().push(n);
                Ok(())
            }));
        }
        assert_eq!(queue.len(), 2);
        while let Some(task) = queue.dequeue() {
            task.run().unwrap();
        }
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_timers_ordered_by_due_then_id() {
        let mut timers = TimerQueue::new();
        timers.schedule(20, TimerId(1), Task::new(|| Ok(())));
        timers.schedule(10, TimerId(3), Task::new(|| Ok(())));
        timers.schedule(10, TimerId(2), Task::new(|| Ok(())));
        assert_eq!(timers.next_due(), Some(10));
        assert_eq!(timers.len(), 3);
        let (due, _) = timers.pop().unwrap();
        assert_eq!(due, 10);
        assert!(timers.cancel(TimerId(3)));
        assert!(!timers.cancel(TimerId(3)));
        assert_eq!(timers.next_due(), Some(20));
    }
}
