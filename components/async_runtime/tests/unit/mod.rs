//! Unit tests for EventLoop

use async_runtime::{EventLoop, Task, TimerId};
use core_types::{enqueue_microtask, PromiseRef, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn new_event_loop_is_idle() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_idle());
}

#[test]
fn enqueue_task_adds_to_task_queue() {
    let event_loop = EventLoop::new();
    event_loop.enqueue_task(Task::new(|| Ok(())));
    assert!(!event_loop.is_task_queue_empty());
    event_loop.run_until_done().unwrap();
    assert!(event_loop.is_task_queue_empty());
}

#[test]
fn tasks_scheduled_by_tasks_run_in_later_turns() {
    let event_loop = Rc::new(EventLoop::new());
    let order = Rc::new(RefCell::new(Vec::new()));

    let (o, el) = (order.clone(), event_loop.clone());
    event_loop.enqueue_task(Task::new(move || {
        o.borrow_mut().push("outer");
        let o = o.clone();
        el.enqueue_task(Task::new(move || {
            o.borrow_mut().push("inner");
            Ok(())
        }));
        Ok(())
    }));

    assert!(event_loop.process_one_cycle().unwrap());
    assert_eq!(*order.borrow(), vec!["outer"]);
    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
}

#[test]
fn promise_reactions_run_before_the_next_task() {
    let event_loop = EventLoop::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let promise = PromiseRef::new();
    let o = order.clone();
    promise.subscribe(move |_| o.borrow_mut().push("reaction"));

    let (o, p) = (order.clone(), promise.clone());
    event_loop.enqueue_task(Task::new(move || {
        o.borrow_mut().push("resolve");
        p.resolve(Value::Null);
        Ok(())
    }));
    let o = order.clone();
    event_loop.enqueue_task(Task::new(move || {
        o.borrow_mut().push("next task");
        Ok(())
    }));

    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec!["resolve", "reaction", "next task"]);
}

#[test]
fn pending_microtasks_count_as_work() {
    let event_loop = EventLoop::new();
    let hit = Rc::new(RefCell::new(false));
    let h = hit.clone();
    enqueue_microtask(move || *h.borrow_mut() = true);
    assert!(!event_loop.is_microtask_queue_empty());
    assert!(event_loop.process_one_cycle().unwrap());
    assert!(*hit.borrow());
    assert!(!event_loop.process_one_cycle().unwrap());
}

#[test]
fn equal_delays_keep_scheduling_order() {
    let event_loop = EventLoop::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut ids = Vec::new();
    for n in 0..3 {
        let o = order.clone();
        ids.push(event_loop.set_timeout(5, Task::new(move || {
            o.borrow_mut().push(n);
            Ok(())
        })));
    }
    assert_eq!(ids, vec![TimerId(1), TimerId(2), TimerId(3)]);
    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn clearing_unknown_timer_is_harmless() {
    let event_loop = EventLoop::new();
    assert!(!event_loop.clear_timeout(TimerId(99)));
}
