//! Async runtime for script execution.
//!
//! This crate provides the host side of asynchronous evaluation:
//! - Event loop with task, timer and microtask queues
//! - Timer globals (`setTimeout`, `clearTimeout`, `queueMicrotask`)
//!
//! # Overview
//!
//! - [`EventLoop`] - Main event loop coordinating task execution
//! - [`Task`] - A unit of macrotask work
//! - [`install_timers`] - Exposes the loop to scripts through globals
//!
//! Promise reactions are queued on the per-thread microtask queue owned by
//! `core_types`; the loop drains it after every task.
//!
//! # Examples
//!
//! ```
//! use async_runtime::{EventLoop, Task};
//! use core_types::{PromiseRef, Value};
//! use std::rc::Rc;
//!
//! let event_loop = Rc::new(EventLoop::new());
//! let promise = PromiseRef::new();
//! let pending = promise.clone();
//! event_loop.set_timeout(10, Task::new(move || {
//!     pending.resolve(Value::Number(42.0));
//!     Ok(())
//! }));
//! let value = event_loop.run_until_settled(&promise).unwrap();
//! assert_eq!(value.to_number(), 42.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_loop;
pub mod task_queue;
pub mod timers;

// Re-export main types at crate root
pub use event_loop::EventLoop;
pub use task_queue::{Task, TaskQueue, TimerId, TimerQueue};
pub use timers::install_timers;
