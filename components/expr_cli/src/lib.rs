//! Expression engine CLI library
//!
//! Provides the [`Runtime`] that the `expr` binary drives: it parses or
//! deserializes a program, optionally lists its rendered form, JSON form
//! and dependencies, and evaluates it against the builtin globals with the
//! timer functions bound to an [`async_runtime::EventLoop`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::{Cli, Input};
pub use error::{CliError, CliResult};
pub use runtime::{format_value, Outcome, Runtime};
