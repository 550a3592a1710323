//! Core value types and error handling for the expression engine.
//!
//! This crate provides the foundational types shared by the parser, the
//! interpreter and the builtins: value representation, object and function
//! handles, promises, error types and source location tracking.
//!
//! # Overview
//!
//! - [`Value`] - Runtime value
//! - [`JsObject`] / [`ObjectRef`] - Ordered property maps with prototypes
//! - [`Callable`] / [`NativeFunction`] - Anything that can be called
//! - [`PromiseRef`] - Promises settled through the microtask queue
//! - [`JsError`] - Lexer, parser and evaluation errors
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Number(42.0);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::type_error("undefined is not a function");
//! assert_eq!(error.kind(), Some(ErrorKind::TypeError));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod function;
mod number;
mod object;
mod promise;
mod regexp;
mod source;
mod value;

pub use error::{ErrorKind, JsError, JsResult};
pub use function::{arg, Callable, FunctionRef, NativeFunction};
pub use number::{number_to_string, string_to_number, to_int32, to_uint32};
pub use object::{
    inherits_from, lookup_property, object_get, object_has, object_set, ArrayRef, JsObject,
    ObjectRef, Property,
};
pub use promise::{
    enqueue_microtask, has_pending_microtasks, run_microtasks, PromiseRef, PromiseState,
    Settlement,
};
pub use regexp::{validate_flags, JsRegExp, REGEXP_FLAGS};
pub use source::SourcePosition;
pub use value::{PreferredType, Value};
