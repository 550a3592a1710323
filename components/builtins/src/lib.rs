//! Standard library for the expression engine
//!
//! This crate provides the built-in objects and prototype methods that
//! scripts see:
//! - Property access on every kind of value ([`get_member`] and friends)
//! - Object, Array, String, Number, Function, Promise and RegExp methods
//! - Math, JSON and console namespaces
//! - Error constructors
//! - The global object handed to the interpreter's outermost scope
//!
//! Primitive values do not allocate prototype objects. Method lookup on a
//! string or an array goes straight to the matching `*Prototype::method`,
//! which returns an unbound native function operating on its `this`.
//!
//! # Example
//!
//! ```
//! use builtins::{get_member, MathObject};
//! use core_types::Value;
//!
//! let arr = Value::new_array(vec![Value::Number(1.0), Value::Number(2.0)]);
//! let join = get_member(&arr, "join").unwrap();
//! let joined = join.call(arr.clone(), vec![Value::from("-")]).unwrap();
//! assert_eq!(joined.to_string(), "1-2");
//!
//! assert_eq!(MathObject::round(2.5), 3.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod console;
pub mod error;
pub mod function;
pub mod globals;
pub mod iterator;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod regexp;
pub mod string;
pub mod value;

// Re-export main types for convenience
pub use array::ArrayPrototype;
pub use console::{inspect, ConsoleObject, ConsoleStream, ConsoleWriter};
pub use error::ErrorConstructor;
pub use function::{BoundFunction, FunctionPrototype};
pub use globals::{global_object, global_object_with_console};
pub use iterator::{collect_iterable, iter_result, ValueIterator};
pub use json::JSONObject;
pub use math::MathObject;
pub use number::{NumberConstructor, NumberPrototype};
pub use object::{ObjectConstructor, ObjectPrototype};
pub use promise::{resolving_functions, PromiseConstructor, PromisePrototype};
pub use regexp::RegExpPrototype;
pub use string::StringPrototype;
pub use value::{delete_member, get_member, has_property, instance_of, own_keys, set_member};
