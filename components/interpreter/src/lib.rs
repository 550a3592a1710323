//! Tree-walking interpreter over a typed AST.
//!
//! This crate provides:
//! - The closed set of AST node kinds, each evaluating, assigning and
//!   serializing itself through [`ExpressionNode`]
//! - Variable environments ([`Scope`], [`ReadOnlyScope`], [`ReactiveScope`])
//!   and the [`Stack`] that chains them
//! - Script functions, classes and the drivers that suspend async
//!   functions and generators at `await` and `yield`
//! - A [`DeserializerRegistry`] that rebuilds trees from their JSON form
//!
//! # Example
//!
//! ```
//! use interpreter::{DeserializerRegistry, Stack};
//! use serde_json::json;
//!
//! let registry = DeserializerRegistry::with_default_nodes();
//! let node = registry
//!     .deserialize(&json!({
//!         "type": "BinaryExpression",
//!         "operator": "*",
//!         "left": { "type": "Identifier", "name": "price" },
//!         "right": { "type": "NumberLiteral", "value": 3.0 },
//!     }))
//!     .unwrap();
//!
//! let mut stack = Stack::with_globals();
//! stack.set("price", core_types::Value::Number(4.0)).unwrap();
//! assert_eq!(node.get(&mut stack, None).unwrap().to_number(), 12.0);
//! assert_eq!(node.to_string(), "price * 3");
//! assert_eq!(node.events(), vec!["price"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod node;
pub mod ops;
pub mod reactive;
pub mod registry;
pub mod runtime;
pub mod scope;
pub mod stack;

// Re-export main types at crate root
pub use node::{Completion, ExprNode, ExpressionNode, Node};
pub use reactive::{ReactiveScope, ScopeSubscription};
pub use registry::DeserializerRegistry;
pub use runtime::class::ClassValue;
pub use runtime::function::{
    max_call_depth, set_max_call_depth, FunctionDef, FunctionForm, ScriptFunction, DEFAULT_MAX_CALL_DEPTH,
};
pub use runtime::machine::{Machine, Resume, Step};
pub use scope::{DeclarationKind, ObjectScope, ReadOnlyScope, Scope, ScopeRef, ScopeType};
pub use stack::{AwaitPromiseInfo, ForAwaitInfo, Stack, YieldInfo};
