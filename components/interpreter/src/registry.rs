//! JSON to AST deserialization.
//!
//! Every serialized node is an object with a `type` tag. The registry maps
//! tags to factory functions; factories receive the registry back so they
//! can deserialize their children through it.

use crate::node::{self, ExprNode};
use core_types::{JsError, JsResult};
use std::collections::HashMap;
use tracing::debug;

/// Builds a node from its JSON form.
pub type NodeFactory = fn(&serde_json::Value, &DeserializerRegistry) -> JsResult<ExprNode>;

/// Tag to factory table.
///
/// # Examples
///
/// ```
/// use interpreter::DeserializerRegistry;
/// use serde_json::json;
///
/// let registry = DeserializerRegistry::with_default_nodes();
/// let node = registry
///     .deserialize(&json!({ "type": "Identifier", "name": "total" }))
///     .unwrap();
/// assert_eq!(node.to_string(), "total");
///
/// let empty = DeserializerRegistry::new();
/// assert!(empty.deserialize(&json!({ "type": "Identifier", "name": "x" })).is_err());
/// ```
#[derive(Clone, Default)]
pub struct DeserializerRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl DeserializerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing every built-in node kind.
    pub fn with_default_nodes() -> Self {
        let mut registry = Self::new();
        node::register_defaults(&mut registry);
        debug!(count = registry.len(), "registered default node kinds");
        registry
    }

    /// Register (or replace) the factory for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, factory: NodeFactory) {
        self.factories.insert(tag.into(), factory);
    }

    /// True if `tag` has a factory.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Rebuild a node from JSON.
    pub fn deserialize(&self, json: &serde_json::Value) -> JsResult<ExprNode> {
        let tag = json
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| JsError::deserialize("node is missing its \"type\" tag"))?;
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| JsError::deserialize(format!("unknown node type '{}'", tag)))?;
        factory(json, self)
    }

    /// Parse `text` as JSON and rebuild the node it describes.
    pub fn deserialize_str(&self, text: &str) -> JsResult<ExprNode> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|err| JsError::deserialize(format!("invalid JSON: {}", err)))?;
        self.deserialize(&json)
    }
}
