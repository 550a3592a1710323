//! Observable scopes.
//!
//! A [`ReactiveScope`] behaves like an ordinary scope but reports every
//! write to subscribers of the written key. Child scopes created for
//! object-valued properties report upwards, so a write to `user.name`
//! reaches subscribers of `name` on the child scope and subscribers of
//! `user` on the root.
//!
//! Emission is synchronous. While a key is being emitted, further emissions
//! for the same key on the same scope are dropped rather than queued, which
//! stops subscribers that write back to their own key from looping.

use crate::scope::{ChildScopes, DeclarationKind, ObjectScope, Scope, ScopeRef, ScopeType};
use core_types::{JsObject, JsResult, ObjectRef, Property, Value};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tracing::trace;

type Callback = dyn Fn(&Value, &Value);

struct Subscriber {
    id: u64,
    callback: Box<Callback>,
    paused: Cell<bool>,
    active: Cell<bool>,
}

type SubscriberMap = Rc<RefCell<HashMap<String, Vec<Rc<Subscriber>>>>>;

/// Handle returned by [`ReactiveScope::subscribe`].
///
/// Dropping the handle does not unsubscribe; call
/// [`ScopeSubscription::unsubscribe`] on teardown.
pub struct ScopeSubscription {
    key: String,
    subscriber: Rc<Subscriber>,
    registry: Weak<RefCell<HashMap<String, Vec<Rc<Subscriber>>>>>,
}

impl ScopeSubscription {
    /// Key this subscription listens to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop delivering changes until [`ScopeSubscription::resume`].
    pub fn pause(&self) {
        self.subscriber.paused.set(true);
    }

    /// Resume delivering changes.
    pub fn resume(&self) {
        self.subscriber.paused.set(false);
    }

    /// True while subscribed and not paused.
    pub fn is_active(&self) -> bool {
        self.subscriber.active.get() && !self.subscriber.paused.get()
    }

    /// Remove the subscription. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if !self.subscriber.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.borrow_mut();
            if let Some(list) = registry.get_mut(&self.key) {
                list.retain(|s| s.id != self.subscriber.id);
                if list.is_empty() {
                    registry.remove(&self.key);
                }
            }
        }
    }
}

/// Scope that emits `(new, old)` pairs to subscribers on every write.
///
/// # Examples
///
/// ```
/// use interpreter::{ReactiveScope, Scope};
/// use core_types::Value;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scope = ReactiveScope::new_root();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let subscription = scope.subscribe("count", move |new, old| {
///     sink.borrow_mut().push((new.to_number(), old.to_string()));
/// });
///
/// scope.set("count", Value::Number(1.0)).unwrap();
/// assert_eq!(*seen.borrow(), vec![(1.0, "undefined".to_string())]);
///
/// subscription.unsubscribe();
/// scope.set("count", Value::Number(2.0)).unwrap();
/// assert_eq!(seen.borrow().len(), 1);
/// ```
pub struct ReactiveScope {
    inner: ObjectScope,
    this: Weak<ReactiveScope>,
    parent: Option<(Weak<ReactiveScope>, String)>,
    subscribers: SubscriberMap,
    next_id: Cell<u64>,
    emitting: RefCell<HashSet<String>>,
    snapshot: RefCell<Option<IndexMap<String, Value>>>,
    children: ChildScopes,
}

impl ReactiveScope {
    /// Reactive scope over `context`.
    pub fn new(context: ObjectRef) -> Rc<Self> {
        Self::build(context, ScopeType::Block, None)
    }

    /// Reactive scope over a fresh, empty context object.
    pub fn new_root() -> Rc<Self> {
        Self::new(JsObject::new().into_ref())
    }

    fn build(
        context: ObjectRef,
        scope_type: ScopeType,
        parent: Option<(Weak<ReactiveScope>, String)>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| ReactiveScope {
            inner: ObjectScope::with_context(context, scope_type),
            this: this.clone(),
            parent,
            subscribers: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(0),
            emitting: RefCell::new(HashSet::new()),
            snapshot: RefCell::new(None),
            children: ChildScopes::default(),
        })
    }

    /// Call `callback(new, old)` whenever `key` changes in this scope.
    pub fn subscribe(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&Value, &Value) + 'static,
    ) -> ScopeSubscription {
        let key = key.into();
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let subscriber = Rc::new(Subscriber {
            id,
            callback: Box::new(callback),
            paused: Cell::new(false),
            active: Cell::new(true),
        });
        self.subscribers
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push(subscriber.clone());
        ScopeSubscription {
            key,
            subscriber,
            registry: Rc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscriptions for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers.borrow().get(key).map_or(0, Vec::len)
    }

    /// Deliver `(new, old)` to the subscribers of `key`, then notify the
    /// parent scope under this scope's property name.
    pub fn emit(&self, key: &str, new: &Value, old: &Value) {
        if !self.emitting.borrow_mut().insert(key.to_string()) {
            trace!(key, "skipping re-entrant emission");
            return;
        }
        let subscribers: Vec<Rc<Subscriber>> = self
            .subscribers
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default();
        trace!(key, subscribers = subscribers.len(), "emitting change");
        for subscriber in subscribers {
            if subscriber.active.get() && !subscriber.paused.get() {
                (subscriber.callback)(new, old);
            }
        }
        self.emitting.borrow_mut().remove(key);

        if let Some((parent, name)) = &self.parent {
            if let Some(parent) = parent.upgrade() {
                let value = Value::Object(self.inner.context());
                parent.emit(name, &value, &value);
            }
        }
    }

    /// Snapshot the own properties of this scope and of every child scope
    /// created so far, for a later [`ReactiveScope::detect_changes`].
    pub fn clone_context(&self) {
        let context = self.inner.context();
        let snapshot = context
            .borrow()
            .properties
            .iter()
            .filter_map(|(key, property)| match property {
                Property::Data(value) => Some((key.clone(), value.clone())),
                Property::Accessor { .. } => None,
            })
            .collect();
        *self.snapshot.borrow_mut() = Some(snapshot);
        for (_, child) in self.children.scopes() {
            if let Some(child) = child.as_reactive() {
                child.clone_context();
            }
        }
    }

    /// Emit for every key whose value changed since the last
    /// [`ReactiveScope::clone_context`], children first, then drop the
    /// snapshot.
    pub fn detect_changes(&self) {
        for (_, child) in self.children.scopes() {
            if let Some(child) = child.as_reactive() {
                child.detect_changes();
            }
        }
        let Some(snapshot) = self.snapshot.borrow_mut().take() else {
            return;
        };
        let current: Vec<(String, Value)> = {
            let context = self.inner.context();
            let context = context.borrow();
            context
                .properties
                .iter()
                .filter_map(|(key, property)| match property {
                    Property::Data(value) => Some((key.clone(), value.clone())),
                    Property::Accessor { .. } => None,
                })
                .collect()
        };
        for (key, value) in &current {
            let old = snapshot.get(key).cloned().unwrap_or(Value::Undefined);
            if !old.same_value(value) {
                self.emit(key, value, &old);
            }
        }
        for (key, old) in &snapshot {
            if !current.iter().any(|(k, _)| k == key) {
                self.emit(key, &Value::Undefined, old);
            }
        }
    }
}

impl Scope for ReactiveScope {
    fn get(&self, key: &str) -> JsResult<Value> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> JsResult<()> {
        let old = self.inner.get(key)?;
        self.inner.set(key, value.clone())?;
        self.emit(key, &value, &old);
        Ok(())
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    fn delete(&self, key: &str) -> JsResult<bool> {
        let old = self.inner.get(key)?;
        let removed = self.inner.delete(key)?;
        if removed {
            self.emit(key, &Value::Undefined, &old);
        }
        Ok(removed)
    }

    fn declare(&self, key: &str, value: Value, kind: DeclarationKind) -> JsResult<()> {
        let old = self.inner.get(key)?;
        self.inner.declare(key, value.clone(), kind)?;
        self.emit(key, &value, &old);
        Ok(())
    }

    fn context(&self) -> ObjectRef {
        self.inner.context()
    }

    fn scope_type(&self) -> ScopeType {
        self.inner.scope_type()
    }

    fn inner_scope(&self, key: &str) -> JsResult<Option<ScopeRef>> {
        match self.inner.get(key)? {
            Value::Object(object) => Ok(Some(self.children.get_or_insert(key, &object, || {
                let parent = Some((self.this.clone(), key.to_string()));
                ReactiveScope::build(object.clone(), ScopeType::Block, parent) as ScopeRef
            }))),
            _ => Ok(None),
        }
    }

    fn as_reactive(&self) -> Option<&ReactiveScope> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(scope: &ReactiveScope, key: &str) -> (ScopeSubscription, Rc<RefCell<Vec<(Value, Value)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = scope.subscribe(key, move |new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
        });
        (subscription, seen)
    }

    #[test]
    fn test_same_value_set_still_emits() {
        let scope = ReactiveScope::new_root();
        let (_sub, seen) = recorder(&scope, "x");
        scope.set("x", Value::Number(1.0)).unwrap();
        scope.set("x", Value::Number(1.0)).unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1].1.to_number(), 1.0);
    }

    #[test]
    fn test_pause_and_resume() {
        let scope = ReactiveScope::new_root();
        let (sub, seen) = recorder(&scope, "x");
        sub.pause();
        assert!(!sub.is_active());
        scope.set("x", Value::Number(1.0)).unwrap();
        assert!(seen.borrow().is_empty());
        sub.resume();
        scope.set("x", Value::Number(2.0)).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let scope = ReactiveScope::new_root();
        let (sub, _seen) = recorder(&scope, "x");
        assert_eq!(scope.subscriber_count("x"), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(scope.subscriber_count("x"), 0);
    }

    #[test]
    fn test_reentrant_emission_is_dropped() {
        let scope = ReactiveScope::new_root();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let weak = Rc::downgrade(&scope);
        let _sub = scope.subscribe("x", move |new, _| {
            counter.set(counter.get() + 1);
            if let Some(scope) = weak.upgrade() {
                scope.set("x", Value::Number(new.to_number() + 1.0)).unwrap();
            }
        });
        scope.set("x", Value::Number(1.0)).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(scope.get("x").unwrap().to_number(), 2.0);
    }

    #[test]
    fn test_child_scope_notifies_parent() {
        let scope = ReactiveScope::new_root();
        scope.set("user", Value::object_from([("name", Value::from("ada"))])).unwrap();
        let (_sub, seen) = recorder(&scope, "user");
        let child = scope.inner_scope("user").unwrap().unwrap();
        let child_reactive = child.as_reactive().unwrap();
        let (_child_sub, child_seen) = recorder(child_reactive, "name");
        child.set("name", Value::from("grace")).unwrap();
        assert_eq!(child_seen.borrow().len(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].0.get_property("name").to_string(), "grace");
    }

    #[test]
    fn test_detect_changes_only_reports_real_changes() {
        let context = JsObject::new().into_ref();
        context.borrow_mut().insert("a", Value::Number(1.0));
        context.borrow_mut().insert("b", Value::Number(2.0));
        let scope = ReactiveScope::new(context.clone());
        let (_a, seen_a) = recorder(&scope, "a");
        let (_b, seen_b) = recorder(&scope, "b");

        scope.clone_context();
        context.borrow_mut().insert("a", Value::Number(10.0));
        context.borrow_mut().insert("b", Value::Number(2.0));
        scope.detect_changes();

        assert_eq!(seen_a.borrow().len(), 1);
        assert_eq!(seen_a.borrow()[0].1.to_number(), 1.0);
        assert!(seen_b.borrow().is_empty());

        // The snapshot is consumed.
        context.borrow_mut().insert("a", Value::Number(11.0));
        scope.detect_changes();
        assert_eq!(seen_a.borrow().len(), 1);
    }

    #[test]
    fn test_detect_changes_recurses_into_children() {
        let scope = ReactiveScope::new_root();
        let inner = Value::object_from([("n", Value::Number(1.0))]);
        scope.set("box", inner.clone()).unwrap();
        let child = scope.inner_scope("box").unwrap().unwrap();
        let (_n, seen_n) = recorder(child.as_reactive().unwrap(), "n");
        let (_box, seen_box) = recorder(&scope, "box");

        scope.clone_context();
        inner.as_object().unwrap().borrow_mut().insert("n", Value::Number(5.0));
        scope.detect_changes();

        assert_eq!(seen_n.borrow().len(), 1);
        assert_eq!(seen_box.borrow().len(), 1);
    }
}
