//! The scope stack and suspension markers.
//!
//! Besides its scopes, a stack carries the markers left behind by `await`,
//! `yield` and `for await` while a statement runs. The statement machine
//! inspects them after each statement and hands control to the async or
//! generator driver when any are present.

use crate::node::ExprNode;
use crate::reactive::ReactiveScope;
use crate::scope::{DeclarationKind, ObjectScope, ReadOnlyScope, Scope, ScopeRef, ScopeType};
use core_types::{JsResult, ObjectRef, PromiseRef, Settlement, Value};
use std::rc::Rc;
use tracing::trace;

/// An `await` waiting for its promise.
#[derive(Clone)]
pub struct AwaitPromiseInfo {
    /// Promise being awaited
    pub promise: PromiseRef,
    /// Node that receives the settled value, if any
    pub node: Option<ExprNode>,
    /// Set when the value completes a declaration (`const x = await p`)
    pub declare_variable: Option<DeclarationKind>,
    /// Type of the innermost scope when the await was recorded
    pub scope_type: ScopeType,
    /// The settled value becomes the function's return value
    pub is_return: bool,
    /// The await sits inside a larger expression; its statement is
    /// evaluated again once the promise settles
    pub replay: bool,
}

/// Settled results of the awaits nested inside the statement being
/// evaluated.
///
/// Awaits are numbered in the order evaluation reaches them. When an await
/// finds no result it suspends the statement; after the promise settles the
/// statement runs again from the top and every await already settled
/// returns its result without evaluating its argument, skipping the slots
/// its argument used.
#[derive(Default)]
pub(crate) struct AwaitReplay {
    enabled: bool,
    cursor: usize,
    settled: Vec<Option<(Settlement, usize)>>,
    pending: Option<(usize, usize)>,
}

impl AwaitReplay {
    /// Start evaluating a statement whose nested awaits may suspend.
    pub(crate) fn open(&mut self) {
        self.enabled = true;
        self.cursor = 0;
    }

    /// Finish the evaluation started by [`AwaitReplay::open`]. Returns true
    /// if an await suspended it; otherwise the cached results are dropped.
    pub(crate) fn close(&mut self) -> bool {
        self.enabled = false;
        let suspended = self.pending.is_some();
        if !suspended {
            self.settled.clear();
        }
        suspended
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number the next await and return its result if it already settled.
    pub(crate) fn claim(&mut self) -> (usize, Option<Settlement>) {
        let index = self.cursor;
        self.cursor += 1;
        match self.settled.get(index).cloned().flatten() {
            Some((settlement, end)) => {
                self.cursor = end;
                (index, Some(settlement))
            }
            None => (index, None),
        }
    }

    /// Mark await `index` as the one the statement waits on.
    pub(crate) fn suspend(&mut self, index: usize) {
        self.pending = Some((index, self.cursor));
    }

    /// Store the result of the await the statement waited on.
    pub(crate) fn settle(&mut self, settlement: Settlement) {
        if let Some((index, end)) = self.pending.take() {
            if self.settled.len() <= index {
                self.settled.resize_with(index + 1, || None);
            }
            self.settled[index] = Some((settlement, end));
        }
    }

    /// Forget every cached result.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A value produced by `yield` or `yield*`.
#[derive(Clone)]
pub struct YieldInfo {
    /// Yielded value, or the iterable for `yield*`
    pub value: Value,
    /// Node that receives the value passed to the next `next(v)` call
    pub node: Option<ExprNode>,
    /// Set when the sent value completes a declaration
    pub declare_variable: Option<DeclarationKind>,
    /// `yield*` delegation
    pub delegate: bool,
}

impl YieldInfo {
    /// A yield whose resumption value is discarded.
    pub fn value(value: Value) -> Self {
        Self {
            value,
            node: None,
            declare_variable: None,
            delegate: false,
        }
    }
}

/// A `for await…of` loop handed to the driver.
#[derive(Clone)]
pub struct ForAwaitInfo {
    /// Value being iterated
    pub iterable: Value,
    /// The `ForAwaitStatement` node
    pub node: ExprNode,
    /// Labels attached to the loop
    pub labels: Vec<String>,
}

/// Ordered list of scopes, innermost last.
///
/// # Examples
///
/// ```
/// use interpreter::Stack;
/// use core_types::Value;
///
/// let mut stack = Stack::with_globals();
/// stack.set("x", Value::Number(1.0)).unwrap();
///
/// let depth = stack.depth();
/// stack.push_block_scope();
/// stack.declare_variable("x", Value::Number(2.0), interpreter::DeclarationKind::Let).unwrap();
/// assert_eq!(stack.get("x").unwrap().to_number(), 2.0);
///
/// stack.clear_to(depth);
/// assert_eq!(stack.get("x").unwrap().to_number(), 1.0);
/// ```
pub struct Stack {
    scopes: Vec<ScopeRef>,
    /// Pending awaits, in the order they were recorded
    pub await_promise: Vec<AwaitPromiseInfo>,
    /// Buffered yields, in the order they were produced
    pub yields: Vec<YieldInfo>,
    /// Deferred `for await` loop
    pub for_await: Option<ForAwaitInfo>,
    pub(crate) replay: AwaitReplay,
}

impl Stack {
    /// Stack with a single root scope.
    pub fn new(root: ScopeRef) -> Self {
        Self {
            scopes: vec![root],
            await_promise: Vec::new(),
            yields: Vec::new(),
            for_await: None,
            replay: AwaitReplay::default(),
        }
    }

    /// Read-only builtins scope with an empty module scope on top.
    pub fn with_globals() -> Self {
        Self::with_global_object(builtins::global_object())
    }

    /// Like [`Stack::with_globals`] but over a caller-built global object,
    /// e.g. one whose console captures output.
    pub fn with_global_object(globals: ObjectRef) -> Self {
        let mut stack = Self::new(Rc::new(ReadOnlyScope::new(globals)));
        stack.push_scope(Rc::new(ObjectScope::new(ScopeType::Module)));
        stack
    }

    /// Number of scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The scopes, outermost first.
    pub fn scopes(&self) -> &[ScopeRef] {
        &self.scopes
    }

    /// The innermost scope.
    pub fn current(&self) -> ScopeRef {
        // The root scope is never popped, so the list is never empty.
        self.scopes[self.scopes.len() - 1].clone()
    }

    /// Innermost scope defining `key`, else the innermost scope.
    pub fn find_scope(&self, key: &str) -> ScopeRef {
        for (depth, scope) in self.scopes.iter().enumerate().rev() {
            if scope.has(key) {
                trace!(key, depth, "resolved");
                return scope.clone();
            }
        }
        trace!(key, "unresolved, using innermost scope");
        self.current()
    }

    /// Read `key`; undeclared names read as `undefined`.
    pub fn get(&self, key: &str) -> JsResult<Value> {
        self.find_scope(key).get(key)
    }

    /// Assign `key` in the first scope holding it, else define it in the
    /// innermost scope.
    pub fn set(&self, key: &str, value: Value) -> JsResult<()> {
        self.find_scope(key).set(key, value)
    }

    /// True if any scope defines `key`.
    pub fn has(&self, key: &str) -> bool {
        self.scopes.iter().any(|scope| scope.has(key))
    }

    /// Remove `key` from the first scope holding it.
    pub fn delete(&self, key: &str) -> JsResult<bool> {
        if self.has(key) {
            self.find_scope(key).delete(key)
        } else {
            Ok(true)
        }
    }

    /// Declare `key`: `var` goes to the nearest function or module scope,
    /// `let` and `const` to the innermost scope.
    pub fn declare_variable(&self, key: &str, value: Value, kind: DeclarationKind) -> JsResult<()> {
        let scope = match kind {
            DeclarationKind::Var => self
                .scopes
                .iter()
                .rev()
                .find(|scope| {
                    scope.scope_type().is_var_target() && scope.scope_type() != ScopeType::Global
                })
                .cloned()
                .unwrap_or_else(|| self.current()),
            DeclarationKind::Let | DeclarationKind::Const => self.current(),
        };
        trace!(key, %kind, "declare");
        scope.declare(key, value, kind)
    }

    /// Push an existing scope.
    pub fn push_scope(&mut self, scope: ScopeRef) {
        self.scopes.push(scope);
    }

    /// Push an empty block scope.
    pub fn push_block_scope(&mut self) -> ScopeRef {
        let scope: ScopeRef = Rc::new(ObjectScope::new(ScopeType::Block));
        self.scopes.push(scope.clone());
        scope
    }

    /// Push an empty function scope.
    pub fn push_function_scope(&mut self) -> ScopeRef {
        let scope: ScopeRef = Rc::new(ObjectScope::new(ScopeType::Function));
        self.scopes.push(scope.clone());
        scope
    }

    /// Push a reactive scope over `context`.
    pub fn push_reactive_scope(&mut self, context: ObjectRef) -> Rc<ReactiveScope> {
        let scope = ReactiveScope::new(context);
        self.scopes.push(scope.clone());
        scope
    }

    /// Pop the innermost scope. The root scope is never removed.
    pub fn pop_scope(&mut self) -> Option<ScopeRef> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Drop scopes until `depth` remain (at least one).
    pub fn clear_to(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// New stack sharing this stack's scope objects, with its own frame
    /// list and no pending markers.
    pub fn copy_stack(&self) -> Stack {
        Stack {
            scopes: self.scopes.clone(),
            await_promise: Vec::new(),
            yields: Vec::new(),
            for_await: None,
            replay: AwaitReplay::default(),
        }
    }

    /// Child scope reached by following `path` from the scope that defines
    /// its first segment, e.g. `["user", "address"]`.
    pub fn scope_for_path(&self, path: &[String]) -> JsResult<Option<ScopeRef>> {
        let Some((root, rest)) = path.split_first() else {
            return Ok(None);
        };
        if !self.has(root) {
            return Ok(None);
        }
        let mut scope = self.find_scope(root).inner_scope(root)?;
        for key in rest {
            scope = match scope {
                Some(scope) => scope.inner_scope(key)?,
                None => return Ok(None),
            };
        }
        Ok(scope)
    }

    /// True if any await, yield or `for await` marker is pending.
    pub fn has_markers(&self) -> bool {
        !self.await_promise.is_empty() || !self.yields.is_empty() || self.for_await.is_some()
    }

    /// Drop every pending marker.
    pub fn clear_markers(&mut self) {
        self.await_promise.clear();
        self.yields.clear();
        self.for_await = None;
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::with_globals()
    }
}
