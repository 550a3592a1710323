//! Statement stepping.
//!
//! Statements run on an explicit frame stack instead of the Rust call
//! stack, so a body can stop after any statement and continue later. After
//! each simple statement the machine looks for await, yield and `for await`
//! markers on the [`Stack`]; when one is present it returns a [`Step`] to
//! its driver and keeps the statement's completion until the driver hands
//! back the settled value through [`Machine::resume`].
//!
//! An await nested inside a larger expression cannot leave a marker for
//! later: in a [suspending](Machine::suspending) machine it stops the
//! statement with [`JsError::Suspended`]. The machine rolls the statement
//! back, waits for the promise, and evaluates the statement again with the
//! settled result cached on the stack, so every await reached before
//! returns immediately.
//!
//! Synchronous callers use [`Machine::run_blocking`], which settles awaits
//! by draining the microtask queue.

use crate::node::{Completion, ExprNode, Node};
use crate::runtime::settle_now;
use crate::scope::DeclarationKind;
use crate::stack::{AwaitPromiseInfo, ForAwaitInfo, Stack, YieldInfo};
use builtins::ValueIterator;
use core_types::{ErrorKind, JsError, JsResult, PromiseRef, Value};
use tracing::{debug, trace};

/// A statement node the machine can enter.
pub(crate) trait StatementNode {
    /// Start running the statement: push frames for its parts, or finish
    /// it immediately through [`Machine::finish`].
    fn enter(&self, machine: &mut Machine, stack: &mut Stack);
}

/// Why a run stopped.
#[derive(Debug)]
pub enum Step {
    /// The body completed
    Done(Completion),
    /// Waiting for a promise
    Await(PromiseRef),
    /// A generator produced a value
    Yield(Value),
}

/// Input for a suspended body.
#[derive(Debug, Clone)]
pub enum Resume {
    /// Continue with a value: the settled promise value or the argument to
    /// a generator's `next`
    Next(Value),
    /// Throw at the suspension point
    Throw(Value),
    /// Return from the suspension point, running `finally` blocks
    Return(Value),
}

type Outcome = JsResult<Completion>;

pub(crate) enum LoopKind {
    While(ExprNode),
    DoWhile(ExprNode),
    For {
        test: Option<ExprNode>,
        update: Option<ExprNode>,
    },
}

pub(crate) struct LoopFrame {
    pub kind: LoopKind,
    pub body: ExprNode,
    pub labels: Vec<String>,
    /// Stack depth restored after each iteration
    pub depth: usize,
    /// Stack depth restored when the loop ends
    pub outer: usize,
    pub started: bool,
    /// The `for` update ran and the test is still to be evaluated
    pub updated: bool,
    pub last: Value,
}

pub(crate) struct IterateFrame {
    pub iter: ValueIterator,
    pub left: ExprNode,
    pub body: ExprNode,
    pub labels: Vec<String>,
    pub depth: usize,
    pub last: Value,
}

pub(crate) enum AwaitSource {
    /// Object whose `next` returns promises of iterator results
    Async { iterator: Value, next: Value },
    /// Synchronous iterable whose items may be promises
    Sync(ValueIterator),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ForAwaitPhase {
    Next,
    AwaitResult,
    AwaitItem,
}

pub(crate) struct ForAwaitFrame {
    source: AwaitSource,
    left: ExprNode,
    body: ExprNode,
    labels: Vec<String>,
    depth: usize,
    last: Value,
    phase: ForAwaitPhase,
    received: Option<Resume>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum TryState {
    Block,
    Catch,
    Finally,
}

pub(crate) struct TryFrame {
    pub param: Option<ExprNode>,
    pub handler: Option<ExprNode>,
    pub finalizer: Option<ExprNode>,
    pub state: TryState,
    pub pending: Option<Outcome>,
    pub depth: usize,
}

pub(crate) struct ListFrame {
    pub items: Vec<ExprNode>,
    pub index: usize,
    /// Stack depth restored when the list ends
    pub depth: Option<usize>,
    /// Consumes an unlabeled `break` (switch bodies)
    pub breakable: bool,
    pub hoisted: bool,
    pub last: Value,
    pub last_produces_value: bool,
}

impl ListFrame {
    pub(crate) fn new(items: Vec<ExprNode>, depth: Option<usize>) -> Self {
        Self {
            items,
            index: 0,
            depth,
            breakable: false,
            hoisted: false,
            last: Value::Undefined,
            last_produces_value: false,
        }
    }
}

pub(crate) struct DeclarationFrame {
    pub declarators: Vec<ExprNode>,
    pub index: usize,
    pub kind: DeclarationKind,
}

pub(crate) enum Frame {
    Statement {
        node: ExprNode,
        labels: Vec<String>,
        hoisted: bool,
    },
    List(ListFrame),
    Loop(LoopFrame),
    Iterate(IterateFrame),
    ForAwait(ForAwaitFrame),
    Try(TryFrame),
    Label(String),
    Declarations(DeclarationFrame),
}

enum Waiting {
    Await(AwaitPromiseInfo),
    Yield(YieldInfo),
    Delegate { iter: ValueIterator, info: YieldInfo },
    ForAwait,
}

/// Statement stepper for one body.
pub struct Machine {
    frames: Vec<Frame>,
    this: Option<Value>,
    signal: Option<Outcome>,
    deferred: Option<Outcome>,
    waiting: Option<Waiting>,
    labels: Vec<String>,
    suspends: bool,
}

fn label_matches(label: &Option<String>, labels: &[String]) -> bool {
    match label {
        None => true,
        Some(label) => labels.iter().any(|l| l == label),
    }
}

fn produces_value(node: &Node) -> bool {
    !matches!(
        node,
        Node::VariableDeclaration(_) | Node::Function(_) | Node::Class(_) | Node::EmptyStatement(_)
    )
}

fn is_hoisted(node: &Node) -> bool {
    matches!(node, Node::Function(f) if f.def.form == crate::node::FunctionForm::Declaration)
}

impl Machine {
    /// Machine with no frames; statements push their own.
    pub fn new(this: Option<Value>) -> Self {
        Self {
            frames: Vec::new(),
            this,
            signal: None,
            deferred: None,
            waiting: None,
            labels: Vec::new(),
            suspends: false,
        }
    }

    /// Let awaits nested inside expressions suspend the body instead of
    /// draining the microtask queue. Only drivers that resume the machine
    /// from promise reactions may set this.
    pub fn suspending(mut self) -> Self {
        self.suspends = true;
        self
    }

    /// Machine that runs `items` in the current scope, hoisting function
    /// declarations first. Used for function bodies and programs.
    pub fn for_body(items: Vec<ExprNode>, this: Option<Value>) -> Self {
        let mut machine = Self::new(this);
        machine.push(Frame::List(ListFrame::new(items, None)));
        machine
    }

    /// Machine that runs a single statement node.
    pub fn for_statement(node: ExprNode, this: Option<Value>) -> Self {
        let mut machine = Self::new(this);
        machine.push_statement(node);
        machine
    }

    /// Enter `statement` and run it to completion, settling awaits by
    /// draining microtasks.
    pub(crate) fn run_blocking_statement(
        statement: &dyn StatementNode,
        stack: &mut Stack,
        this: Option<&Value>,
    ) -> JsResult<Completion> {
        let mut machine = Self::new(this.cloned());
        statement.enter(&mut machine, stack);
        machine.run_blocking(stack)
    }

    /// Run until completion, settling awaits in place.
    pub fn run_blocking(&mut self, stack: &mut Stack) -> JsResult<Completion> {
        let mut step = self.run(stack)?;
        loop {
            step = match step {
                Step::Done(completion) => return Ok(completion),
                Step::Await(promise) => {
                    let input = match settle_now(&promise) {
                        Ok(value) => Resume::Next(value),
                        Err(JsError::Throw(reason)) => Resume::Throw(reason),
                        Err(err) => return Err(err),
                    };
                    self.resume(stack, input)?
                }
                Step::Yield(_) => {
                    return Err(JsError::eval(
                        ErrorKind::InternalError,
                        "yield is only valid inside generator functions",
                    ))
                }
            };
        }
    }

    // ------------------------------------------------------------------------
    // API used by statement nodes
    // ------------------------------------------------------------------------

    /// `this` for expressions evaluated by this machine.
    pub(crate) fn this(&self) -> Option<Value> {
        self.this.clone()
    }

    /// Labels attached to the statement being entered.
    pub(crate) fn take_labels(&mut self) -> Vec<String> {
        std::mem::take(&mut self.labels)
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn push_statement(&mut self, node: ExprNode) {
        self.push_labeled(node, Vec::new());
    }

    pub(crate) fn push_labeled(&mut self, node: ExprNode, labels: Vec<String>) {
        self.frames.push(Frame::Statement {
            node,
            labels,
            hoisted: false,
        });
    }

    /// Complete the statement being entered. Markers recorded while it ran
    /// suspend the machine before the completion reaches the parent frame.
    pub(crate) fn finish(&mut self, stack: &Stack, outcome: Outcome) {
        if stack.has_markers() && outcome.is_ok() {
            self.deferred = Some(outcome);
        } else {
            self.signal = Some(outcome);
        }
    }

    /// Complete a frame, restoring the stack depth it started at.
    fn complete(&mut self, stack: &mut Stack, depth: Option<usize>, outcome: Outcome) {
        if let Some(depth) = depth {
            stack.clear_to(depth);
        }
        self.signal = Some(outcome);
    }

    /// Evaluate `eval` with nested awaits allowed to suspend it.
    ///
    /// Returns the promise to wait for when an await suspended the
    /// evaluation. Whatever `eval` produced is then discarded: the caller
    /// restores its frame and evaluates again after the promise settles.
    fn replayable<T>(
        &mut self,
        stack: &mut Stack,
        eval: impl FnOnce(&mut Self, &mut Stack) -> T,
    ) -> Result<T, PromiseRef> {
        if !self.suspends {
            return Ok(eval(self, stack));
        }
        stack.replay.open();
        let result = eval(self, stack);
        if !stack.replay.close() {
            return Ok(result);
        }
        let info = match stack.await_promise.iter().rposition(|info| info.replay) {
            Some(index) => stack.await_promise.remove(index),
            None => {
                // An await suspended without leaving its marker
                stack.replay.reset();
                return Ok(result);
            }
        };
        stack.clear_markers();
        self.signal = None;
        self.deferred = None;
        let promise = info.promise.clone();
        trace!("suspending on nested await");
        self.waiting = Some(Waiting::Await(info));
        Err(promise)
    }

    // ------------------------------------------------------------------------
    // Driver API
    // ------------------------------------------------------------------------

    /// Run until the body completes or suspends.
    pub fn run(&mut self, stack: &mut Stack) -> JsResult<Step> {
        loop {
            if self.deferred.is_some() {
                if let Some(step) = self.next_marker(stack) {
                    return Ok(step);
                }
                continue;
            }
            let Some(frame) = self.frames.pop() else {
                return match self.signal.take() {
                    None => Ok(Step::Done(Completion::Normal(Value::Undefined))),
                    Some(Ok(completion)) => Ok(Step::Done(completion)),
                    Some(Err(err)) => Err(err),
                };
            };
            let signal = self.signal.take();
            if let Some(step) = self.advance(frame, signal, stack) {
                return Ok(step);
            }
        }
    }

    /// Continue after a [`Step::Await`] or [`Step::Yield`].
    pub fn resume(&mut self, stack: &mut Stack, input: Resume) -> JsResult<Step> {
        match self.waiting.take() {
            Some(Waiting::Await(info)) if info.replay => match input {
                Resume::Next(value) => stack.replay.settle(Ok(value)),
                Resume::Throw(reason) => stack.replay.settle(Err(reason)),
                Resume::Return(value) => {
                    // Drop the statement waiting to be replayed
                    self.frames.pop();
                    stack.replay.reset();
                    self.abort(stack, Ok(Completion::Return(value)));
                }
            },
            Some(Waiting::Await(info)) => match input {
                Resume::Next(value) => {
                    if info.is_return {
                        self.deferred = Some(Ok(Completion::Return(value)));
                    } else {
                        let declared = info.declare_variable.is_some();
                        match self.assign(stack, info.node, info.declare_variable, value.clone()) {
                            Ok(()) if !declared => self.deferred = Some(Ok(Completion::Normal(value))),
                            Ok(()) => {}
                            Err(err) => self.abort(stack, Err(err)),
                        }
                    }
                }
                Resume::Throw(reason) => self.abort(stack, Err(JsError::Throw(reason))),
                Resume::Return(value) => self.abort(stack, Ok(Completion::Return(value))),
            },
            Some(Waiting::Yield(info)) => match input {
                Resume::Next(sent) => {
                    if let Err(err) = self.assign(stack, info.node, info.declare_variable, sent) {
                        self.abort(stack, Err(err));
                    }
                }
                Resume::Throw(reason) => self.abort(stack, Err(JsError::Throw(reason))),
                Resume::Return(value) => self.abort(stack, Ok(Completion::Return(value))),
            },
            Some(Waiting::Delegate { mut iter, info }) => match input {
                Resume::Next(_) => {
                    if let Some(step) = self.delegate(stack, iter, info) {
                        return Ok(step);
                    }
                }
                Resume::Throw(reason) => {
                    iter.close()?;
                    self.abort(stack, Err(JsError::Throw(reason)));
                }
                Resume::Return(value) => {
                    iter.close()?;
                    self.abort(stack, Ok(Completion::Return(value)));
                }
            },
            Some(Waiting::ForAwait) => {
                if let Some(Frame::ForAwait(frame)) = self.frames.last_mut() {
                    frame.received = Some(input);
                }
            }
            None => {}
        }
        self.run(stack)
    }

    fn abort(&mut self, stack: &mut Stack, outcome: Outcome) {
        stack.clear_markers();
        self.deferred = None;
        self.signal = Some(outcome);
    }

    fn assign(
        &mut self,
        stack: &mut Stack,
        node: Option<ExprNode>,
        declare: Option<DeclarationKind>,
        value: Value,
    ) -> JsResult<()> {
        match (node, declare) {
            (Some(node), Some(kind)) => node.declare(stack, value, kind),
            (Some(node), None) => node.set(stack, value),
            (None, _) => Ok(()),
        }
    }

    /// Hand the oldest marker to the driver, or release the deferred
    /// completion once none are left.
    fn next_marker(&mut self, stack: &mut Stack) -> Option<Step> {
        if !stack.await_promise.is_empty() {
            let info = stack.await_promise.remove(0);
            let promise = info.promise.clone();
            debug!(scope = ?info.scope_type, "suspending on await");
            self.waiting = Some(Waiting::Await(info));
            return Some(Step::Await(promise));
        }
        if !stack.yields.is_empty() {
            let info = stack.yields.remove(0);
            if info.delegate {
                return match ValueIterator::new(&info.value) {
                    Ok(iter) => self.delegate(stack, iter, info),
                    Err(err) => {
                        self.abort(stack, Err(err));
                        None
                    }
                };
            }
            trace!("suspending on yield");
            let value = info.value.clone();
            self.waiting = Some(Waiting::Yield(info));
            return Some(Step::Yield(value));
        }
        if let Some(info) = stack.for_await.take() {
            self.deferred = None;
            self.start_for_await(info);
            return None;
        }
        self.signal = self.deferred.take();
        None
    }

    /// Pull the next value of a `yield*` delegate.
    fn delegate(&mut self, stack: &mut Stack, mut iter: ValueIterator, info: YieldInfo) -> Option<Step> {
        match iter.next_value() {
            Ok(Some(value)) => {
                self.waiting = Some(Waiting::Delegate { iter, info });
                Some(Step::Yield(value))
            }
            Ok(None) => {
                if let Err(err) = self.assign(stack, info.node, info.declare_variable, Value::Undefined) {
                    self.abort(stack, Err(err));
                }
                None
            }
            Err(err) => {
                self.abort(stack, Err(err));
                None
            }
        }
    }

    fn start_for_await(&mut self, info: ForAwaitInfo) {
        let (left, body) = match &*info.node {
            Node::ForAwaitStatement(stmt) => (stmt.left.clone(), stmt.body.clone()),
            other => {
                self.signal = Some(Err(JsError::eval(
                    ErrorKind::InternalError,
                    format!("for await marker points at {}", other.type_tag()),
                )));
                return;
            }
        };
        let source = match &info.iterable {
            Value::Object(_) => match builtins::get_member(&info.iterable, "next") {
                Ok(next @ Value::Function(_)) => AwaitSource::Async {
                    iterator: info.iterable.clone(),
                    next,
                },
                Ok(_) => {
                    self.signal = Some(Err(JsError::type_error("object is not async iterable")));
                    return;
                }
                Err(err) => {
                    self.signal = Some(Err(err));
                    return;
                }
            },
            other => match ValueIterator::new(other) {
                Ok(iter) => AwaitSource::Sync(iter),
                Err(err) => {
                    self.signal = Some(Err(err));
                    return;
                }
            },
        };
        self.frames.push(Frame::ForAwait(ForAwaitFrame {
            source,
            left,
            body,
            labels: info.labels,
            depth: 0,
            last: Value::Undefined,
            phase: ForAwaitPhase::Next,
            received: None,
        }));
    }

    // ------------------------------------------------------------------------
    // Frame stepping
    // ------------------------------------------------------------------------

    fn advance(&mut self, frame: Frame, signal: Option<Outcome>, stack: &mut Stack) -> Option<Step> {
        match frame {
            Frame::Statement { node, labels, hoisted } => {
                if hoisted {
                    self.signal = Some(Ok(Completion::Normal(Value::Undefined)));
                    return None;
                }
                let frames = self.frames.len();
                let depth = stack.depth();
                self.labels = labels.clone();
                let entered = self.replayable(stack, |machine, stack| match node.as_statement() {
                    Some(statement) => statement.enter(machine, stack),
                    None => {
                        let this = machine.this.clone();
                        let outcome = node.get(stack, this.as_ref()).map(Completion::Normal);
                        machine.finish(stack, outcome);
                    }
                });
                match entered {
                    Ok(()) => None,
                    Err(promise) => {
                        self.frames.truncate(frames);
                        stack.clear_to(depth);
                        self.frames.push(Frame::Statement { node, labels, hoisted });
                        Some(Step::Await(promise))
                    }
                }
            }
            Frame::List(list) => {
                self.advance_list(list, signal, stack);
                None
            }
            Frame::Loop(frame) => self.advance_loop(frame, signal, stack),
            Frame::Iterate(frame) => {
                self.advance_iterate(frame, signal, stack);
                None
            }
            Frame::ForAwait(frame) => self.advance_for_await(frame, signal, stack),
            Frame::Try(frame) => {
                self.advance_try(frame, signal, stack);
                None
            }
            Frame::Label(label) => {
                self.signal = Some(match signal {
                    Some(Ok(Completion::Break(Some(target)))) if target == label => {
                        Ok(Completion::Normal(Value::Undefined))
                    }
                    Some(outcome) => outcome,
                    None => Ok(Completion::Normal(Value::Undefined)),
                });
                None
            }
            Frame::Declarations(frame) => self.advance_declarations(frame, signal, stack),
        }
    }

    fn advance_list(&mut self, mut list: ListFrame, signal: Option<Outcome>, stack: &mut Stack) {
        match signal {
            None => {}
            Some(Ok(Completion::Normal(value))) => {
                if list.last_produces_value {
                    list.last = value;
                }
            }
            Some(Ok(Completion::Break(None))) if list.breakable => {
                let last = std::mem::take(&mut list.last);
                return self.complete(stack, list.depth, Ok(Completion::Normal(last)));
            }
            Some(outcome) => return self.complete(stack, list.depth, outcome),
        }
        if !list.hoisted {
            list.hoisted = true;
            for item in &list.items {
                if is_hoisted(item) {
                    let this = self.this.clone();
                    if let Err(err) = item.get(stack, this.as_ref()) {
                        return self.complete(stack, list.depth, Err(err));
                    }
                }
            }
        }
        match list.items.get(list.index).cloned() {
            Some(item) => {
                list.index += 1;
                list.last_produces_value = produces_value(&item);
                let hoisted = is_hoisted(&item);
                self.frames.push(Frame::List(list));
                self.frames.push(Frame::Statement {
                    node: item,
                    labels: Vec::new(),
                    hoisted,
                });
            }
            None => {
                let last = std::mem::take(&mut list.last);
                self.complete(stack, list.depth, Ok(Completion::Normal(last)));
            }
        }
    }

    fn advance_loop(&mut self, mut frame: LoopFrame, signal: Option<Outcome>, stack: &mut Stack) -> Option<Step> {
        if let Some(outcome) = signal {
            stack.clear_to(frame.depth);
            match outcome {
                Ok(Completion::Normal(value)) => frame.last = value,
                Ok(Completion::Break(label)) if label_matches(&label, &frame.labels) => {
                    self.complete(stack, Some(frame.outer), Ok(Completion::Normal(frame.last)));
                    return None;
                }
                Ok(Completion::Continue(label)) if label_matches(&label, &frame.labels) => {}
                other => {
                    self.complete(stack, Some(frame.outer), other);
                    return None;
                }
            }
        }
        let this = self.this.clone();
        let proceed = match self.replayable(stack, |_, stack| loop_proceeds(&mut frame, stack, this.as_ref())) {
            Ok(proceed) => proceed,
            Err(promise) => {
                self.frames.push(Frame::Loop(frame));
                return Some(Step::Await(promise));
            }
        };
        frame.started = true;
        frame.updated = false;
        match proceed {
            Ok(true) => {
                stack.push_block_scope();
                let body = frame.body.clone();
                self.frames.push(Frame::Loop(frame));
                self.push_statement(body);
            }
            Ok(false) => self.complete(stack, Some(frame.outer), Ok(Completion::Normal(frame.last))),
            Err(err) => self.complete(stack, Some(frame.outer), Err(err)),
        }
        None
    }

    fn advance_iterate(&mut self, mut frame: IterateFrame, signal: Option<Outcome>, stack: &mut Stack) {
        if let Some(outcome) = signal {
            stack.clear_to(frame.depth);
            match outcome {
                Ok(Completion::Normal(value)) => frame.last = value,
                Ok(Completion::Continue(label)) if label_matches(&label, &frame.labels) => {}
                Ok(Completion::Break(label)) if label_matches(&label, &frame.labels) => {
                    let closed = frame.iter.close().map(|_| Completion::Normal(frame.last));
                    return self.complete(stack, None, closed);
                }
                other => {
                    // The body's own outcome wins over a failing `return()`.
                    let _ = frame.iter.close();
                    return self.complete(stack, None, other);
                }
            }
        }
        match frame.iter.next_value() {
            Ok(Some(value)) => {
                stack.push_block_scope();
                if let Err(err) = bind_loop_target(&frame.left, stack, value) {
                    stack.clear_to(frame.depth);
                    let _ = frame.iter.close();
                    return self.complete(stack, None, Err(err));
                }
                let body = frame.body.clone();
                self.frames.push(Frame::Iterate(frame));
                self.push_statement(body);
            }
            Ok(None) => self.complete(stack, None, Ok(Completion::Normal(frame.last))),
            Err(err) => self.complete(stack, None, Err(err)),
        }
    }

    fn advance_for_await(
        &mut self,
        mut frame: ForAwaitFrame,
        signal: Option<Outcome>,
        stack: &mut Stack,
    ) -> Option<Step> {
        if let Some(outcome) = signal {
            stack.clear_to(frame.depth);
            match outcome {
                Ok(Completion::Normal(value)) => frame.last = value,
                Ok(Completion::Continue(label)) if label_matches(&label, &frame.labels) => {}
                Ok(Completion::Break(label)) if label_matches(&label, &frame.labels) => {
                    self.complete(stack, None, Ok(Completion::Normal(frame.last)));
                    return None;
                }
                other => {
                    self.complete(stack, None, other);
                    return None;
                }
            }
            frame.phase = ForAwaitPhase::Next;
        }

        if let Some(input) = frame.received.take() {
            let value = match input {
                Resume::Next(value) => value,
                Resume::Throw(reason) => {
                    self.complete(stack, None, Err(JsError::Throw(reason)));
                    return None;
                }
                Resume::Return(value) => {
                    self.complete(stack, None, Ok(Completion::Return(value)));
                    return None;
                }
            };
            return match frame.phase {
                ForAwaitPhase::AwaitResult => self.for_await_result(frame, value, stack),
                _ => {
                    self.for_await_body(frame, value, stack);
                    None
                }
            };
        }

        match &mut frame.source {
            AwaitSource::Async { iterator, next } => {
                match next.call(iterator.clone(), Vec::new()) {
                    Ok(Value::Promise(promise)) => {
                        frame.phase = ForAwaitPhase::AwaitResult;
                        self.frames.push(Frame::ForAwait(frame));
                        self.waiting = Some(Waiting::ForAwait);
                        Some(Step::Await(promise))
                    }
                    Ok(result) => self.for_await_result(frame, result, stack),
                    Err(err) => {
                        self.complete(stack, None, Err(err));
                        None
                    }
                }
            }
            AwaitSource::Sync(iter) => match iter.next_value() {
                Ok(Some(Value::Promise(promise))) => {
                    frame.phase = ForAwaitPhase::AwaitItem;
                    self.frames.push(Frame::ForAwait(frame));
                    self.waiting = Some(Waiting::ForAwait);
                    Some(Step::Await(promise))
                }
                Ok(Some(value)) => {
                    self.for_await_body(frame, value, stack);
                    None
                }
                Ok(None) => {
                    self.complete(stack, None, Ok(Completion::Normal(frame.last)));
                    None
                }
                Err(err) => {
                    self.complete(stack, None, Err(err));
                    None
                }
            },
        }
    }

    fn for_await_result(&mut self, frame: ForAwaitFrame, result: Value, stack: &mut Stack) -> Option<Step> {
        let step = (|| -> JsResult<Option<Value>> {
            if builtins::get_member(&result, "done")?.is_truthy() {
                Ok(None)
            } else {
                builtins::get_member(&result, "value").map(Some)
            }
        })();
        match step {
            Ok(Some(value)) => self.for_await_body(frame, value, stack),
            Ok(None) => self.complete(stack, None, Ok(Completion::Normal(frame.last))),
            Err(err) => self.complete(stack, None, Err(err)),
        }
        None
    }

    fn for_await_body(&mut self, mut frame: ForAwaitFrame, value: Value, stack: &mut Stack) {
        frame.depth = stack.depth();
        stack.push_block_scope();
        if let Err(err) = bind_loop_target(&frame.left, stack, value) {
            stack.clear_to(frame.depth);
            return self.complete(stack, None, Err(err));
        }
        let body = frame.body.clone();
        frame.phase = ForAwaitPhase::Next;
        self.frames.push(Frame::ForAwait(frame));
        self.push_statement(body);
    }

    fn advance_try(&mut self, mut frame: TryFrame, signal: Option<Outcome>, stack: &mut Stack) {
        let Some(outcome) = signal else {
            return self.complete(stack, None, Ok(Completion::Normal(Value::Undefined)));
        };
        match frame.state {
            TryState::Block => {
                if let Err(err) = &outcome {
                    if err.is_catchable() {
                        if let Some(handler) = frame.handler.clone() {
                            stack.push_block_scope();
                            if let Some(param) = &frame.param {
                                let bound = param.declare(stack, err.to_value(), DeclarationKind::Let);
                                if let Err(bind_err) = bound {
                                    stack.clear_to(frame.depth);
                                    return self.run_finalizer(frame, Err(bind_err), stack);
                                }
                            }
                            frame.state = TryState::Catch;
                            self.frames.push(Frame::Try(frame));
                            self.push_statement(handler);
                            return;
                        }
                    }
                }
                self.run_finalizer(frame, outcome, stack);
            }
            TryState::Catch => {
                stack.clear_to(frame.depth);
                self.run_finalizer(frame, outcome, stack);
            }
            TryState::Finally => match outcome {
                Ok(Completion::Normal(_)) => {
                    let pending = frame
                        .pending
                        .take()
                        .unwrap_or(Ok(Completion::Normal(Value::Undefined)));
                    self.complete(stack, None, pending);
                }
                abrupt => self.complete(stack, None, abrupt),
            },
        }
    }

    fn run_finalizer(&mut self, mut frame: TryFrame, outcome: Outcome, stack: &mut Stack) {
        match frame.finalizer.clone() {
            Some(finalizer) => {
                frame.pending = Some(outcome);
                frame.state = TryState::Finally;
                self.frames.push(Frame::Try(frame));
                self.push_statement(finalizer);
            }
            None => self.complete(stack, None, outcome),
        }
    }

    fn advance_declarations(
        &mut self,
        mut frame: DeclarationFrame,
        signal: Option<Outcome>,
        stack: &mut Stack,
    ) -> Option<Step> {
        if let Some(Err(err)) = signal {
            self.complete(stack, None, Err(err));
            return None;
        }
        let Some(declarator) = frame.declarators.get(frame.index).cloned() else {
            self.complete(stack, None, Ok(Completion::Normal(Value::Undefined)));
            return None;
        };
        frame.index += 1;
        let kind = frame.kind;
        self.frames.push(Frame::Declarations(frame));
        let this = self.this.clone();
        let evaluated = self.replayable(stack, |_, stack| match &*declarator {
            Node::VariableDeclarator(decl) => decl
                .run(stack, this.as_ref(), kind, true)
                .map(|_| Completion::Normal(Value::Undefined)),
            other => Err(JsError::eval(
                ErrorKind::InternalError,
                format!("expected a declarator, found {}", other.type_tag()),
            )),
        });
        match evaluated {
            Ok(outcome) => {
                self.finish(stack, outcome);
                None
            }
            Err(promise) => {
                if let Some(Frame::Declarations(frame)) = self.frames.last_mut() {
                    frame.index -= 1;
                }
                Some(Step::Await(promise))
            }
        }
    }
}

/// Run the `for` update if it is due, then the loop test.
fn loop_proceeds(frame: &mut LoopFrame, stack: &mut Stack, this: Option<&Value>) -> JsResult<bool> {
    let LoopFrame {
        kind,
        started,
        updated,
        ..
    } = frame;
    match kind {
        LoopKind::While(test) => Ok(test.get(stack, this)?.is_truthy()),
        LoopKind::DoWhile(test) => Ok(!*started || test.get(stack, this)?.is_truthy()),
        LoopKind::For { test, update } => {
            if *started && !*updated {
                if let Some(update) = update {
                    update.get(stack, this)?;
                }
                *updated = true;
            }
            match test {
                Some(test) => Ok(test.get(stack, this)?.is_truthy()),
                None => Ok(true),
            }
        }
    }
}

/// Bind a `for…of`/`for…in`/`for await` loop variable.
pub(crate) fn bind_loop_target(left: &ExprNode, stack: &mut Stack, value: Value) -> JsResult<()> {
    match &**left {
        Node::VariableDeclaration(decl) => match decl.declarations.first().map(|d| &**d) {
            Some(Node::VariableDeclarator(declarator)) => {
                declarator.id.declare(stack, value, decl.kind)
            }
            _ => Err(JsError::eval(
                ErrorKind::InternalError,
                "loop declaration without a binding",
            )),
        },
        _ => left.set(stack, value),
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(None)
    }
}
