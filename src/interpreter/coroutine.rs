//! Explicit-stack coroutine engine
//!
//! Evaluation of one function body (or program) never recurses natively: every
//! AST node being evaluated owns a [`Frame`] on a heap-allocated [`Stack`], and
//! the step dispatcher advances the top frame one state at a time. Because the
//! whole evaluation lives in the stack, it can be paused at any `yield`/`await`
//! ([`Coroutine::interrupt`]) and continued later ([`Coroutine::resume`]).

use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{Expression, Program, Statement};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::scope::{Scope, Variable};
use crate::interpreter::step::{self, Action};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

/// What a frame evaluates
#[derive(Debug, Clone)]
pub enum Node {
    Program(Rc<Program>),
    Statement(Rc<Statement>),
    Expression(Rc<Expression>),
    /// Synthetic frame that raises its completion as soon as it runs.
    /// Used to inject a throw or return at a suspension point.
    Signal(Completion),
}

impl Node {
    pub fn kind(&self) -> &str {
        match self {
            Node::Program(_) => "Program",
            Node::Statement(stmt) => stmt.kind(),
            Node::Expression(expr) => expr.kind(),
            Node::Signal(_) => "Signal",
        }
    }
}

/// Abrupt completion travelling down the stack
#[derive(Debug, Clone)]
pub enum Completion {
    Return(JsValue),
    Throw(JsValue),
    Break(Option<JsString>),
    Continue(Option<JsString>),
}

impl Completion {
    /// Value handed to the frame the completion comes to rest on
    pub fn value(&self) -> JsValue {
        match self {
            Completion::Return(v) | Completion::Throw(v) => v.clone(),
            Completion::Break(_) | Completion::Continue(_) => JsValue::Undefined,
        }
    }
}

/// A resolved property reference (`object[key]`)
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub object: JsValue,
    pub key: JsString,
}

/// Reference information a child hands to its parent on leave
#[derive(Debug, Clone, Default)]
pub struct Carry {
    pub member: Option<MemberRef>,
    pub variable: Option<Rc<Variable>>,
}

impl Carry {
    pub fn member(object: JsValue, key: JsString) -> Self {
        Carry {
            member: Some(MemberRef { object, key }),
            variable: None,
        }
    }

    pub fn variable(variable: Rc<Variable>) -> Self {
        Carry {
            member: None,
            variable: Some(variable),
        }
    }
}

/// Per-kind working state of a frame
#[derive(Debug, Default)]
pub enum FrameState {
    #[default]
    Empty,
    /// Program and block statements
    Block {
        scope: Rc<Scope>,
        index: usize,
        completion: JsValue,
    },
    /// Position in a declarator or case list
    Index { index: usize },
    /// Array literals and sequences
    List { index: usize, values: Vec<JsValue> },
    Object {
        object: JsObjectRef,
        index: usize,
        key: Option<JsString>,
    },
    Member { object: JsValue },
    Binary { left: JsValue },
    Assign { target: AssignTarget, old: JsValue },
    Call {
        callee: JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    },
    Try(TryState),
    For {
        scope: Rc<Scope>,
        per_iteration: bool,
    },
    /// `for…in` / `for…of`
    ForEach {
        source: IterSource,
        current: JsValue,
        scope: Option<Rc<Scope>>,
    },
    Switch {
        scope: Rc<Scope>,
        discriminant: JsValue,
        case: usize,
        statement: usize,
    },
    /// `yield*` delegation
    Delegate { source: IterSource },
}

/// Where an assignment or update writes its result
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Variable(Rc<Variable>),
    Member(MemberRef),
}

/// Try statement progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TryStage {
    Block = 0,
    Handler = 1,
    Finalizer = 2,
    Redeliver = 3,
}

#[derive(Debug)]
pub struct TryState {
    pub stage: TryStage,
    /// Completion held back while the finalizer runs
    pub parked: Option<Completion>,
}

/// Values a `for…in`/`for…of` loop or `yield*` walks over
#[derive(Debug)]
pub enum IterSource {
    /// Live array, re-checked against its current length each step
    Array { array: JsObjectRef, index: usize },
    /// Precomputed values: for-in keys, string characters
    Values { values: Vec<JsValue>, index: usize },
    /// Any object exposing a callable `next`
    Iterator { iterator: JsValue },
}

/// Mutable evaluation record of a frame
#[derive(Debug, Default)]
pub struct Context {
    /// Program counter private to the node's state machine
    pub next: u32,
    /// Result of the most recent child
    pub tmp_result: JsValue,
    /// Property reference of the most recent child, if it was a member access
    pub tmp_member: Option<MemberRef>,
    /// Binding of the most recent child, if it was an identifier
    pub tmp_variable: Option<Rc<Variable>>,
    /// Completion delivered by an unwind that came to rest on this frame
    pub signal: Option<Completion>,
    pub state: FrameState,
}

/// One node's in-progress evaluation
#[derive(Debug)]
pub struct Frame {
    pub node: Node,
    pub scope: Rc<Scope>,
    pub context: Context,
}

impl Frame {
    pub fn new(node: Node, scope: Rc<Scope>) -> Self {
        Frame {
            node,
            scope,
            context: Context::default(),
        }
    }
}

/// LIFO stack of frames
#[derive(Debug, Default)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// The frame `n` positions below the top (`top(0)` is the current frame)
    pub fn top(&self, n: usize) -> Option<&Frame> {
        self.frames
            .len()
            .checked_sub(n + 1)
            .and_then(|i| self.frames.get(i))
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}

/// One suspendable evaluation
#[derive(Debug)]
pub struct Coroutine {
    pub stack: Stack,
    /// Evaluation finished (normally or with an error)
    pub done: bool,
    /// Control is back with the driver
    pub halt: bool,
    /// Finished by an uncaught exception; `result` holds the thrown value
    pub error: bool,
    pub result: JsValue,
}

impl Coroutine {
    /// Seed a coroutine with its root frame
    pub fn new(node: Node, scope: Rc<Scope>) -> Self {
        let mut stack = Stack::default();
        stack.push(Frame::new(node, scope));
        Coroutine {
            stack,
            done: false,
            halt: false,
            error: false,
            result: JsValue::Undefined,
        }
    }

    /// Push a frame for `node`. Without an explicit scope the child shares the
    /// current frame's scope.
    pub fn enter(&mut self, node: Node, scope: Option<Rc<Scope>>) -> Result<(), JsError> {
        let scope = match scope {
            Some(scope) => scope,
            None => self
                .stack
                .top(0)
                .map(|frame| frame.scope.cheap_clone())
                .ok_or_else(|| JsError::internal_error("enter on an empty stack"))?,
        };
        trace!(node = node.kind(), depth = self.stack.len() + 1, "enter");
        self.stack.push(Frame::new(node, scope));
        Ok(())
    }

    /// Pop the current frame and hand `value` to its parent
    pub fn leave(&mut self, value: JsValue, carry: Carry) {
        self.stack.pop();
        match self.stack.top_mut() {
            Some(parent) => {
                parent.context.tmp_result = value;
                parent.context.tmp_member = carry.member;
                parent.context.tmp_variable = carry.variable;
            }
            None => self.finish(value),
        }
    }

    /// Pop frames until `predicate` accepts the top one, then deliver `value`
    /// and `signal` to it. Returns false when the stack ran empty instead.
    pub fn leave_while<P>(
        &mut self,
        value: JsValue,
        signal: Option<Completion>,
        predicate: P,
    ) -> bool
    where
        P: Fn(&Stack) -> bool,
    {
        loop {
            if self.stack.is_empty() {
                self.finish(value);
                return false;
            }
            if predicate(&self.stack) {
                if let Some(target) = self.stack.top_mut() {
                    trace!(node = target.node.kind(), "unwind target");
                    target.context.tmp_result = value;
                    target.context.tmp_member = None;
                    target.context.tmp_variable = None;
                    target.context.signal = signal;
                }
                return true;
            }
            self.stack.pop();
        }
    }

    /// Suspend with `value` without finishing
    pub fn interrupt(&mut self, value: JsValue) {
        debug!(depth = self.stack.len(), "coroutine suspended");
        self.halt = true;
        self.result = value;
    }

    /// Continue evaluation with `value` as the current frame's latest child
    /// result, stepping until the coroutine finishes or suspends.
    pub fn resume(&mut self, interp: &Interpreter, value: JsValue) -> Result<JsValue, JsError> {
        if self.done {
            return Ok(self.result.clone());
        }
        self.halt = false;
        if let Some(frame) = self.stack.top_mut() {
            frame.context.tmp_result = value;
        }
        while !self.done && !self.halt && !self.error {
            let action = {
                let frame = self
                    .stack
                    .top_mut()
                    .ok_or_else(|| JsError::internal_error("resume on an empty stack"))?;
                match step::step(interp, frame) {
                    Ok(action) => action,
                    Err(e) if e.is_catchable() => {
                        Action::Unwind(Completion::Throw(interp.error_value(&e)))
                    }
                    Err(e) => return Err(e),
                }
            };
            self.apply(action)?;
        }
        Ok(self.result.clone())
    }

    /// Inject an exception at the current suspension point
    pub fn throw(&mut self, exception: JsValue) -> Result<(), JsError> {
        self.enter(Node::Signal(Completion::Throw(exception)), None)
    }

    /// Inject a return at the current suspension point; pending finalizers still run
    pub fn force_return(&mut self, value: JsValue) -> Result<(), JsError> {
        self.enter(Node::Signal(Completion::Return(value)), None)
    }

    fn apply(&mut self, action: Action) -> Result<(), JsError> {
        match action {
            Action::Enter(node, scope) => self.enter(node, scope),
            Action::Leave(value, carry) => {
                self.leave(value, carry);
                Ok(())
            }
            Action::Proceed => Ok(()),
            Action::Interrupt(value) => {
                self.interrupt(value);
                Ok(())
            }
            Action::Unwind(completion) => self.unwind(completion),
        }
    }

    fn unwind(&mut self, completion: Completion) -> Result<(), JsError> {
        trace!(?completion, depth = self.stack.len(), "unwind");
        let value = completion.value();
        let predicate = |stack: &Stack| step::is_unwind_target(stack, &completion);
        let landed = self.leave_while(value, Some(completion.clone()), predicate);
        if landed {
            return Ok(());
        }
        match completion {
            Completion::Return(_) => Ok(()),
            Completion::Throw(_) => {
                debug!("uncaught exception finished coroutine");
                self.error = true;
                Ok(())
            }
            Completion::Break(label) => Err(JsError::invalid_ast(match label {
                Some(label) => format!("Undefined label '{}'", label),
                None => "Illegal break statement".to_string(),
            })),
            Completion::Continue(label) => Err(JsError::invalid_ast(match label {
                Some(label) => format!("Undefined label '{}'", label),
                None => "Illegal continue statement".to_string(),
            })),
        }
    }

    fn finish(&mut self, value: JsValue) {
        self.done = true;
        self.halt = true;
        self.result = value;
    }
}
