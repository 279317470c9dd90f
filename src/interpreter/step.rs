//! Step dispatcher
//!
//! [`step`] advances the top frame of a coroutine by one state and reports what
//! the coroutine should do next as an [`Action`]. Statement state machines live
//! in `exec_stmt`, expression state machines in `eval_expr`.

use std::rc::Rc;

use crate::ast::{Expression, Statement};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::coroutine::{Carry, Completion, Frame, FrameState, Node, Stack, TryStage};
use crate::interpreter::scope::Scope;
use crate::interpreter::{eval_expr, exec_stmt};
use crate::value::{CheapClone, JsValue};

/// Transition requested by one step
#[derive(Debug)]
pub enum Action {
    /// Push a child frame, optionally in a different scope
    Enter(Node, Option<Rc<Scope>>),
    /// Pop the current frame, handing the value (and reference) to the parent
    Leave(JsValue, Carry),
    /// Stay on the current frame; it changed state without needing a child
    Proceed,
    /// Suspend the coroutine with a value for the driver
    Interrupt(JsValue),
    /// Raise an abrupt completion
    Unwind(Completion),
}

impl Action {
    pub fn statement(stmt: &Rc<Statement>) -> Self {
        Action::Enter(Node::Statement(stmt.cheap_clone()), None)
    }

    pub fn statement_in(stmt: &Rc<Statement>, scope: &Rc<Scope>) -> Self {
        Action::Enter(Node::Statement(stmt.cheap_clone()), Some(scope.cheap_clone()))
    }

    pub fn expression(expr: &Rc<Expression>) -> Self {
        Action::Enter(Node::Expression(expr.cheap_clone()), None)
    }

    pub fn expression_in(expr: &Rc<Expression>, scope: &Rc<Scope>) -> Self {
        Action::Enter(Node::Expression(expr.cheap_clone()), Some(scope.cheap_clone()))
    }

    pub fn leave(value: JsValue) -> Self {
        Action::Leave(value, Carry::default())
    }

    /// Leave with `undefined`
    pub fn done() -> Self {
        Action::leave(JsValue::Undefined)
    }
}

/// Destructure the frame's working state, bailing out with an internal error
/// when the frame is in a different state than its program counter implies.
macro_rules! frame_state {
    ($context:expr, $variant:ident { $($field:ident),+ }) => {
        let FrameState::$variant { $($field),+, .. } = &mut $context.state else {
            return Err(JsError::internal_error(concat!(
                "frame is not in ",
                stringify!($variant),
                " state"
            )));
        };
    };
}

pub(crate) use frame_state;

/// Advance `frame` by one state
pub fn step(interp: &Interpreter, frame: &mut Frame) -> Result<Action, JsError> {
    let node = frame.node.clone();
    match &node {
        Node::Program(program) => exec_stmt::step_program(program, frame),
        Node::Statement(stmt) => exec_stmt::step_statement(interp, stmt, frame),
        Node::Expression(expr) => eval_expr::step_expression(interp, expr, frame),
        Node::Signal(completion) => Ok(Action::Unwind(completion.clone())),
    }
}

/// Whether the top frame of `stack` is where `completion` comes to rest
pub fn is_unwind_target(stack: &Stack, completion: &Completion) -> bool {
    let Some(top) = stack.top(0) else {
        return false;
    };
    let Node::Statement(stmt) = &top.node else {
        return false;
    };

    // A try statement intercepts whatever its handler or finalizer still has
    // to see; everything else passes through it.
    if let Statement::Try(try_stmt) = &**stmt {
        let FrameState::Try(state) = &top.context.state else {
            return false;
        };
        let has_finalizer = try_stmt.finalizer.is_some();
        return match completion {
            Completion::Throw(_) => match state.stage {
                TryStage::Block => try_stmt.handler.is_some() || has_finalizer,
                TryStage::Handler => has_finalizer,
                TryStage::Finalizer | TryStage::Redeliver => false,
            },
            _ => state.stage <= TryStage::Handler && has_finalizer,
        };
    }

    match completion {
        Completion::Return(_) | Completion::Throw(_) => false,
        Completion::Break(None) => stmt.is_loop() || matches!(&**stmt, Statement::Switch(_)),
        Completion::Break(Some(label)) => {
            matches!(&**stmt, Statement::Labeled(labeled) if labeled.label.name == *label)
        }
        Completion::Continue(None) => stmt.is_loop(),
        Completion::Continue(Some(label)) => {
            if !stmt.is_loop() {
                return false;
            }
            // The loop's own labels are the labeled statements directly below it
            let mut depth = 1;
            while let Some(frame) = stack.top(depth) {
                let Node::Statement(outer) = &frame.node else {
                    break;
                };
                let Statement::Labeled(labeled) = &**outer else {
                    break;
                };
                if labeled.label.name == *label {
                    return true;
                }
                depth += 1;
            }
            false
        }
    }
}
