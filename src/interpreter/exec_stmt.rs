//! Statement state machines
//!
//! Each function inspects `context.next` (and a delivered `signal`, if any) and
//! returns the next [`Action`]. Child results arrive in `context.tmp_result`.

use std::mem::take;
use std::rc::Rc;

use crate::ast::{
    Expression, ForInOfLeft, ForInOfStatement, ForInit, ForStatement, Function, Program, Statement,
    SwitchStatement, TryStatement, VariableDeclaration, VariableKind,
};
use crate::error::JsError;
use crate::hoist::Hoisting;
use crate::interpreter::{ClosureKind, Interpreter};
use crate::interpreter::coroutine::{
    Completion, Context, Frame, FrameState, IterSource, TryStage, TryState,
};
use crate::interpreter::operators::{self, IterStep};
use crate::interpreter::scope::{Scope, ScopeKind};
use crate::interpreter::step::{Action, frame_state};
use crate::value::{CheapClone, ExoticObject, JsFunction, JsString, JsValue};

pub(crate) fn step_program(program: &Rc<Program>, frame: &mut Frame) -> Result<Action, JsError> {
    step_sequence(&program.body, program.hoisting.as_ref(), true, frame)
}

pub(crate) fn step_statement(
    interp: &Interpreter,
    stmt: &Rc<Statement>,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    match &**stmt {
        Statement::Block(block) => step_sequence(&block.body, block.hoisting.as_ref(), false, frame),
        Statement::Expression(stmt) => match frame.context.next {
            0 => {
                frame.context.next = 1;
                Ok(Action::expression(&stmt.expression))
            }
            _ => Ok(Action::leave(take(&mut frame.context.tmp_result))),
        },
        Statement::VariableDeclaration(decl) => step_variable_declaration(decl, frame),
        Statement::FunctionDeclaration(func) => step_function_declaration(interp, func, frame),
        Statement::If(stmt) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&stmt.test))
                }
                1 => {
                    ctx.next = 2;
                    if ctx.tmp_result.to_boolean() {
                        Ok(Action::statement(&stmt.consequent))
                    } else if let Some(alternate) = &stmt.alternate {
                        Ok(Action::statement(alternate))
                    } else {
                        Ok(Action::done())
                    }
                }
                _ => Ok(Action::done()),
            }
        }
        Statement::Labeled(labeled) => {
            let ctx = &mut frame.context;
            // Only a break aimed at this label comes to rest here
            if ctx.signal.take().is_some() || ctx.next > 0 {
                return Ok(Action::done());
            }
            ctx.next = 1;
            Ok(Action::statement(&labeled.body))
        }
        Statement::Return(ret) => {
            let ctx = &mut frame.context;
            match (ctx.next, &ret.argument) {
                (0, Some(argument)) => {
                    ctx.next = 1;
                    Ok(Action::expression(argument))
                }
                (0, None) => Ok(Action::Unwind(Completion::Return(JsValue::Undefined))),
                _ => Ok(Action::Unwind(Completion::Return(take(&mut ctx.tmp_result)))),
            }
        }
        Statement::Throw(throw) => {
            let ctx = &mut frame.context;
            if ctx.next == 0 {
                ctx.next = 1;
                return Ok(Action::expression(&throw.argument));
            }
            Ok(Action::Unwind(Completion::Throw(take(&mut ctx.tmp_result))))
        }
        Statement::Break(jump) => Ok(Action::Unwind(Completion::Break(
            jump.label.as_ref().map(|l| l.name.cheap_clone()),
        ))),
        Statement::Continue(jump) => Ok(Action::Unwind(Completion::Continue(
            jump.label.as_ref().map(|l| l.name.cheap_clone()),
        ))),
        Statement::Try(try_stmt) => step_try(try_stmt, frame),
        Statement::While(stmt) => {
            let ctx = &mut frame.context;
            if let Some(signal) = ctx.signal.take() {
                match signal {
                    Completion::Continue(_) => ctx.next = 0,
                    _ => return Ok(Action::done()),
                }
            }
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&stmt.test))
                }
                _ => {
                    if !ctx.tmp_result.to_boolean() {
                        return Ok(Action::done());
                    }
                    ctx.next = 0;
                    Ok(Action::statement(&stmt.body))
                }
            }
        }
        Statement::DoWhile(stmt) => {
            let ctx = &mut frame.context;
            if let Some(signal) = ctx.signal.take() {
                match signal {
                    Completion::Continue(_) => ctx.next = 1,
                    _ => return Ok(Action::done()),
                }
            }
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::statement(&stmt.body))
                }
                1 => {
                    ctx.next = 2;
                    Ok(Action::expression(&stmt.test))
                }
                _ => {
                    if !ctx.tmp_result.to_boolean() {
                        return Ok(Action::done());
                    }
                    ctx.next = 1;
                    Ok(Action::statement(&stmt.body))
                }
            }
        }
        Statement::For(stmt) => step_for(stmt, frame),
        Statement::ForIn(stmt) => step_for_each(interp, stmt, false, frame),
        Statement::ForOf(stmt) => step_for_each(interp, stmt, true, frame),
        Statement::Switch(stmt) => step_switch(stmt, frame),
        Statement::Empty | Statement::Debugger => Ok(Action::done()),
        Statement::Unsupported(node) => Err(JsError::unsupported(node.kind.as_str())),
    }
}

/// Program and block bodies: run statements in order in a fresh block scope.
/// Programs leave with the value of the last expression statement.
fn step_sequence(
    body: &[Rc<Statement>],
    hoisting: Option<&Hoisting>,
    record_completion: bool,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.next == 0 {
        let scope = Scope::child(ScopeKind::Block, &frame.scope);
        if let Some(hoisting) = hoisting {
            scope.apply_hoisting(hoisting);
        }
        ctx.state = FrameState::Block {
            scope,
            index: 0,
            completion: JsValue::Undefined,
        };
    }
    frame_state!(ctx, Block { scope, index, completion });

    if ctx.next == 1 && record_completion {
        let finished = index.checked_sub(1).and_then(|i| body.get(i));
        if matches!(finished.map(|s| &**s), Some(Statement::Expression(_))) {
            *completion = take(&mut ctx.tmp_result);
        }
    }
    ctx.next = 1;

    match body.get(*index) {
        Some(stmt) => {
            *index += 1;
            Ok(Action::statement_in(stmt, scope))
        }
        None if record_completion => Ok(Action::leave(take(completion))),
        None => Ok(Action::done()),
    }
}

fn step_variable_declaration(
    decl: &VariableDeclaration,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.next == 0 {
        ctx.state = FrameState::Index { index: 0 };
    }
    frame_state!(ctx, Index { index });

    // An initializer just finished for the declarator at `index`
    if ctx.next == 1 {
        if let Some(declarator) = decl.declarations.get(*index) {
            let name = declarator.id.name()?;
            let value = take(&mut ctx.tmp_result);
            let value = match &declarator.init {
                Some(init) => name_anonymous_function(init, value, name),
                None => value,
            };
            frame.scope.declare(decl.kind, name).initialize(value);
        }
        *index += 1;
    }

    while let Some(declarator) = decl.declarations.get(*index) {
        if let Some(init) = &declarator.init {
            ctx.next = 1;
            return Ok(Action::expression(init));
        }
        let variable = frame.scope.declare(decl.kind, declarator.id.name()?);
        // `var x;` keeps an earlier value; `let x;` starts as undefined
        if decl.kind != VariableKind::Var {
            variable.initialize(JsValue::Undefined);
        }
        *index += 1;
    }
    Ok(Action::done())
}

/// Give `function () {}` the name of the binding it is assigned to
pub(crate) fn name_anonymous_function(init: &Expression, value: JsValue, name: &JsString) -> JsValue {
    let anonymous = match init {
        Expression::Function(func) | Expression::ArrowFunction(func) => func.id.is_none(),
        _ => false,
    };
    if anonymous && let JsValue::Object(obj) = &value {
        let mut o = obj.borrow_mut();
        if let ExoticObject::Function(JsFunction::Interpreted(f)) = &mut o.exotic {
            f.name = Some(name.cheap_clone());
        }
        o.define_hidden(JsString::from("name"), JsValue::String(name.cheap_clone()));
    }
    value
}

fn step_function_declaration(
    interp: &Interpreter,
    func: &Rc<Function>,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let Some(name) = func.name() else {
        return Err(JsError::invalid_ast("function declaration without a name"));
    };
    let closure = interp.create_closure(func, &frame.scope, ClosureKind::Declaration);
    frame
        .scope
        .declare(VariableKind::Var, name)
        .initialize(closure);
    Ok(Action::done())
}

fn step_try(try_stmt: &TryStatement, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;

    if let Some(signal) = ctx.signal.take() {
        let FrameState::Try(state) = &mut ctx.state else {
            return Err(JsError::internal_error("try frame without try state"));
        };
        if let Completion::Throw(exception) = &signal
            && state.stage == TryStage::Block
            && let Some(handler) = &try_stmt.handler
        {
            let catch_scope = Scope::child(ScopeKind::Block, &frame.scope);
            if let Some(param) = &handler.param {
                catch_scope
                    .declare_local(VariableKind::Let, param.name()?)
                    .initialize(exception.clone());
            }
            state.stage = TryStage::Handler;
            ctx.next = 1;
            return Ok(Action::statement_in(&handler.body, &catch_scope));
        }
        let Some(finalizer) = &try_stmt.finalizer else {
            return Err(JsError::internal_error("completion intercepted without a finalizer"));
        };
        state.parked = Some(signal);
        state.stage = TryStage::Finalizer;
        ctx.next = 2;
        return Ok(Action::statement(finalizer));
    }

    if ctx.next == 0 {
        ctx.state = FrameState::Try(TryState {
            stage: TryStage::Block,
            parked: None,
        });
        ctx.next = 1;
        return Ok(Action::statement(&try_stmt.block));
    }
    let FrameState::Try(state) = &mut ctx.state else {
        return Err(JsError::internal_error("try frame without try state"));
    };
    match ctx.next {
        // Block or handler completed normally
        1 => match &try_stmt.finalizer {
            Some(finalizer) => {
                state.stage = TryStage::Finalizer;
                ctx.next = 2;
                Ok(Action::statement(finalizer))
            }
            None => Ok(Action::done()),
        },
        // Finalizer completed normally: resume whatever it interrupted
        _ => match state.parked.take() {
            Some(parked) => {
                state.stage = TryStage::Redeliver;
                Ok(Action::Unwind(parked))
            }
            None => Ok(Action::done()),
        },
    }
}

/// Take a delivered break/continue for a loop frame. Returns `Some(action)`
/// when the loop must finish.
fn loop_signal(ctx: &mut Context, continue_at: u32) -> Option<Action> {
    match ctx.signal.take()? {
        Completion::Continue(_) => {
            ctx.next = continue_at;
            None
        }
        _ => Some(Action::done()),
    }
}

fn step_for(stmt: &ForStatement, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if let Some(action) = loop_signal(ctx, 3) {
        return Ok(action);
    }

    if ctx.next == 0 {
        let head = Scope::child(ScopeKind::Block, &frame.scope);
        let mut per_iteration = false;
        if let Some(hoisting) = &stmt.hoisting {
            head.apply_hoisting(hoisting);
            per_iteration = hoisting.has_lexical();
        }
        ctx.state = FrameState::For {
            scope: head.cheap_clone(),
            per_iteration,
        };
        ctx.next = 1;
        return Ok(match &stmt.init {
            Some(ForInit::Declaration(decl)) => Action::statement_in(decl, &head),
            Some(ForInit::Expression(expr)) => Action::expression_in(expr, &head),
            None => Action::Proceed,
        });
    }
    frame_state!(ctx, For { scope, per_iteration });

    match ctx.next {
        1 => {
            ctx.next = 2;
            match &stmt.test {
                Some(test) => Ok(Action::expression_in(test, scope)),
                None => {
                    ctx.tmp_result = JsValue::Boolean(true);
                    Ok(Action::Proceed)
                }
            }
        }
        2 => {
            if !ctx.tmp_result.to_boolean() {
                return Ok(Action::done());
            }
            ctx.next = 3;
            Ok(Action::statement_in(&stmt.body, scope))
        }
        _ => {
            // Each iteration gets fresh copies of the head's let/const
            // bindings before the update runs
            if *per_iteration {
                *scope = scope.clone_for_iteration();
            }
            ctx.next = 1;
            match &stmt.update {
                Some(update) => Ok(Action::expression_in(update, scope)),
                None => Ok(Action::Proceed),
            }
        }
    }
}

fn step_for_each(
    interp: &Interpreter,
    stmt: &ForInOfStatement,
    values: bool,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if let Some(action) = loop_signal(ctx, 2) {
        return Ok(action);
    }

    match ctx.next {
        0 => {
            ctx.next = 1;
            return Ok(Action::expression(&stmt.right));
        }
        1 => {
            let subject = take(&mut ctx.tmp_result);
            let source = if values {
                IterSource::values(&subject)?
            } else {
                IterSource::keys(&subject)
            };
            ctx.state = FrameState::ForEach {
                source,
                current: JsValue::Undefined,
                scope: None,
            };
            ctx.next = 2;
        }
        _ => {}
    }
    frame_state!(ctx, ForEach { source, current, scope });

    // The assignment target of `for (x.y of …)` was just evaluated
    if ctx.next == 3 {
        let value = take(current);
        if let Some(variable) = ctx.tmp_variable.take() {
            variable.set(value)?;
        } else if let Some(member) = ctx.tmp_member.take() {
            operators::set_member(&member.object, member.key, value)?;
        } else {
            return Err(JsError::reference_error(
                "Invalid left-hand side in for-loop",
            ));
        }
        ctx.next = 2;
        let Some(iteration) = scope.take() else {
            return Err(JsError::internal_error("for-loop iteration scope missing"));
        };
        return Ok(Action::statement_in(&stmt.body, &iteration));
    }

    let item = match source.advance(interp, JsValue::Undefined)? {
        IterStep::Item(item) => item,
        IterStep::Done(_) => return Ok(Action::done()),
    };

    let iteration = Scope::child(ScopeKind::Block, &frame.scope);
    if let Some(hoisting) = &stmt.hoisting {
        iteration.apply_hoisting(hoisting);
    }
    match &stmt.left {
        ForInOfLeft::Declaration(decl) => {
            let Statement::VariableDeclaration(decl) = &**decl else {
                return Err(JsError::invalid_ast("for-loop head is not a declaration"));
            };
            let Some(declarator) = decl.declarations.first() else {
                return Err(JsError::invalid_ast("for-loop declaration without a binding"));
            };
            iteration
                .declare(decl.kind, declarator.id.name()?)
                .initialize(item);
            Ok(Action::statement_in(&stmt.body, &iteration))
        }
        ForInOfLeft::Target(target) => {
            *current = item;
            *scope = Some(iteration.cheap_clone());
            ctx.next = 3;
            Ok(Action::expression_in(target, &iteration))
        }
    }
}

fn step_switch(stmt: &SwitchStatement, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.signal.take().is_some() {
        // Only an unlabeled break lands on a switch
        return Ok(Action::done());
    }

    if ctx.next == 0 {
        ctx.next = 1;
        return Ok(Action::expression(&stmt.discriminant));
    }
    if ctx.next == 1 {
        let scope = Scope::child(ScopeKind::Block, &frame.scope);
        if let Some(hoisting) = &stmt.hoisting {
            scope.apply_hoisting(hoisting);
        }
        ctx.state = FrameState::Switch {
            scope,
            discriminant: take(&mut ctx.tmp_result),
            case: 0,
            statement: 0,
        };
        ctx.next = 2;
    }
    frame_state!(ctx, Switch { scope, discriminant, case, statement });

    // next 2: evaluate the test of `case`; 3: compare it; 4: run statements
    loop {
        match ctx.next {
            2 => {
                let Some(switch_case) = stmt.cases.get(*case) else {
                    // No case matched: fall back to `default`, if any
                    match stmt.cases.iter().position(|c| c.test.is_none()) {
                        Some(default) => {
                            *case = default;
                            *statement = 0;
                            ctx.next = 4;
                            continue;
                        }
                        None => return Ok(Action::done()),
                    }
                };
                match &switch_case.test {
                    Some(test) => {
                        ctx.next = 3;
                        return Ok(Action::expression_in(test, scope));
                    }
                    None => {
                        *case += 1;
                    }
                }
            }
            3 => {
                if discriminant.strict_equals(&ctx.tmp_result) {
                    *statement = 0;
                    ctx.next = 4;
                } else {
                    *case += 1;
                    ctx.next = 2;
                }
            }
            _ => {
                // Execution falls through consecutive cases
                let Some(switch_case) = stmt.cases.get(*case) else {
                    return Ok(Action::done());
                };
                match switch_case.consequent.get(*statement) {
                    Some(next) => {
                        *statement += 1;
                        return Ok(Action::statement_in(next, scope));
                    }
                    None => {
                        *case += 1;
                        *statement = 0;
                    }
                }
            }
        }
    }
}

