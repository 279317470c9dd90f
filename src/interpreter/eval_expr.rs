//! Expression state machines

use std::mem::take;
use std::rc::Rc;

use crate::ast::{
    AssignmentExpression, AssignmentOp, CallExpression, Expression, LiteralValue, LogicalOp,
    ObjectExpression, PropertyKind, UnaryExpression, UnaryOp, UpdateExpression, UpdateOp,
    YieldExpression,
};
use crate::error::JsError;
use crate::interpreter::{ClosureKind, Interpreter};
use crate::interpreter::coroutine::{AssignTarget, Carry, Frame, FrameState, IterSource, MemberRef};
use crate::interpreter::exec_stmt::name_anonymous_function;
use crate::interpreter::operators::{self, IterStep};
use crate::interpreter::step::{Action, frame_state};
use crate::value::{CheapClone, JsObject, JsString, JsValue};

pub(crate) fn step_expression(
    interp: &Interpreter,
    expr: &Rc<Expression>,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    match &**expr {
        Expression::Identifier(id) => match frame.scope.get(id.name.as_str()) {
            Some(variable) => {
                let value = variable.get()?;
                Ok(Action::Leave(value, Carry::variable(variable)))
            }
            None => global_constant(id.name.as_str())
                .map(Action::leave)
                .ok_or_else(|| JsError::not_defined(id.name.as_str())),
        },
        Expression::Literal(literal) => Ok(Action::leave(match &literal.value {
            LiteralValue::Null => JsValue::Null,
            LiteralValue::Boolean(b) => JsValue::Boolean(*b),
            LiteralValue::Number(n) => JsValue::Number(*n),
            LiteralValue::String(s) => JsValue::String(s.cheap_clone()),
        })),
        Expression::This => {
            let this = match frame.scope.get("this") {
                Some(variable) => variable.get()?,
                None => JsValue::Undefined,
            };
            Ok(Action::leave(this))
        }
        Expression::Array(array) => {
            let ctx = &mut frame.context;
            if ctx.next == 0 {
                ctx.state = FrameState::List {
                    index: 0,
                    values: Vec::with_capacity(array.elements.len()),
                };
            }
            frame_state!(ctx, List { index, values });
            if ctx.next == 1 {
                values.push(take(&mut ctx.tmp_result));
            }
            while let Some(element) = array.elements.get(*index) {
                *index += 1;
                match element {
                    Some(element) => {
                        ctx.next = 1;
                        return Ok(Action::expression(element));
                    }
                    None => values.push(JsValue::Undefined),
                }
            }
            Ok(Action::leave(JsValue::Object(JsObject::array(take(values)))))
        }
        Expression::Object(object) => step_object(object, frame),
        Expression::Function(func) => Ok(Action::leave(interp.create_closure(
            func,
            &frame.scope,
            ClosureKind::Expression,
        ))),
        Expression::ArrowFunction(func) => Ok(Action::leave(interp.create_closure(
            func,
            &frame.scope,
            ClosureKind::Arrow,
        ))),
        Expression::Unary(unary) => step_unary(unary, frame),
        Expression::Update(update) => step_update(update, frame),
        Expression::Binary(binary) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&binary.left))
                }
                1 => {
                    ctx.state = FrameState::Binary {
                        left: take(&mut ctx.tmp_result),
                    };
                    ctx.next = 2;
                    Ok(Action::expression(&binary.right))
                }
                _ => {
                    frame_state!(ctx, Binary { left });
                    let value = operators::binary(interp, binary.operator, left, &ctx.tmp_result)?;
                    Ok(Action::leave(value))
                }
            }
        }
        Expression::Logical(logical) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&logical.left))
                }
                1 => {
                    let left = take(&mut ctx.tmp_result);
                    if short_circuits(logical.operator, &left) {
                        return Ok(Action::leave(left));
                    }
                    ctx.next = 2;
                    Ok(Action::expression(&logical.right))
                }
                _ => Ok(Action::leave(take(&mut ctx.tmp_result))),
            }
        }
        Expression::Assignment(assign) => step_assignment(interp, assign, frame),
        Expression::Conditional(cond) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&cond.test))
                }
                1 => {
                    ctx.next = 2;
                    if ctx.tmp_result.to_boolean() {
                        Ok(Action::expression(&cond.consequent))
                    } else {
                        Ok(Action::expression(&cond.alternate))
                    }
                }
                _ => Ok(Action::leave(take(&mut ctx.tmp_result))),
            }
        }
        Expression::Sequence(seq) => {
            let ctx = &mut frame.context;
            let index = ctx.next as usize;
            match seq.expressions.get(index) {
                Some(expr) => {
                    ctx.next += 1;
                    Ok(Action::expression(expr))
                }
                None => Ok(Action::leave(take(&mut ctx.tmp_result))),
            }
        }
        Expression::Member(member) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&member.object))
                }
                1 => {
                    let object = take(&mut ctx.tmp_result);
                    if member.computed {
                        ctx.state = FrameState::Member { object };
                        ctx.next = 2;
                        return Ok(Action::expression(&member.property));
                    }
                    let Expression::Identifier(property) = &*member.property else {
                        return Err(JsError::invalid_ast("non-computed member without a name"));
                    };
                    read_member(object, property.name.cheap_clone())
                }
                _ => {
                    frame_state!(ctx, Member { object });
                    let key = operators::to_property_key(&ctx.tmp_result);
                    read_member(take(object), key)
                }
            }
        }
        Expression::Call(call) => step_call(interp, call, false, frame),
        Expression::New(call) => step_call(interp, call, true, frame),
        Expression::Yield(yield_expr) if yield_expr.delegate => {
            step_yield_delegate(interp, yield_expr, frame)
        }
        Expression::Yield(yield_expr) => {
            let ctx = &mut frame.context;
            match (ctx.next, &yield_expr.argument) {
                (0, Some(argument)) => {
                    ctx.next = 1;
                    Ok(Action::expression(argument))
                }
                (0, None) => {
                    ctx.next = 2;
                    Ok(Action::Interrupt(JsValue::Undefined))
                }
                (1, _) => {
                    ctx.next = 2;
                    Ok(Action::Interrupt(take(&mut ctx.tmp_result)))
                }
                // The driver's resume value arrives as the latest child result
                _ => Ok(Action::leave(take(&mut ctx.tmp_result))),
            }
        }
        Expression::Await(await_expr) => {
            let ctx = &mut frame.context;
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Action::expression(&await_expr.argument))
                }
                1 => {
                    ctx.next = 2;
                    Ok(Action::Interrupt(take(&mut ctx.tmp_result)))
                }
                _ => Ok(Action::leave(take(&mut ctx.tmp_result))),
            }
        }
        Expression::Unsupported(node) => Err(JsError::unsupported(node.kind.as_str())),
    }
}

/// Global value properties that resolve even without a binding
fn global_constant(name: &str) -> Option<JsValue> {
    match name {
        "undefined" => Some(JsValue::Undefined),
        "NaN" => Some(JsValue::Number(f64::NAN)),
        "Infinity" => Some(JsValue::Number(f64::INFINITY)),
        _ => None,
    }
}

fn short_circuits(op: LogicalOp, left: &JsValue) -> bool {
    match op {
        LogicalOp::And => !left.to_boolean(),
        LogicalOp::Or => left.to_boolean(),
        LogicalOp::NullishCoalescing => !left.is_null_or_undefined(),
    }
}

fn read_member(object: JsValue, key: JsString) -> Result<Action, JsError> {
    let value = operators::get_member(&object, &key)?;
    Ok(Action::Leave(value, Carry::member(object, key)))
}

/// Static key of a non-computed property: `{ a: 1 }`, `{ "a": 1 }`, `{ 1: 1 }`
fn static_key(key: &Expression) -> Result<JsString, JsError> {
    match key {
        Expression::Identifier(id) => Ok(id.name.cheap_clone()),
        Expression::Literal(literal) => Ok(match &literal.value {
            LiteralValue::String(s) => s.cheap_clone(),
            LiteralValue::Number(n) => crate::value::number_to_string(*n),
            LiteralValue::Boolean(b) => JsString::from(if *b { "true" } else { "false" }),
            LiteralValue::Null => JsString::from("null"),
        }),
        other => Err(JsError::invalid_ast(format!(
            "{} is not a property key",
            other.kind()
        ))),
    }
}

fn step_object(literal: &ObjectExpression, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.next == 0 {
        ctx.state = FrameState::Object {
            object: JsObject::ordinary(),
            index: 0,
            key: None,
        };
        ctx.next = 1;
    }
    frame_state!(ctx, Object { object, index, key });

    match ctx.next {
        // Computed key evaluated
        2 => {
            *key = Some(operators::to_property_key(&ctx.tmp_result));
            if let Some(property) = literal.properties.get(*index) {
                ctx.next = 3;
                return Ok(Action::expression(&property.value));
            }
        }
        // Value evaluated
        3 => {
            let name = key
                .take()
                .ok_or_else(|| JsError::internal_error("object property without a key"))?;
            let mut value = take(&mut ctx.tmp_result);
            if let Some(property) = literal.properties.get(*index) {
                value = name_anonymous_function(&property.value, value, &name);
            }
            object.borrow_mut().set_property(name, value);
            *index += 1;
        }
        _ => {}
    }

    let Some(property) = literal.properties.get(*index) else {
        return Ok(Action::leave(JsValue::Object(object.cheap_clone())));
    };
    if property.kind != PropertyKind::Init {
        return Err(JsError::unsupported("accessor property"));
    }
    if property.computed {
        ctx.next = 2;
        return Ok(Action::expression(&property.key));
    }
    *key = Some(static_key(&property.key)?);
    ctx.next = 3;
    Ok(Action::expression(&property.value))
}

fn step_unary(unary: &UnaryExpression, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.next == 0 {
        match (unary.operator, &*unary.argument) {
            // `typeof undeclared` is not an error
            (UnaryOp::Typeof, Expression::Identifier(id))
                if frame.scope.get(id.name.as_str()).is_none()
                    && global_constant(id.name.as_str()).is_none() =>
            {
                return Ok(Action::leave(JsValue::from("undefined")));
            }
            (UnaryOp::Delete, Expression::Identifier(_)) => {
                return Ok(Action::leave(JsValue::Boolean(false)));
            }
            _ => {
                ctx.next = 1;
                return Ok(Action::expression(&unary.argument));
            }
        }
    }
    if unary.operator == UnaryOp::Delete {
        let deleted = match ctx.tmp_member.take() {
            Some(member) => operators::delete_member(&member.object, &member.key)?,
            None => true,
        };
        return Ok(Action::leave(JsValue::Boolean(deleted)));
    }
    Ok(Action::leave(operators::unary(unary.operator, &ctx.tmp_result)?))
}

fn step_update(update: &UpdateExpression, frame: &mut Frame) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    if ctx.next == 0 {
        if !matches!(
            &*update.argument,
            Expression::Identifier(_) | Expression::Member(_)
        ) {
            return Err(JsError::reference_error(
                "Invalid left-hand side expression in update operation",
            ));
        }
        ctx.next = 1;
        return Ok(Action::expression(&update.argument));
    }
    let old = ctx.tmp_result.to_number();
    let new = match update.operator {
        UpdateOp::Increment => old + 1.0,
        UpdateOp::Decrement => old - 1.0,
    };
    let target = match (ctx.tmp_variable.take(), ctx.tmp_member.take()) {
        (Some(variable), _) => AssignTarget::Variable(variable),
        (None, Some(member)) => AssignTarget::Member(member),
        (None, None) => {
            return Err(JsError::reference_error(
                "Invalid left-hand side expression in update operation",
            ));
        }
    };
    write(target, JsValue::Number(new))?;
    Ok(Action::leave(JsValue::Number(if update.prefix {
        new
    } else {
        old
    })))
}

fn write(target: AssignTarget, value: JsValue) -> Result<(), JsError> {
    match target {
        AssignTarget::Variable(variable) => variable.set(value),
        AssignTarget::Member(MemberRef { object, key }) => {
            operators::set_member(&object, key, value)
        }
    }
}

fn step_assignment(
    interp: &Interpreter,
    assign: &AssignmentExpression,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    let (target, old) = match ctx.next {
        0 => match &*assign.left {
            Expression::Identifier(id) => {
                let variable = frame
                    .scope
                    .get(id.name.as_str())
                    .ok_or_else(|| JsError::not_defined(id.name.as_str()))?;
                // Plain `=` never reads the old value, so it may initialize
                let old = if assign.operator == AssignmentOp::Assign {
                    JsValue::Undefined
                } else {
                    variable.get()?
                };
                (AssignTarget::Variable(variable), old)
            }
            Expression::Member(_) => {
                ctx.next = 1;
                return Ok(Action::expression(&assign.left));
            }
            _ => {
                return Err(JsError::reference_error(
                    "Invalid left-hand side in assignment",
                ));
            }
        },
        1 => {
            let member = ctx
                .tmp_member
                .take()
                .ok_or_else(|| JsError::reference_error("Invalid left-hand side in assignment"))?;
            (AssignTarget::Member(member), take(&mut ctx.tmp_result))
        }
        _ => {
            frame_state!(ctx, Assign { target, old });
            let right = take(&mut ctx.tmp_result);
            let value = match assign.operator.binary() {
                Some(op) => operators::binary(interp, op, old, &right)?,
                None => right,
            };
            let value = match (&*assign.left, assign.operator) {
                (Expression::Identifier(id), AssignmentOp::Assign) => {
                    name_anonymous_function(&assign.right, value, &id.name)
                }
                _ => value,
            };
            write(target.clone(), value.clone())?;
            return Ok(Action::leave(value));
        }
    };

    if let Some(op) = assign.operator.logical()
        && short_circuits(op, &old)
    {
        return Ok(Action::leave(old));
    }
    ctx.state = FrameState::Assign { target, old };
    ctx.next = 2;
    Ok(Action::expression(&assign.right))
}

/// Human-readable callee for "is not a function" messages
fn describe_callee(callee: &Expression) -> String {
    match callee {
        Expression::Identifier(id) => id.name.to_string(),
        Expression::Member(member) => match (&*member.property, member.computed) {
            (Expression::Identifier(property), false) => {
                format!("{}.{}", describe_callee(&member.object), property.name)
            }
            _ => format!("{}[...]", describe_callee(&member.object)),
        },
        Expression::This => "this".to_string(),
        other => other.kind().to_string(),
    }
}

fn step_call(
    interp: &Interpreter,
    call: &CallExpression,
    construct: bool,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    match ctx.next {
        0 => {
            ctx.next = 1;
            return Ok(Action::expression(&call.callee));
        }
        1 => {
            // A member callee supplies the receiver
            let this = ctx
                .tmp_member
                .take()
                .map(|member| member.object)
                .unwrap_or_default();
            ctx.state = FrameState::Call {
                callee: take(&mut ctx.tmp_result),
                this,
                args: Vec::with_capacity(call.arguments.len()),
            };
            ctx.next = 2;
        }
        _ => {}
    }
    frame_state!(ctx, Call { callee, this, args });

    if ctx.next == 3 {
        args.push(take(&mut ctx.tmp_result));
    }
    if let Some(argument) = call.arguments.get(args.len()) {
        ctx.next = 3;
        return Ok(Action::expression(argument));
    }

    let callee = take(callee);
    let args = take(args);
    if construct {
        if !callee.is_callable() {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                describe_callee(&call.callee)
            )));
        }
        return Ok(Action::leave(interp.construct(&callee, &args)?));
    }
    if !callee.is_callable() {
        return Err(JsError::type_error(format!(
            "{} is not a function",
            describe_callee(&call.callee)
        )));
    }
    let result = interp.call_function(&callee, take(this), &args)?;
    Ok(Action::leave(result))
}

fn step_yield_delegate(
    interp: &Interpreter,
    yield_expr: &YieldExpression,
    frame: &mut Frame,
) -> Result<Action, JsError> {
    let ctx = &mut frame.context;
    match ctx.next {
        0 => {
            let Some(argument) = &yield_expr.argument else {
                return Err(JsError::invalid_ast("yield* without an operand"));
            };
            ctx.next = 1;
            return Ok(Action::expression(argument));
        }
        1 => {
            ctx.state = FrameState::Delegate {
                source: IterSource::values(&ctx.tmp_result)?,
            };
            ctx.tmp_result = JsValue::Undefined;
            ctx.next = 2;
        }
        _ => {}
    }
    frame_state!(ctx, Delegate { source });

    // Values sent into the outer generator are forwarded to the inner iterator
    let sent = take(&mut ctx.tmp_result);
    match source.advance(interp, sent)? {
        IterStep::Item(value) => Ok(Action::Interrupt(value)),
        IterStep::Done(value) => Ok(Action::leave(value)),
    }
}
