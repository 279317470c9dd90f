//! Promise built-in methods
//!
//! Settling a promise never runs reactions directly: each registered handler
//! becomes a [`Job`] on the interpreter's queue, drained by
//! [`Interpreter::run_jobs`].

use std::cell::Cell;
use std::rc::Rc;

use crate::error::JsError;
use crate::interpreter::{Interpreter, Job};
use crate::value::{
    CheapClone, ExoticObject, JsObject, JsObjectRef, JsString, JsValue, PromiseHandler,
    PromiseState, PromiseStatus, native_function,
};

/// Initialize Promise.prototype with then, catch, finally methods
pub fn init_promise_prototype(interp: &Interpreter) {
    let proto = interp.promise_prototype.cheap_clone();

    interp.register_method(&proto, "then", 2, promise_then);
    interp.register_method(&proto, "catch", 1, promise_catch);
    interp.register_method(&proto, "finally", 1, promise_finally);
}

/// Create Promise constructor with static methods
pub fn create_promise_constructor(interp: &Interpreter) -> JsObjectRef {
    let ctor = native_function("Promise", 1, promise_constructor);
    ctor.borrow_mut().define_hidden(
        JsString::from("prototype"),
        JsValue::Object(interp.promise_prototype.cheap_clone()),
    );

    interp.register_method(&ctor, "resolve", 1, |interp, _this, args| {
        promise_resolve(interp, args.first().cloned().unwrap_or_default())
    });
    interp.register_method(&ctor, "reject", 1, |interp, _this, args| {
        let promise = create_promise(interp);
        reject_promise(interp, &promise, args.first().cloned().unwrap_or_default());
        Ok(JsValue::Object(promise))
    });

    ctor
}

/// Create a new pending promise
pub fn create_promise(interp: &Interpreter) -> JsObjectRef {
    let obj = JsObject::ordinary();
    {
        let mut o = obj.borrow_mut();
        o.prototype = Some(interp.promise_prototype.cheap_clone());
        o.exotic = ExoticObject::Promise(PromiseState {
            status: PromiseStatus::Pending,
            result: JsValue::Undefined,
            handlers: Vec::new(),
        });
    }
    obj
}

pub fn is_promise(value: &JsValue) -> bool {
    matches!(value, JsValue::Object(obj) if matches!(obj.borrow().exotic, ExoticObject::Promise(_)))
}

/// Status and result of a promise object
pub fn promise_state(obj: &JsObjectRef) -> Option<(PromiseStatus, JsValue)> {
    match &obj.borrow().exotic {
        ExoticObject::Promise(state) => Some((state.status, state.result.clone())),
        _ => None,
    }
}

/// `Promise.resolve(value)`: promises pass through, anything else is wrapped
pub fn promise_resolve(interp: &Interpreter, value: JsValue) -> Result<JsValue, JsError> {
    if is_promise(&value) {
        return Ok(value);
    }
    let promise = create_promise(interp);
    resolve_promise(interp, &promise, value)?;
    Ok(JsValue::Object(promise))
}

/// Resolve a promise: adopt the state of a promise or thenable, fulfill
/// with anything else
pub fn resolve_promise(
    interp: &Interpreter,
    promise: &JsObjectRef,
    value: JsValue,
) -> Result<(), JsError> {
    let JsValue::Object(obj) = &value else {
        fulfill_promise(interp, promise, value);
        return Ok(());
    };
    if Rc::ptr_eq(obj, promise) {
        let error = interp.create_error("TypeError", "Chaining cycle detected for promise");
        reject_promise(interp, promise, error);
        return Ok(());
    }

    if let Some((status, result)) = promise_state(obj) {
        match status {
            PromiseStatus::Pending => {
                // Settle together with the other promise
                if let ExoticObject::Promise(state) = &mut obj.borrow_mut().exotic {
                    state.handlers.push(PromiseHandler {
                        on_fulfilled: None,
                        on_rejected: None,
                        result_promise: promise.cheap_clone(),
                    });
                }
            }
            PromiseStatus::Fulfilled => fulfill_promise(interp, promise, result),
            PromiseStatus::Rejected => reject_promise(interp, promise, result),
        }
        return Ok(());
    }

    let then = obj.borrow().get_property("then");
    match then {
        Some(then) if then.is_callable() => {
            let (resolve, reject) = resolving_functions(promise);
            if let Err(e) = interp.call_function(
                &then,
                value.clone(),
                &[JsValue::Object(resolve), JsValue::Object(reject)],
            ) {
                if !e.is_catchable() {
                    return Err(e);
                }
                reject_promise(interp, promise, interp.error_value(&e));
            }
        }
        _ => fulfill_promise(interp, promise, value),
    }
    Ok(())
}

/// Fulfill a promise with a value
pub fn fulfill_promise(interp: &Interpreter, promise: &JsObjectRef, value: JsValue) {
    settle(interp, promise, PromiseStatus::Fulfilled, value);
}

/// Reject a promise with a reason
pub fn reject_promise(interp: &Interpreter, promise: &JsObjectRef, reason: JsValue) {
    settle(interp, promise, PromiseStatus::Rejected, reason);
}

fn settle(interp: &Interpreter, promise: &JsObjectRef, status: PromiseStatus, value: JsValue) {
    let handlers = {
        let mut obj = promise.borrow_mut();
        let ExoticObject::Promise(state) = &mut obj.exotic else {
            return;
        };
        if state.status != PromiseStatus::Pending {
            return; // Already settled, ignore
        }
        state.status = status;
        state.result = value.clone();
        std::mem::take(&mut state.handlers)
    };

    let fulfilled = status == PromiseStatus::Fulfilled;
    for handler in handlers {
        interp.enqueue_job(Job {
            handler,
            value: value.clone(),
            fulfilled,
        });
    }
}

/// Run one queued reaction: call the handler and settle the promise `then` returned
pub fn run_reaction(interp: &Interpreter, job: Job) -> Result<(), JsError> {
    let Job {
        handler,
        value,
        fulfilled,
    } = job;
    let callback = if fulfilled {
        handler.on_fulfilled
    } else {
        handler.on_rejected
    };

    match callback {
        Some(cb) => match interp.call_function(&cb, JsValue::Undefined, std::slice::from_ref(&value)) {
            Ok(result) => resolve_promise(interp, &handler.result_promise, result)?,
            Err(e) if e.is_catchable() => {
                reject_promise(interp, &handler.result_promise, interp.error_value(&e));
            }
            Err(e) => return Err(e),
        },
        // No callback - propagate the value/reason
        None if fulfilled => fulfill_promise(interp, &handler.result_promise, value),
        None => reject_promise(interp, &handler.result_promise, value),
    }
    Ok(())
}

/// The `resolve`/`reject` pair handed to an executor or a thenable's `then`.
/// Only the first call of either has an effect.
fn resolving_functions(promise: &JsObjectRef) -> (JsObjectRef, JsObjectRef) {
    let already_resolved = Rc::new(Cell::new(false));

    let resolve = {
        let promise = promise.cheap_clone();
        let already_resolved = already_resolved.cheap_clone();
        native_function("resolve", 1, move |interp, _this, args| {
            if !already_resolved.replace(true) {
                resolve_promise(interp, &promise, args.first().cloned().unwrap_or_default())?;
            }
            Ok(JsValue::Undefined)
        })
    };
    let reject = {
        let promise = promise.cheap_clone();
        native_function("reject", 1, move |interp, _this, args| {
            if !already_resolved.replace(true) {
                reject_promise(interp, &promise, args.first().cloned().unwrap_or_default());
            }
            Ok(JsValue::Undefined)
        })
    };
    (resolve, reject)
}

/// Promise constructor: new Promise((resolve, reject) => { ... })
pub fn promise_constructor(
    interp: &Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let executor = args.first().cloned().unwrap_or_default();
    if !executor.is_callable() {
        return Err(JsError::type_error(format!(
            "Promise resolver {} is not a function",
            executor.type_of()
        )));
    }

    let promise = create_promise(interp);
    let (resolve, reject) = resolving_functions(&promise);

    // An executor that throws rejects the promise
    if let Err(e) = interp.call_function(
        &executor,
        JsValue::Undefined,
        &[JsValue::Object(resolve), JsValue::Object(reject.cheap_clone())],
    ) {
        if !e.is_catchable() {
            return Err(e);
        }
        interp.call_function(
            &JsValue::Object(reject),
            JsValue::Undefined,
            &[interp.error_value(&e)],
        )?;
    }

    Ok(JsValue::Object(promise))
}

fn this_promise(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().exotic, ExoticObject::Promise(_)) => {
            Ok(obj.cheap_clone())
        }
        _ => Err(JsError::type_error(format!(
            "Method Promise.prototype.{} called on incompatible receiver {}",
            method,
            this.to_js_string()
        ))),
    }
}

/// Register reactions on `promise` and return the derived promise
pub fn then(
    interp: &Interpreter,
    promise: &JsObjectRef,
    on_fulfilled: Option<JsValue>,
    on_rejected: Option<JsValue>,
) -> JsObjectRef {
    let result_promise = create_promise(interp);
    let handler = PromiseHandler {
        on_fulfilled: on_fulfilled.filter(|v| v.is_callable()),
        on_rejected: on_rejected.filter(|v| v.is_callable()),
        result_promise: result_promise.cheap_clone(),
    };

    let settled = {
        let mut obj = promise.borrow_mut();
        match &mut obj.exotic {
            ExoticObject::Promise(state) if state.status == PromiseStatus::Pending => {
                state.handlers.push(handler.clone());
                None
            }
            ExoticObject::Promise(state) => Some((state.status, state.result.clone())),
            _ => None,
        }
    };
    // Already settled - the reaction still runs as a job
    if let Some((status, value)) = settled {
        interp.enqueue_job(Job {
            handler,
            value,
            fulfilled: status == PromiseStatus::Fulfilled,
        });
    }
    result_promise
}

/// Promise.prototype.then(onFulfilled, onRejected)
pub fn promise_then(
    interp: &Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "then")?;
    let result = then(interp, &promise, args.first().cloned(), args.get(1).cloned());
    Ok(JsValue::Object(result))
}

/// Promise.prototype.catch(onRejected)
pub fn promise_catch(
    interp: &Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "catch")?;
    let result = then(interp, &promise, None, args.first().cloned());
    Ok(JsValue::Object(result))
}

/// Promise.prototype.finally(onFinally): runs the callback, then passes the
/// original outcome through
pub fn promise_finally(
    interp: &Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "finally")?;
    let on_finally = args.first().cloned().filter(|f| f.is_callable());
    let Some(on_finally) = on_finally else {
        return Ok(JsValue::Object(then(interp, &promise, None, None)));
    };

    let on_fulfilled = {
        let on_finally = on_finally.clone();
        native_function("", 1, move |interp, _this, args| {
            interp.call_function(&on_finally, JsValue::Undefined, &[])?;
            Ok(args.first().cloned().unwrap_or_default())
        })
    };
    let on_rejected = native_function("", 1, move |interp, _this, args| {
        interp.call_function(&on_finally, JsValue::Undefined, &[])?;
        Err(JsError::Thrown(args.first().cloned().unwrap_or_default()))
    });
    let result = then(
        interp,
        &promise,
        Some(JsValue::Object(on_fulfilled)),
        Some(JsValue::Object(on_rejected)),
    );
    Ok(JsValue::Object(result))
}
