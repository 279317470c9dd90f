//! Drivers: run a coroutine to completion, as a generator, or as an async
//! function settling a promise.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::promise;
use crate::interpreter::coroutine::{Coroutine, Node};
use crate::interpreter::scope::Scope;
use crate::value::{CheapClone, JsObjectRef, JsValue, native_function};

/// Run `node` to completion. An uncaught exception comes back as
/// [`JsError::Thrown`]; suspending is a TypeError here.
pub fn evaluate(interp: &Interpreter, node: Node, scope: Rc<Scope>) -> Result<JsValue, JsError> {
    let mut co = Coroutine::new(node, scope);
    let result = co.resume(interp, JsValue::Undefined)?;
    if co.error {
        return Err(JsError::Thrown(result));
    }
    if !co.done {
        return Err(JsError::type_error(
            "yield and await are only valid in generator and async functions",
        ));
    }
    Ok(result)
}

/// Outcome of one generator step
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorResult {
    pub value: JsValue,
    pub done: bool,
}

impl IteratorResult {
    fn done(value: JsValue) -> Self {
        IteratorResult { value, done: true }
    }
}

/// Drives a coroutine one `yield` at a time
pub struct GeneratorDriver {
    co: Coroutine,
    finished: bool,
}

impl fmt::Debug for GeneratorDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorDriver")
            .field("depth", &self.co.stack.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl GeneratorDriver {
    pub fn new(node: Node, scope: Rc<Scope>) -> Self {
        GeneratorDriver {
            co: Coroutine::new(node, scope),
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Resume with `value` as the result of the pending `yield`
    pub fn next(&mut self, interp: &Interpreter, value: JsValue) -> Result<IteratorResult, JsError> {
        if self.finished {
            return Ok(IteratorResult::done(JsValue::Undefined));
        }
        self.drive(interp, value)
    }

    /// Finish early with `value`. Pending `finally` blocks still run and may
    /// override the outcome.
    pub fn return_(&mut self, interp: &Interpreter, value: JsValue) -> Result<IteratorResult, JsError> {
        if self.finished {
            return Ok(IteratorResult::done(value));
        }
        self.co.force_return(value)?;
        self.drive(interp, JsValue::Undefined)
    }

    /// Raise `exception` at the pending `yield`
    pub fn throw(&mut self, interp: &Interpreter, exception: JsValue) -> Result<IteratorResult, JsError> {
        if self.finished {
            return Ok(IteratorResult::done(JsValue::Undefined));
        }
        self.co.throw(exception)?;
        self.drive(interp, JsValue::Undefined)
    }

    fn drive(&mut self, interp: &Interpreter, value: JsValue) -> Result<IteratorResult, JsError> {
        let result = self.co.resume(interp, value);
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        if self.co.error {
            self.finished = true;
            return Err(JsError::Thrown(value));
        }
        if self.co.done {
            self.finished = true;
            return Ok(IteratorResult::done(value));
        }
        Ok(IteratorResult { value, done: false })
    }
}

/// Run `node` as an async function body and return the promise it settles.
///
/// The body runs synchronously up to its first `await` of a thenable. The
/// continuation is chained through the thenable's `then`: fulfilment resumes
/// the body with the value, rejection throws into it. Awaiting a non-thenable
/// resumes at once with the same value.
pub fn evaluate_async(interp: &Interpreter, node: Node, scope: Rc<Scope>) -> JsObjectRef {
    let result = promise::create_promise(interp);
    let driver = Rc::new(RefCell::new(GeneratorDriver::new(node, scope)));
    step_async(interp, &driver, &result, Resumption::Next(JsValue::Undefined));
    result
}

enum Resumption {
    Next(JsValue),
    Throw(JsValue),
}

fn step_async(
    interp: &Interpreter,
    driver: &Rc<RefCell<GeneratorDriver>>,
    result: &JsObjectRef,
    mut resumption: Resumption,
) {
    loop {
        let outcome = {
            let Ok(mut d) = driver.try_borrow_mut() else {
                settle(interp, result, Err(JsError::internal_error("async function re-entered")));
                return;
            };
            match resumption {
                Resumption::Next(value) => d.next(interp, value),
                Resumption::Throw(reason) => d.throw(interp, reason),
            }
        };
        match outcome {
            Ok(step) if step.done => return settle(interp, result, Ok(step.value)),
            Ok(step) => match thenable(&step.value) {
                Some(then) => {
                    if let Err(e) = chain(interp, driver, result, step.value, &then) {
                        settle(interp, result, Err(e));
                    }
                    return;
                }
                None => resumption = Resumption::Next(step.value),
            },
            Err(e) => return settle(interp, result, Err(e)),
        }
    }
}

/// The callable `then` of a thenable value
fn thenable(value: &JsValue) -> Option<JsValue> {
    let then = value.as_object()?.borrow().get_property("then")?;
    then.is_callable().then_some(then)
}

/// Subscribe the async body to the settlement of `awaited`
fn chain(
    interp: &Interpreter,
    driver: &Rc<RefCell<GeneratorDriver>>,
    result: &JsObjectRef,
    awaited: JsValue,
    then: &JsValue,
) -> Result<(), JsError> {
    let on_fulfilled = {
        let driver = driver.cheap_clone();
        let result = result.cheap_clone();
        native_function("", 1, move |interp, _this, args| {
            let value = args.first().cloned().unwrap_or_default();
            step_async(interp, &driver, &result, Resumption::Next(value));
            interp.take_fatal().map_or(Ok(JsValue::Undefined), Err)
        })
    };
    let on_rejected = {
        let driver = driver.cheap_clone();
        let result = result.cheap_clone();
        native_function("", 1, move |interp, _this, args| {
            let reason = args.first().cloned().unwrap_or_default();
            step_async(interp, &driver, &result, Resumption::Throw(reason));
            interp.take_fatal().map_or(Ok(JsValue::Undefined), Err)
        })
    };
    interp.call_function(
        then,
        awaited,
        &[JsValue::Object(on_fulfilled), JsValue::Object(on_rejected)],
    )?;
    Ok(())
}

fn settle(interp: &Interpreter, promise_obj: &JsObjectRef, outcome: Result<JsValue, JsError>) {
    let settled = match outcome {
        Ok(value) => promise::resolve_promise(interp, promise_obj, value),
        Err(e) if e.is_catchable() => {
            promise::reject_promise(interp, promise_obj, interp.error_value(&e));
            Ok(())
        }
        Err(e) => {
            // Engine failures are not language exceptions: the promise stays
            // pending and the failure goes to the host
            warn!(error = %e, "async function failed");
            interp.record_fatal(e);
            Ok(())
        }
    };
    if let Err(e) = settled {
        promise::reject_promise(interp, promise_obj, interp.error_value(&e));
    }
}
