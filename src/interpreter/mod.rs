//! Suspendable tree-walking interpreter
//!
//! The [`Interpreter`] owns process-wide state: configuration, the builtin
//! prototypes and the promise job queue. Evaluation itself happens in
//! coroutines (see [`coroutine`]); each call of an interpreted function runs
//! its body in a fresh one.

pub mod builtins;
pub mod coroutine;
pub mod eval_expr;
pub mod evaluate;
pub mod exec_stmt;
pub mod operators;
pub mod scope;
pub mod step;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{Function, FunctionBody, VariableKind};
use crate::error::JsError;
use crate::interpreter::coroutine::Node;
use crate::interpreter::scope::{Scope, ScopeKind};
use crate::prelude::*;
use crate::value::{
    CheapClone, ExoticObject, InterpretedFunction, JsFunction, JsObject, JsObjectRef, JsString,
    JsValue, PromiseHandler, native_function,
};

/// Default limit on nested function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Interpreter settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Nested calls beyond this depth raise a RangeError
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// How a function value was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Declaration,
    Expression,
    Arrow,
}

/// A queued promise reaction
#[derive(Debug)]
pub struct Job {
    pub handler: PromiseHandler,
    pub value: JsValue,
    pub fulfilled: bool,
}

pub struct Interpreter {
    config: Config,
    call_depth: Cell<usize>,
    /// Microtask queue, drained in FIFO order by [`Interpreter::run_jobs`]
    jobs: RefCell<VecDeque<Job>>,
    pub promise_prototype: JsObjectRef,
    pub generator_prototype: JsObjectRef,
    /// Error.prototype plus one prototype per native error type
    error_prototypes: FxHashMap<&'static str, JsObjectRef>,
    /// First engine failure raised inside an async body, surfaced to the host
    fatal: RefCell<Option<JsError>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("call_depth", &self.call_depth.get())
            .field("pending_jobs", &self.jobs.borrow().len())
            .finish()
    }
}

/// Decrements the call depth when a call returns, whichever way it returns
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let interp = Interpreter {
            config,
            call_depth: Cell::new(0),
            jobs: RefCell::new(VecDeque::new()),
            promise_prototype: JsObject::ordinary(),
            generator_prototype: JsObject::ordinary(),
            error_prototypes: builtins::error::create_error_prototypes(),
            fatal: RefCell::new(None),
        };
        builtins::promise::init_promise_prototype(&interp);
        builtins::generator::init_generator_prototype(&interp);
        interp
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.config.max_call_depth = depth;
    }

    /// Define the builtin globals in `scope`
    pub fn install_globals(&self, scope: &Rc<Scope>) {
        scope.define("undefined", JsValue::Undefined);
        scope.define("NaN", JsValue::Number(f64::NAN));
        scope.define("Infinity", JsValue::Number(f64::INFINITY));
        scope.define(
            "Promise",
            JsValue::Object(builtins::promise::create_promise_constructor(self)),
        );
        for (name, ctor) in builtins::error::create_error_constructors(self) {
            scope.define(name, JsValue::Object(ctor));
        }
        scope.define("JSON", JsValue::Object(builtins::json::create_json_object(self)));
    }

    /// Attach a native method to `obj`
    pub fn register_method<F>(&self, obj: &JsObjectRef, name: &str, arity: usize, func: F)
    where
        F: Fn(&Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    {
        let method = native_function(name, arity, func);
        obj.borrow_mut()
            .set_property(JsString::from(name), JsValue::Object(method));
    }

    /// Create a closure over `scope`. Named function expressions see their own
    /// name through an immutable binding in an extra scope between the closure
    /// and `scope`; declarations and arrows capture `scope` directly.
    pub fn create_closure(
        &self,
        func: &Rc<Function>,
        scope: &Rc<Scope>,
        kind: ClosureKind,
    ) -> JsValue {
        let name = func.name().cloned();
        let arrow = kind == ClosureKind::Arrow;
        let self_name = match &name {
            Some(name) if kind == ClosureKind::Expression => Some(name),
            _ => None,
        };
        let captured = match self_name {
            Some(_) => Scope::child(ScopeKind::Block, scope),
            None => scope.cheap_clone(),
        };
        let obj = JsObject::function(JsFunction::Interpreted(InterpretedFunction {
            name: name.clone(),
            node: func.cheap_clone(),
            scope: captured.cheap_clone(),
            arrow,
        }));
        {
            let mut o = obj.borrow_mut();
            o.define_hidden(
                JsString::from("name"),
                JsValue::String(name.clone().unwrap_or_else(|| JsString::from(""))),
            );
            o.define_hidden(
                JsString::from("length"),
                JsValue::Number(func.params.len() as f64),
            );
            if !arrow && !func.generator && !func.is_async {
                o.define_hidden(
                    JsString::from("prototype"),
                    JsValue::Object(JsObject::ordinary()),
                );
            }
        }
        if let Some(name) = self_name {
            captured
                .declare_local(VariableKind::Const, name)
                .initialize(JsValue::Object(obj.cheap_clone()));
        }
        JsValue::Object(obj)
    }

    fn enter_call(&self) -> Result<DepthGuard<'_>, JsError> {
        let depth = self.call_depth.get();
        if depth >= self.config.max_call_depth {
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        self.call_depth.set(depth + 1);
        Ok(DepthGuard {
            depth: &self.call_depth,
        })
    }

    /// Call `callee` with the given receiver and arguments
    pub fn call_function(
        &self,
        callee: &JsValue,
        this: JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = callee else {
            return Err(JsError::type_error(format!(
                "{} is not a function",
                callee.to_js_string()
            )));
        };
        let func = match &obj.borrow().exotic {
            ExoticObject::Function(func) => func.clone(),
            _ => {
                return Err(JsError::type_error(format!(
                    "{} is not a function",
                    callee.to_js_string()
                )));
            }
        };
        let _guard = self.enter_call()?;
        match func {
            JsFunction::Native(native) => {
                trace!(name = %native.name, "call native");
                (native.func)(self, this, args)
            }
            JsFunction::Interpreted(func) => self.call_interpreted(&func, this, args),
        }
    }

    fn call_interpreted(
        &self,
        func: &InterpretedFunction,
        this: JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let node = &func.node;
        trace!(
            name = func.name.as_ref().map(|n| n.as_str()).unwrap_or("<anonymous>"),
            args = args.len(),
            "call"
        );
        let scope = Scope::child(ScopeKind::Function, &func.scope);
        if !func.arrow {
            scope.define("this", this);
            scope.define("arguments", JsValue::Object(JsObject::array(args.to_vec())));
        }
        for (i, param) in node.params.iter().enumerate() {
            scope
                .declare_local(VariableKind::Var, param.name()?)
                .initialize(args.get(i).cloned().unwrap_or_default());
        }
        if let Some(hoisting) = &node.hoisting {
            scope.apply_hoisting(hoisting);
        }

        let body = match &node.body {
            FunctionBody::Block(block) => Node::Statement(block.cheap_clone()),
            FunctionBody::Expression(expr) => Node::Expression(expr.cheap_clone()),
        };
        match (node.generator, node.is_async) {
            (true, true) => Err(JsError::unsupported("async generator function")),
            (true, false) => Ok(builtins::generator::create_generator(self, body, scope)),
            (false, true) => {
                let promise = evaluate::evaluate_async(self, body, scope);
                match self.take_fatal() {
                    Some(e) => Err(e),
                    None => Ok(JsValue::Object(promise)),
                }
            }
            (false, false) => evaluate::evaluate(self, body, scope),
        }
    }

    /// `new callee(...args)`
    pub fn construct(&self, callee: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = callee else {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                callee.to_js_string()
            )));
        };
        let interpreted = match &obj.borrow().exotic {
            ExoticObject::Function(JsFunction::Interpreted(func)) => Some(func.clone()),
            ExoticObject::Function(JsFunction::Native(_)) => None,
            _ => {
                return Err(JsError::type_error(format!(
                    "{} is not a constructor",
                    callee.to_js_string()
                )));
            }
        };
        // Native constructors build their own instance
        let Some(func) = interpreted else {
            return self.call_function(callee, JsValue::Undefined, args);
        };
        if func.arrow || func.node.generator || func.node.is_async {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                func.name.as_ref().map(|n| n.as_str()).unwrap_or("anonymous")
            )));
        }

        let instance = JsObject::ordinary();
        if let Some(JsValue::Object(proto)) = obj.borrow().get_own("prototype") {
            instance.borrow_mut().prototype = Some(proto);
        }
        let _guard = self.enter_call()?;
        let result = self.call_interpreted(&func, JsValue::Object(instance.cheap_clone()), args)?;
        Ok(match result {
            JsValue::Object(_) => result,
            _ => JsValue::Object(instance),
        })
    }

    /// `value instanceof ctor`
    pub fn instance_of(&self, value: &JsValue, ctor: &JsValue) -> Result<bool, JsError> {
        if !ctor.is_callable() {
            return Err(JsError::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let Some(JsValue::Object(proto)) = ctor.as_object().and_then(|c| c.borrow().get_own("prototype"))
        else {
            return Ok(false);
        };
        let mut current = obj.borrow().prototype.clone();
        while let Some(candidate) = current {
            if Rc::ptr_eq(&candidate, &proto) {
                return Ok(true);
            }
            current = candidate.borrow().prototype.clone();
        }
        Ok(false)
    }

    /// Error object of the named builtin type (`"TypeError"`, ...)
    pub fn create_error(&self, name: &str, message: impl Into<JsString>) -> JsValue {
        let obj = JsObject::ordinary();
        {
            let mut o = obj.borrow_mut();
            o.prototype = self
                .error_prototypes
                .get(name)
                .or_else(|| self.error_prototypes.get("Error"))
                .cloned();
            o.set_property(JsString::from("message"), JsValue::String(message.into()));
        }
        JsValue::Object(obj)
    }

    pub(crate) fn error_prototype(&self, name: &str) -> Option<&JsObjectRef> {
        self.error_prototypes.get(name)
    }

    /// In-language exception value for an engine error
    pub fn error_value(&self, error: &JsError) -> JsValue {
        match error {
            JsError::Thrown(value) => value.clone(),
            JsError::ReferenceError { message }
            | JsError::TypeError { message }
            | JsError::RangeError { message } => {
                self.create_error(error.error_name(), message.as_str())
            }
            other => other.to_value(),
        }
    }

    pub fn enqueue_job(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    /// Keep an engine failure that has no caller to propagate to. Only the
    /// first one is kept until taken.
    pub(crate) fn record_fatal(&self, error: JsError) {
        let mut slot = self.fatal.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub(crate) fn take_fatal(&self) -> Option<JsError> {
        self.fatal.borrow_mut().take()
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.jobs.borrow().is_empty()
    }

    /// Run queued promise reactions until the queue is empty. Jobs queued
    /// while draining run in the same pass.
    pub fn run_jobs(&self) -> Result<(), JsError> {
        let mut ran = 0usize;
        loop {
            let next = self.jobs.borrow_mut().pop_front();
            let Some(job) = next else {
                break;
            };
            builtins::promise::run_reaction(self, job)?;
            ran += 1;
            if let Some(e) = self.take_fatal() {
                return Err(e);
            }
        }
        if ran > 0 {
            debug!(jobs = ran, "drained job queue");
        }
        Ok(())
    }
}
