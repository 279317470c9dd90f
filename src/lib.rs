//! Suspendable tree-walking interpreter for ESTree programs
//!
//! Evaluation runs on an explicit frame stack instead of the host call
//! stack, so a running function can pause at `yield` or `await` and be
//! resumed later. Generators and async functions are built on the same
//! coroutine engine that evaluates ordinary code.
//!
//! # Example
//!
//! ```
//! use resumable::ast::build::*;
//! use resumable::{JsValue, Runtime};
//!
//! // 1 + 2
//! let program = program(vec![expr_stmt(binary(BinaryOp::Add, num(1.0), num(2.0)))]);
//! let mut runtime = Runtime::new();
//! assert_eq!(runtime.eval(program).unwrap(), JsValue::Number(3.0));
//! ```

pub mod ast;
pub mod error;
pub mod hoist;
pub mod interpreter;
pub mod prelude;
pub mod value;

pub use ast::{Program, VariableKind};
pub use error::JsError;
pub use interpreter::evaluate::{GeneratorDriver, IteratorResult};
pub use interpreter::scope::{Scope, ScopeKind, Variable};
pub use interpreter::{Config, Interpreter};
pub use value::CheapClone;
pub use value::JsObject;
pub use value::JsObjectRef;
pub use value::JsString;
pub use value::JsValue;

use std::rc::Rc;

use tracing::debug;

use crate::interpreter::coroutine::Node;
use crate::interpreter::evaluate::evaluate;

/// Embedding entry point: an interpreter plus the global scope programs run in
pub struct Runtime {
    interp: Interpreter,
    global: Rc<Scope>,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let interp = Interpreter::with_config(config);
        let global = Scope::global();
        interp.install_globals(&global);
        Runtime { interp, global }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// The scope top-level declarations land in
    pub fn global_scope(&self) -> &Rc<Scope> {
        &self.global
    }

    /// Bind a host value in the global scope
    pub fn set_global(&mut self, name: &str, value: JsValue) {
        self.global.define(name, value);
    }

    /// Look up a global binding, `None` when it does not exist
    pub fn get_global(&self, name: &str) -> Result<Option<JsValue>, JsError> {
        self.global.get(name).map(|var| var.get()).transpose()
    }

    /// Evaluate a program in the global scope and return its completion
    /// value. Hoisting runs first when the program has not been hoisted yet,
    /// and pending promise jobs are drained before returning.
    pub fn eval(&mut self, mut program: Program) -> Result<JsValue, JsError> {
        if program.hoisting.is_none() {
            hoist::hoist_program(&mut program);
        }
        let node = Node::Program(Rc::new(program));
        let value = evaluate(&self.interp, node, self.global.cheap_clone())?;
        self.run_jobs()?;
        Ok(value)
    }

    /// Evaluate an ESTree JSON document
    pub fn eval_json(&mut self, source: &str) -> Result<JsValue, JsError> {
        let program = Program::from_json(source)?;
        self.eval(program)
    }

    /// Evaluate a program as a module: a global `module = { exports: {} }`
    /// binding is installed first and `module.exports` is returned.
    pub fn run(&mut self, program: Program) -> Result<JsValue, JsError> {
        let module = JsObject::ordinary();
        module.borrow_mut().set_property(
            JsString::from("exports"),
            JsValue::Object(JsObject::ordinary()),
        );
        self.set_global("module", JsValue::Object(module.cheap_clone()));
        self.eval(program)?;
        let exports = module.borrow().get_own("exports").unwrap_or_default();
        debug!(exports = exports.type_of(), "module evaluated");
        Ok(exports)
    }

    /// Drain the promise job queue
    pub fn run_jobs(&mut self) -> Result<(), JsError> {
        self.interp.run_jobs()
    }

    /// Call a function value from the host, then drain pending jobs
    pub fn call(&mut self, func: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let result = self.interp.call_function(func, JsValue::Undefined, args)?;
        self.run_jobs()?;
        Ok(result)
    }

    /// Maximum depth of nested interpreted calls before a RangeError
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.interp.set_max_call_depth(depth);
    }

    pub fn max_call_depth(&self) -> usize {
        self.interp.config().max_call_depth
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
