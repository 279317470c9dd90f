//! Integration tests for the interpreter, organized by feature
//!
//! Programs are assembled with `resumable::ast::build` (or loaded from ESTree
//! JSON in `estree`) and run through the public `Runtime` API.
//!
//! Set `RUST_LOG=resumable=trace` to see frame-level tracing while a test runs.

mod async_await;
mod error;
mod estree;
mod function;
mod scope;

use resumable::ast::build::{Stmt, program};
use resumable::{JsError, JsValue, Runtime};

/// Install a test subscriber once so `RUST_LOG` works in tests
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn create_test_runtime() -> Runtime {
    init_tracing();
    Runtime::new()
}

/// Evaluate a program and return its completion value
pub fn eval(body: Vec<Stmt>) -> JsValue {
    let mut runtime = create_test_runtime();
    runtime.eval(program(body)).unwrap()
}

/// Evaluate a program that is expected to fail
pub fn eval_err(body: Vec<Stmt>) -> JsError {
    let mut runtime = create_test_runtime();
    match runtime.eval(program(body)) {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(e) => e,
    }
}

/// Evaluate a program, then read a global binding
pub fn eval_global(body: Vec<Stmt>, name: &str) -> JsValue {
    let mut runtime = create_test_runtime();
    runtime.eval(program(body)).unwrap();
    runtime.get_global(name).unwrap().unwrap_or_default()
}

/// Property of an object value, following the prototype chain
pub fn prop(value: &JsValue, key: &str) -> JsValue {
    match value {
        JsValue::Object(obj) => obj.borrow().get_property(key).unwrap_or_default(),
        other => panic!("expected an object, got {:?}", other),
    }
}

/// `name` of an uncaught in-language error
pub fn thrown_name(error: &JsError) -> String {
    match error {
        JsError::Thrown(value) => prop(value, "name").to_js_string().to_string(),
        other => panic!("expected a thrown value, got {:?}", other),
    }
}

pub fn js_num(n: f64) -> JsValue {
    JsValue::Number(n)
}

pub fn js_str(s: &str) -> JsValue {
    JsValue::from(s)
}
