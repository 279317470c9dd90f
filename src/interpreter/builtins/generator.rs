//! Generator objects: `next`, `return` and `throw` on Generator.prototype

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::coroutine::Node;
use crate::interpreter::evaluate::{GeneratorDriver, IteratorResult};
use crate::interpreter::operators::iterator_result;
use crate::interpreter::scope::Scope;
use crate::value::{CheapClone, ExoticObject, GeneratorRef, JsObject, JsValue};

/// Initialize Generator.prototype with next, return, throw methods
pub fn init_generator_prototype(interp: &Interpreter) {
    let proto = interp.generator_prototype.cheap_clone();

    interp.register_method(&proto, "next", 1, |interp, this, args| {
        let driver = this_generator(&this, "next")?;
        let value = args.first().cloned().unwrap_or_default();
        with_driver(&driver, |d| d.next(interp, value))
    });
    interp.register_method(&proto, "return", 1, |interp, this, args| {
        let driver = this_generator(&this, "return")?;
        let value = args.first().cloned().unwrap_or_default();
        with_driver(&driver, |d| d.return_(interp, value))
    });
    interp.register_method(&proto, "throw", 1, |interp, this, args| {
        let driver = this_generator(&this, "throw")?;
        let exception = args.first().cloned().unwrap_or_default();
        with_driver(&driver, |d| d.throw(interp, exception))
    });
}

/// Generator object for a generator function body, suspended before its
/// first statement
pub fn create_generator(interp: &Interpreter, body: Node, scope: Rc<Scope>) -> JsValue {
    let driver = Rc::new(RefCell::new(GeneratorDriver::new(body, scope)));
    let obj = JsObject::ordinary();
    {
        let mut o = obj.borrow_mut();
        o.prototype = Some(interp.generator_prototype.cheap_clone());
        o.exotic = ExoticObject::Generator(driver);
    }
    JsValue::Object(obj)
}

fn this_generator(this: &JsValue, method: &str) -> Result<GeneratorRef, JsError> {
    if let JsValue::Object(obj) = this
        && let ExoticObject::Generator(driver) = &obj.borrow().exotic
    {
        return Ok(driver.cheap_clone());
    }
    Err(JsError::type_error(format!(
        "{} method called on incompatible receiver {}",
        method,
        this.to_js_string()
    )))
}

fn with_driver<F>(driver: &GeneratorRef, f: F) -> Result<JsValue, JsError>
where
    F: FnOnce(&mut GeneratorDriver) -> Result<IteratorResult, JsError>,
{
    // A generator that resumes itself finds its driver already borrowed
    let mut d = driver
        .try_borrow_mut()
        .map_err(|_| JsError::type_error("Generator is already running"))?;
    let result = f(&mut d)?;
    Ok(iterator_result(result.value, result.done))
}
