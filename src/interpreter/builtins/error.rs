//! Error constructor built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::prelude::*;
use crate::value::{CheapClone, JsObject, JsObjectRef, JsString, JsValue, native_function};

/// Error types with their own constructor and prototype
pub const ERROR_TYPES: [&str; 5] = [
    "Error",
    "TypeError",
    "ReferenceError",
    "RangeError",
    "SyntaxError",
];

/// Error.prototype and one prototype per derived type, each carrying its
/// `name` and an empty default `message`
pub fn create_error_prototypes() -> FxHashMap<&'static str, JsObjectRef> {
    let mut prototypes = FxHashMap::default();
    let error_proto = JsObject::ordinary();
    for name in ERROR_TYPES {
        let proto = if name == "Error" {
            error_proto.cheap_clone()
        } else {
            let proto = JsObject::ordinary();
            proto.borrow_mut().prototype = Some(error_proto.cheap_clone());
            proto
        };
        {
            let mut p = proto.borrow_mut();
            p.define_hidden(JsString::from("name"), JsValue::from(name));
            p.define_hidden(JsString::from("message"), JsValue::from(""));
        }
        prototypes.insert(name, proto);
    }
    prototypes
}

/// Constructors for every error type, wired to their prototypes
pub fn create_error_constructors(interp: &Interpreter) -> Vec<(&'static str, JsObjectRef)> {
    ERROR_TYPES
        .iter()
        .filter_map(|&name| {
            let proto = interp.error_prototype(name)?.cheap_clone();
            let ctor = native_function(name, 1, move |interp, _this, args| {
                error_constructor(interp, name, args)
            });
            ctor.borrow_mut()
                .define_hidden(JsString::from("prototype"), JsValue::Object(proto));
            Some((name, ctor))
        })
        .collect()
}

/// `new TypeError(message)` and friends; calling without `new` behaves the same
fn error_constructor(
    interp: &Interpreter,
    name: &str,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let error = interp.create_error(name, "");
    if let (JsValue::Object(obj), Some(message)) = (&error, args.first())
        && !matches!(message, JsValue::Undefined)
    {
        obj.borrow_mut()
            .set_property(JsString::from("message"), JsValue::String(message.to_js_string()));
    }
    Ok(error)
}
