//! JSON built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::value::{JsObject, JsObjectRef, JsValue};

/// Create the JSON namespace object
pub fn create_json_object(interp: &Interpreter) -> JsObjectRef {
    let json = JsObject::ordinary();
    interp.register_method(&json, "stringify", 3, json_stringify);
    interp.register_method(&json, "parse", 1, json_parse);
    json
}

pub fn json_stringify(
    _interp: &Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = args.first().cloned().unwrap_or_default();
    // Values with no JSON form stringify to undefined
    if matches!(value, JsValue::Undefined) || value.is_callable() {
        return Ok(JsValue::Undefined);
    }
    // The replacer argument is not supported; any positive indent pretty-prints
    let pretty = matches!(args.get(2), Some(JsValue::Number(n)) if *n > 0.0);

    let json = value.to_json();
    let output = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|e| JsError::type_error(format!("JSON.stringify failed: {}", e)))?;
    Ok(JsValue::from(output))
}

pub fn json_parse(
    interp: &Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let text = args.first().cloned().unwrap_or_default().to_js_string();
    match serde_json::from_str::<serde_json::Value>(text.as_str()) {
        Ok(json) => Ok(JsValue::from_json(&json)),
        Err(e) => Err(JsError::Thrown(interp.create_error(
            "SyntaxError",
            format!("Unexpected token in JSON: {}", e),
        ))),
    }
}
