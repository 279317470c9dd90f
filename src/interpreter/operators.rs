//! Value-level operations shared by the state machines: operators, property
//! access and iteration.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::coroutine::IterSource;
use crate::prelude::*;
use crate::value::{CheapClone, ExoticObject, JsObject, JsString, JsValue};

/// Apply a binary operator to two evaluated operands
pub fn binary(
    interp: &Interpreter,
    op: BinaryOp,
    left: &JsValue,
    right: &JsValue,
) -> Result<JsValue, JsError> {
    let value = match op {
        BinaryOp::Add => return Ok(add(left, right)),
        BinaryOp::Sub => JsValue::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => JsValue::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => JsValue::Number(left.to_number() / right.to_number()),
        // f64 remainder keeps the dividend's sign, like JS
        BinaryOp::Mod => JsValue::Number(left.to_number() % right.to_number()),
        BinaryOp::Exp => JsValue::Number(power(left.to_number(), right.to_number())),

        BinaryOp::Eq => JsValue::Boolean(left.loose_equals(right)),
        BinaryOp::NotEq => JsValue::Boolean(!left.loose_equals(right)),
        BinaryOp::StrictEq => JsValue::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEq => JsValue::Boolean(!left.strict_equals(right)),
        BinaryOp::Lt => JsValue::Boolean(compare(left, right, |o| o.is_lt())),
        BinaryOp::LtEq => JsValue::Boolean(compare(left, right, |o| o.is_le())),
        BinaryOp::Gt => JsValue::Boolean(compare(left, right, |o| o.is_gt())),
        BinaryOp::GtEq => JsValue::Boolean(compare(left, right, |o| o.is_ge())),

        BinaryOp::BitAnd => int32_result(to_int32(left) & to_int32(right)),
        BinaryOp::BitOr => int32_result(to_int32(left) | to_int32(right)),
        BinaryOp::BitXor => int32_result(to_int32(left) ^ to_int32(right)),
        BinaryOp::LShift => int32_result(to_int32(left).wrapping_shl(shift_count(right))),
        BinaryOp::RShift => int32_result(to_int32(left).wrapping_shr(shift_count(right))),
        BinaryOp::URShift => {
            JsValue::Number(f64::from(to_uint32(left).wrapping_shr(shift_count(right))))
        }

        BinaryOp::In => {
            let JsValue::Object(obj) = right else {
                return Err(JsError::type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    left.to_js_string(),
                    right.to_js_string()
                )));
            };
            let key = to_property_key(left);
            JsValue::Boolean(obj.borrow().has_property(key.as_str()))
        }
        BinaryOp::Instanceof => JsValue::Boolean(interp.instance_of(left, right)?),
    };
    Ok(value)
}

fn add(left: &JsValue, right: &JsValue) -> JsValue {
    let concatenates = |v: &JsValue| matches!(v, JsValue::String(_) | JsValue::Object(_));
    if concatenates(left) || concatenates(right) {
        JsValue::String(left.to_js_string() + &right.to_js_string())
    } else {
        JsValue::Number(left.to_number() + right.to_number())
    }
}

fn power(base: f64, exponent: f64) -> f64 {
    // powf treats 1 ** NaN and 1 ** ±Infinity as 1; JS says NaN
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// Relational comparison: strings compare by code point, everything else
/// numerically. Any NaN makes the comparison false.
fn compare<F>(left: &JsValue, right: &JsValue, accept: F) -> bool
where
    F: Fn(std::cmp::Ordering) -> bool,
{
    if let (JsValue::String(a), JsValue::String(b)) = (left, right) {
        return accept(a.as_str().cmp(b.as_str()));
    }
    left.to_number()
        .partial_cmp(&right.to_number())
        .is_some_and(accept)
}

fn int32_result(n: i32) -> JsValue {
    JsValue::Number(f64::from(n))
}

fn shift_count(value: &JsValue) -> u32 {
    to_uint32(value) & 0x1f
}

/// ToUint32
pub fn to_uint32(value: &JsValue) -> u32 {
    let n = value.to_number();
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc() % 4_294_967_296.0;
    let modulo = if modulo < 0.0 {
        modulo + 4_294_967_296.0
    } else {
        modulo
    };
    modulo as u32
}

/// ToInt32
pub fn to_int32(value: &JsValue) -> i32 {
    to_uint32(value) as i32
}

/// Apply a unary operator other than `delete`, which needs the operand's reference
pub fn unary(op: UnaryOp, value: &JsValue) -> Result<JsValue, JsError> {
    Ok(match op {
        UnaryOp::Minus => JsValue::Number(-value.to_number()),
        UnaryOp::Plus => JsValue::Number(value.to_number()),
        UnaryOp::Not => JsValue::Boolean(!value.to_boolean()),
        UnaryOp::BitNot => int32_result(!to_int32(value)),
        UnaryOp::Typeof => JsValue::from(value.type_of()),
        UnaryOp::Void => JsValue::Undefined,
        UnaryOp::Delete => return Err(JsError::internal_error("delete needs a reference")),
    })
}

/// ToPropertyKey for the supported value types
pub fn to_property_key(value: &JsValue) -> JsString {
    value.to_js_string()
}

/// `object[key]`
pub fn get_member(object: &JsValue, key: &JsString) -> Result<JsValue, JsError> {
    match object {
        JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            object.to_js_string(),
            key
        ))),
        JsValue::Object(obj) => Ok(obj.borrow().get_property(key.as_str()).unwrap_or_default()),
        JsValue::String(s) => Ok(string_member(s, key)),
        JsValue::Boolean(_) | JsValue::Number(_) => Ok(JsValue::Undefined),
    }
}

fn string_member(s: &JsString, key: &JsString) -> JsValue {
    if *key == "length" {
        return JsValue::Number(s.utf16_len() as f64);
    }
    let Ok(index) = key.as_str().parse::<usize>() else {
        return JsValue::Undefined;
    };
    s.as_str()
        .encode_utf16()
        .nth(index)
        .map(|unit| JsValue::from(String::from_utf16_lossy(&[unit])))
        .unwrap_or_default()
}

/// `object[key] = value`. Writes to primitives are silently dropped.
pub fn set_member(object: &JsValue, key: JsString, value: JsValue) -> Result<(), JsError> {
    match object {
        JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            object.to_js_string(),
            key
        ))),
        JsValue::Object(obj) => {
            obj.borrow_mut().set_property(key, value);
            Ok(())
        }
        JsValue::Boolean(_) | JsValue::Number(_) | JsValue::String(_) => Ok(()),
    }
}

/// `delete object[key]`
pub fn delete_member(object: &JsValue, key: &JsString) -> Result<bool, JsError> {
    match object {
        JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
            "Cannot convert {} to object",
            object.to_js_string()
        ))),
        JsValue::Object(obj) => Ok(obj.borrow_mut().delete_property(key.as_str())),
        _ => Ok(true),
    }
}

/// Keys a `for…in` loop visits: own keys first, then inherited ones not
/// already seen. Strings enumerate their indices; other primitives nothing.
pub fn enumerate_keys(value: &JsValue) -> Vec<JsValue> {
    match value {
        JsValue::Object(obj) => {
            let mut seen = FxHashSet::default();
            let mut keys = Vec::new();
            let mut current = Some(obj.cheap_clone());
            while let Some(object) = current {
                let object = object.borrow();
                for key in object.own_keys() {
                    if seen.insert(key.cheap_clone()) {
                        keys.push(JsValue::String(key));
                    }
                }
                current = object.prototype.clone();
            }
            keys
        }
        JsValue::String(s) => (0..s.utf16_len())
            .map(|i| JsValue::from(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// One step of an iteration
#[derive(Debug)]
pub enum IterStep {
    Item(JsValue),
    /// Exhausted; carries the iterator's return value
    Done(JsValue),
}

impl IterSource {
    /// Source for `for…in`
    pub fn keys(value: &JsValue) -> IterSource {
        IterSource::Values {
            values: enumerate_keys(value),
            index: 0,
        }
    }

    /// Source for `for…of` and `yield*`: arrays, strings, or any object with
    /// a callable `next` (generators included)
    pub fn values(value: &JsValue) -> Result<IterSource, JsError> {
        match value {
            JsValue::Object(obj) => {
                if matches!(obj.borrow().exotic, ExoticObject::Array(_)) {
                    return Ok(IterSource::Array {
                        array: obj.cheap_clone(),
                        index: 0,
                    });
                }
                let next = obj.borrow().get_property("next");
                if next.is_some_and(|n| n.is_callable()) {
                    return Ok(IterSource::Iterator {
                        iterator: value.clone(),
                    });
                }
                Err(not_iterable(value))
            }
            JsValue::String(s) => {
                // Iteration walks code points, not UTF-16 units
                let values = s
                    .as_str()
                    .chars()
                    .map(|c| JsValue::from(c.to_string()))
                    .collect();
                Ok(IterSource::Values { values, index: 0 })
            }
            _ => Err(not_iterable(value)),
        }
    }

    /// Fetch the next item. `sent` is forwarded to iterator objects' `next`.
    pub fn advance(&mut self, interp: &Interpreter, sent: JsValue) -> Result<IterStep, JsError> {
        match self {
            IterSource::Array { array, index } => {
                // Length is re-read every step so pushes during the loop are seen
                let item = u32::try_from(*index)
                    .ok()
                    .and_then(|i| array.borrow().array_element(i));
                *index += 1;
                Ok(item.map_or(IterStep::Done(JsValue::Undefined), IterStep::Item))
            }
            IterSource::Values { values, index } => {
                let item = values.get(*index).cloned();
                *index += 1;
                Ok(item.map_or(IterStep::Done(JsValue::Undefined), IterStep::Item))
            }
            IterSource::Iterator { iterator } => {
                let next = get_member(iterator, &JsString::from("next"))?;
                let result = interp.call_function(&next, iterator.clone(), &[sent])?;
                if !matches!(result, JsValue::Object(_)) {
                    return Err(JsError::type_error(format!(
                        "Iterator result {} is not an object",
                        result.to_js_string()
                    )));
                }
                let done = get_member(&result, &JsString::from("done"))?.to_boolean();
                let value = get_member(&result, &JsString::from("value"))?;
                Ok(if done {
                    IterStep::Done(value)
                } else {
                    IterStep::Item(value)
                })
            }
        }
    }
}

fn not_iterable(value: &JsValue) -> JsError {
    JsError::type_error(format!("{} is not iterable", value.to_js_string()))
}

/// Create an `{ value, done }` iterator result object
pub fn iterator_result(value: JsValue, done: bool) -> JsValue {
    let obj = JsObject::ordinary();
    {
        let mut o = obj.borrow_mut();
        o.set_property(JsString::from("value"), value);
        o.set_property(JsString::from("done"), JsValue::Boolean(done));
    }
    JsValue::Object(obj)
}
