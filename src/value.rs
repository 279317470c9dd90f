//! JavaScript value representation
//!
//! The core JsValue type and related structures for representing values at runtime.
//! Objects are reference counted (`Rc<RefCell<JsObject>>`); there is no tracing
//! collector, so closures that capture their own scope form cycles that live until
//! the process exits.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::ast::Function;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::evaluate::GeneratorDriver;
use crate::interpreter::scope::Scope;
use crate::prelude::*;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data).
///
/// # Examples
/// - `JsObjectRef` (Rc<RefCell<JsObject>>) - cheap clone
/// - `JsString` (Rc<str>) - cheap clone
/// - `Rc<Scope>` - cheap clone
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

// Implement CheapClone for Rc-based types (Rc<RefCell<T>> is covered by this)
impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl CheapClone for JsValue {}

impl JsValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object", // Historical quirk
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Convert to number (ToNumber)
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => parse_number(s.as_str()),
            JsValue::Object(obj) => {
                // Arrays go through their string form like ToPrimitive would
                if matches!(obj.borrow().exotic, ExoticObject::Array(_)) {
                    parse_number(self.to_js_string().as_str())
                } else {
                    f64::NAN
                }
            }
        }
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => {
                let obj = obj.borrow();
                match &obj.exotic {
                    ExoticObject::Array(array) => {
                        let parts: Vec<String> = (0..array.length)
                            .map(|i| obj.array_element(i).unwrap_or_default())
                            .map(|e| {
                                if e.is_null_or_undefined() {
                                    String::new()
                                } else {
                                    e.to_js_string().to_string()
                                }
                            })
                            .collect();
                        JsString::from(parts.join(","))
                    }
                    ExoticObject::Function(func) => JsString::from(format!(
                        "function {}() {{ [code] }}",
                        func.name().map(|n| n.as_str()).unwrap_or("")
                    )),
                    ExoticObject::Promise(_) => JsString::from("[object Promise]"),
                    ExoticObject::Generator(_) => JsString::from("[object Generator]"),
                    ExoticObject::Ordinary => {
                        // Error-like objects render as "Name: message"
                        let name = obj.get_property("name");
                        let message = obj.get_property("message");
                        match (name, message) {
                            (Some(JsValue::String(n)), Some(JsValue::String(m))) => {
                                JsString::from(format!("{}: {}", n, m))
                            }
                            _ => JsString::from("[object Object]"),
                        }
                    }
                }
            }
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN falls out of IEEE comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Loose equality (==)
    pub fn loose_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
            (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => {
                false
            }
            (JsValue::Number(_), JsValue::String(_)) | (JsValue::String(_), JsValue::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (JsValue::Boolean(_), _) => JsValue::Number(self.to_number()).loose_equals(other),
            (_, JsValue::Boolean(_)) => self.loose_equals(&JsValue::Number(other.to_number())),
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_)) => {
                JsValue::String(self.to_js_string()).loose_equals(other)
            }
            (JsValue::Number(_) | JsValue::String(_), JsValue::Object(_)) => {
                self.loose_equals(&JsValue::String(other.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Build a value from JSON data (objects become ordinary objects, arrays become arrays)
    pub fn from_json(json: &serde_json::Value) -> JsValue {
        match json {
            serde_json::Value::Null => JsValue::Null,
            serde_json::Value::Bool(b) => JsValue::Boolean(*b),
            serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => JsValue::from(s.as_str()),
            serde_json::Value::Array(items) => {
                JsValue::Object(JsObject::array(items.iter().map(JsValue::from_json).collect()))
            }
            serde_json::Value::Object(map) => {
                let obj = JsObject::ordinary();
                {
                    let mut o = obj.borrow_mut();
                    for (key, value) in map {
                        o.set_property(JsString::from(key.as_str()), JsValue::from_json(value));
                    }
                }
                JsValue::Object(obj)
            }
        }
    }

    /// Convert plain data to JSON. Functions, promises and `undefined` become `null`;
    /// a cyclic reference is cut off with `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = FxHashSet::default();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut FxHashSet<*const RefCell<JsObject>>) -> serde_json::Value {
        match self {
            JsValue::Undefined | JsValue::Null => serde_json::Value::Null,
            JsValue::Boolean(b) => serde_json::Value::Bool(*b),
            // Integral numbers serialize without a fraction, as JSON.stringify does
            JsValue::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serde_json::Value::Number(serde_json::Number::from(*n as i64))
            }
            JsValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            JsValue::String(s) => serde_json::Value::String(s.to_string()),
            JsValue::Object(obj) => {
                let ptr = Rc::as_ptr(obj);
                if !path.insert(ptr) {
                    return serde_json::Value::Null;
                }
                let o = obj.borrow();
                let json = match &o.exotic {
                    ExoticObject::Array(array) => serde_json::Value::Array(
                        (0..array.length)
                            .map(|i| o.array_element(i).unwrap_or_default().to_json_inner(path))
                            .collect(),
                    ),
                    ExoticObject::Ordinary => {
                        let mut map = serde_json::Map::new();
                        for (key, value) in o.properties.iter() {
                            if value.is_callable() || o.hidden.contains(key) {
                                continue;
                            }
                            map.insert(key.to_string(), value.to_json_inner(path));
                        }
                        serde_json::Value::Object(map)
                    }
                    ExoticObject::Function(_)
                    | ExoticObject::Promise(_)
                    | ExoticObject::Generator(_) => serde_json::Value::Null,
                };
                path.remove(&ptr);
                json
            }
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Parse a numeric string following ToNumber rules for the common cases
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that JavaScript does not
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number to string conversion (Number::toString for radix 10)
pub fn number_to_string(n: f64) -> JsString {
    if n.is_nan() {
        JsString::from("NaN")
    } else if n.is_infinite() {
        if n > 0.0 {
            JsString::from("Infinity")
        } else {
            JsString::from("-Infinity")
        }
    } else if n == 0.0 {
        JsString::from("0")
    } else {
        JsString::from(format_finite(n))
    }
}

/// Number::toString layout for a finite, non-zero `n`: plain decimal when the
/// decimal exponent is in -7 < exp < 21, exponent form otherwise
fn format_finite(n: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e-7"
    let formatted = format!("{:e}", n.abs());
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at_checked(point as usize).unwrap_or((&digits, ""));
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at_checked(1).unwrap_or((&digits, ""));
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if point > 0 { '+' } else { '-' });
        out.push_str(&(point - 1).abs().to_string());
    }
    out
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => match obj.try_borrow() {
                Ok(obj) => match &obj.exotic {
                    ExoticObject::Ordinary => write!(f, "{{...}}"),
                    ExoticObject::Array(array) => write!(f, "Array({})", array.length),
                    ExoticObject::Function(func) => {
                        let name = func.name().map(|n| n.as_str()).unwrap_or("anonymous");
                        write!(f, "[Function: {}]", name)
                    }
                    ExoticObject::Promise(state) => {
                        let status = match state.status {
                            PromiseStatus::Pending => "pending",
                            PromiseStatus::Fulfilled => "fulfilled",
                            PromiseStatus::Rejected => "rejected",
                        };
                        write!(f, "Promise {{{}}}", status)
                    }
                    ExoticObject::Generator(_) => write!(f, "Object [Generator] {{}}"),
                },
                Err(_) => write!(f, "[object <borrowed>]"),
            },
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Reference-counted immutable string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct JsString(Rc<str>);

impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in UTF-16 code units, as `String.prototype.length` reports it
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(Rc::from(s))
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(Rc::from(s))
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &*self.0)
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, other: &JsString) -> Self::Output {
        let mut s = String::with_capacity(self.0.len() + other.0.len());
        s.push_str(&self.0);
        s.push_str(&other.0);
        JsString::from(s)
    }
}

/// Shared handle to a heap object
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// A JavaScript object
#[derive(Debug)]
pub struct JsObject {
    /// Prototype link consulted by property lookups
    pub prototype: Option<JsObjectRef>,
    /// Own properties in insertion order
    pub properties: IndexMap<JsString, JsValue>,
    /// Own keys that `for…in` and JSON output skip
    pub hidden: FxHashSet<JsString>,
    pub exotic: ExoticObject,
}

impl JsObject {
    pub fn new(exotic: ExoticObject) -> Self {
        JsObject {
            prototype: None,
            properties: index_map_new(),
            hidden: FxHashSet::default(),
            exotic,
        }
    }

    /// Allocate an empty ordinary object
    pub fn ordinary() -> JsObjectRef {
        Rc::new(RefCell::new(JsObject::new(ExoticObject::Ordinary)))
    }

    /// Allocate an array object
    pub fn array(elements: Vec<JsValue>) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject::new(ExoticObject::Array(
            ArrayElements::new(elements),
        ))))
    }

    /// Allocate a function object
    pub fn function(func: JsFunction) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject::new(ExoticObject::Function(func))))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.exotic, ExoticObject::Function(_))
    }

    /// Look up an own property, including array elements and `length`
    pub fn get_own(&self, key: &str) -> Option<JsValue> {
        if let ExoticObject::Array(array) = &self.exotic {
            if key == "length" {
                return Some(JsValue::Number(f64::from(array.length)));
            }
            if let Some(index) = array_index(key)
                && let Some(value) = array.dense.get(index as usize)
            {
                return Some(value.clone());
            }
        }
        self.properties.get(key).cloned()
    }

    /// Element `index` of an array: `None` at or past `length`, holes read
    /// as `undefined`
    pub fn array_element(&self, index: u32) -> Option<JsValue> {
        let ExoticObject::Array(array) = &self.exotic else {
            return None;
        };
        if index >= array.length {
            return None;
        }
        Some(match array.dense.get(index as usize) {
            Some(value) => value.clone(),
            None => self
                .properties
                .get(index.to_string().as_str())
                .cloned()
                .unwrap_or_default(),
        })
    }

    /// Look up a property along the prototype chain
    pub fn get_property(&self, key: &str) -> Option<JsValue> {
        if let Some(value) = self.get_own(key) {
            return Some(value);
        }
        let mut current = self.prototype.clone();
        while let Some(proto) = current {
            let proto = proto.borrow();
            if let Some(value) = proto.get_own(key) {
                return Some(value);
            }
            current = proto.prototype.clone();
        }
        None
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    /// Set an own property. Array indices close to the end of the dense
    /// prefix extend it; far-away indices are stored as keyed properties.
    pub fn set_property(&mut self, key: JsString, value: JsValue) {
        let JsObject {
            properties, exotic, ..
        } = self;
        if let ExoticObject::Array(array) = exotic {
            if key == "length" {
                if let Some(len) = array_length(&value) {
                    array.truncate(len, properties);
                }
                return;
            }
            if let Some(index) = array_index(key.as_str()) {
                array.store(index, key, value, properties);
                return;
            }
        }
        properties.insert(key, value);
    }

    /// Set an own property that enumeration skips
    pub fn define_hidden(&mut self, key: JsString, value: JsValue) {
        self.hidden.insert(key.cheap_clone());
        self.set_property(key, value);
    }

    /// Remove an own property. Dense array slots are left as `undefined`.
    pub fn delete_property(&mut self, key: &str) -> bool {
        if let ExoticObject::Array(array) = &mut self.exotic
            && let Some(index) = array_index(key)
            && let Some(slot) = array.dense.get_mut(index as usize)
        {
            *slot = JsValue::Undefined;
            return true;
        }
        self.properties.shift_remove(key);
        self.hidden.remove(key);
        true
    }

    /// Enumerable own keys in for-in order: array indices ascending, then
    /// the remaining properties in insertion order
    pub fn own_keys(&self) -> Vec<JsString> {
        let mut keys = Vec::new();
        let mut named = Vec::new();
        if let ExoticObject::Array(array) = &self.exotic {
            keys.extend((0..array.dense.len()).map(|i| JsString::from(i.to_string())));
            let mut sparse: Vec<(u32, JsString)> = Vec::new();
            for key in self.properties.keys() {
                match array_index(key.as_str()) {
                    Some(index) => sparse.push((index, key.cheap_clone())),
                    None => named.push(key.cheap_clone()),
                }
            }
            sparse.sort_by_key(|(index, _)| *index);
            keys.extend(sparse.into_iter().map(|(_, key)| key));
        } else {
            named.extend(self.properties.keys().cloned());
        }
        keys.extend(named.into_iter().filter(|key| !self.hidden.contains(key)));
        keys
    }
}

impl Default for JsObject {
    fn default() -> Self {
        JsObject::new(ExoticObject::Ordinary)
    }
}

/// Gap past the dense prefix up to which an array write still fills holes
/// instead of going to keyed storage
const DENSE_GAP_LIMIT: usize = 1024;

/// Array storage: a dense prefix plus the logical `length`. Elements beyond
/// the prefix live in the owning object's `properties` under their index key.
#[derive(Debug, Default)]
pub struct ArrayElements {
    pub dense: Vec<JsValue>,
    pub length: u32,
}

impl ArrayElements {
    pub fn new(dense: Vec<JsValue>) -> Self {
        let length = u32::try_from(dense.len()).unwrap_or(u32::MAX);
        ArrayElements { dense, length }
    }

    fn store(
        &mut self,
        index: u32,
        key: JsString,
        value: JsValue,
        sparse: &mut IndexMap<JsString, JsValue>,
    ) {
        let slot = index as usize;
        if slot < self.dense.len() {
            if let Some(element) = self.dense.get_mut(slot) {
                *element = value;
            }
        } else if slot <= self.dense.len() + DENSE_GAP_LIMIT {
            // Pull keyed elements that now fall inside the prefix
            for hole in self.dense.len()..slot {
                let moved = if sparse.is_empty() {
                    None
                } else {
                    sparse.shift_remove(hole.to_string().as_str())
                };
                self.dense.push(moved.unwrap_or_default());
            }
            sparse.shift_remove(key.as_str());
            self.dense.push(value);
        } else {
            sparse.insert(key, value);
        }
        self.length = self.length.max(index + 1);
    }

    fn truncate(&mut self, len: u32, sparse: &mut IndexMap<JsString, JsValue>) {
        self.dense.truncate(len as usize);
        if len < self.length {
            sparse.retain(|key, _| array_index(key.as_str()).is_none_or(|index| index < len));
        }
        self.length = len;
    }
}

/// Canonical array index: decimal digits without leading zeros, below 2^32 - 1
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&index| index != u32::MAX)
}

/// A value usable as an array `length`: an integer in 0..=2^32 - 1
fn array_length(value: &JsValue) -> Option<u32> {
    let len = value.to_number();
    if len.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&len) {
        Some(len as u32)
    } else {
        None
    }
}

/// Object kinds with internal state beyond ordinary properties
#[derive(Debug)]
pub enum ExoticObject {
    Ordinary,
    Array(ArrayElements),
    Function(JsFunction),
    Promise(PromiseState),
    /// Generator object driving a suspended coroutine
    Generator(GeneratorRef),
}

pub type GeneratorRef = Rc<RefCell<GeneratorDriver>>;

/// Internal state of a promise object
#[derive(Debug, Clone)]
pub struct PromiseState {
    pub status: PromiseStatus,
    pub result: JsValue,
    pub handlers: Vec<PromiseHandler>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    Pending,
    Fulfilled,
    Rejected,
}

/// A reaction registered through `then`
#[derive(Debug, Clone)]
pub struct PromiseHandler {
    pub on_fulfilled: Option<JsValue>,
    pub on_rejected: Option<JsValue>,
    /// Promise returned by the `then` call that registered this handler
    pub result_promise: JsObjectRef,
}

/// Callable object payload
#[derive(Debug, Clone)]
pub enum JsFunction {
    /// A closure over an AST function node
    Interpreted(InterpretedFunction),
    /// A host function
    Native(NativeFunction),
}

impl JsFunction {
    pub fn name(&self) -> Option<&JsString> {
        match self {
            JsFunction::Interpreted(f) => f.name.as_ref(),
            JsFunction::Native(f) => Some(&f.name),
        }
    }
}

/// A closure: function node plus the scope it was defined in
#[derive(Debug, Clone)]
pub struct InterpretedFunction {
    pub name: Option<JsString>,
    pub node: Rc<Function>,
    /// Defining scope; every invocation chains a fresh function scope onto it
    pub scope: Rc<Scope>,
    /// Arrow functions take `this` lexically
    pub arrow: bool,
}

/// Host function signature: interpreter, receiver, arguments
pub type NativeFn = Rc<dyn Fn(&Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Wrap a Rust closure as a callable object
pub fn native_function<F>(name: &str, arity: usize, func: F) -> JsObjectRef
where
    F: Fn(&Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError> + 'static,
{
    let obj = JsObject::function(JsFunction::Native(NativeFunction {
        name: JsString::from(name),
        arity,
        func: Rc::new(func),
    }));
    {
        let mut o = obj.borrow_mut();
        o.define_hidden(JsString::from("name"), JsValue::from(name));
        o.define_hidden(JsString::from("length"), JsValue::Number(arity as f64));
    }
    obj
}
