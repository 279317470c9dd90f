//! Error types for the interpreter

use thiserror::Error;

use crate::value::{JsObject, JsString, JsValue};

/// Main error type for the interpreter
///
/// The first four variants are catchable: the step dispatcher converts them into an
/// in-language exception value. The rest are engine failures that abort evaluation
/// and reach the caller of the driver unchanged.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("ReferenceError: {message}")]
    ReferenceError { message: String },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    /// A value raised by a `throw` statement (or a rejected promise) that nothing caught
    #[error("Uncaught {}", describe_thrown(.0))]
    Thrown(JsValue),

    /// The dispatcher has no state machine for this node kind
    #[error("Unsupported node: {kind}")]
    UnsupportedNode { kind: String },

    /// ESTree input that could not be loaded
    #[error("Invalid AST: {message}")]
    InvalidAst { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn describe_thrown(value: &JsValue) -> String {
    value.to_js_string().to_string()
}

impl JsError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        JsError::ReferenceError {
            message: message.into(),
        }
    }

    /// ReferenceError for a name with no binding in scope
    pub fn not_defined(name: &str) -> Self {
        JsError::ReferenceError {
            message: format!("{} is not defined", name),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        JsError::UnsupportedNode { kind: kind.into() }
    }

    pub fn invalid_ast(message: impl Into<String>) -> Self {
        JsError::InvalidAst {
            message: message.into(),
        }
    }

    /// Create an internal error for unexpected interpreter states
    /// These should never happen in correctly-written code
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal {
            message: message.into(),
        }
    }

    pub fn thrown(value: JsValue) -> Self {
        JsError::Thrown(value)
    }

    /// Whether in-language `try`/`catch` can observe this error
    pub fn is_catchable(&self) -> bool {
        matches!(
            self,
            JsError::ReferenceError { .. }
                | JsError::TypeError { .. }
                | JsError::RangeError { .. }
                | JsError::Thrown(_)
        )
    }

    /// Name of the in-language error constructor for this failure
    pub fn error_name(&self) -> &'static str {
        match self {
            JsError::ReferenceError { .. } => "ReferenceError",
            JsError::TypeError { .. } => "TypeError",
            JsError::RangeError { .. } => "RangeError",
            _ => "Error",
        }
    }

    /// Extract the in-language exception value.
    ///
    /// Thrown values come back as-is. Other variants become a plain object with
    /// `name` and `message`; the interpreter attaches the matching prototype when it
    /// has one (see `Interpreter::error_value`).
    pub fn to_value(&self) -> JsValue {
        let message = match self {
            JsError::Thrown(value) => return value.clone(),
            JsError::ReferenceError { message }
            | JsError::TypeError { message }
            | JsError::RangeError { message }
            | JsError::InvalidAst { message }
            | JsError::Internal { message } => message.clone(),
            JsError::UnsupportedNode { kind } => format!("unsupported node {}", kind),
        };
        let obj = JsObject::ordinary();
        {
            let mut o = obj.borrow_mut();
            o.set_property(JsString::from("name"), JsValue::from(self.error_name()));
            o.set_property(JsString::from("message"), JsValue::from(message));
        }
        JsValue::Object(obj)
    }
}
