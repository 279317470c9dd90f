//! Error constructors and in-language error values

use super::{eval, eval_err, eval_global, js_str, prop, thrown_name};
use resumable::ast::build::*;
use resumable::{JsError, JsValue};

#[test]
fn test_error_constructor_sets_message() {
    // var e = new Error("boom"); e.message
    assert_eq!(
        eval(vec![
            var("e", Some(new_expr(ident("Error"), vec![string("boom")]))),
            expr_stmt(member(ident("e"), "message")),
        ]),
        js_str("boom")
    );
}

#[test]
fn test_error_without_message_is_empty() {
    assert_eq!(
        eval(vec![expr_stmt(member(
            new_expr(ident("Error"), vec![]),
            "message"
        ))]),
        js_str("")
    );
}

#[test]
fn test_error_string_conversion() {
    // "" + new TypeError("bad")
    assert_eq!(
        eval(vec![expr_stmt(binary(
            BinaryOp::Add,
            string(""),
            new_expr(ident("TypeError"), vec![string("bad")]),
        ))]),
        js_str("TypeError: bad")
    );
}

#[test]
fn test_derived_errors_are_instances_of_error() {
    // var e = new RangeError("r"); (e instanceof RangeError) && (e instanceof Error)
    assert_eq!(
        eval(vec![
            var("e", Some(new_expr(ident("RangeError"), vec![string("r")]))),
            expr_stmt(logical(
                LogicalOp::And,
                binary(BinaryOp::Instanceof, ident("e"), ident("RangeError")),
                binary(BinaryOp::Instanceof, ident("e"), ident("Error")),
            )),
        ]),
        JsValue::Boolean(true)
    );
    // new TypeError() instanceof RangeError
    assert_eq!(
        eval(vec![expr_stmt(binary(
            BinaryOp::Instanceof,
            new_expr(ident("TypeError"), vec![]),
            ident("RangeError"),
        ))]),
        JsValue::Boolean(false)
    );
}

#[test]
fn test_engine_errors_match_constructors() {
    // var ok; try { undefinedName; } catch (e) { ok = e instanceof ReferenceError; }
    assert_eq!(
        eval_global(
            vec![
                var("ok", None),
                try_(
                    vec![expr_stmt(ident("undefinedName"))],
                    Some((
                        Some("e"),
                        vec![expr_stmt(assign(
                            ident("ok"),
                            binary(BinaryOp::Instanceof, ident("e"), ident("ReferenceError")),
                        ))]
                    )),
                    None,
                ),
            ],
            "ok"
        ),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_any_value_can_be_thrown() {
    // throw { code: 7 };
    let err = eval_err(vec![throw(object(vec![("code", num(7.0))]))]);
    let JsError::Thrown(value) = &err else {
        panic!("expected a thrown object");
    };
    assert_eq!(prop(value, "code"), JsValue::Number(7.0));

    let err = eval_err(vec![throw(string("plain"))]);
    assert!(matches!(err, JsError::Thrown(JsValue::String(ref s)) if s.as_str() == "plain"));
}

#[test]
fn test_instanceof_non_callable_is_type_error() {
    let err = eval_err(vec![expr_stmt(binary(
        BinaryOp::Instanceof,
        object(vec![]),
        num(1.0),
    ))]);
    assert_eq!(thrown_name(&err), "TypeError");
}

#[test]
fn test_error_display() {
    let err = JsError::type_error("x is not a function");
    assert_eq!(err.to_string(), "TypeError: x is not a function");
    assert!(err.is_catchable());
    assert!(!JsError::unsupported("ClassDeclaration").is_catchable());
}
