//! Async functions driven through the promise job queue

use std::rc::Rc;

use super::{create_test_runtime, eval, eval_global, js_num, js_str};
use resumable::ast::build::*;
use resumable::ast::{Statement, UnsupportedNode};
use resumable::{JsError, JsValue};
use resumable::interpreter::builtins::promise::promise_state;
use resumable::value::PromiseStatus;

fn async_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    function(Some(name), params, body).asynchronous().decl()
}

/// `Promise.resolve(value)`
fn resolved(value: Expr) -> Expr {
    call(member(ident("Promise"), "resolve"), vec![value])
}

/// `Promise.reject(value)`
fn rejected(value: Expr) -> Expr {
    call(member(ident("Promise"), "reject"), vec![value])
}

/// `promise.then(v => name = v)`
fn capture(promise: Expr, method: &str, name: &str) -> Stmt {
    expr_stmt(call(
        member(promise, method),
        vec![arrow_expr(&["v"], assign(ident(name), ident("v")))],
    ))
}

/// `log += s`
fn append(s: &str) -> Stmt {
    expr_stmt(assign_op(AssignmentOp::AddAssign, ident("log"), string(s)))
}

#[test]
fn test_await_resolved_promise() {
    // async function f() { return await Promise.resolve(5) + 1; }
    // var result; f().then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                async_decl(
                    "f",
                    &[],
                    vec![ret(Some(binary(
                        BinaryOp::Add,
                        await_(resolved(num(5.0))),
                        num(1.0),
                    )))],
                ),
                var("result", None),
                capture(call(ident("f"), vec![]), "then", "result"),
            ],
            "result"
        ),
        js_num(6.0)
    );
}

#[test]
fn test_async_call_returns_promise() {
    // async function f() { return 1; } f() instanceof Promise
    assert_eq!(
        eval(vec![
            async_decl("f", &[], vec![ret(Some(num(1.0)))]),
            expr_stmt(binary(
                BinaryOp::Instanceof,
                call(ident("f"), vec![]),
                ident("Promise"),
            )),
        ]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_await_thenable_defers_to_job_queue() {
    // var log = ""; async function f() { log += "a"; await Promise.resolve(1); log += "b"; }
    // f(); log += "c";
    assert_eq!(
        eval_global(
            vec![
                var("log", Some(string(""))),
                async_decl(
                    "f",
                    &[],
                    vec![
                        append("a"),
                        expr_stmt(await_(resolved(num(1.0)))),
                        append("b"),
                    ],
                ),
                expr_stmt(call(ident("f"), vec![])),
                append("c"),
            ],
            "log"
        ),
        js_str("acb")
    );
}

#[test]
fn test_await_plain_value_resumes_immediately() {
    // var log = ""; async function f() { log += "a"; var v = await 1; log += v; } f(); log += "c";
    assert_eq!(
        eval_global(
            vec![
                var("log", Some(string(""))),
                async_decl(
                    "f",
                    &[],
                    vec![
                        append("a"),
                        var("v", Some(await_(num(1.0)))),
                        expr_stmt(assign_op(AssignmentOp::AddAssign, ident("log"), ident("v"))),
                    ],
                ),
                expr_stmt(call(ident("f"), vec![])),
                append("c"),
            ],
            "log"
        ),
        js_str("a1c")
    );
}

#[test]
fn test_rejection_is_thrown_into_body() {
    // async function f() { try { await Promise.reject("no"); } catch (e) { return "caught " + e; } }
    // var result; f().then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                async_decl(
                    "f",
                    &[],
                    vec![try_(
                        vec![expr_stmt(await_(rejected(string("no"))))],
                        Some((
                            Some("e"),
                            vec![ret(Some(binary(BinaryOp::Add, string("caught "), ident("e"))))]
                        )),
                        None,
                    )],
                ),
                var("result", None),
                capture(call(ident("f"), vec![]), "then", "result"),
            ],
            "result"
        ),
        js_str("caught no")
    );
}

#[test]
fn test_throw_rejects_returned_promise() {
    // async function f() { throw new Error("bad"); }
    // var msg; f().catch(e => msg = e.message);
    assert_eq!(
        eval_global(
            vec![
                async_decl(
                    "f",
                    &[],
                    vec![throw(new_expr(ident("Error"), vec![string("bad")]))],
                ),
                var("msg", None),
                expr_stmt(call(
                    member(call(ident("f"), vec![]), "catch"),
                    vec![arrow_expr(&["e"], assign(ident("msg"), member(ident("e"), "message")))],
                )),
            ],
            "msg"
        ),
        js_str("bad")
    );
}

#[test]
fn test_type_error_rejects_with_error_object() {
    // async function f() { null.x; } var name; f().catch(e => name = e.name);
    assert_eq!(
        eval_global(
            vec![
                async_decl("f", &[], vec![expr_stmt(member(null(), "x"))]),
                var("name", None),
                expr_stmt(call(
                    member(call(ident("f"), vec![]), "catch"),
                    vec![arrow_expr(&["e"], assign(ident("name"), member(ident("e"), "name")))],
                )),
            ],
            "name"
        ),
        js_str("TypeError")
    );
}

fn class_declaration() -> Stmt {
    Rc::new(Statement::Unsupported(UnsupportedNode {
        kind: "ClassDeclaration".to_string(),
    }))
}

#[test]
fn test_unsupported_node_in_async_body_reaches_host() {
    // async function g() { class A {} } var caught; g().catch(e => caught = e);
    let mut runtime = create_test_runtime();
    let result = runtime.eval(program(vec![
        async_decl("g", &[], vec![class_declaration()]),
        var("caught", None),
        capture(call(ident("g"), vec![]), "catch", "caught"),
    ]));
    assert!(matches!(
        result,
        Err(JsError::UnsupportedNode { ref kind }) if kind == "ClassDeclaration"
    ));
    assert_eq!(runtime.get_global("caught").unwrap(), Some(JsValue::Undefined));
}

#[test]
fn test_unsupported_node_after_await_reaches_host() {
    // async function g() { await Promise.resolve(1); class A {} }
    // try { g(); } catch (e) {} g().catch(e => caught = e);
    let mut runtime = create_test_runtime();
    let result = runtime.eval(program(vec![
        async_decl(
            "g",
            &[],
            vec![expr_stmt(await_(resolved(num(1.0)))), class_declaration()],
        ),
        var("caught", None),
        try_(
            vec![capture(call(ident("g"), vec![]), "catch", "caught")],
            Some((Some("e"), vec![])),
            None,
        ),
    ]));
    assert!(matches!(result, Err(JsError::UnsupportedNode { .. })));
    assert_eq!(runtime.get_global("caught").unwrap(), Some(JsValue::Undefined));
}

#[test]
fn test_await_in_loop() {
    // async function sum() { let t = 0; for (let i = 0; i < 3; i++) { t += await Promise.resolve(i); } return t; }
    // var result; sum().then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                async_decl(
                    "sum",
                    &[],
                    vec![
                        let_("t", Some(num(0.0))),
                        for_(
                            Some(let_("i", Some(num(0.0)))),
                            Some(binary(BinaryOp::Lt, ident("i"), num(3.0))),
                            Some(update(UpdateOp::Increment, false, ident("i"))),
                            block(vec![expr_stmt(assign_op(
                                AssignmentOp::AddAssign,
                                ident("t"),
                                await_(resolved(ident("i"))),
                            ))]),
                        ),
                        ret(Some(ident("t"))),
                    ],
                ),
                var("result", None),
                capture(call(ident("sum"), vec![]), "then", "result"),
            ],
            "result"
        ),
        js_num(3.0)
    );
}

#[test]
fn test_await_other_async_function() {
    // async function a() { return 2; } async function b() { return (await a()) * 3; }
    // var result; b().then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                async_decl("a", &[], vec![ret(Some(num(2.0)))]),
                async_decl(
                    "b",
                    &[],
                    vec![ret(Some(binary(
                        BinaryOp::Mul,
                        await_(call(ident("a"), vec![])),
                        num(3.0),
                    )))],
                ),
                var("result", None),
                capture(call(ident("b"), vec![]), "then", "result"),
            ],
            "result"
        ),
        js_num(6.0)
    );
}

#[test]
fn test_await_custom_thenable() {
    // var t = { then: function (resolve) { resolve(9); } };
    // async function f() { return await t; } var result; f().then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                var(
                    "t",
                    Some(object(vec![(
                        "then",
                        func_expr(
                            None,
                            &["resolve"],
                            vec![expr_stmt(call(ident("resolve"), vec![num(9.0)]))]
                        )
                    )])),
                ),
                async_decl("f", &[], vec![ret(Some(await_(ident("t"))))]),
                var("result", None),
                capture(call(ident("f"), vec![]), "then", "result"),
            ],
            "result"
        ),
        js_num(9.0)
    );
}

#[test]
fn test_async_arrow_function() {
    // var f = async (x) => x * 2; var result; f(4).then(v => result = v);
    assert_eq!(
        eval_global(
            vec![
                var(
                    "f",
                    Some(
                        function(
                            None,
                            &["x"],
                            vec![ret(Some(binary(BinaryOp::Mul, ident("x"), num(2.0))))]
                        )
                        .asynchronous()
                        .arrow()
                    ),
                ),
                var("result", None),
                capture(call(ident("f"), vec![num(4.0)]), "then", "result"),
            ],
            "result"
        ),
        js_num(8.0)
    );
}

#[test]
fn test_host_observes_settled_promise() {
    // async function f() { return await Promise.resolve("done"); } var p = f();
    let mut runtime = create_test_runtime();
    runtime
        .eval(program(vec![
            async_decl(
                "f",
                &[],
                vec![ret(Some(await_(resolved(string("done")))))],
            ),
            var("p", Some(call(ident("f"), vec![]))),
        ]))
        .unwrap();
    let Some(JsValue::Object(p)) = runtime.get_global("p").unwrap() else {
        panic!("expected a promise");
    };
    assert_eq!(
        promise_state(&p),
        Some((PromiseStatus::Fulfilled, js_str("done")))
    );
    assert!(!runtime.interpreter().has_pending_jobs());
}
