//! Functions, closures, `this`, `new` and the call depth limit

use super::{create_test_runtime, eval, eval_err, eval_global, js_num, js_str, prop, thrown_name};
use resumable::ast::build::*;
use resumable::{Config, JsError, JsValue, Runtime};

#[test]
fn test_closure_keeps_captured_binding_alive() {
    // function counter() { var n = 0; return () => ++n; }
    // var c = counter(); c(); c(); c()
    assert_eq!(
        eval(vec![
            func_decl(
                "counter",
                &[],
                vec![
                    var("n", Some(num(0.0))),
                    ret(Some(arrow_expr(&[], update(UpdateOp::Increment, true, ident("n"))))),
                ],
            ),
            var("c", Some(call(ident("counter"), vec![]))),
            expr_stmt(call(ident("c"), vec![])),
            expr_stmt(call(ident("c"), vec![])),
            expr_stmt(call(ident("c"), vec![])),
        ]),
        js_num(3.0)
    );
}

#[test]
fn test_missing_arguments_are_undefined() {
    // function f(a, b) { return b; } f(1)
    assert_eq!(
        eval(vec![
            func_decl("f", &["a", "b"], vec![ret(Some(ident("b")))]),
            expr_stmt(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Undefined
    );
}

#[test]
fn test_arguments_object() {
    // function f() { return arguments.length; } f(1, 2, 3)
    assert_eq!(
        eval(vec![
            func_decl("f", &[], vec![ret(Some(member(ident("arguments"), "length")))]),
            expr_stmt(call(ident("f"), vec![num(1.0), num(2.0), num(3.0)])),
        ]),
        js_num(3.0)
    );
}

#[test]
fn test_method_call_binds_this() {
    // var o = { v: 7, get: function () { return this.v; } }; o.get()
    assert_eq!(
        eval(vec![
            var(
                "o",
                Some(object(vec![
                    ("v", num(7.0)),
                    ("get", func_expr(None, &[], vec![ret(Some(member(this(), "v")))])),
                ])),
            ),
            expr_stmt(call(member(ident("o"), "get"), vec![])),
        ]),
        js_num(7.0)
    );
}

#[test]
fn test_computed_method_call_binds_this() {
    // o["get"]()
    assert_eq!(
        eval(vec![
            var(
                "o",
                Some(object(vec![
                    ("v", num(8.0)),
                    ("get", func_expr(None, &[], vec![ret(Some(member(this(), "v")))])),
                ])),
            ),
            expr_stmt(call(index(ident("o"), string("get")), vec![])),
        ]),
        js_num(8.0)
    );
}

#[test]
fn test_arrow_inherits_this() {
    // var o = { v: 1, run: function () { var f = () => this.v; return f(); } }; o.run()
    assert_eq!(
        eval(vec![
            var(
                "o",
                Some(object(vec![
                    ("v", num(1.0)),
                    (
                        "run",
                        func_expr(
                            None,
                            &[],
                            vec![
                                var("f", Some(arrow_expr(&[], member(this(), "v")))),
                                ret(Some(call(ident("f"), vec![]))),
                            ]
                        )
                    ),
                ])),
            ),
            expr_stmt(call(member(ident("o"), "run"), vec![])),
        ]),
        js_num(1.0)
    );
}

#[test]
fn test_plain_call_has_undefined_this() {
    // function f() { return this; } f()
    assert_eq!(
        eval(vec![
            func_decl("f", &[], vec![ret(Some(this()))]),
            expr_stmt(call(ident("f"), vec![])),
        ]),
        JsValue::Undefined
    );
}

/// `function Point(x) { this.x = x; }`
fn point_ctor() -> Stmt {
    func_decl(
        "Point",
        &["x"],
        vec![expr_stmt(assign(member(this(), "x"), ident("x")))],
    )
}

#[test]
fn test_new_creates_instance() {
    // var p = new Point(3); p.x
    assert_eq!(
        eval(vec![
            point_ctor(),
            var("p", Some(new_expr(ident("Point"), vec![num(3.0)]))),
            expr_stmt(member(ident("p"), "x")),
        ]),
        js_num(3.0)
    );
}

#[test]
fn test_instanceof_follows_prototype() {
    // new Point(1) instanceof Point
    assert_eq!(
        eval(vec![
            point_ctor(),
            expr_stmt(binary(
                BinaryOp::Instanceof,
                new_expr(ident("Point"), vec![num(1.0)]),
                ident("Point"),
            )),
        ]),
        JsValue::Boolean(true)
    );
    // ({}) instanceof Point
    assert_eq!(
        eval(vec![
            point_ctor(),
            expr_stmt(binary(BinaryOp::Instanceof, object(vec![]), ident("Point"))),
        ]),
        JsValue::Boolean(false)
    );
}

#[test]
fn test_prototype_methods_are_inherited() {
    // Point.prototype.double = function () { return this.x * 2; }; new Point(4).double()
    assert_eq!(
        eval(vec![
            point_ctor(),
            expr_stmt(assign(
                member(member(ident("Point"), "prototype"), "double"),
                func_expr(
                    None,
                    &[],
                    vec![ret(Some(binary(BinaryOp::Mul, member(this(), "x"), num(2.0))))]
                ),
            )),
            expr_stmt(call(
                member(new_expr(ident("Point"), vec![num(4.0)]), "double"),
                vec![]
            )),
        ]),
        js_num(8.0)
    );
}

#[test]
fn test_constructor_returning_object_replaces_instance() {
    // function F() { this.a = 1; return { b: 2 }; } var f = new F(); f.b
    assert_eq!(
        eval(vec![
            func_decl(
                "F",
                &[],
                vec![
                    expr_stmt(assign(member(this(), "a"), num(1.0))),
                    ret(Some(object(vec![("b", num(2.0))]))),
                ],
            ),
            expr_stmt(member(new_expr(ident("F"), vec![]), "b")),
        ]),
        js_num(2.0)
    );
}

#[test]
fn test_arrow_is_not_a_constructor() {
    // var A = () => 1; new A()
    let err = eval_err(vec![
        var("A", Some(arrow_expr(&[], num(1.0)))),
        expr_stmt(new_expr(ident("A"), vec![])),
    ]);
    assert_eq!(thrown_name(&err), "TypeError");
}

#[test]
fn test_named_function_expression_sees_itself() {
    // var fact = function me(n) { return n <= 1 ? 1 : n * me(n - 1); }; fact(5)
    assert_eq!(
        eval(vec![
            var(
                "fact",
                Some(func_expr(
                    Some("me"),
                    &["n"],
                    vec![ret(Some(cond(
                        binary(BinaryOp::LtEq, ident("n"), num(1.0)),
                        num(1.0),
                        binary(
                            BinaryOp::Mul,
                            ident("n"),
                            call(ident("me"), vec![binary(BinaryOp::Sub, ident("n"), num(1.0))]),
                        ),
                    )))],
                )),
            ),
            expr_stmt(call(ident("fact"), vec![num(5.0)])),
        ]),
        js_num(120.0)
    );
}

#[test]
fn test_named_function_expression_name_is_local() {
    // var f = function me() {}; typeof me
    assert_eq!(
        eval(vec![
            var("f", Some(func_expr(Some("me"), &[], vec![]))),
            expr_stmt(unary(UnaryOp::Typeof, ident("me"))),
        ]),
        js_str("undefined")
    );
}

#[test]
fn test_declaration_sees_reassigned_name() {
    // function f() { return f; } var g = f; f = 1; g()
    assert_eq!(
        eval(vec![
            func_decl("f", &[], vec![ret(Some(ident("f")))]),
            var("g", Some(ident("f"))),
            expr_stmt(assign(ident("f"), num(1.0))),
            expr_stmt(call(ident("g"), vec![])),
        ]),
        js_num(1.0)
    );
}

#[test]
fn test_named_function_expression_name_is_immutable() {
    // var f = function me() { me = 1; }; f()
    let err = eval_err(vec![
        var(
            "f",
            Some(func_expr(
                Some("me"),
                &[],
                vec![expr_stmt(assign(ident("me"), num(1.0)))],
            )),
        ),
        expr_stmt(call(ident("f"), vec![])),
    ]);
    assert_eq!(thrown_name(&err), "TypeError");
}

#[test]
fn test_function_own_properties_are_not_enumerated() {
    // function f(a) {} f.extra = 1; var keys = ""; for (var k in f) keys += k;
    assert_eq!(
        eval_global(
            vec![
                func_decl("f", &["a"], vec![]),
                expr_stmt(assign(member(ident("f"), "extra"), num(1.0))),
                var("keys", Some(string(""))),
                for_in(
                    var("k", None),
                    ident("f"),
                    expr_stmt(assign_op(AssignmentOp::AddAssign, ident("keys"), ident("k"))),
                ),
            ],
            "keys"
        ),
        js_str("extra")
    );
}

#[test]
fn test_function_name_and_length() {
    // var anon = function (a, b) {}; anon.name + anon.length
    assert_eq!(
        eval(vec![
            var("anon", Some(func_expr(None, &["a", "b"], vec![]))),
            expr_stmt(binary(
                BinaryOp::Add,
                member(ident("anon"), "name"),
                member(ident("anon"), "length"),
            )),
        ]),
        js_str("anon2")
    );
}

#[test]
fn test_calling_non_function_is_type_error() {
    // var x = 1; x()
    let err = eval_err(vec![
        var("x", Some(num(1.0))),
        expr_stmt(call(ident("x"), vec![])),
    ]);
    let JsError::Thrown(value) = &err else {
        panic!("expected a thrown TypeError");
    };
    assert_eq!(prop(value, "name"), js_str("TypeError"));
    assert_eq!(prop(value, "message"), js_str("x is not a function"));
}

#[test]
fn test_calling_missing_method_names_the_member() {
    // var o = {}; o.missing()
    let err = eval_err(vec![
        var("o", Some(object(vec![]))),
        expr_stmt(call(member(ident("o"), "missing"), vec![])),
    ]);
    let JsError::Thrown(value) = &err else {
        panic!("expected a thrown TypeError");
    };
    assert_eq!(prop(value, "message"), js_str("o.missing is not a function"));
}

/// `function r() { return r(); }`
fn runaway() -> Stmt {
    func_decl("r", &[], vec![ret(Some(call(ident("r"), vec![])))])
}

#[test]
fn test_unbounded_recursion_is_range_error() {
    let err = eval_err(vec![runaway(), expr_stmt(call(ident("r"), vec![]))]);
    assert_eq!(thrown_name(&err), "RangeError");
}

#[test]
fn test_recursion_overflow_is_catchable() {
    // var name; try { r(); } catch (e) { name = e.name; }
    assert_eq!(
        eval_global(
            vec![
                runaway(),
                var("name", None),
                try_(
                    vec![expr_stmt(call(ident("r"), vec![]))],
                    Some((
                        Some("e"),
                        vec![expr_stmt(assign(ident("name"), member(ident("e"), "name")))]
                    )),
                    None,
                ),
            ],
            "name"
        ),
        js_str("RangeError")
    );
}

#[test]
fn test_call_depth_is_configurable() {
    // function down(n) { return n == 0 ? 0 : down(n - 1); }
    let body = || {
        vec![
            func_decl(
                "down",
                &["n"],
                vec![ret(Some(cond(
                    binary(BinaryOp::Eq, ident("n"), num(0.0)),
                    num(0.0),
                    call(ident("down"), vec![binary(BinaryOp::Sub, ident("n"), num(1.0))]),
                )))],
            ),
            expr_stmt(call(ident("down"), vec![num(20.0)])),
        ]
    };

    let mut runtime = Runtime::with_config(Config { max_call_depth: 10 });
    assert_eq!(runtime.max_call_depth(), 10);
    let err = runtime.eval(program(body())).unwrap_err();
    assert_eq!(thrown_name(&err), "RangeError");

    runtime.set_max_call_depth(50);
    assert_eq!(runtime.eval(program(body())).unwrap(), js_num(0.0));
}

#[test]
fn test_call_depth_recovers_after_overflow() {
    let mut runtime = create_test_runtime();
    runtime.set_max_call_depth(5);
    let _ = runtime.eval(program(vec![runaway(), expr_stmt(call(ident("r"), vec![]))]));
    // Depth is released on the error path, so a shallow call still works
    let result = runtime
        .eval(program(vec![
            func_decl("one", &[], vec![ret(Some(num(1.0)))]),
            expr_stmt(call(ident("one"), vec![])),
        ]))
        .unwrap();
    assert_eq!(result, js_num(1.0));
}

#[test]
fn test_host_calls_interpreted_function() {
    let mut runtime = create_test_runtime();
    runtime
        .eval(program(vec![func_decl(
            "add",
            &["a", "b"],
            vec![ret(Some(binary(BinaryOp::Add, ident("a"), ident("b"))))],
        )]))
        .unwrap();
    let add = runtime.get_global("add").unwrap().unwrap();
    assert_eq!(
        runtime.call(&add, &[js_num(2.0), js_num(3.0)]).unwrap(),
        js_num(5.0)
    );
}

#[test]
fn test_member_assignment_targets_original_object() {
    // var a = { n: 0 }; var orig = a; a.x = a = { n: 1 };
    let body = || {
        vec![
            var("a", Some(object(vec![("n", num(0.0))]))),
            var("orig", Some(ident("a"))),
            expr_stmt(assign(
                member(ident("a"), "x"),
                assign(ident("a"), object(vec![("n", num(1.0))])),
            )),
        ]
    };
    let mut with_read = body();
    with_read.push(expr_stmt(member(member(ident("orig"), "x"), "n")));
    assert_eq!(eval(with_read), js_num(1.0));

    let mut new_target = body();
    new_target.push(expr_stmt(member(ident("a"), "x")));
    assert_eq!(eval(new_target), JsValue::Undefined);
}
