//! Declarations, hoisting and block scoping

use super::{create_test_runtime, eval, eval_err, eval_global, js_num, js_str, thrown_name};
use resumable::ast::build::*;
use resumable::{JsError, JsValue};

#[test]
fn test_var_redeclaration_reuses_binding() {
    // var a = 123; var a = 321;
    let mut runtime = create_test_runtime();
    runtime
        .eval(program(vec![
            var("a", Some(num(123.0))),
            var("a", Some(num(321.0))),
        ]))
        .unwrap();
    assert_eq!(runtime.get_global("a").unwrap(), Some(js_num(321.0)));
    assert!(runtime.global_scope().has_own("a"));
}

#[test]
fn test_var_without_initializer_keeps_value() {
    // var a = 1; var a; a
    assert_eq!(
        eval(vec![var("a", Some(num(1.0))), var("a", None), expr_stmt(ident("a"))]),
        js_num(1.0)
    );
}

#[test]
fn test_var_is_hoisted_as_undefined() {
    // var seen = typeof later; var later = 1;
    assert_eq!(
        eval_global(
            vec![
                var("seen", Some(unary(UnaryOp::Typeof, ident("later")))),
                var("later", Some(num(1.0))),
            ],
            "seen"
        ),
        js_str("undefined")
    );
}

#[test]
fn test_const_reassignment_is_type_error() {
    // const c = 1; c = 2;
    let err = eval_err(vec![
        const_("c", num(1.0)),
        expr_stmt(assign(ident("c"), num(2.0))),
    ]);
    assert_eq!(thrown_name(&err), "TypeError");
}

#[test]
fn test_let_before_declaration_is_reference_error() {
    // x; let x = 1;
    let err = eval_err(vec![expr_stmt(ident("x")), let_("x", Some(num(1.0)))]);
    assert_eq!(thrown_name(&err), "ReferenceError");
}

#[test]
fn test_let_assignment_before_declaration_is_reference_error() {
    // x = 2; let x = 1;
    let err = eval_err(vec![
        expr_stmt(assign(ident("x"), num(2.0))),
        let_("x", Some(num(1.0))),
    ]);
    assert_eq!(thrown_name(&err), "ReferenceError");
}

#[test]
fn test_let_without_initializer_is_undefined() {
    assert_eq!(
        eval(vec![let_("x", None), expr_stmt(ident("x"))]),
        JsValue::Undefined
    );
}

#[test]
fn test_undeclared_name_is_reference_error() {
    let err = eval_err(vec![expr_stmt(ident("nowhere"))]);
    assert_eq!(thrown_name(&err), "ReferenceError");
    let JsError::Thrown(value) = &err else {
        panic!("expected a thrown error");
    };
    assert_eq!(
        super::prop(value, "message"),
        js_str("nowhere is not defined")
    );
}

#[test]
fn test_assignment_to_undeclared_name_fails() {
    let err = eval_err(vec![expr_stmt(assign(ident("ghost"), num(1.0)))]);
    assert_eq!(thrown_name(&err), "ReferenceError");
}

#[test]
fn test_block_scoping_shadows_outer_let() {
    // let x = 1; { let x = 2; } x
    assert_eq!(
        eval(vec![
            let_("x", Some(num(1.0))),
            block(vec![let_("x", Some(num(2.0)))]),
            expr_stmt(ident("x")),
        ]),
        js_num(1.0)
    );
}

#[test]
fn test_var_in_block_reaches_global() {
    // { var inner = 5; }
    assert_eq!(
        eval_global(vec![block(vec![var("inner", Some(num(5.0)))])], "inner"),
        js_num(5.0)
    );
}

#[test]
fn test_let_in_block_is_invisible_outside() {
    // { let hidden = 1; } hidden
    let err = eval_err(vec![
        block(vec![let_("hidden", Some(num(1.0)))]),
        expr_stmt(ident("hidden")),
    ]);
    assert_eq!(thrown_name(&err), "ReferenceError");
}

#[test]
fn test_function_declaration_visible_before_its_position() {
    // var r = f(); function f() { return 42; }
    assert_eq!(
        eval_global(
            vec![
                var("r", Some(call(ident("f"), vec![]))),
                func_decl("f", &[], vec![ret(Some(num(42.0)))]),
            ],
            "r"
        ),
        js_num(42.0)
    );
}

#[test]
fn test_function_declared_in_block_is_hoisted_to_function() {
    // function outer() { if (true) { function inner() { return 1; } } return inner(); }
    // outer()
    assert_eq!(
        eval(vec![
            func_decl(
                "outer",
                &[],
                vec![
                    if_(
                        boolean(true),
                        block(vec![func_decl("inner", &[], vec![ret(Some(num(1.0)))])]),
                        None
                    ),
                    ret(Some(call(ident("inner"), vec![]))),
                ]
            ),
            expr_stmt(call(ident("outer"), vec![])),
        ]),
        js_num(1.0)
    );
}

#[test]
fn test_loop_closures_capture_each_iteration() {
    // var fns = []; var k = 0;
    // for (let i = 0; i < 3; i++) { fns[k++] = () => i; }
    // fns[0]() + fns[1]() * 10 + fns[2]() * 100
    let result = eval(vec![
        var("fns", Some(array(vec![]))),
        var("k", Some(num(0.0))),
        for_(
            Some(let_("i", Some(num(0.0)))),
            Some(binary(BinaryOp::Lt, ident("i"), num(3.0))),
            Some(update(UpdateOp::Increment, false, ident("i"))),
            block(vec![expr_stmt(assign(
                index(ident("fns"), update(UpdateOp::Increment, false, ident("k"))),
                arrow_expr(&[], ident("i")),
            ))]),
        ),
        expr_stmt(binary(
            BinaryOp::Add,
            binary(
                BinaryOp::Add,
                call(index(ident("fns"), num(0.0)), vec![]),
                binary(BinaryOp::Mul, call(index(ident("fns"), num(1.0)), vec![]), num(10.0)),
            ),
            binary(BinaryOp::Mul, call(index(ident("fns"), num(2.0)), vec![]), num(100.0)),
        )),
    ]);
    assert_eq!(result, js_num(210.0));
}

#[test]
fn test_var_loop_closures_share_binding() {
    // var fns = []; var k = 0;
    // for (var i = 0; i < 3; i++) { fns[k++] = () => i; }
    // fns[0]()
    let result = eval(vec![
        var("fns", Some(array(vec![]))),
        var("k", Some(num(0.0))),
        for_(
            Some(var("i", Some(num(0.0)))),
            Some(binary(BinaryOp::Lt, ident("i"), num(3.0))),
            Some(update(UpdateOp::Increment, false, ident("i"))),
            block(vec![expr_stmt(assign(
                index(ident("fns"), update(UpdateOp::Increment, false, ident("k"))),
                arrow_expr(&[], ident("i")),
            ))]),
        ),
        expr_stmt(call(index(ident("fns"), num(0.0)), vec![])),
    ]);
    assert_eq!(result, js_num(3.0));
}

#[test]
fn test_for_of_let_binding_is_fresh_per_iteration() {
    // var fns = []; var k = 0;
    // for (const v of [1, 2]) { fns[k++] = () => v; }
    // fns[0]() + fns[1]()
    let result = eval(vec![
        var("fns", Some(array(vec![]))),
        var("k", Some(num(0.0))),
        for_of(
            const_("v", undefined()),
            array(vec![num(1.0), num(2.0)]),
            block(vec![expr_stmt(assign(
                index(ident("fns"), update(UpdateOp::Increment, false, ident("k"))),
                arrow_expr(&[], ident("v")),
            ))]),
        ),
        expr_stmt(binary(
            BinaryOp::Add,
            call(index(ident("fns"), num(0.0)), vec![]),
            binary(BinaryOp::Mul, call(index(ident("fns"), num(1.0)), vec![]), num(10.0)),
        )),
    ]);
    assert_eq!(result, js_num(21.0));
}

#[test]
fn test_injected_global_is_visible() {
    let mut runtime = create_test_runtime();
    runtime.set_global("input", js_num(20.0));
    let result = runtime
        .eval(program(vec![expr_stmt(binary(
            BinaryOp::Add,
            ident("input"),
            num(1.0),
        ))]))
        .unwrap();
    assert_eq!(result, js_num(21.0));
}

#[test]
fn test_globals_persist_across_evaluations() {
    let mut runtime = create_test_runtime();
    runtime
        .eval(program(vec![var("count", Some(num(1.0)))]))
        .unwrap();
    let result = runtime
        .eval(program(vec![expr_stmt(update(
            UpdateOp::Increment,
            true,
            ident("count"),
        ))]))
        .unwrap();
    assert_eq!(result, js_num(2.0));
}
