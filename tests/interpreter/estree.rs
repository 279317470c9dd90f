//! Loading programs from ESTree JSON

use super::{create_test_runtime, js_num, js_str};
use resumable::{JsError, JsValue, Program};
use serde_json::json;

fn ident(name: &str) -> serde_json::Value {
    json!({ "type": "Identifier", "name": name })
}

fn lit(value: serde_json::Value) -> serde_json::Value {
    json!({ "type": "Literal", "value": value, "raw": value.to_string() })
}

fn expr_stmt(expression: serde_json::Value) -> serde_json::Value {
    json!({ "type": "ExpressionStatement", "expression": expression })
}

fn class_decl() -> serde_json::Value {
    json!({
        "type": "ClassDeclaration",
        "id": ident("A"),
        "superClass": null,
        "body": { "type": "ClassBody", "body": [] }
    })
}

fn eval_json(program: serde_json::Value) -> Result<JsValue, JsError> {
    let mut runtime = create_test_runtime();
    runtime.eval_json(&program.to_string())
}

#[test]
fn test_program_from_estree() {
    // function add(a, b) { return a + b; }
    // var total = 0;
    // for (let i = 0; i < 4; i++) { total += add(i, 1); }
    // total
    let program = json!({
        "type": "Program",
        "sourceType": "script",
        "body": [
            {
                "type": "FunctionDeclaration",
                "id": ident("add"),
                "params": [ident("a"), ident("b")],
                "generator": false,
                "async": false,
                "body": {
                    "type": "BlockStatement",
                    "body": [{
                        "type": "ReturnStatement",
                        "argument": {
                            "type": "BinaryExpression",
                            "operator": "+",
                            "left": ident("a"),
                            "right": ident("b")
                        }
                    }]
                }
            },
            {
                "type": "VariableDeclaration",
                "kind": "var",
                "declarations": [{ "type": "VariableDeclarator", "id": ident("total"), "init": lit(json!(0)) }]
            },
            {
                "type": "ForStatement",
                "init": {
                    "type": "VariableDeclaration",
                    "kind": "let",
                    "declarations": [{ "type": "VariableDeclarator", "id": ident("i"), "init": lit(json!(0)) }]
                },
                "test": { "type": "BinaryExpression", "operator": "<", "left": ident("i"), "right": lit(json!(4)) },
                "update": { "type": "UpdateExpression", "operator": "++", "prefix": false, "argument": ident("i") },
                "body": {
                    "type": "BlockStatement",
                    "body": [expr_stmt(json!({
                        "type": "AssignmentExpression",
                        "operator": "+=",
                        "left": ident("total"),
                        "right": {
                            "type": "CallExpression",
                            "callee": ident("add"),
                            "arguments": [ident("i"), lit(json!(1))],
                            "optional": false
                        }
                    }))]
                }
            },
            expr_stmt(ident("total"))
        ]
    });
    assert_eq!(eval_json(program).unwrap(), js_num(10.0));
}

#[test]
fn test_arrow_with_expression_body() {
    // ((x) => x + "!")("hi")
    let program = json!({
        "type": "Program",
        "body": [expr_stmt(json!({
            "type": "CallExpression",
            "callee": {
                "type": "ArrowFunctionExpression",
                "id": null,
                "params": [ident("x")],
                "expression": true,
                "body": { "type": "BinaryExpression", "operator": "+", "left": ident("x"), "right": lit(json!("!")) }
            },
            "arguments": [lit(json!("hi"))]
        }))]
    });
    assert_eq!(eval_json(program).unwrap(), js_str("hi!"));
}

#[test]
fn test_literals() {
    // [null, true, 1.5, "s", this]
    let program = json!({
        "type": "Program",
        "body": [expr_stmt(json!({
            "type": "ArrayExpression",
            "elements": [lit(json!(null)), lit(json!(true)), lit(json!(1.5)), lit(json!("s")), { "type": "ThisExpression" }]
        }))]
    });
    let value = eval_json(program).unwrap();
    assert_eq!(value.to_json(), json!([null, true, 1.5, "s", null]));
}

#[test]
fn test_unsupported_node_fails_when_reached() {
    let program = json!({ "type": "Program", "body": [class_decl()] });
    let err = eval_json(program).unwrap_err();
    assert!(matches!(err, JsError::UnsupportedNode { ref kind } if kind == "ClassDeclaration"));
    assert_eq!(err.to_string(), "Unsupported node: ClassDeclaration");
}

#[test]
fn test_unsupported_expression_names_its_type() {
    // a template literal
    let program = json!({
        "type": "Program",
        "body": [expr_stmt(json!({ "type": "TemplateLiteral", "quasis": [], "expressions": [] }))]
    });
    assert!(matches!(
        eval_json(program),
        Err(JsError::UnsupportedNode { ref kind }) if kind == "TemplateLiteral"
    ));
}

#[test]
fn test_destructuring_pattern_loads_and_fails_when_bound() {
    // function f({ a }) { return a; } var ok = 1; f({ a: 2 })
    let object_pattern = json!({
        "type": "ObjectPattern",
        "properties": [{
            "type": "Property",
            "key": ident("a"),
            "value": ident("a"),
            "kind": "init",
            "computed": false,
            "method": false,
            "shorthand": true
        }]
    });
    let function = json!({
        "type": "FunctionDeclaration",
        "id": ident("f"),
        "params": [object_pattern],
        "body": { "type": "BlockStatement", "body": [{ "type": "ReturnStatement", "argument": ident("a") }] }
    });
    let declare_ok = json!({
        "type": "VariableDeclaration",
        "kind": "var",
        "declarations": [{ "type": "VariableDeclarator", "id": ident("ok"), "init": lit(json!(1)) }]
    });
    let call_f = expr_stmt(json!({
        "type": "CallExpression",
        "callee": ident("f"),
        "arguments": [{ "type": "ObjectExpression", "properties": [] }]
    }));

    // Never called: the program runs
    let program = json!({ "type": "Program", "body": [function.clone(), declare_ok.clone()] });
    let mut runtime = create_test_runtime();
    runtime.eval_json(&program.to_string()).unwrap();
    assert_eq!(runtime.get_global("ok").unwrap(), Some(js_num(1.0)));

    let program = json!({ "type": "Program", "body": [function, declare_ok, call_f] });
    assert!(matches!(
        eval_json(program),
        Err(JsError::UnsupportedNode { ref kind }) if kind == "ObjectPattern"
    ));
}

#[test]
fn test_destructuring_declaration_fails_when_reached() {
    // var [x] = [1];
    let program = json!({
        "type": "Program",
        "body": [{
            "type": "VariableDeclaration",
            "kind": "var",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": { "type": "ArrayPattern", "elements": [ident("x")] },
                "init": { "type": "ArrayExpression", "elements": [lit(json!(1))] }
            }]
        }]
    });
    assert!(matches!(
        eval_json(program),
        Err(JsError::UnsupportedNode { ref kind }) if kind == "ArrayPattern"
    ));
}

#[test]
fn test_unsupported_node_in_dead_branch_is_ignored() {
    // if (false) { class A {} } 1
    let program = json!({
        "type": "Program",
        "body": [
            {
                "type": "IfStatement",
                "test": lit(json!(false)),
                "consequent": { "type": "BlockStatement", "body": [class_decl()] },
                "alternate": null
            },
            expr_stmt(lit(json!(1)))
        ]
    });
    assert_eq!(eval_json(program).unwrap(), js_num(1.0));
}

#[test]
fn test_unsupported_node_is_not_catchable() {
    // try { class A {} } catch (e) {}
    let program = json!({
        "type": "Program",
        "body": [{
            "type": "TryStatement",
            "block": { "type": "BlockStatement", "body": [class_decl()] },
            "handler": {
                "type": "CatchClause",
                "param": ident("e"),
                "body": { "type": "BlockStatement", "body": [] }
            },
            "finalizer": null
        }]
    });
    assert!(matches!(
        eval_json(program),
        Err(JsError::UnsupportedNode { .. })
    ));
}

#[test]
fn test_malformed_tree_is_invalid_ast() {
    // IfStatement without a test
    let program = json!({
        "type": "Program",
        "body": [{ "type": "IfStatement", "consequent": { "type": "EmptyStatement" } }]
    });
    assert!(matches!(
        Program::from_json(&program.to_string()),
        Err(JsError::InvalidAst { .. })
    ));
    assert!(matches!(
        Program::from_json("not json"),
        Err(JsError::InvalidAst { .. })
    ));
}
