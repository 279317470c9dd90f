//! Declaration hoisting pre-pass
//!
//! A single traversal run once before evaluation. It moves function declarations
//! to the front of every statement list and attaches [`Hoisting`] records naming
//! the bindings each scope-introducing node must create on entry:
//!
//! - `var` names and function-declaration names bubble up to the nearest
//!   function (or the program).
//! - `let`/`const` names stay with the nearest block-like node: a block, a
//!   `switch`, a `for`/`for…in`/`for…of` head, or the program top level.
//! - Function and arrow expressions nested anywhere in expressions get their
//!   own records.
//!
//! Running the pass twice yields the same records.

use std::rc::Rc;

use crate::ast::{
    Expression, ForInOfLeft, ForInOfStatement, ForInit, Function, FunctionBody, Program,
    Statement, VariableKind,
};
use crate::prelude::*;
use crate::value::{CheapClone, JsString};

/// Names a scope-introducing node declares on entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hoisting {
    pub vars: IndexSet<JsString>,
    pub lets: IndexSet<JsString>,
    pub consts: IndexSet<JsString>,
}

impl Hoisting {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.lets.is_empty() && self.consts.is_empty()
    }

    /// Whether this record introduces any block-scoped binding
    pub fn has_lexical(&self) -> bool {
        !self.lets.is_empty() || !self.consts.is_empty()
    }

    fn record(&mut self, kind: VariableKind, name: &JsString, vars: &mut IndexSet<JsString>) {
        match kind {
            VariableKind::Var => {
                vars.insert(name.cheap_clone());
            }
            VariableKind::Let => {
                self.lets.insert(name.cheap_clone());
            }
            VariableKind::Const => {
                self.consts.insert(name.cheap_clone());
            }
        }
    }
}

/// Hoist a whole program in place
pub fn hoist_program(program: &mut Program) {
    let mut vars = index_set_new();
    let mut record = Hoisting::default();
    hoist_statements(&mut program.body, &mut vars, &mut record);
    record.vars = vars;
    program.hoisting = Some(record);
}

/// Hoist a single function node in place
pub fn hoist_function(func: &mut Function) {
    let mut vars = index_set_new();
    match &mut func.body {
        FunctionBody::Block(body) => {
            // The body block records its own lexical names
            let mut unused = Hoisting::default();
            hoist_statement(body, &mut vars, &mut unused);
        }
        FunctionBody::Expression(expr) => hoist_expression(expr),
    }
    func.hoisting = Some(Hoisting {
        vars,
        ..Hoisting::default()
    });
}

/// Function declarations run before every other statement of their list
fn sort_functions_first(body: &mut [Rc<Statement>]) {
    body.sort_by_key(|stmt| !matches!(**stmt, Statement::FunctionDeclaration(_)));
}

fn hoist_statements(
    body: &mut [Rc<Statement>],
    vars: &mut IndexSet<JsString>,
    lexical: &mut Hoisting,
) {
    sort_functions_first(body);
    for stmt in body.iter_mut() {
        hoist_statement(stmt, vars, lexical);
    }
}

fn hoist_statement(
    stmt: &mut Rc<Statement>,
    vars: &mut IndexSet<JsString>,
    lexical: &mut Hoisting,
) {
    match Rc::make_mut(stmt) {
        Statement::VariableDeclaration(decl) => {
            for declarator in decl.declarations.iter_mut() {
                if let Ok(name) = declarator.id.name() {
                    lexical.record(decl.kind, name, vars);
                }
                if let Some(init) = &mut declarator.init {
                    hoist_expression(init);
                }
            }
        }

        Statement::FunctionDeclaration(func) => {
            if let Some(name) = func.name() {
                vars.insert(name.cheap_clone());
            }
            hoist_function(Rc::make_mut(func));
        }

        Statement::Block(block) => {
            let mut record = Hoisting::default();
            hoist_statements(&mut block.body, vars, &mut record);
            block.hoisting = Some(record);
        }

        Statement::If(if_stmt) => {
            hoist_expression(&mut if_stmt.test);
            hoist_statement(&mut if_stmt.consequent, vars, lexical);
            if let Some(alt) = &mut if_stmt.alternate {
                hoist_statement(alt, vars, lexical);
            }
        }

        Statement::Switch(switch_stmt) => {
            hoist_expression(&mut switch_stmt.discriminant);
            let mut record = Hoisting::default();
            for case in switch_stmt.cases.iter_mut() {
                if let Some(test) = &mut case.test {
                    hoist_expression(test);
                }
                hoist_statements(&mut case.consequent, vars, &mut record);
            }
            switch_stmt.hoisting = Some(record);
        }

        Statement::For(for_stmt) => {
            let mut record = Hoisting::default();
            match &mut for_stmt.init {
                Some(ForInit::Declaration(decl)) => hoist_statement(decl, vars, &mut record),
                Some(ForInit::Expression(expr)) => hoist_expression(expr),
                None => {}
            }
            if let Some(test) = &mut for_stmt.test {
                hoist_expression(test);
            }
            if let Some(update) = &mut for_stmt.update {
                hoist_expression(update);
            }
            hoist_statement(&mut for_stmt.body, vars, &mut record);
            for_stmt.hoisting = Some(record);
        }

        Statement::ForIn(for_in) | Statement::ForOf(for_in) => {
            hoist_for_in_of(for_in, vars);
        }

        Statement::While(while_stmt) => {
            hoist_expression(&mut while_stmt.test);
            hoist_statement(&mut while_stmt.body, vars, lexical);
        }

        Statement::DoWhile(do_while) => {
            hoist_statement(&mut do_while.body, vars, lexical);
            hoist_expression(&mut do_while.test);
        }

        Statement::Try(try_stmt) => {
            hoist_statement(&mut try_stmt.block, vars, lexical);
            if let Some(handler) = &mut try_stmt.handler {
                hoist_statement(&mut handler.body, vars, lexical);
            }
            if let Some(finalizer) = &mut try_stmt.finalizer {
                hoist_statement(finalizer, vars, lexical);
            }
        }

        Statement::Labeled(labeled) => hoist_statement(&mut labeled.body, vars, lexical),

        Statement::Return(ret) => {
            if let Some(arg) = &mut ret.argument {
                hoist_expression(arg);
            }
        }

        Statement::Throw(throw) => hoist_expression(&mut throw.argument),

        Statement::Expression(expr_stmt) => hoist_expression(&mut expr_stmt.expression),

        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Debugger
        | Statement::Unsupported(_) => {}
    }
}

fn hoist_for_in_of(stmt: &mut ForInOfStatement, vars: &mut IndexSet<JsString>) {
    let mut record = Hoisting::default();
    match &mut stmt.left {
        ForInOfLeft::Declaration(decl) => hoist_statement(decl, vars, &mut record),
        ForInOfLeft::Target(target) => hoist_expression(target),
    }
    hoist_expression(&mut stmt.right);
    hoist_statement(&mut stmt.body, vars, &mut record);
    stmt.hoisting = Some(record);
}

/// Find function nodes nested inside an expression
fn hoist_expression(expr: &mut Rc<Expression>) {
    match Rc::make_mut(expr) {
        Expression::Function(func) | Expression::ArrowFunction(func) => {
            hoist_function(Rc::make_mut(func));
        }

        Expression::Array(arr) => {
            for element in arr.elements.iter_mut().flatten() {
                hoist_expression(element);
            }
        }

        Expression::Object(obj) => {
            for prop in obj.properties.iter_mut() {
                if prop.computed {
                    hoist_expression(&mut prop.key);
                }
                hoist_expression(&mut prop.value);
            }
        }

        Expression::Unary(unary) => hoist_expression(&mut unary.argument),
        Expression::Update(update) => hoist_expression(&mut update.argument),

        Expression::Binary(bin) => {
            hoist_expression(&mut bin.left);
            hoist_expression(&mut bin.right);
        }

        Expression::Logical(logical) => {
            hoist_expression(&mut logical.left);
            hoist_expression(&mut logical.right);
        }

        Expression::Assignment(assign) => {
            hoist_expression(&mut assign.left);
            hoist_expression(&mut assign.right);
        }

        Expression::Conditional(cond) => {
            hoist_expression(&mut cond.test);
            hoist_expression(&mut cond.consequent);
            hoist_expression(&mut cond.alternate);
        }

        Expression::Sequence(seq) => {
            for e in seq.expressions.iter_mut() {
                hoist_expression(e);
            }
        }

        Expression::Member(member) => {
            hoist_expression(&mut member.object);
            if member.computed {
                hoist_expression(&mut member.property);
            }
        }

        Expression::Call(call) | Expression::New(call) => {
            hoist_expression(&mut call.callee);
            for arg in call.arguments.iter_mut() {
                hoist_expression(arg);
            }
        }

        Expression::Yield(yield_expr) => {
            if let Some(arg) = &mut yield_expr.argument {
                hoist_expression(arg);
            }
        }

        Expression::Await(await_expr) => hoist_expression(&mut await_expr.argument),

        Expression::Identifier(_)
        | Expression::Literal(_)
        | Expression::This
        | Expression::Unsupported(_) => {}
    }
}
