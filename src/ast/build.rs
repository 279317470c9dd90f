//! Helpers for assembling trees in Rust code
//!
//! Embedders that do not go through ESTree JSON, the benchmarks and the tests
//! construct programs with these functions:
//!
//! ```
//! use resumable::ast::build::*;
//!
//! // var a = 1 + 2;
//! let program = program(vec![var("a", Some(binary(BinaryOp::Add, num(1.0), num(2.0))))]);
//! assert_eq!(program.body.len(), 1);
//! ```

use std::rc::Rc;

pub use crate::ast::{AssignmentOp, BinaryOp, LogicalOp, UnaryOp, UpdateOp, VariableKind};
use crate::ast::*;
use crate::value::JsString;

pub type Expr = Rc<Expression>;
pub type Stmt = Rc<Statement>;

// ============ EXPRESSIONS ============

pub fn num(n: f64) -> Expr {
    literal(LiteralValue::Number(n))
}

pub fn string(s: &str) -> Expr {
    literal(LiteralValue::String(JsString::from(s)))
}

pub fn boolean(b: bool) -> Expr {
    literal(LiteralValue::Boolean(b))
}

pub fn null() -> Expr {
    literal(LiteralValue::Null)
}

/// `void 0`
pub fn undefined() -> Expr {
    unary(UnaryOp::Void, num(0.0))
}

fn literal(value: LiteralValue) -> Expr {
    Rc::new(Expression::Literal(Literal { value }))
}

pub fn ident(name: &str) -> Expr {
    Rc::new(Expression::Identifier(identifier(name)))
}

fn identifier(name: &str) -> Identifier {
    Identifier {
        name: JsString::from(name),
    }
}

fn pattern(name: &str) -> Pattern {
    Pattern::Identifier(identifier(name))
}

pub fn this() -> Expr {
    Rc::new(Expression::This)
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Rc::new(Expression::Array(ArrayExpression {
        elements: elements.into_iter().map(Some).collect(),
    }))
}

/// Object literal with plain identifier keys
pub fn object(properties: Vec<(&str, Expr)>) -> Expr {
    Rc::new(Expression::Object(ObjectExpression {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property {
                key: ident(key),
                value,
                computed: false,
                kind: PropertyKind::Init,
                method: false,
                shorthand: false,
            })
            .collect(),
    }))
}

/// Object literal whose keys are evaluated (`{ [k]: v }`)
pub fn object_computed(properties: Vec<(Expr, Expr)>) -> Expr {
    Rc::new(Expression::Object(ObjectExpression {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property {
                key,
                value,
                computed: true,
                kind: PropertyKind::Init,
                method: false,
                shorthand: false,
            })
            .collect(),
    }))
}

pub fn unary(operator: UnaryOp, argument: Expr) -> Expr {
    Rc::new(Expression::Unary(UnaryExpression { operator, argument }))
}

pub fn update(operator: UpdateOp, prefix: bool, argument: Expr) -> Expr {
    Rc::new(Expression::Update(UpdateExpression {
        operator,
        prefix,
        argument,
    }))
}

pub fn binary(operator: BinaryOp, left: Expr, right: Expr) -> Expr {
    Rc::new(Expression::Binary(BinaryExpression {
        operator,
        left,
        right,
    }))
}

pub fn logical(operator: LogicalOp, left: Expr, right: Expr) -> Expr {
    Rc::new(Expression::Logical(LogicalExpression {
        operator,
        left,
        right,
    }))
}

/// `target = value`
pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignmentOp::Assign, target, value)
}

pub fn assign_op(operator: AssignmentOp, target: Expr, value: Expr) -> Expr {
    Rc::new(Expression::Assignment(AssignmentExpression {
        operator,
        left: target,
        right: value,
    }))
}

pub fn cond(test: Expr, consequent: Expr, alternate: Expr) -> Expr {
    Rc::new(Expression::Conditional(ConditionalExpression {
        test,
        consequent,
        alternate,
    }))
}

pub fn seq(expressions: Vec<Expr>) -> Expr {
    Rc::new(Expression::Sequence(SequenceExpression { expressions }))
}

/// `object.name`
pub fn member(object: Expr, name: &str) -> Expr {
    Rc::new(Expression::Member(MemberExpression {
        object,
        property: ident(name),
        computed: false,
    }))
}

/// `object[key]`
pub fn index(object: Expr, key: Expr) -> Expr {
    Rc::new(Expression::Member(MemberExpression {
        object,
        property: key,
        computed: true,
    }))
}

pub fn call(callee: Expr, arguments: Vec<Expr>) -> Expr {
    Rc::new(Expression::Call(CallExpression { callee, arguments }))
}

/// `new callee(...arguments)`
pub fn new_expr(callee: Expr, arguments: Vec<Expr>) -> Expr {
    Rc::new(Expression::New(CallExpression { callee, arguments }))
}

pub fn yield_(argument: Option<Expr>) -> Expr {
    Rc::new(Expression::Yield(YieldExpression {
        argument,
        delegate: false,
    }))
}

/// `yield* argument`
pub fn yield_delegate(argument: Expr) -> Expr {
    Rc::new(Expression::Yield(YieldExpression {
        argument: Some(argument),
        delegate: true,
    }))
}

pub fn await_(argument: Expr) -> Expr {
    Rc::new(Expression::Await(AwaitExpression { argument }))
}

// ============ FUNCTIONS ============

/// Builder for function nodes; finish with [`decl`](Self::decl),
/// [`expr`](Self::expr) or [`arrow`](Self::arrow).
pub struct FunctionBuilder {
    func: Function,
}

pub fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> FunctionBuilder {
    FunctionBuilder {
        func: Function {
            id: name.map(identifier),
            params: params.iter().map(|p| pattern(p)).collect(),
            body: FunctionBody::Block(block(body)),
            generator: false,
            is_async: false,
            hoisting: None,
        },
    }
}

impl FunctionBuilder {
    pub fn generator(mut self) -> Self {
        self.func.generator = true;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.func.is_async = true;
        self
    }

    pub fn decl(self) -> Stmt {
        Rc::new(Statement::FunctionDeclaration(Rc::new(self.func)))
    }

    pub fn expr(self) -> Expr {
        Rc::new(Expression::Function(Rc::new(self.func)))
    }

    pub fn arrow(mut self) -> Expr {
        self.func.id = None;
        Rc::new(Expression::ArrowFunction(Rc::new(self.func)))
    }
}

pub fn func_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    function(Some(name), params, body).decl()
}

pub fn func_expr(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Expr {
    function(name, params, body).expr()
}

/// Arrow function with a block body
pub fn arrow(params: &[&str], body: Vec<Stmt>) -> Expr {
    function(None, params, body).arrow()
}

/// Arrow function with an expression body (`x => x + 1`)
pub fn arrow_expr(params: &[&str], body: Expr) -> Expr {
    Rc::new(Expression::ArrowFunction(Rc::new(Function {
        id: None,
        params: params.iter().map(|p| pattern(p)).collect(),
        body: FunctionBody::Expression(body),
        generator: false,
        is_async: false,
        hoisting: None,
    })))
}

// ============ STATEMENTS ============

pub fn expr_stmt(expression: Expr) -> Stmt {
    Rc::new(Statement::Expression(ExpressionStatement { expression }))
}

pub fn declare(kind: VariableKind, declarations: Vec<(&str, Option<Expr>)>) -> Stmt {
    Rc::new(Statement::VariableDeclaration(VariableDeclaration {
        kind,
        declarations: declarations
            .into_iter()
            .map(|(name, init)| VariableDeclarator {
                id: pattern(name),
                init,
            })
            .collect(),
    }))
}

pub fn var(name: &str, init: Option<Expr>) -> Stmt {
    declare(VariableKind::Var, vec![(name, init)])
}

pub fn let_(name: &str, init: Option<Expr>) -> Stmt {
    declare(VariableKind::Let, vec![(name, init)])
}

pub fn const_(name: &str, init: Expr) -> Stmt {
    declare(VariableKind::Const, vec![(name, Some(init))])
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Rc::new(Statement::Block(BlockStatement {
        body,
        hoisting: None,
    }))
}

pub fn empty() -> Stmt {
    Rc::new(Statement::Empty)
}

pub fn if_(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Stmt {
    Rc::new(Statement::If(IfStatement {
        test,
        consequent,
        alternate,
    }))
}

pub fn while_(test: Expr, body: Stmt) -> Stmt {
    Rc::new(Statement::While(WhileStatement { test, body }))
}

pub fn do_while(body: Stmt, test: Expr) -> Stmt {
    Rc::new(Statement::DoWhile(DoWhileStatement { body, test }))
}

/// `for (init; test; update) body`. A declaration `init` becomes the loop head
/// declaration; an expression statement contributes its expression.
pub fn for_(init: Option<Stmt>, test: Option<Expr>, update: Option<Expr>, body: Stmt) -> Stmt {
    let init = init.map(|stmt| match &*stmt {
        Statement::Expression(e) => ForInit::Expression(e.expression.clone()),
        _ => ForInit::Declaration(stmt),
    });
    Rc::new(Statement::For(ForStatement {
        init,
        test,
        update,
        body,
        hoisting: None,
    }))
}

fn for_in_of_left(left: Stmt) -> ForInOfLeft {
    match &*left {
        Statement::Expression(e) => ForInOfLeft::Target(e.expression.clone()),
        _ => ForInOfLeft::Declaration(left),
    }
}

/// `for (left in right) body`; `left` is a declaration or an expression statement
pub fn for_in(left: Stmt, right: Expr, body: Stmt) -> Stmt {
    Rc::new(Statement::ForIn(ForInOfStatement {
        left: for_in_of_left(left),
        right,
        body,
        hoisting: None,
    }))
}

/// `for (left of right) body`; `left` is a declaration or an expression statement
pub fn for_of(left: Stmt, right: Expr, body: Stmt) -> Stmt {
    Rc::new(Statement::ForOf(ForInOfStatement {
        left: for_in_of_left(left),
        right,
        body,
        hoisting: None,
    }))
}

pub fn ret(argument: Option<Expr>) -> Stmt {
    Rc::new(Statement::Return(ReturnStatement { argument }))
}

pub fn throw(argument: Expr) -> Stmt {
    Rc::new(Statement::Throw(ThrowStatement { argument }))
}

/// `try { block } catch (param) { handler } finally { finalizer }`
pub fn try_(
    block_body: Vec<Stmt>,
    handler: Option<(Option<&str>, Vec<Stmt>)>,
    finalizer: Option<Vec<Stmt>>,
) -> Stmt {
    Rc::new(Statement::Try(TryStatement {
        block: block(block_body),
        handler: handler.map(|(param, body)| CatchClause {
            param: param.map(pattern),
            body: block(body),
        }),
        finalizer: finalizer.map(block),
    }))
}

pub fn break_(label: Option<&str>) -> Stmt {
    Rc::new(Statement::Break(JumpStatement {
        label: label.map(identifier),
    }))
}

pub fn continue_(label: Option<&str>) -> Stmt {
    Rc::new(Statement::Continue(JumpStatement {
        label: label.map(identifier),
    }))
}

pub fn labeled(label: &str, body: Stmt) -> Stmt {
    Rc::new(Statement::Labeled(LabeledStatement {
        label: identifier(label),
        body,
    }))
}

/// `switch (discriminant) { ... }`; a `None` test is the `default` clause
pub fn switch(discriminant: Expr, cases: Vec<(Option<Expr>, Vec<Stmt>)>) -> Stmt {
    Rc::new(Statement::Switch(SwitchStatement {
        discriminant,
        cases: cases
            .into_iter()
            .map(|(test, consequent)| SwitchCase { test, consequent })
            .collect(),
        hoisting: None,
    }))
}

pub fn program(body: Vec<Stmt>) -> Program {
    Program::new(body)
}
