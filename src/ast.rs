//! Abstract Syntax Tree types (ESTree node taxonomy)
//!
//! Trees are either deserialized from ESTree JSON produced by an external parser
//! or assembled with the helpers in [`build`]. Children are `Rc`-shared so that
//! suspended frames and closures can keep the nodes they evaluate alive.
//!
//! Node kinds outside the supported subset deserialize to an `Unsupported` node
//! that keeps its ESTree `type` and fails when the dispatcher reaches it.

pub mod build;

use std::rc::Rc;

use serde::Deserialize;

use crate::error::JsError;
use crate::hoist::Hoisting;
use crate::value::JsString;

/// A complete program
#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub body: Vec<Rc<Statement>>,
    /// Filled in by the hoisting pre-pass
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

impl Program {
    pub fn new(body: Vec<Rc<Statement>>) -> Self {
        Program {
            body,
            hoisting: None,
        }
    }

    /// Load a program from ESTree JSON text
    pub fn from_json(source: &str) -> Result<Program, JsError> {
        serde_json::from_str(source).map_err(|e| JsError::invalid_ast(e.to_string()))
    }

    /// Load a program from an already parsed ESTree JSON document
    pub fn from_value(value: serde_json::Value) -> Result<Program, JsError> {
        serde_json::from_value(value).map_err(|e| JsError::invalid_ast(e.to_string()))
    }
}

// ============ STATEMENTS ============

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    // Declarations
    #[serde(rename = "VariableDeclaration")]
    VariableDeclaration(VariableDeclaration),
    #[serde(rename = "FunctionDeclaration")]
    FunctionDeclaration(Rc<Function>),

    // Control Flow
    #[serde(rename = "BlockStatement")]
    Block(BlockStatement),
    #[serde(rename = "IfStatement")]
    If(IfStatement),
    #[serde(rename = "SwitchStatement")]
    Switch(SwitchStatement),
    #[serde(rename = "ForStatement")]
    For(ForStatement),
    #[serde(rename = "ForInStatement")]
    ForIn(ForInOfStatement),
    #[serde(rename = "ForOfStatement")]
    ForOf(ForInOfStatement),
    #[serde(rename = "WhileStatement")]
    While(WhileStatement),
    #[serde(rename = "DoWhileStatement")]
    DoWhile(DoWhileStatement),
    #[serde(rename = "TryStatement")]
    Try(TryStatement),

    // Jump
    #[serde(rename = "ReturnStatement")]
    Return(ReturnStatement),
    #[serde(rename = "BreakStatement")]
    Break(JumpStatement),
    #[serde(rename = "ContinueStatement")]
    Continue(JumpStatement),
    #[serde(rename = "ThrowStatement")]
    Throw(ThrowStatement),

    // Other
    #[serde(rename = "ExpressionStatement")]
    Expression(ExpressionStatement),
    #[serde(rename = "EmptyStatement")]
    Empty,
    #[serde(rename = "DebuggerStatement")]
    Debugger,
    #[serde(rename = "LabeledStatement")]
    Labeled(LabeledStatement),

    #[serde(untagged)]
    Unsupported(UnsupportedNode),
}

impl Statement {
    /// ESTree `type` name of this node
    pub fn kind(&self) -> &str {
        match self {
            Statement::VariableDeclaration(_) => "VariableDeclaration",
            Statement::FunctionDeclaration(_) => "FunctionDeclaration",
            Statement::Block(_) => "BlockStatement",
            Statement::If(_) => "IfStatement",
            Statement::Switch(_) => "SwitchStatement",
            Statement::For(_) => "ForStatement",
            Statement::ForIn(_) => "ForInStatement",
            Statement::ForOf(_) => "ForOfStatement",
            Statement::While(_) => "WhileStatement",
            Statement::DoWhile(_) => "DoWhileStatement",
            Statement::Try(_) => "TryStatement",
            Statement::Return(_) => "ReturnStatement",
            Statement::Break(_) => "BreakStatement",
            Statement::Continue(_) => "ContinueStatement",
            Statement::Throw(_) => "ThrowStatement",
            Statement::Expression(_) => "ExpressionStatement",
            Statement::Empty => "EmptyStatement",
            Statement::Debugger => "DebuggerStatement",
            Statement::Labeled(_) => "LabeledStatement",
            Statement::Unsupported(node) => &node.kind,
        }
    }

    /// Loops are the targets of unlabeled `continue`
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Statement::For(_)
                | Statement::ForIn(_)
                | Statement::ForOf(_)
                | Statement::While(_)
                | Statement::DoWhile(_)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpressionStatement {
    pub expression: Rc<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockStatement {
    pub body: Vec<Rc<Statement>>,
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDeclarator {
    pub id: Pattern,
    pub init: Option<Rc<Expression>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IfStatement {
    pub test: Rc<Expression>,
    pub consequent: Rc<Statement>,
    pub alternate: Option<Rc<Statement>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchStatement {
    pub discriminant: Rc<Expression>,
    pub cases: Vec<SwitchCase>,
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchCase {
    /// `None` for the `default` clause
    pub test: Option<Rc<Expression>>,
    pub consequent: Vec<Rc<Statement>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Rc<Expression>>,
    pub update: Option<Rc<Expression>>,
    pub body: Rc<Statement>,
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

/// `for` head initializer: a declaration or a bare expression
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum ForInit {
    Declaration(Rc<Statement>),
    Expression(Rc<Expression>),
}

/// Shared shape of `for…in` and `for…of`
#[derive(Debug, Clone, Deserialize)]
pub struct ForInOfStatement {
    pub left: ForInOfLeft,
    pub right: Rc<Expression>,
    pub body: Rc<Statement>,
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum ForInOfLeft {
    Declaration(Rc<Statement>),
    Target(Rc<Expression>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhileStatement {
    pub test: Rc<Expression>,
    pub body: Rc<Statement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoWhileStatement {
    pub body: Rc<Statement>,
    pub test: Rc<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TryStatement {
    pub block: Rc<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Rc<Statement>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Rc<Statement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnStatement {
    pub argument: Option<Rc<Expression>>,
}

/// `break` / `continue`
#[derive(Debug, Clone, Deserialize)]
pub struct JumpStatement {
    pub label: Option<Identifier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrowStatement {
    pub argument: Rc<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Rc<Statement>,
}

// Both node families have a catch-all variant, so the statement/expression choice
// is made on the ESTree `type` tag instead of by trial deserialization.

fn has_node_type(value: &serde_json::Value, kind: &str) -> bool {
    value.get("type").and_then(|t| t.as_str()) == Some(kind)
}

impl TryFrom<serde_json::Value> for ForInit {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        if has_node_type(&value, "VariableDeclaration") {
            serde_json::from_value(value).map(ForInit::Declaration)
        } else {
            serde_json::from_value(value).map(ForInit::Expression)
        }
    }
}

impl TryFrom<serde_json::Value> for ForInOfLeft {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        if has_node_type(&value, "VariableDeclaration") {
            serde_json::from_value(value).map(ForInOfLeft::Declaration)
        } else {
            serde_json::from_value(value).map(ForInOfLeft::Target)
        }
    }
}

impl TryFrom<serde_json::Value> for FunctionBody {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        if has_node_type(&value, "BlockStatement") {
            serde_json::from_value(value).map(FunctionBody::Block)
        } else {
            serde_json::from_value(value).map(FunctionBody::Expression)
        }
    }
}

// ============ FUNCTIONS ============

/// Shared node for function declarations, function expressions and arrows
#[derive(Debug, Clone, Deserialize)]
pub struct Function {
    pub id: Option<Identifier>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    #[serde(default)]
    pub generator: bool,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    /// Filled in by the hoisting pre-pass
    #[serde(skip)]
    pub hoisting: Option<Hoisting>,
}

impl Function {
    pub fn name(&self) -> Option<&JsString> {
        self.id.as_ref().map(|id| &id.name)
    }
}

/// Arrow functions may have a bare expression body
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum FunctionBody {
    Block(Rc<Statement>),
    Expression(Rc<Expression>),
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    // Literals
    #[serde(rename = "Identifier")]
    Identifier(Identifier),
    #[serde(rename = "Literal")]
    Literal(Literal),
    #[serde(rename = "ThisExpression")]
    This,
    #[serde(rename = "ArrayExpression")]
    Array(ArrayExpression),
    #[serde(rename = "ObjectExpression")]
    Object(ObjectExpression),
    #[serde(rename = "FunctionExpression")]
    Function(Rc<Function>),
    #[serde(rename = "ArrowFunctionExpression")]
    ArrowFunction(Rc<Function>),

    // Operators
    #[serde(rename = "UnaryExpression")]
    Unary(UnaryExpression),
    #[serde(rename = "UpdateExpression")]
    Update(UpdateExpression),
    #[serde(rename = "BinaryExpression")]
    Binary(BinaryExpression),
    #[serde(rename = "LogicalExpression")]
    Logical(LogicalExpression),
    #[serde(rename = "AssignmentExpression")]
    Assignment(AssignmentExpression),
    #[serde(rename = "ConditionalExpression")]
    Conditional(ConditionalExpression),
    #[serde(rename = "SequenceExpression")]
    Sequence(SequenceExpression),

    // Access & calls
    #[serde(rename = "MemberExpression")]
    Member(MemberExpression),
    #[serde(rename = "CallExpression")]
    Call(CallExpression),
    #[serde(rename = "NewExpression")]
    New(CallExpression),

    // Suspension points
    #[serde(rename = "YieldExpression")]
    Yield(YieldExpression),
    #[serde(rename = "AwaitExpression")]
    Await(AwaitExpression),

    #[serde(untagged)]
    Unsupported(UnsupportedNode),
}

impl Expression {
    /// ESTree `type` name of this node
    pub fn kind(&self) -> &str {
        match self {
            Expression::Identifier(_) => "Identifier",
            Expression::Literal(_) => "Literal",
            Expression::This => "ThisExpression",
            Expression::Array(_) => "ArrayExpression",
            Expression::Object(_) => "ObjectExpression",
            Expression::Function(_) => "FunctionExpression",
            Expression::ArrowFunction(_) => "ArrowFunctionExpression",
            Expression::Unary(_) => "UnaryExpression",
            Expression::Update(_) => "UpdateExpression",
            Expression::Binary(_) => "BinaryExpression",
            Expression::Logical(_) => "LogicalExpression",
            Expression::Assignment(_) => "AssignmentExpression",
            Expression::Conditional(_) => "ConditionalExpression",
            Expression::Sequence(_) => "SequenceExpression",
            Expression::Member(_) => "MemberExpression",
            Expression::Call(_) => "CallExpression",
            Expression::New(_) => "NewExpression",
            Expression::Yield(_) => "YieldExpression",
            Expression::Await(_) => "AwaitExpression",
            Expression::Unsupported(node) => &node.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identifier {
    pub name: JsString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayExpression {
    /// `None` marks a hole (`[1, , 3]`)
    pub elements: Vec<Option<Rc<Expression>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectExpression {
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Property {
    pub key: Rc<Expression>,
    pub value: Rc<Expression>,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub kind: PropertyKind,
    #[serde(default)]
    pub method: bool,
    #[serde(default)]
    pub shorthand: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    #[default]
    Init,
    Get,
    Set,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnaryExpression {
    pub operator: UnaryOp,
    pub argument: Rc<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "typeof")]
    Typeof,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "delete")]
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateExpression {
    pub operator: UpdateOp,
    pub prefix: bool,
    pub argument: Rc<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UpdateOp {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryExpression {
    pub operator: BinaryOp,
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Exp,

    // Comparison
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,

    // Bitwise
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    LShift,
    #[serde(rename = ">>")]
    RShift,
    #[serde(rename = ">>>")]
    URShift,

    // Other
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    Instanceof,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogicalExpression {
    pub operator: LogicalOp,
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    NullishCoalescing,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentExpression {
    pub operator: AssignmentOp,
    /// Identifier or member expression
    pub left: Rc<Expression>,
    pub right: Rc<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AssignmentOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
    #[serde(rename = "**=")]
    ExpAssign,
    #[serde(rename = "&=")]
    BitAndAssign,
    #[serde(rename = "|=")]
    BitOrAssign,
    #[serde(rename = "^=")]
    BitXorAssign,
    #[serde(rename = "<<=")]
    LShiftAssign,
    #[serde(rename = ">>=")]
    RShiftAssign,
    #[serde(rename = ">>>=")]
    URShiftAssign,
    #[serde(rename = "&&=")]
    AndAssign,
    #[serde(rename = "||=")]
    OrAssign,
    #[serde(rename = "??=")]
    NullishAssign,
}

impl AssignmentOp {
    /// Binary operator applied by a compound assignment
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignmentOp::AddAssign => Some(BinaryOp::Add),
            AssignmentOp::SubAssign => Some(BinaryOp::Sub),
            AssignmentOp::MulAssign => Some(BinaryOp::Mul),
            AssignmentOp::DivAssign => Some(BinaryOp::Div),
            AssignmentOp::ModAssign => Some(BinaryOp::Mod),
            AssignmentOp::ExpAssign => Some(BinaryOp::Exp),
            AssignmentOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignmentOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignmentOp::BitXorAssign => Some(BinaryOp::BitXor),
            AssignmentOp::LShiftAssign => Some(BinaryOp::LShift),
            AssignmentOp::RShiftAssign => Some(BinaryOp::RShift),
            AssignmentOp::URShiftAssign => Some(BinaryOp::URShift),
            _ => None,
        }
    }

    /// Short-circuiting operator applied by a logical assignment
    pub fn logical(self) -> Option<LogicalOp> {
        match self {
            AssignmentOp::AndAssign => Some(LogicalOp::And),
            AssignmentOp::OrAssign => Some(LogicalOp::Or),
            AssignmentOp::NullishAssign => Some(LogicalOp::NullishCoalescing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalExpression {
    pub test: Rc<Expression>,
    pub consequent: Rc<Expression>,
    pub alternate: Rc<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceExpression {
    pub expressions: Vec<Rc<Expression>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberExpression {
    pub object: Rc<Expression>,
    pub property: Rc<Expression>,
    /// `a[b]` when true, `a.b` otherwise
    #[serde(default)]
    pub computed: bool,
}

/// Shared shape of call and `new` expressions
#[derive(Debug, Clone, Deserialize)]
pub struct CallExpression {
    pub callee: Rc<Expression>,
    pub arguments: Vec<Rc<Expression>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldExpression {
    pub argument: Option<Rc<Expression>>,
    #[serde(default)]
    pub delegate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwaitExpression {
    pub argument: Rc<Expression>,
}

// ============ PATTERNS ============

/// Binding targets. Destructuring patterns load as `Unsupported` and fail
/// when a binding is made through them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    Identifier(Identifier),
    #[serde(untagged)]
    Unsupported(UnsupportedNode),
}

impl Pattern {
    pub fn name(&self) -> Result<&JsString, JsError> {
        match self {
            Pattern::Identifier(id) => Ok(&id.name),
            Pattern::Unsupported(node) => Err(JsError::unsupported(node.kind.as_str())),
        }
    }
}

// ============ UNSUPPORTED NODES ============

/// Every node `type` the loader understands
const KNOWN_KINDS: &[&str] = &[
    "VariableDeclaration",
    "FunctionDeclaration",
    "BlockStatement",
    "IfStatement",
    "SwitchStatement",
    "ForStatement",
    "ForInStatement",
    "ForOfStatement",
    "WhileStatement",
    "DoWhileStatement",
    "TryStatement",
    "ReturnStatement",
    "BreakStatement",
    "ContinueStatement",
    "ThrowStatement",
    "ExpressionStatement",
    "EmptyStatement",
    "DebuggerStatement",
    "LabeledStatement",
    "Identifier",
    "Literal",
    "ThisExpression",
    "ArrayExpression",
    "ObjectExpression",
    "FunctionExpression",
    "ArrowFunctionExpression",
    "UnaryExpression",
    "UpdateExpression",
    "BinaryExpression",
    "LogicalExpression",
    "AssignmentExpression",
    "ConditionalExpression",
    "SequenceExpression",
    "MemberExpression",
    "CallExpression",
    "NewExpression",
    "YieldExpression",
    "AwaitExpression",
];

/// A node whose `type` is outside the supported subset. A known `type` with
/// malformed fields never lands here; it fails the load instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct UnsupportedNode {
    pub kind: String,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
}

impl TryFrom<RawNode> for UnsupportedNode {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if KNOWN_KINDS.contains(&raw.kind.as_str()) {
            return Err(format!("malformed {} node", raw.kind));
        }
        Ok(UnsupportedNode { kind: raw.kind })
    }
}
