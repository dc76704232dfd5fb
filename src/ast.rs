// ABOUTME: Syntax tree for the language, pattern-matched by resolver and interpreter

use crate::token::{Literal, Token};
use std::rc::Rc;

/// Identity of a variable reference, assigned by the parser. The resolver
/// keys its scope-distance side-table on this, never on the name.
pub type ExprId = usize;

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Literal,
    },
    Grouping {
        inner: Box<Expr>,
    },
    Unary {
        op: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    /// and/or; short-circuits, unlike Binary
    Logical {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// Shared with every function value created from this declaration.
    Function(Rc<FunctionDecl>),
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}
