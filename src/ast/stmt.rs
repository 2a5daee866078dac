//! Statement AST nodes.

use crate::ast::expr::Expr;

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn expression(expr: Expr) -> Self {
        let line = expr.line;
        Self::new(StmtKind::Expression(expr), line)
    }

    pub fn assign(name: impl Into<String>, value: Expr, line: u32) -> Self {
        Self::new(
            StmtKind::Assign {
                name: name.into(),
                value,
            },
            line,
        )
    }

    pub fn block(statements: Vec<Stmt>, line: u32) -> Self {
        Self::new(StmtKind::Block(statements), line)
    }

    pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>, line: u32) -> Self {
        Self::new(
            StmtKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            },
            line,
        )
    }

    pub fn while_loop(condition: Expr, body: Stmt, line: u32) -> Self {
        Self::new(
            StmtKind::While {
                condition,
                body: Box::new(body),
            },
            line,
        )
    }

    pub fn function(name: impl Into<String>, params: &[&str], body: Vec<Stmt>, line: u32) -> Self {
        Self::new(
            StmtKind::Function(FunctionDecl {
                name: name.into(),
                params: params.iter().map(|p| p.to_string()).collect(),
                body,
            }),
            line,
        )
    }

    pub fn return_value(value: Option<Expr>, line: u32) -> Self {
        Self::new(StmtKind::Return(value), line)
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its effect; the result is discarded.
    Expression(Expr),

    /// Assignment: x = expr. Declares `x` when no visible binding exists.
    Assign { name: String, value: Expr },

    /// Block: do ... end. Opens a scope.
    Block(Vec<Stmt>),

    /// If statement: if cond ... else ... end
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// While loop: while cond ... end
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration
    Function(FunctionDecl),

    /// Return statement: return expr
    Return(Option<Expr>),

    /// Class declaration (no runtime representation yet)
    Class { name: String },

    /// Empty statement
    Empty,
}

/// Function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Source file name, exposed to programs as `__FILE__`.
    pub file: String,
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            file: "<script>".to_string(),
            statements,
        }
    }

    pub fn with_file(file: impl Into<String>, statements: Vec<Stmt>) -> Self {
        Self {
            file: file.into(),
            statements,
        }
    }
}
