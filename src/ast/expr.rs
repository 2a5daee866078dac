//! Expression AST nodes.

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn number(value: f64, line: u32) -> Self {
        Self::new(ExprKind::Number(value), line)
    }

    pub fn string(value: impl Into<String>, line: u32) -> Self {
        Self::new(ExprKind::String(value.into()), line)
    }

    pub fn boolean(value: bool, line: u32) -> Self {
        Self::new(ExprKind::Boolean(value), line)
    }

    pub fn null(line: u32) -> Self {
        Self::new(ExprKind::Null, line)
    }

    pub fn variable(name: impl Into<String>, line: u32) -> Self {
        Self::new(ExprKind::Variable(name.into()), line)
    }

    pub fn unary(operator: UnaryOp, operand: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            line,
        )
    }

    pub fn binary(left: Expr, operator: BinaryOp, right: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            line,
        )
    }

    pub fn logical(left: Expr, operator: LogicalOp, right: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            line,
        )
    }

    pub fn ternary(condition: Expr, then_branch: Expr, else_branch: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            line,
        )
    }

    pub fn call(callee: Expr, arguments: Vec<Expr>, line: u32) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            line,
        )
    }

    /// Call a function by name: `name(args...)`.
    pub fn call_named(name: impl Into<String>, arguments: Vec<Expr>, line: u32) -> Self {
        Self::call(Self::variable(name, line), arguments, line)
    }
}

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Number literal: 42, 3.14
    Number(f64),
    /// String literal: "hello"
    String(String),
    /// Boolean literal: true, false
    Boolean(bool),
    /// Null literal
    Null,
    /// `__FILE__`: the name of the file being compiled
    File,

    /// Variable reference: foo
    Variable(String),

    /// Unary operation: -x, !x, ~x
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    /// Binary operation: a + b
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    /// Short-circuit logic: a && b, a || b
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
    },

    /// Ternary: cond ? a : b
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Function call: foo(a, b)
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    /// Member access: obj.field
    Property { object: Box<Expr>, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    BitNot,
}
