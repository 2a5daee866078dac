//! Abstract Syntax Tree consumed by the compiler.
//!
//! Front ends produce these nodes; the compiler trusts their shape and only
//! rejects programs on semantic grounds.

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
pub use stmt::{FunctionDecl, Program, Stmt, StmtKind};
