//! Expression compilation.

use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
use crate::error::CompileError;

use super::compiler::Compiler;
use super::opcode::OpCode;
use super::value::Value;

/// Arguments addressable by the one-byte call operand.
const MAX_ARGUMENTS: usize = 255;

impl<'a> Compiler<'a> {
    pub fn compile_expr(&mut self, expr: &Expr) {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Number(n) => self.compile_number(*n, line),
            ExprKind::String(s) => self.compile_string(s, line),
            ExprKind::Boolean(true) => self.emit_op(OpCode::True, line),
            ExprKind::Boolean(false) => self.emit_op(OpCode::False, line),
            ExprKind::Null => self.emit_op(OpCode::Null, line),
            ExprKind::File => {
                let file = self.file;
                self.compile_string(file, line);
            }
            ExprKind::Variable(name) => {
                let access = self.resolve_variable(name, line);
                self.emit_get(access, line);
            }
            ExprKind::Unary { operator, operand } => self.compile_unary(*operator, operand, line),
            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.compile_binary(left, *operator, right, line),
            ExprKind::Logical {
                left,
                operator,
                right,
            } => self.compile_logical(left, *operator, right, line),
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => self.compile_ternary(condition, then_branch, else_branch, line),
            ExprKind::Call { callee, arguments } => self.compile_call(callee, arguments, line),
            ExprKind::Property { object, .. } => {
                self.error(CompileError::Unsupported {
                    what: "Property access".to_string(),
                    line,
                });
                // Keep the stack shape of a single-value expression.
                self.compile_expr(object);
            }
        }
    }

    fn compile_number(&mut self, n: f64, line: u32) {
        // -0.0 must keep its sign, so it goes through the constant pool.
        let is_small = n.fract() == 0.0 && (0.0..=5.0).contains(&n) && n.is_sign_positive();
        if !is_small {
            self.emit_constant(Value::number(n), line);
            return;
        }
        let op = match n as u8 {
            0 => OpCode::PushZero,
            1 => OpCode::PushOne,
            2 => OpCode::PushTwo,
            3 => OpCode::PushThree,
            4 => OpCode::PushFour,
            _ => OpCode::PushFive,
        };
        self.emit_op(op, line);
    }

    fn compile_string(&mut self, s: &str, line: u32) {
        let handle = self.vm.intern(s);
        self.emit_constant(Value::object(handle), line);
    }

    fn compile_unary(&mut self, operator: UnaryOp, operand: &Expr, line: u32) {
        if operator == UnaryOp::Negate && operand.kind == ExprKind::Number(1.0) {
            self.emit_op(OpCode::PushNegOne, line);
            return;
        }
        self.compile_expr(operand);
        let op = match operator {
            UnaryOp::Negate => OpCode::Negate,
            UnaryOp::Not => OpCode::Not,
            UnaryOp::BitNot => OpCode::BitNot,
        };
        self.emit_op(op, line);
    }

    fn compile_binary(&mut self, left: &Expr, operator: BinaryOp, right: &Expr, line: u32) {
        self.compile_expr(left);
        self.compile_expr(right);
        let op = match operator {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Subtract => OpCode::Subtract,
            BinaryOp::Multiply => OpCode::Multiply,
            BinaryOp::Divide => OpCode::Divide,
            BinaryOp::Equal => OpCode::Equal,
            BinaryOp::NotEqual => OpCode::NotEqual,
            BinaryOp::Less => OpCode::Less,
            BinaryOp::LessEqual => OpCode::LessEqual,
            BinaryOp::Greater => OpCode::Greater,
            BinaryOp::GreaterEqual => OpCode::GreaterEqual,
            BinaryOp::ShiftLeft => OpCode::ShiftLeft,
            BinaryOp::ShiftRight => OpCode::ShiftRight,
            BinaryOp::BitAnd => OpCode::BitAnd,
            BinaryOp::BitOr => OpCode::BitOr,
            BinaryOp::BitXor => OpCode::BitXor,
        };
        self.emit_op(op, line);
    }

    /// `a && b` leaves `a` when it is falsy, `a || b` leaves `a` when it is truthy.
    fn compile_logical(&mut self, left: &Expr, operator: LogicalOp, right: &Expr, line: u32) {
        self.compile_expr(left);
        let op = match operator {
            LogicalOp::And => OpCode::And,
            LogicalOp::Or => OpCode::Or,
        };
        let end_jump = self.emit_jump(op, line);
        self.compile_expr(right);
        self.patch_jump(end_jump, line);
    }

    fn compile_ternary(&mut self, condition: &Expr, then_branch: &Expr, else_branch: &Expr, line: u32) {
        self.compile_expr(condition);
        let else_jump = self.emit_jump(OpCode::JumpIfFalse, line);
        self.compile_expr(then_branch);
        let end_jump = self.emit_jump(OpCode::Jump, line);
        self.patch_jump(else_jump, line);
        self.compile_expr(else_branch);
        self.patch_jump(end_jump, line);
    }

    fn compile_call(&mut self, callee: &Expr, arguments: &[Expr], line: u32) {
        self.compile_expr(callee);
        if arguments.len() > MAX_ARGUMENTS {
            self.error(CompileError::TooManyArguments { line });
        }
        for argument in arguments {
            self.compile_expr(argument);
        }
        self.emit_op_byte(OpCode::Call, arguments.len().min(MAX_ARGUMENTS) as u8, line);
    }
}
