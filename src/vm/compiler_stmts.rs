//! Statement compilation.

use log::debug;

use crate::ast::{Expr, FunctionDecl, Stmt, StmtKind};
use crate::error::CompileError;

use super::compiler::{AssignTarget, Compiler, FunctionType, VariableAccess};
use super::object::{Function, Object};
use super::opcode::OpCode;
use super::value::Value;

/// Parameters addressable by the one-byte arity.
const MAX_PARAMETERS: usize = 255;

/// Where a declared function's closure ends up.
enum FunctionBinding {
    Store(VariableAccess),
    /// The closure itself becomes the new local's slot.
    NewLocal,
    /// No slot could be allocated.
    Discard,
}

impl<'a> Compiler<'a> {
    pub fn compile_stmt(&mut self, stmt: &Stmt) {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expr(expr);
                self.emit_op(OpCode::Pop, line);
            }
            StmtKind::Assign { name, value } => self.compile_assign(name, value, line),
            StmtKind::Block(statements) => {
                self.begin_scope();
                for stmt in statements {
                    self.compile_stmt(stmt);
                }
                self.end_scope(line);
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.compile_if(condition, then_branch, else_branch.as_deref(), line),
            StmtKind::While { condition, body } => self.compile_while(condition, body, line),
            StmtKind::Function(decl) => self.compile_function_decl(decl, line),
            StmtKind::Return(value) => self.compile_return(value.as_ref(), line),
            StmtKind::Class { name } => {
                debug!("class '{}' has no runtime representation, skipping", name);
            }
            StmtKind::Empty => {}
        }
    }

    fn compile_assign(&mut self, name: &str, value: &Expr, line: u32) {
        match self.assignment_target(name, line) {
            AssignTarget::Existing(access) => {
                self.compile_expr(value);
                self.emit_set(access, line);
                self.emit_op(OpCode::Pop, line);
            }
            AssignTarget::NewLocal => {
                if self.add_local(name, line) {
                    self.compile_expr(value);
                    self.mark_initialized();
                } else {
                    self.compile_expr(value);
                    self.emit_op(OpCode::Pop, line);
                }
            }
        }
    }

    fn compile_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>, line: u32) {
        self.compile_expr(condition);
        let then_jump = self.emit_jump(OpCode::JumpIfFalse, line);
        self.compile_body(then_branch);

        match else_branch {
            Some(else_branch) => {
                let else_jump = self.emit_jump(OpCode::Jump, line);
                self.patch_jump(then_jump, line);
                self.compile_body(else_branch);
                self.patch_jump(else_jump, line);
            }
            None => self.patch_jump(then_jump, line),
        }
    }

    fn compile_while(&mut self, condition: &Expr, body: &Stmt, line: u32) {
        let loop_start = self.current_offset();
        self.compile_expr(condition);
        let exit_jump = self.emit_jump(OpCode::JumpIfFalse, line);
        self.compile_body(body);
        self.emit_loop(loop_start, line);
        self.patch_jump(exit_jump, line);
    }

    /// Branch and loop bodies get their own scope even when they are not
    /// blocks: a local declared there only exists on paths that run the body.
    fn compile_body(&mut self, body: &Stmt) {
        if let StmtKind::Block(_) = body.kind {
            self.compile_stmt(body);
        } else {
            self.begin_scope();
            self.compile_stmt(body);
            self.end_scope(body.line);
        }
    }

    fn compile_return(&mut self, value: Option<&Expr>, line: u32) {
        if self.state.function_type == FunctionType::Script {
            self.error(CompileError::ReturnFromTopLevel { line });
        }
        match value {
            Some(value) => {
                self.compile_expr(value);
                self.emit_op(OpCode::Return, line);
            }
            None => self.emit_op(OpCode::ReturnNull, line),
        }
    }

    fn compile_function_decl(&mut self, decl: &FunctionDecl, line: u32) {
        // Bind the name before compiling the body so the function can call itself.
        let binding = if self.state.scope_depth > 0 {
            let depth = self.state.scope_depth;
            let existing = self
                .state
                .locals
                .iter()
                .rposition(|local| local.depth == depth && local.name == decl.name);
            match existing {
                Some(slot) => FunctionBinding::Store(VariableAccess::Local(slot as u8)),
                None if self.add_local(&decl.name, line) => {
                    self.mark_initialized();
                    FunctionBinding::NewLocal
                }
                None => FunctionBinding::Discard,
            }
        } else {
            let slot = self.global_slot(&decl.name, line);
            self.assigned_globals.insert(slot);
            FunctionBinding::Store(VariableAccess::Global(slot))
        };

        self.compile_function(decl, line);

        match binding {
            FunctionBinding::Store(access) => {
                self.emit_set(access, line);
                self.emit_op(OpCode::Pop, line);
            }
            FunctionBinding::NewLocal => {}
            FunctionBinding::Discard => self.emit_op(OpCode::Pop, line),
        }
    }

    /// Compile a function body into a new function object and emit the
    /// closure instruction that creates it at runtime.
    fn compile_function(&mut self, decl: &FunctionDecl, line: u32) {
        let function = self.vm.alloc(Object::Function(Function::new()));
        self.vm.compiler_roots.push(function);
        let name = self.vm.intern(&decl.name);
        self.vm.heap.function_mut(function).name = Some(name);

        self.start_function(function);
        self.begin_scope();

        if decl.params.len() > MAX_PARAMETERS {
            self.error(CompileError::TooManyParameters { line });
        }
        for param in &decl.params {
            if self.add_local(param, line) {
                self.mark_initialized();
            }
        }

        for stmt in &decl.body {
            self.compile_stmt(stmt);
        }
        let end_line = decl.body.last().map_or(line, |stmt| stmt.line);
        let finished = self.finish_function(end_line);

        {
            let function = self.vm.heap.function_mut(function);
            function.arity = decl.params.len().min(MAX_PARAMETERS) as u8;
            function.upvalue_count = finished.upvalues.len();
        }
        self.vm.account_growth(function);

        let index = self.make_constant(Value::object(function), line);
        self.vm.compiler_roots.pop();

        match u8::try_from(index) {
            Ok(index) => self.emit_op_byte(OpCode::Closure, index, line),
            Err(_) => self.emit_op_u16(OpCode::ClosureLong, index as u16, line),
        }
        for upvalue in &finished.upvalues {
            self.emit_byte(upvalue.is_local as u8, line);
            self.emit_byte(upvalue.index, line);
        }
    }
}
