//! AST-to-bytecode compiler.
//!
//! Single pass: walks the AST once, emitting bytecode straight into the chunk
//! of a heap-resident `Function`. Locals become stack slot indices; variables
//! of enclosing functions become upvalue indices; everything else is a global
//! slot.
//!
//! Functions under construction are registered in `Vm::compiler_roots` so a
//! collection triggered by a compile-time allocation cannot free them.

use std::collections::HashSet;
use std::mem;

use log::debug;

use crate::ast::Program;
use crate::error::{CompileError, CompileErrors};

use super::chunk::Chunk;
use super::disassembler::disassemble;
use super::heap::ObjRef;
use super::object::{Function, Object};
use super::opcode::OpCode;
use super::value::Value;
use super::vm::Vm;

/// Slots addressable by a one-byte operand.
const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 256;

/// A local variable tracked during compilation.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    /// Scope depth, or -1 while the initializer is still being compiled.
    pub depth: i32,
    pub is_captured: bool,
}

/// Where a closure finds one of its captured variables when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDescriptor {
    /// True if this captures a local of the enclosing function, false if it
    /// re-captures one of the enclosing function's upvalues.
    pub is_local: bool,
    pub index: u8,
}

/// Tracks what kind of function is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
    Script,
    Function,
}

/// Per-function compilation state. Nested function bodies push a fresh state
/// and keep the outer one in `enclosing`.
#[derive(Debug)]
pub struct FunctionState {
    pub function: ObjRef,
    pub function_type: FunctionType,
    pub locals: Vec<Local>,
    pub upvalues: Vec<UpvalueDescriptor>,
    /// Current scope depth (0 = global).
    pub scope_depth: i32,
    pub errors: Vec<CompileError>,
    pub enclosing: Option<Box<FunctionState>>,
}

impl FunctionState {
    pub fn new(function: ObjRef, function_type: FunctionType) -> Self {
        Self {
            function,
            function_type,
            // Slot 0 holds the callee.
            locals: vec![Local {
                name: String::new(),
                depth: 0,
                is_captured: false,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
            errors: Vec::new(),
            enclosing: None,
        }
    }

    /// Most recent local with this name: its slot and whether it is initialized.
    pub fn resolve_local(&self, name: &str) -> Option<(usize, bool)> {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth != -1))
    }

    pub fn resolve_upvalue(&mut self, name: &str, line: u32) -> Option<u8> {
        let captured = {
            let enclosing = self.enclosing.as_mut()?;
            match enclosing.resolve_local(name) {
                Some((slot, _)) => {
                    enclosing.locals[slot].is_captured = true;
                    Some(slot)
                }
                None => None,
            }
        };
        if let Some(slot) = captured {
            return self.add_upvalue(slot as u8, true, line);
        }

        let index = self.enclosing.as_mut()?.resolve_upvalue(name, line)?;
        self.add_upvalue(index, false, line)
    }

    fn add_upvalue(&mut self, index: u8, is_local: bool, line: u32) -> Option<u8> {
        let descriptor = UpvalueDescriptor { is_local, index };
        if let Some(existing) = self.upvalues.iter().position(|uv| *uv == descriptor) {
            return Some(existing as u8);
        }
        if self.upvalues.len() == MAX_UPVALUES {
            self.errors.push(CompileError::TooManyUpvalues { line });
            return None;
        }
        self.upvalues.push(descriptor);
        Some((self.upvalues.len() - 1) as u8)
    }
}

/// How a variable is read at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableAccess {
    Local(u8),
    Upvalue(u8),
    Global(u16),
}

/// Where an assignment stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignTarget {
    Existing(VariableAccess),
    /// Declare a local in the current scope; the value stays on the stack as its slot.
    NewLocal,
}

/// The compiler: transforms AST into bytecode.
pub struct Compiler<'a> {
    pub(crate) vm: &'a mut Vm,
    pub(crate) state: FunctionState,
    /// Name of the file being compiled, the value of `__FILE__`.
    pub(crate) file: &'a str,
    /// Global slots assigned at top level in this unit so far.
    pub(crate) assigned_globals: HashSet<u16>,
}

impl<'a> Compiler<'a> {
    /// Compile a full program into a top-level script function.
    ///
    /// The returned function is not rooted; run it (or otherwise root it)
    /// before allocating again.
    pub fn compile(vm: &'a mut Vm, program: &'a Program) -> Result<ObjRef, CompileErrors> {
        let roots = vm.compiler_roots.len();
        let function = vm.alloc(Object::Function(Function::new()));
        vm.compiler_roots.push(function);

        let mut compiler = Compiler {
            vm,
            state: FunctionState::new(function, FunctionType::Script),
            file: &program.file,
            assigned_globals: HashSet::new(),
        };
        for stmt in &program.statements {
            compiler.compile_stmt(stmt);
        }
        let line = program.statements.last().map_or(1, |stmt| stmt.line);
        compiler.emit_op(OpCode::ReturnNull, line);

        let Compiler { vm, state, .. } = compiler;
        vm.account_growth(function);
        vm.compiler_roots.truncate(roots);

        if !state.errors.is_empty() {
            debug!("compilation of '{}' failed with {} errors", program.file, state.errors.len());
            return Err(CompileErrors(state.errors));
        }
        if vm.config.dump_bytecode {
            debug!("\n{}", disassemble(&vm.heap, function));
        }
        Ok(function)
    }

    // --- Chunk helpers ---

    pub(crate) fn chunk(&mut self) -> &mut Chunk {
        &mut self.vm.heap.function_mut(self.state.function).chunk
    }

    pub(crate) fn current_offset(&mut self) -> usize {
        self.chunk().len()
    }

    pub(crate) fn emit_op(&mut self, op: OpCode, line: u32) {
        self.chunk().write_op(op, line);
    }

    pub(crate) fn emit_byte(&mut self, byte: u8, line: u32) {
        self.chunk().write_byte(byte, line);
    }

    pub(crate) fn emit_op_byte(&mut self, op: OpCode, operand: u8, line: u32) {
        self.emit_op(op, line);
        self.emit_byte(operand, line);
    }

    pub(crate) fn emit_op_u16(&mut self, op: OpCode, operand: u16, line: u32) {
        self.emit_op(op, line);
        self.chunk().write_u16(operand, line);
    }

    /// Add a value to the constant pool, recording an error past the 2-byte limit.
    pub(crate) fn make_constant(&mut self, value: Value, line: u32) -> usize {
        let index = self.chunk().add_constant(value);
        if index > u16::MAX as usize {
            self.error(CompileError::TooManyConstants { line });
            return 0;
        }
        index
    }

    pub(crate) fn emit_constant(&mut self, value: Value, line: u32) {
        let index = self.make_constant(value, line);
        self.chunk().write_constant(index, line);
    }

    /// Emit a forward jump with a placeholder offset; returns the operand position.
    pub(crate) fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.emit_op_u16(op, 0xffff, line);
        self.current_offset() - 2
    }

    pub(crate) fn patch_jump(&mut self, offset: usize, line: u32) {
        // -2 skips the operand bytes themselves.
        let jump = self.current_offset() - offset - 2;
        match u16::try_from(jump) {
            Ok(jump) => self.chunk().patch_u16(offset, jump),
            Err(_) => self.error(CompileError::JumpTooLarge { line }),
        }
    }

    pub(crate) fn emit_loop(&mut self, loop_start: usize, line: u32) {
        self.emit_op(OpCode::Loop, line);
        // +2 accounts for the operand the VM reads before jumping back.
        let offset = self.current_offset() - loop_start + 2;
        let offset = match u16::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => {
                self.error(CompileError::LoopTooLarge { line });
                0
            }
        };
        self.chunk().write_u16(offset, line);
    }

    pub(crate) fn error(&mut self, error: CompileError) {
        debug!("compile error: {}", error);
        self.state.errors.push(error);
    }

    // --- Scope management ---

    pub(crate) fn begin_scope(&mut self) {
        self.state.scope_depth += 1;
    }

    pub(crate) fn end_scope(&mut self, line: u32) {
        self.state.scope_depth -= 1;
        let mut pending_pops = 0usize;
        while let Some(&Local {
            depth, is_captured, ..
        }) = self.state.locals.last()
        {
            if depth <= self.state.scope_depth {
                break;
            }
            if is_captured {
                self.flush_pops(&mut pending_pops, line);
                self.emit_op(OpCode::CloseUpvalue, line);
            } else {
                pending_pops += 1;
            }
            self.state.locals.pop();
        }
        self.flush_pops(&mut pending_pops, line);
    }

    fn flush_pops(&mut self, count: &mut usize, line: u32) {
        while *count > 0 {
            let batch = (*count).min(u8::MAX as usize);
            if batch == 1 {
                self.emit_op(OpCode::Pop, line);
            } else {
                self.emit_op_byte(OpCode::PopN, batch as u8, line);
            }
            *count -= batch;
        }
    }

    // --- Variables ---

    /// Add an uninitialized local. Returns false if the function has no slots left.
    pub(crate) fn add_local(&mut self, name: &str, line: u32) -> bool {
        if self.state.locals.len() == MAX_LOCALS {
            self.error(CompileError::TooManyLocals { line });
            return false;
        }
        self.state.locals.push(Local {
            name: name.to_string(),
            depth: -1,
            is_captured: false,
        });
        true
    }

    pub(crate) fn mark_initialized(&mut self) {
        if self.state.scope_depth == 0 {
            return;
        }
        let depth = self.state.scope_depth;
        if let Some(local) = self.state.locals.last_mut() {
            local.depth = depth;
        }
    }

    pub(crate) fn resolve_local(&mut self, name: &str, line: u32) -> Option<u8> {
        let (slot, initialized) = self.state.resolve_local(name)?;
        if !initialized {
            self.error(CompileError::OwnInitializer {
                name: name.to_string(),
                line,
            });
        }
        Some(slot as u8)
    }

    /// Global slot for `name`, creating it on first mention.
    pub(crate) fn global_slot(&mut self, name: &str, line: u32) -> u16 {
        match self.vm.global_slot(name) {
            Some(slot) => slot,
            None => {
                self.error(CompileError::TooManyGlobals { line });
                0
            }
        }
    }

    /// Resolve a variable name to the appropriate get/set operations.
    pub(crate) fn resolve_variable(&mut self, name: &str, line: u32) -> VariableAccess {
        if let Some(slot) = self.resolve_local(name, line) {
            VariableAccess::Local(slot)
        } else if let Some(index) = self.state.resolve_upvalue(name, line) {
            VariableAccess::Upvalue(index)
        } else {
            VariableAccess::Global(self.global_slot(name, line))
        }
    }

    /// A global is visible from nested scopes once it holds a value from an
    /// earlier unit or has been assigned at top level in this one.
    fn is_defined_global(&mut self, name: &str) -> Option<u16> {
        let slot = self.vm.existing_global_slot(name)?;
        let defined = self.assigned_globals.contains(&slot)
            || !self.vm.global_values[slot as usize].is_undefined();
        defined.then_some(slot)
    }

    /// Local declared in the innermost scope under this name. Locals still
    /// being initialized count as innermost.
    fn same_depth_local(&self, name: &str) -> Option<usize> {
        let depth = self.state.scope_depth;
        for (slot, local) in self.state.locals.iter().enumerate().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                return Some(slot);
            }
        }
        None
    }

    pub(crate) fn assignment_target(&mut self, name: &str, line: u32) -> AssignTarget {
        if self.state.scope_depth == 0 {
            let slot = self.global_slot(name, line);
            self.assigned_globals.insert(slot);
            return AssignTarget::Existing(VariableAccess::Global(slot));
        }
        if let Some(slot) = self.same_depth_local(name) {
            return AssignTarget::Existing(VariableAccess::Local(slot as u8));
        }
        // A local from an outer scope of this function is shadowed, not written.
        if self.state.resolve_local(name).is_some() {
            return AssignTarget::NewLocal;
        }
        if let Some(index) = self.state.resolve_upvalue(name, line) {
            return AssignTarget::Existing(VariableAccess::Upvalue(index));
        }
        match self.is_defined_global(name) {
            Some(slot) => AssignTarget::Existing(VariableAccess::Global(slot)),
            None => AssignTarget::NewLocal,
        }
    }

    pub(crate) fn emit_get(&mut self, access: VariableAccess, line: u32) {
        match access {
            VariableAccess::Local(slot) => self.emit_op_byte(OpCode::GetLocal, slot, line),
            VariableAccess::Upvalue(index) => self.emit_op_byte(OpCode::GetUpvalue, index, line),
            VariableAccess::Global(slot) => self.emit_op_u16(OpCode::GetGlobal, slot, line),
        }
    }

    /// Store the top of the stack without popping it.
    pub(crate) fn emit_set(&mut self, access: VariableAccess, line: u32) {
        match access {
            VariableAccess::Local(slot) => self.emit_op_byte(OpCode::SetLocal, slot, line),
            VariableAccess::Upvalue(index) => self.emit_op_byte(OpCode::SetUpvalue, index, line),
            VariableAccess::Global(slot) => self.emit_op_u16(OpCode::SetGlobal, slot, line),
        }
    }

    // --- Function compilation ---

    /// Start compiling a nested function. The current state becomes its enclosing state.
    pub(crate) fn start_function(&mut self, function: ObjRef) {
        let new_state = FunctionState::new(function, FunctionType::Function);
        let enclosing = mem::replace(&mut self.state, new_state);
        self.state.enclosing = Some(Box::new(enclosing));
    }

    /// Finish the current function and restore the enclosing state. Errors
    /// recorded in the finished function move to the enclosing one.
    pub(crate) fn finish_function(&mut self, line: u32) -> FunctionState {
        self.emit_op(OpCode::ReturnNull, line);
        let enclosing = match self.state.enclosing.take() {
            Some(enclosing) => *enclosing,
            None => panic!("finish_function called on the top-level script"),
        };
        let mut finished = mem::replace(&mut self.state, enclosing);
        self.state.errors.append(&mut finished.errors);
        finished
    }
}

impl Vm {
    /// Compile a program into a script function ready for [`Vm::execute`].
    pub fn compile(&mut self, program: &Program) -> Result<ObjRef, CompileErrors> {
        Compiler::compile(self, program)
    }
}
