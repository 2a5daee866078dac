//! The bytecode virtual machine: stack-based execution engine.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

use colored::Colorize;
use log::{log_enabled, trace, Level};

use crate::ast::Program;
use crate::error::{PeridotError, RuntimeError, RuntimeErrorKind, TraceFrame};

use super::builtins;
use super::config::VmConfig;
use super::disassembler::disassemble_instruction;
use super::event_loop::TimerQueue;
use super::heap::{Heap, ObjRef};
use super::object::{format_value, Closure, Object, Upvalue};
use super::opcode::OpCode;
use super::table::Table;
use super::value::Value;

/// A call frame on the VM call stack.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame {
    /// The closure being executed.
    pub closure: ObjRef,
    /// The closure's function, cached to avoid a second lookup per instruction.
    pub function: ObjRef,
    /// Instruction pointer (index into chunk.code).
    pub ip: usize,
    /// Stack index of the callee slot; locals start here.
    pub base: usize,
}

/// The bytecode VM.
pub struct Vm {
    pub(crate) config: VmConfig,
    pub(crate) heap: Heap,
    /// Value stack.
    pub(crate) stack: Vec<Value>,
    /// Call frame stack.
    pub(crate) frames: Vec<CallFrame>,
    /// Upvalues still aliasing a stack slot, keyed by that slot.
    pub(crate) open_upvalues: BTreeMap<usize, ObjRef>,
    /// Intern table: every live string, values unused.
    pub(crate) strings: Table,
    /// Global name -> slot index (stored as a number).
    pub(crate) global_names: Table,
    /// Global values by slot; `Value::UNDEFINED` until first assignment.
    pub(crate) global_values: Vec<Value>,
    /// Functions whose compilation is in progress.
    pub(crate) compiler_roots: Vec<ObjRef>,
    /// Callbacks registered with `setTimeout`.
    pub(crate) timers: TimerQueue,
    /// Builtin output when `capture_output` is set.
    output: String,
    started: Instant,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut vm = Self {
            heap: Heap::new(&config),
            stack: Vec::with_capacity(config.stack_max()),
            frames: Vec::with_capacity(config.max_frames),
            open_upvalues: BTreeMap::new(),
            strings: Table::new(),
            global_names: Table::new(),
            global_values: Vec::new(),
            compiler_roots: Vec::new(),
            timers: TimerQueue::new(),
            output: String::new(),
            started: Instant::now(),
            config,
        };
        builtins::register(&mut vm);
        vm
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Time since the VM was created.
    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Compile and run a program.
    pub fn interpret(&mut self, program: &Program) -> Result<(), PeridotError> {
        let function = self.compile(program)?;
        self.execute(function)?;
        Ok(())
    }

    /// Execute a compiled top-level script function.
    pub fn execute(&mut self, function: ObjRef) -> Result<(), RuntimeError> {
        // The function is unrooted until the closure holds it.
        self.push(Value::object(function));
        let closure = self.alloc(Object::Closure(Closure {
            function,
            upvalues: Vec::new(),
        }));
        self.pop();
        self.push(Value::object(closure));

        let depth = self.frames.len();
        let result = self.call_value(Value::object(closure), 0);
        match result.and_then(|_| self.run(depth)) {
            Ok(_) => Ok(()),
            Err(kind) => Err(self.runtime_error(kind)),
        }
    }

    /// Run the dispatch loop until the frame count drops back to `base_depth`.
    /// Returns the value returned by the frame that brought it there.
    pub(crate) fn run(&mut self, base_depth: usize) -> Result<Value, RuntimeErrorKind> {
        loop {
            if log_enabled!(Level::Trace) {
                self.trace_instruction();
            }

            let byte = self.read_byte();
            let op = match OpCode::from_u8(byte) {
                Some(op) => op,
                None => panic!("unknown opcode {}", byte),
            };

            match op {
                OpCode::Constant => {
                    let index = self.read_byte() as usize;
                    let value = self.read_constant(index);
                    self.push(value);
                }
                OpCode::ConstantLong => {
                    let index = self.read_u16() as usize;
                    let value = self.read_constant(index);
                    self.push(value);
                }
                OpCode::Null => self.push(Value::NULL),
                OpCode::True => self.push(Value::TRUE),
                OpCode::False => self.push(Value::FALSE),
                OpCode::PushNegOne => self.push(Value::number(-1.0)),
                OpCode::PushZero => self.push(Value::number(0.0)),
                OpCode::PushOne => self.push(Value::number(1.0)),
                OpCode::PushTwo => self.push(Value::number(2.0)),
                OpCode::PushThree => self.push(Value::number(3.0)),
                OpCode::PushFour => self.push(Value::number(4.0)),
                OpCode::PushFive => self.push(Value::number(5.0)),

                OpCode::Pop => {
                    self.pop();
                }
                OpCode::PopN => {
                    let count = self.read_byte() as usize;
                    let len = self.stack.len();
                    self.stack.truncate(len.saturating_sub(count));
                }

                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let slot = self.read_u16() as usize;
                    let value = self.global_values[slot];
                    if value.is_undefined() {
                        let name = self.global_name(slot).unwrap_or_default();
                        return Err(RuntimeErrorKind::UndefinedVariable { name });
                    }
                    self.push(value);
                }
                OpCode::SetGlobal => {
                    let slot = self.read_u16() as usize;
                    self.global_values[slot] = self.peek(0);
                }
                OpCode::GetUpvalue => {
                    let index = self.read_byte() as usize;
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[index];
                    let value = match *self.heap.upvalue(upvalue) {
                        Upvalue::Open(slot) => self.stack[slot],
                        Upvalue::Closed(value) => value,
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let index = self.read_byte() as usize;
                    let value = self.peek(0);
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[index];
                    match self.heap.upvalue_mut(upvalue) {
                        Upvalue::Open(slot) => {
                            let slot = *slot;
                            self.stack[slot] = value;
                        }
                        Upvalue::Closed(closed) => *closed = value,
                    }
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }

                OpCode::Add => self.binary_number(|a, b| Value::number(a + b))?,
                OpCode::Subtract => self.binary_number(|a, b| Value::number(a - b))?,
                OpCode::Multiply => self.binary_number(|a, b| Value::number(a * b))?,
                OpCode::Divide => self.binary_number(|a, b| Value::number(a / b))?,
                OpCode::Negate => {
                    let n = self.peek(0).try_number().ok_or(RuntimeErrorKind::OperandMustBeNumber)?;
                    self.replace_top(Value::number(-n));
                }

                OpCode::ShiftLeft => self.binary_int(|a, b| a.wrapping_shl(b as u32))?,
                OpCode::ShiftRight => self.binary_int(|a, b| a.wrapping_shr(b as u32))?,
                OpCode::BitAnd => self.binary_int(|a, b| a & b)?,
                OpCode::BitOr => self.binary_int(|a, b| a | b)?,
                OpCode::BitXor => self.binary_int(|a, b| a ^ b)?,
                OpCode::BitNot => {
                    let n = self.peek(0).try_number().ok_or(RuntimeErrorKind::OperandMustBeNumber)?;
                    self.replace_top(Value::number(!(n as i32) as f64));
                }

                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::boolean(a == b));
                }
                OpCode::NotEqual => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::boolean(a != b));
                }
                OpCode::Less => self.binary_number(|a, b| Value::boolean(a < b))?,
                OpCode::LessEqual => self.binary_number(|a, b| Value::boolean(a <= b))?,
                OpCode::Greater => self.binary_number(|a, b| Value::boolean(a > b))?,
                OpCode::GreaterEqual => self.binary_number(|a, b| Value::boolean(a >= b))?,

                OpCode::Not => {
                    let value = self.peek(0);
                    self.replace_top(Value::boolean(!value.is_truthy()));
                }
                OpCode::And => {
                    let offset = self.read_u16() as usize;
                    if self.peek(0).is_truthy() {
                        self.pop();
                    } else {
                        self.frame_mut().ip += offset;
                    }
                }
                OpCode::Or => {
                    let offset = self.read_u16() as usize;
                    if self.peek(0).is_truthy() {
                        self.frame_mut().ip += offset;
                    } else {
                        self.pop();
                    }
                }

                OpCode::Jump => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16() as usize;
                    if !self.pop().is_truthy() {
                        self.frame_mut().ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip -= offset;
                }

                OpCode::Call => {
                    let argc = self.read_byte() as usize;
                    let callee = self.peek(argc);
                    self.call_value(callee, argc)?;
                }
                OpCode::Closure => {
                    let index = self.read_byte() as usize;
                    self.make_closure(index);
                }
                OpCode::ClosureLong => {
                    let index = self.read_u16() as usize;
                    self.make_closure(index);
                }

                OpCode::Return => {
                    let result = self.pop();
                    if let Some(value) = self.return_from_frame(result, base_depth) {
                        return Ok(value);
                    }
                }
                OpCode::ReturnNull => {
                    if let Some(value) = self.return_from_frame(Value::NULL, base_depth) {
                        return Ok(value);
                    }
                }
            }
        }
    }

    /// Pop the current frame. Returns the result if that was the last frame
    /// of this `run`, otherwise pushes it for the caller and returns `None`.
    fn return_from_frame(&mut self, result: Value, base_depth: usize) -> Option<Value> {
        let frame = self.frames.pop()?;
        self.close_upvalues(frame.base);
        self.stack.truncate(frame.base);
        if self.frames.len() <= base_depth {
            return Some(result);
        }
        self.push(result);
        None
    }

    // --- Stack operations ---

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::NULL)
    }

    #[inline]
    pub fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    #[inline]
    fn replace_top(&mut self, value: Value) {
        let top = self.stack.len() - 1;
        self.stack[top] = value;
    }

    // --- Instruction decoding ---

    #[inline]
    fn frame(&self) -> &CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    #[inline]
    fn frame_mut(&mut self) -> &mut CallFrame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> u8 {
        let top = self.frames.len() - 1;
        let CallFrame { function, ip, .. } = self.frames[top];
        let byte = self.heap.function(function).chunk.code[ip];
        self.frames[top].ip += 1;
        byte
    }

    #[inline]
    fn read_u16(&mut self) -> u16 {
        let lo = self.read_byte();
        let hi = self.read_byte();
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    fn read_constant(&self, index: usize) -> Value {
        self.heap.function(self.frame().function).chunk.constants[index]
    }

    // --- Arithmetic helpers ---

    fn binary_number(&mut self, op: impl Fn(f64, f64) -> Value) -> Result<(), RuntimeErrorKind> {
        let (a, b) = match (self.peek(1).try_number(), self.peek(0).try_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(RuntimeErrorKind::OperandsMustBeNumbers),
        };
        self.pop();
        self.replace_top(op(a, b));
        Ok(())
    }

    fn binary_int(&mut self, op: impl Fn(i32, i32) -> i32) -> Result<(), RuntimeErrorKind> {
        self.binary_number(|a, b| Value::number(op(a as i32, b as i32) as f64))
    }

    // --- Diagnostics ---

    /// Build the error with a stack trace, report it, and reset the VM.
    pub(crate) fn runtime_error(&mut self, kind: RuntimeErrorKind) -> RuntimeError {
        let trace = self
            .frames
            .iter()
            .rev()
            .map(|frame| {
                let function = self.heap.function(frame.function);
                TraceFrame {
                    line: function.chunk.line_at(frame.ip.saturating_sub(1)),
                    function: function
                        .name
                        .map(|name| self.heap.string(name).chars.to_string()),
                }
            })
            .collect();
        let error = RuntimeError::new(kind, trace);

        if self.config.report_errors {
            eprintln!("{} {}", "error:".red().bold(), error);
            for frame in &error.trace {
                eprintln!("  {}", frame.to_string().dimmed());
            }
        }
        self.reset_stack();
        error
    }

    /// Discard all frames, values and open upvalues.
    pub fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    fn trace_instruction(&self) {
        let stack: Vec<String> = self
            .stack
            .iter()
            .map(|&value| format!("[ {} ]", format_value(&self.heap, value)))
            .collect();
        let frame = self.frame();
        let chunk = &self.heap.function(frame.function).chunk;
        let (line, _) = disassemble_instruction(&self.heap, chunk, frame.ip);
        trace!("          {}", stack.join(""));
        trace!("{}", line);
    }

    // --- Output ---

    /// Write builtin output to stdout or the capture buffer.
    pub fn write_output(&mut self, text: &str) {
        if self.config.capture_output {
            self.output.push_str(text);
        } else {
            let mut stdout = std::io::stdout().lock();
            // Output is best-effort; a closed stdout must not abort the program.
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }

    /// Take everything captured so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Render a value the way `print` shows it.
    pub fn format_value(&self, value: Value) -> String {
        format_value(&self.heap, value)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        self.heap.clear();
    }
}
