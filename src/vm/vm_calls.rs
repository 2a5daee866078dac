//! Function call dispatch for the VM.

use crate::error::{RuntimeError, RuntimeErrorKind};

use super::config::FRAME_SLOTS;
use super::heap::ObjRef;
use super::object::{Closure, NativeFn, Native, Object, Upvalue};
use super::value::Value;
use super::vm::{CallFrame, Vm};

impl Vm {
    /// Call a value with `argc` arguments on the stack.
    /// The callee sits just below the arguments.
    pub(crate) fn call_value(&mut self, callee: Value, argc: usize) -> Result<(), RuntimeErrorKind> {
        let handle = callee.try_object().ok_or(RuntimeErrorKind::NotCallable)?;
        match self.heap.get(handle) {
            Object::Closure(closure) => {
                let function = closure.function;
                self.call_closure(handle, function, argc)
            }
            Object::Native(native) => {
                let function = native.function;
                self.call_native(function, argc);
                Ok(())
            }
            _ => Err(RuntimeErrorKind::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: ObjRef, function: ObjRef, argc: usize) -> Result<(), RuntimeErrorKind> {
        let arity = self.heap.function(function).arity as usize;
        if argc != arity {
            return Err(RuntimeErrorKind::WrongArity {
                expected: arity,
                got: argc,
            });
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        // The new frame needs room for a full set of locals above its arguments.
        if self.stack.len() + FRAME_SLOTS > self.config.stack_max() {
            return Err(RuntimeErrorKind::StackOverflow);
        }

        let base = self.stack.len() - argc - 1; // -1 for the callee slot
        self.frames.push(CallFrame {
            closure,
            function,
            ip: 0,
            base,
        });
        Ok(())
    }

    fn call_native(&mut self, function: NativeFn, argc: usize) {
        let callee_idx = self.stack.len() - argc - 1;
        // Arguments stay on the stack (and rooted) while the native runs.
        let args = self.stack[callee_idx + 1..].to_vec();
        let result = function(self, &args);
        self.stack.truncate(callee_idx);
        self.push(result);
    }

    /// Call `callee` from outside the dispatch loop and return its result.
    ///
    /// Used by host code and the event loop. An error unwinds the whole VM
    /// stack, so this must not be called while a script is running.
    pub fn call(&mut self, callee: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let depth = self.frames.len();
        self.push(callee);
        for &arg in args {
            self.push(arg);
        }

        let result = match self.call_value(callee, args.len()) {
            // A closure pushed a frame; a native already left its result.
            Ok(()) if self.frames.len() > depth => self.run(depth),
            Ok(()) => Ok(self.pop()),
            Err(kind) => Err(kind),
        };
        result.map_err(|kind| self.runtime_error(kind))
    }

    /// Build a closure for the function constant at `index`, reading its
    /// upvalue descriptors from the instruction stream.
    pub(crate) fn make_closure(&mut self, index: usize) {
        let frame = self.frames[self.frames.len() - 1];
        let function = self.heap.function(frame.function).chunk.constants[index].as_object();
        let count = self.heap.function(function).upvalue_count;

        let mut upvalues = Vec::with_capacity(count);
        for _ in 0..count {
            let is_local = self.read_byte() == 1;
            let index = self.read_byte() as usize;
            let upvalue = if is_local {
                self.capture_upvalue(frame.base + index)
            } else {
                self.heap.closure(frame.closure).upvalues[index]
            };
            upvalues.push(upvalue);
        }

        // Captured upvalues are rooted through `open_upvalues` or the enclosing closure.
        let closure = self.alloc(Object::Closure(Closure { function, upvalues }));
        self.push(Value::object(closure));
    }

    /// The upvalue aliasing stack `slot`, shared by every closure that captures it.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> ObjRef {
        if let Some(&existing) = self.open_upvalues.get(&slot) {
            return existing;
        }
        let upvalue = self.alloc(Object::Upvalue(Upvalue::Open(slot)));
        self.open_upvalues.insert(slot, upvalue);
        upvalue
    }

    /// Close every open upvalue at or above stack slot `from`.
    pub(crate) fn close_upvalues(&mut self, from: usize) {
        let closing = self.open_upvalues.split_off(&from);
        for (slot, upvalue) in closing {
            let value = self.stack[slot];
            *self.heap.upvalue_mut(upvalue) = Upvalue::Closed(value);
        }
    }

    /// Bind a host function to a global name.
    pub fn define_native(&mut self, name: &'static str, function: NativeFn) {
        let native = self.alloc(Object::Native(Native { name, function }));
        // Keep the native reachable while the name is interned.
        self.push(Value::object(native));
        if let Some(slot) = self.global_slot(name) {
            self.global_values[slot as usize] = Value::object(native);
        }
        self.pop();
    }
}
