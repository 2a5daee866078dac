//! Mark-and-sweep collection over the VM heap.
//!
//! Roots are the operand stack, the closures of active frames, open upvalues,
//! globals (names and values), functions under compilation, and pending timer
//! callbacks. Marking is a gray worklist; the intern table is weak and is
//! purged after marking so that strings reachable only through live objects
//! survive while unreferenced ones are dropped.

use log::debug;

use super::heap::ObjRef;
use super::object::Object;
use super::value::Value;
use super::vm::Vm;

impl Vm {
    /// Allocate an object, collecting first if the heap is over its threshold.
    ///
    /// Anything the caller needs to keep must already be reachable from a
    /// root, because the collection runs before the new object exists.
    pub(crate) fn alloc(&mut self, object: Object) -> ObjRef {
        if self.heap.should_collect(object.byte_size()) {
            self.collect_garbage();
        }
        self.heap.insert(object)
    }

    /// Charge an object that grew in place (a function whose chunk was filled).
    pub(crate) fn account_growth(&mut self, handle: ObjRef) {
        let grown = self.heap.reaccount(handle);
        if grown > 0 && self.heap.should_collect(0) {
            self.collect_garbage();
        }
    }

    /// Run a full collection cycle. Returns the number of bytes freed.
    pub fn collect_garbage(&mut self) -> usize {
        let before = self.heap.bytes_allocated();
        debug!("-- gc begin ({} bytes, {} objects)", before, self.heap.len());

        self.mark_roots();
        self.trace_references();
        let evicted = self.strings.remove_unmarked(&self.heap);
        let freed = self.heap.sweep();
        self.heap.finish_cycle();

        debug!(
            "-- gc end: collected {} bytes (from {} to {}), {} interned strings evicted, next at {}",
            freed,
            before,
            self.heap.bytes_allocated(),
            evicted,
            self.heap.next_gc()
        );
        freed
    }

    fn mark_roots(&mut self) {
        for &value in &self.stack {
            self.heap.mark_value(value);
        }
        for frame in &self.frames {
            self.heap.mark(frame.closure);
        }
        for &upvalue in self.open_upvalues.values() {
            self.heap.mark(upvalue);
        }
        for (key, _) in self.global_names.iter() {
            self.heap.mark(key.handle);
        }
        for &value in &self.global_values {
            self.heap.mark_value(value);
        }
        for &function in &self.compiler_roots {
            self.heap.mark(function);
        }
        for callback in self.timers.callbacks() {
            self.heap.mark_value(callback);
        }
    }

    fn trace_references(&mut self) {
        let mut children: Vec<Value> = Vec::new();
        while let Some(handle) = self.heap.gray.pop() {
            children.clear();
            self.heap.get(handle).children(&mut children);
            for &child in &children {
                self.heap.mark_value(child);
            }
        }
    }
}
