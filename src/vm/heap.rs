//! Handle-indexed object arena.
//!
//! Objects live in a slot vector and are addressed by [`ObjRef`], a plain
//! index. Freed slots go on a free list and are reused by later allocations.
//! Each slot carries its mark flag and the byte size it was charged, so the
//! sweep can release both without re-measuring the object.
//!
//! The heap does not decide when to collect; allocation that may trigger a
//! collection goes through [`Vm::alloc`](super::Vm::alloc), which can see
//! the roots.

use super::config::VmConfig;
use super::object::{Closure, Function, Native, ObjString, Object, Upvalue};
use super::value::Value;

/// A reference to a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct Slot {
    marked: bool,
    size: usize,
    object: Object,
}

/// The garbage-collected heap.
#[derive(Debug)]
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
    bytes_allocated: usize,
    next_gc: usize,
    growth_factor: usize,
    stress: bool,
    /// Flips every cycle; a slot is reached when `slot.marked == mark_bit`.
    mark_bit: bool,
    /// Reached objects whose children have not been traced yet.
    pub(crate) gray: Vec<ObjRef>,
}

impl Heap {
    pub fn new(config: &VmConfig) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            bytes_allocated: 0,
            next_gc: config.initial_gc_threshold,
            growth_factor: config.gc_growth_factor.max(1),
            stress: config.stress_gc,
            mark_bit: true,
            gray: Vec::new(),
        }
    }

    /// Whether charging `incoming` more bytes should run a collection first.
    pub fn should_collect(&self, incoming: usize) -> bool {
        self.stress || self.bytes_allocated + incoming > self.next_gc
    }

    /// Place an object in the arena without considering a collection.
    pub(crate) fn insert(&mut self, object: Object) -> ObjRef {
        let size = object.byte_size();
        self.bytes_allocated += size;
        let slot = Slot {
            marked: !self.mark_bit,
            size,
            object,
        };
        match self.free_list.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(slot);
                ObjRef(index)
            }
            None => {
                self.slots.push(Some(slot));
                ObjRef((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Re-measure an object that grew after allocation and charge the difference.
    pub(crate) fn reaccount(&mut self, handle: ObjRef) -> usize {
        let slot = self.slot_mut(handle);
        let size = slot.object.byte_size();
        let old = std::mem::replace(&mut slot.size, size);
        self.bytes_allocated = self.bytes_allocated - old + size;
        size.saturating_sub(old)
    }

    pub fn contains(&self, handle: ObjRef) -> bool {
        matches!(self.slots.get(handle.0 as usize), Some(Some(_)))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    fn slot(&self, handle: ObjRef) -> &Slot {
        match self.slots.get(handle.0 as usize) {
            Some(Some(slot)) => slot,
            _ => panic!("dangling object handle #{}", handle.0),
        }
    }

    fn slot_mut(&mut self, handle: ObjRef) -> &mut Slot {
        match self.slots.get_mut(handle.0 as usize) {
            Some(Some(slot)) => slot,
            _ => panic!("dangling object handle #{}", handle.0),
        }
    }

    pub fn get(&self, handle: ObjRef) -> &Object {
        &self.slot(handle).object
    }

    pub fn get_mut(&mut self, handle: ObjRef) -> &mut Object {
        &mut self.slot_mut(handle).object
    }

    pub fn string(&self, handle: ObjRef) -> &ObjString {
        match self.get(handle) {
            Object::String(s) => s,
            other => panic!("expected string, found {}", other.kind()),
        }
    }

    pub fn function(&self, handle: ObjRef) -> &Function {
        match self.get(handle) {
            Object::Function(f) => f,
            other => panic!("expected function, found {}", other.kind()),
        }
    }

    pub fn function_mut(&mut self, handle: ObjRef) -> &mut Function {
        match self.get_mut(handle) {
            Object::Function(f) => f,
            other => panic!("expected function, found {}", other.kind()),
        }
    }

    pub fn closure(&self, handle: ObjRef) -> &Closure {
        match self.get(handle) {
            Object::Closure(c) => c,
            other => panic!("expected closure, found {}", other.kind()),
        }
    }

    pub fn native(&self, handle: ObjRef) -> &Native {
        match self.get(handle) {
            Object::Native(n) => n,
            other => panic!("expected native function, found {}", other.kind()),
        }
    }

    pub fn upvalue(&self, handle: ObjRef) -> &Upvalue {
        match self.get(handle) {
            Object::Upvalue(u) => u,
            other => panic!("expected upvalue, found {}", other.kind()),
        }
    }

    pub fn upvalue_mut(&mut self, handle: ObjRef) -> &mut Upvalue {
        match self.get_mut(handle) {
            Object::Upvalue(u) => u,
            other => panic!("expected upvalue, found {}", other.kind()),
        }
    }

    /// True if `value` is an object of the closure variant.
    pub fn is_closure(&self, value: Value) -> bool {
        value.is_object() && matches!(self.get(value.as_object()), Object::Closure(_))
    }

    pub(crate) fn is_marked(&self, handle: ObjRef) -> bool {
        self.slot(handle).marked == self.mark_bit
    }

    /// Gray an object. Returns false if it was already reached this cycle.
    pub(crate) fn mark(&mut self, handle: ObjRef) -> bool {
        let mark_bit = self.mark_bit;
        let slot = self.slot_mut(handle);
        if slot.marked == mark_bit {
            return false;
        }
        slot.marked = mark_bit;
        self.gray.push(handle);
        true
    }

    pub(crate) fn mark_value(&mut self, value: Value) {
        if value.is_object() {
            self.mark(value.as_object());
        }
    }

    /// Free every object not reached this cycle. Returns the bytes released.
    pub(crate) fn sweep(&mut self) -> usize {
        let mark_bit = self.mark_bit;
        let mut freed = 0;
        for (index, entry) in self.slots.iter_mut().enumerate() {
            let unreached = matches!(entry, Some(slot) if slot.marked != mark_bit);
            if unreached {
                if let Some(slot) = entry.take() {
                    freed += slot.size;
                    self.free_list.push(index as u32);
                }
            }
        }
        self.bytes_allocated -= freed;
        freed
    }

    /// Set the next threshold from the surviving bytes and flip the mark polarity.
    pub(crate) fn finish_cycle(&mut self) {
        self.next_gc = self.bytes_allocated * self.growth_factor;
        self.mark_bit = !self.mark_bit;
    }

    /// Drop every object unconditionally.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.gray.clear();
        self.bytes_allocated = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(chars: &str) -> Object {
        Object::String(ObjString {
            chars: chars.into(),
            hash: 0,
        })
    }

    #[test]
    fn test_insert_charges_bytes() {
        let mut heap = Heap::new(&VmConfig::default());
        let a = heap.insert(string("hello"));
        assert!(heap.contains(a));
        assert_eq!(heap.bytes_allocated(), string("hello").byte_size());
        assert_eq!(&*heap.string(a).chars, "hello");
    }

    #[test]
    fn test_new_objects_start_unmarked() {
        let mut heap = Heap::new(&VmConfig::default());
        let a = heap.insert(string("a"));
        assert!(!heap.is_marked(a));
        assert!(heap.mark(a));
        assert!(!heap.mark(a), "second mark is a no-op");
        assert!(heap.is_marked(a));
    }

    #[test]
    fn test_sweep_frees_unmarked_and_reuses_slots() {
        let mut heap = Heap::new(&VmConfig::default());
        let keep = heap.insert(string("keep"));
        let drop = heap.insert(string("drop"));
        heap.mark(keep);
        heap.gray.clear();
        let freed = heap.sweep();
        heap.finish_cycle();

        assert_eq!(freed, string("drop").byte_size());
        assert!(heap.contains(keep));
        assert!(!heap.contains(drop));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.next_gc(), heap.bytes_allocated() * 2);

        // Survivors read as unmarked after the polarity flip.
        assert!(!heap.is_marked(keep));
        let reused = heap.insert(string("new"));
        assert_eq!(reused, drop);
    }

    #[test]
    fn test_stress_mode_always_collects() {
        let config = VmConfig {
            stress_gc: true,
            ..VmConfig::default()
        };
        let heap = Heap::new(&config);
        assert!(heap.should_collect(0));
        let relaxed = VmConfig {
            stress_gc: false,
            ..VmConfig::default()
        };
        assert!(!Heap::new(&relaxed).should_collect(16));
    }

    #[test]
    #[should_panic(expected = "expected closure")]
    fn test_wrong_downcast_panics() {
        let mut heap = Heap::new(&VmConfig::default());
        let s = heap.insert(string("x"));
        heap.closure(s);
    }
}
