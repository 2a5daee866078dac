//! String interning and the global name registry.

use super::heap::ObjRef;
use super::object::{ObjString, Object};
use super::table::{hash_string, StrKey};
use super::value::Value;
use super::vm::Vm;

impl Vm {
    /// The unique string object with these contents, allocating it on first use.
    pub fn intern(&mut self, chars: &str) -> ObjRef {
        let hash = hash_string(chars.as_bytes());
        if let Some(existing) = self.strings.find_string(&self.heap, chars, hash) {
            return existing;
        }
        let handle = self.alloc(Object::String(ObjString {
            chars: chars.into(),
            hash,
        }));
        self.strings.set(StrKey { handle, hash }, Value::NULL);
        handle
    }

    fn existing_string(&self, chars: &str) -> Option<StrKey> {
        let hash = hash_string(chars.as_bytes());
        let handle = self.strings.find_string(&self.heap, chars, hash)?;
        Some(StrKey { handle, hash })
    }

    /// Slot of the global `name`, assigning the next free slot on first
    /// mention. `None` once every 2-byte slot is taken.
    pub(crate) fn global_slot(&mut self, name: &str) -> Option<u16> {
        if let Some(slot) = self.existing_global_slot(name) {
            return Some(slot);
        }
        let slot = u16::try_from(self.global_values.len()).ok()?;
        let handle = self.intern(name);
        let hash = self.heap.string(handle).hash;
        self.global_names
            .set(StrKey { handle, hash }, Value::number(slot as f64));
        self.global_values.push(Value::UNDEFINED);
        Some(slot)
    }

    /// Slot of the global `name` if any unit has mentioned it.
    pub(crate) fn existing_global_slot(&self, name: &str) -> Option<u16> {
        let key = self.existing_string(name)?;
        let slot = self.global_names.get(key)?;
        Some(slot.as_number() as u16)
    }

    /// Current value of a global, `None` if it was never assigned.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        let slot = self.existing_global_slot(name)?;
        let value = self.global_values[slot as usize];
        (!value.is_undefined()).then_some(value)
    }

    /// Reverse lookup used by error messages.
    pub(crate) fn global_name(&self, slot: usize) -> Option<String> {
        let wanted = Value::number(slot as f64);
        self.global_names
            .iter()
            .find(|&(_, value)| value == wanted)
            .map(|(key, _)| self.heap.string(key.handle).chars.to_string())
    }
}
