//! Open-addressed hash table keyed by interned strings.
//!
//! Linear probing with wraparound. A slot with no key is either empty (value
//! null) or a tombstone (value true); probes stop only at truly empty slots.
//! Keys are compared by handle, which is sound because strings are interned.

use super::heap::{Heap, ObjRef};
use super::value::Value;

const MAX_LOAD: f64 = 0.75;
const MIN_CAPACITY: usize = 8;

/// FNV-1a, 32 bit.
pub fn hash_string(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// An interned string handle together with its cached hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrKey {
    pub handle: ObjRef,
    pub hash: u32,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Option<StrKey>,
    value: Value,
}

impl Entry {
    const EMPTY: Entry = Entry {
        key: None,
        value: Value::NULL,
    };
    const TOMBSTONE: Entry = Entry {
        key: None,
        value: Value::TRUE,
    };

    fn is_empty(&self) -> bool {
        self.key.is_none() && self.value.is_null()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Occupied slots, tombstones included.
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.key.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: StrKey) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let entry = &self.entries[find_slot(&self.entries, key)];
        entry.key.map(|_| entry.value)
    }

    /// Insert or overwrite. Returns true if the key was not present.
    pub fn set(&mut self, key: StrKey, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            let capacity = if self.capacity() < MIN_CAPACITY {
                MIN_CAPACITY
            } else {
                self.capacity() * 2
            };
            self.adjust_capacity(capacity);
        }

        let index = find_slot(&self.entries, key);
        let entry = &mut self.entries[index];
        let is_new = entry.key.is_none();
        // Reusing a tombstone does not change the occupied count.
        if entry.is_empty() {
            self.count += 1;
        }
        *entry = Entry {
            key: Some(key),
            value,
        };
        is_new
    }

    /// Replace the entry with a tombstone. Returns true if the key was present.
    pub fn delete(&mut self, key: StrKey) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = find_slot(&self.entries, key);
        if self.entries[index].key.is_none() {
            return false;
        }
        self.entries[index] = Entry::TOMBSTONE;
        true
    }

    /// Look a string up by content rather than by handle.
    pub fn find_string(&self, heap: &Heap, chars: &str, hash: u32) -> Option<ObjRef> {
        if self.count == 0 {
            return None;
        }
        let mask = self.capacity() - 1;
        let mut index = hash as usize & mask;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None if entry.is_empty() => return None,
                None => {}
                Some(key) => {
                    if key.hash == hash {
                        let candidate = &heap.string(key.handle).chars;
                        if candidate.len() == chars.len() && **candidate == *chars {
                            return Some(key.handle);
                        }
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Tombstone every entry whose key was not reached by the current mark phase.
    pub(crate) fn remove_unmarked(&mut self, heap: &Heap) -> usize {
        let mut removed = 0;
        for entry in self.entries.iter_mut() {
            if let Some(key) = entry.key {
                if !heap.is_marked(key.handle) {
                    *entry = Entry::TOMBSTONE;
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (StrKey, Value)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.key.map(|key| (key, entry.value)))
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let old = std::mem::replace(&mut self.entries, vec![Entry::EMPTY; capacity]);
        self.count = 0;
        for entry in old {
            if let Some(key) = entry.key {
                let index = find_slot(&self.entries, key);
                self.entries[index] = entry;
                self.count += 1;
            }
        }
    }
}

/// Slot holding `key`, or the slot where it should be inserted: the first
/// tombstone passed on the way, else the empty slot that ended the probe.
fn find_slot(entries: &[Entry], key: StrKey) -> usize {
    let mask = entries.len() - 1;
    let mut index = key.hash as usize & mask;
    let mut tombstone = None;
    loop {
        let entry = &entries[index];
        match entry.key {
            Some(existing) if existing.handle == key.handle => return index,
            Some(_) => {}
            None if entry.is_empty() => return tombstone.unwrap_or(index),
            None => {
                tombstone.get_or_insert(index);
            }
        }
        index = (index + 1) & mask;
    }
}
