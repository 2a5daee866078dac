//! Heap object variants.
//!
//! Every heap object is one case of [`Object`]. The collector owns them all;
//! code elsewhere refers to them through [`ObjRef`] handles.

use std::fmt;

use super::chunk::Chunk;
use super::heap::{Heap, ObjRef};
use super::value::{format_number, Value};
use super::vm::Vm;

/// Signature of a host function callable from bytecode.
pub type NativeFn = fn(&mut Vm, &[Value]) -> Value;

/// An interned, immutable string.
#[derive(Debug, Clone)]
pub struct ObjString {
    pub chars: Box<str>,
    pub hash: u32,
}

/// A compiled function. Immutable once its compilation context finishes.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub arity: u8,
    pub upvalue_count: usize,
    /// Interned name, `None` for a top-level script.
    pub name: Option<ObjRef>,
    pub chunk: Chunk,
}

impl Function {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone)]
pub struct Native {
    pub name: &'static str,
    pub function: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

/// A function paired with the upvalues it captured when it was created.
#[derive(Debug, Clone)]
pub struct Closure {
    pub function: ObjRef,
    pub upvalues: Vec<ObjRef>,
}

/// A captured variable, either still living on the stack or moved into the cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upvalue {
    /// Absolute index of the captured stack slot.
    Open(usize),
    Closed(Value),
}

#[derive(Debug, Clone)]
pub enum Object {
    String(ObjString),
    Function(Function),
    Native(Native),
    Closure(Closure),
    Upvalue(Upvalue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    String,
    Function,
    Native,
    Closure,
    Upvalue,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::String => "string",
            ObjectKind::Function => "function",
            ObjectKind::Native => "native function",
            ObjectKind::Closure => "closure",
            ObjectKind::Upvalue => "upvalue",
        };
        f.write_str(name)
    }
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::String(_) => ObjectKind::String,
            Object::Function(_) => ObjectKind::Function,
            Object::Native(_) => ObjectKind::Native,
            Object::Closure(_) => ObjectKind::Closure,
            Object::Upvalue(_) => ObjectKind::Upvalue,
        }
    }

    /// Bytes charged against the GC budget for this object.
    pub fn byte_size(&self) -> usize {
        let payload = match self {
            Object::String(s) => s.chars.len(),
            Object::Function(f) => f.chunk.byte_size(),
            Object::Closure(c) => c.upvalues.len() * std::mem::size_of::<ObjRef>(),
            Object::Native(_) | Object::Upvalue(_) => 0,
        };
        std::mem::size_of::<Object>() + payload
    }

    /// Every value this object references directly.
    pub(crate) fn children(&self, out: &mut Vec<Value>) {
        match self {
            Object::Closure(closure) => {
                out.push(Value::object(closure.function));
                out.extend(closure.upvalues.iter().map(|&uv| Value::object(uv)));
            }
            Object::Function(function) => {
                if let Some(name) = function.name {
                    out.push(Value::object(name));
                }
                out.extend_from_slice(&function.chunk.constants);
            }
            Object::Upvalue(Upvalue::Closed(value)) => out.push(*value),
            Object::Upvalue(Upvalue::Open(_)) | Object::String(_) | Object::Native(_) => {}
        }
    }
}

/// Render a value the way `print` shows it.
pub fn format_value(heap: &Heap, value: Value) -> String {
    if value.is_number() {
        return format_number(value.as_number());
    }
    if value == Value::TRUE {
        return "true".to_string();
    }
    if value == Value::FALSE {
        return "false".to_string();
    }
    if value.is_null() {
        return "null".to_string();
    }
    if value.is_undefined() {
        return "<undefined>".to_string();
    }
    format_object(heap, value.as_object())
}

fn format_object(heap: &Heap, handle: ObjRef) -> String {
    match heap.get(handle) {
        Object::String(s) => s.chars.to_string(),
        Object::Function(function) => match function.name {
            Some(name) => format!("<function {}>", heap.string(name).chars),
            None => "<script>".to_string(),
        },
        Object::Native(native) => format!("<native function {}>", native.name),
        Object::Closure(closure) => format_object(heap, closure.function),
        Object::Upvalue(_) => "upvalue".to_string(),
    }
}
