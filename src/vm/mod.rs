//! Bytecode VM for Peridot: compiles the AST to bytecode and executes it on a
//! stack-based VM with closures and a tracing garbage collector.

pub mod builtins;
pub mod chunk;
pub mod compiler;
pub mod compiler_exprs;
pub mod compiler_stmts;
pub mod config;
pub mod disassembler;
pub mod event_loop;
pub mod gc;
pub mod heap;
pub mod object;
pub mod opcode;
pub mod strings;
pub mod table;
pub mod value;
#[allow(clippy::module_inception)]
pub mod vm;
pub mod vm_calls;

#[cfg(test)]
mod tests;

pub use chunk::Chunk;
pub use compiler::Compiler;
pub use config::VmConfig;
pub use disassembler::disassemble;
pub use event_loop::run_event_loop;
pub use heap::{Heap, ObjRef};
pub use object::{format_value, Object, ObjectKind};
pub use opcode::OpCode;
pub use value::Value;
pub use vm::Vm;
