//! Bytecode chunk: instruction bytes, a parallel line table and a constant pool.

use super::opcode::OpCode;
use super::value::Value;

/// A chunk of bytecode containing instructions and metadata.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Opcodes and their operand bytes.
    pub code: Vec<u8>,
    /// Source line of every byte in `code`.
    pub lines: Vec<u32>,
    /// The constant pool.
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an opcode to the chunk.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op as u8, line);
    }

    /// Write a raw byte to the chunk.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit value to the chunk (little-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(lo, line);
        self.write_byte(hi, line);
    }

    /// Read a 16-bit value from the chunk at offset.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.code[offset], self.code[offset + 1]])
    }

    /// Patch a u16 value at the given offset.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.code[offset] = lo;
        self.code[offset + 1] = hi;
    }

    /// Append a constant and return its index. Callers enforce the pool limit.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Emit a constant load, choosing the short or long form by index.
    pub fn write_constant(&mut self, index: usize, line: u32) {
        match u8::try_from(index) {
            Ok(short) => {
                self.write_op(OpCode::Constant, line);
                self.write_byte(short, line);
            }
            Err(_) => {
                self.write_op(OpCode::ConstantLong, line);
                self.write_u16(index as u16, line);
            }
        }
    }

    /// Get the current offset in the code.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Get the line number at a given offset.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    /// Approximate heap footprint, used for GC accounting.
    pub fn byte_size(&self) -> usize {
        self.code.len()
            + self.lines.len() * std::mem::size_of::<u32>()
            + self.constants.len() * std::mem::size_of::<Value>()
    }
}
