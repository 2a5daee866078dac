//! Bytecode disassembler for debug output.

use super::chunk::Chunk;
use super::heap::{Heap, ObjRef};
use super::object::{format_value, Object};
use super::opcode::OpCode;

/// Disassemble a function and every function nested in its constants.
pub fn disassemble(heap: &Heap, function: ObjRef) -> String {
    let proto = heap.function(function);
    let name = match proto.name {
        Some(name) => heap.string(name).chars.to_string(),
        None => "<script>".to_string(),
    };
    let mut out = format!(
        "== {} (arity={}, upvalues={}) ==\n",
        name, proto.arity, proto.upvalue_count
    );

    let chunk = &proto.chunk;
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(heap, chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }

    // Recursively disassemble nested functions
    for constant in &chunk.constants {
        if let Some(handle) = constant.try_object() {
            if let Object::Function(_) = heap.get(handle) {
                out.push('\n');
                out.push_str(&disassemble(heap, handle));
            }
        }
    }
    out
}

/// Render the instruction at `offset`. Returns the text and the offset of the
/// next instruction.
pub fn disassemble_instruction(heap: &Heap, chunk: &Chunk, offset: usize) -> (String, usize) {
    let line = chunk.line_at(offset);
    let line_str = if offset > 0 && chunk.line_at(offset - 1) == line {
        "   |".to_string()
    } else {
        format!("{:4}", line)
    };
    let prefix = format!("{:04} {} ", offset, line_str);

    let byte = chunk.code[offset];
    let op = match OpCode::from_u8(byte) {
        Some(op) => op,
        None => return (format!("{}UNKNOWN {}", prefix, byte), offset + 1),
    };
    let operand_at = offset + 1;

    let (text, next) = match op {
        OpCode::Constant | OpCode::ConstantLong => {
            let (index, next) = read_operand(chunk, op, operand_at);
            let value = format_value(heap, chunk.constants[index]);
            (format!("{:<16} {:>5} '{}'", op.name(), index, value), next)
        }
        OpCode::Jump | OpCode::JumpIfFalse | OpCode::And | OpCode::Or => {
            let (jump, next) = read_operand(chunk, op, operand_at);
            (format!("{:<16} {:>5} -> {}", op.name(), offset, next + jump), next)
        }
        OpCode::Loop => {
            let (jump, next) = read_operand(chunk, op, operand_at);
            (format!("{:<16} {:>5} -> {}", op.name(), offset, next - jump), next)
        }
        OpCode::Closure | OpCode::ClosureLong => {
            let (index, mut next) = read_operand(chunk, op, operand_at);
            let function = chunk.constants[index];
            let mut text = format!(
                "{:<16} {:>5} {}",
                op.name(),
                index,
                format_value(heap, function)
            );
            let upvalue_count = heap.function(function.as_object()).upvalue_count;
            for _ in 0..upvalue_count {
                let kind = if chunk.code[next] == 1 { "local" } else { "upvalue" };
                text.push_str(&format!(
                    "\n{:04}    |                     {} {}",
                    next, kind, chunk.code[next + 1]
                ));
                next += 2;
            }
            (text, next)
        }
        _ if op.operand_size() > 0 => {
            let (operand, next) = read_operand(chunk, op, operand_at);
            (format!("{:<16} {:>5}", op.name(), operand), next)
        }
        _ => (op.name().to_string(), operand_at),
    };
    (format!("{}{}", prefix, text), next)
}

fn read_operand(chunk: &Chunk, op: OpCode, at: usize) -> (usize, usize) {
    match op.operand_size() {
        2 => (chunk.read_u16(at) as usize, at + 2),
        _ => (chunk.code[at] as usize, at + 1),
    }
}
