//! Bytecode instruction set.
//!
//! One byte per opcode; multi-byte operands are little-endian.

/// Opcodes for the bytecode virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ============ Constants & Stack ============
    /// Load a constant: CONSTANT <index:u8>
    Constant = 0,
    /// Load a constant: CONSTANT_LONG <index:u16>
    ConstantLong,
    Null,
    True,
    False,
    PushNegOne,
    PushZero,
    PushOne,
    PushTwo,
    PushThree,
    PushFour,
    PushFive,
    Pop,
    /// Pop several values: POPN <count:u8>
    PopN,

    // ============ Variables ============
    /// GET_LOCAL <slot:u8>
    GetLocal,
    /// SET_LOCAL <slot:u8>
    SetLocal,
    /// GET_GLOBAL <slot:u16>
    GetGlobal,
    /// SET_GLOBAL <slot:u16>
    SetGlobal,
    /// GET_UPVALUE <index:u8>
    GetUpvalue,
    /// SET_UPVALUE <index:u8>
    SetUpvalue,
    /// Close the upvalue pointing at the top slot, then pop it.
    CloseUpvalue,

    // ============ Arithmetic ============
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,

    // ============ Bitwise ============
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,

    // ============ Comparison ============
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // ============ Logic ============
    Not,
    /// Short-circuit and: AND <offset:u16>, keeps the value when jumping
    And,
    /// Short-circuit or: OR <offset:u16>, keeps the value when jumping
    Or,

    // ============ Control Flow ============
    /// JUMP <offset:u16>
    Jump,
    /// Jump if false (and pop): JUMP_IF_FALSE <offset:u16>
    JumpIfFalse,
    /// Backward jump: LOOP <offset:u16>
    Loop,

    // ============ Functions ============
    /// CALL <argc:u8>
    Call,
    /// CLOSURE <index:u8> followed by (is_local, index) byte pairs
    Closure,
    /// CLOSURE_LONG <index:u16> followed by (is_local, index) byte pairs
    ClosureLong,
    Return,
    ReturnNull,
}

const LAST_OPCODE: u8 = OpCode::ReturnNull as u8;

const ALL_OPCODES: [OpCode; LAST_OPCODE as usize + 1] = [
    OpCode::Constant,
    OpCode::ConstantLong,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::PushNegOne,
    OpCode::PushZero,
    OpCode::PushOne,
    OpCode::PushTwo,
    OpCode::PushThree,
    OpCode::PushFour,
    OpCode::PushFive,
    OpCode::Pop,
    OpCode::PopN,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::GetUpvalue,
    OpCode::SetUpvalue,
    OpCode::CloseUpvalue,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Negate,
    OpCode::ShiftLeft,
    OpCode::ShiftRight,
    OpCode::BitAnd,
    OpCode::BitOr,
    OpCode::BitXor,
    OpCode::BitNot,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Less,
    OpCode::LessEqual,
    OpCode::Greater,
    OpCode::GreaterEqual,
    OpCode::Not,
    OpCode::And,
    OpCode::Or,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::Loop,
    OpCode::Call,
    OpCode::Closure,
    OpCode::ClosureLong,
    OpCode::Return,
    OpCode::ReturnNull,
];

impl OpCode {
    /// Number of fixed operand bytes. `Closure` additionally carries two bytes
    /// per upvalue of the function it creates.
    pub fn operand_size(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::PopN
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Call
            | OpCode::Closure => 1,

            OpCode::ConstantLong
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::And
            | OpCode::Or
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::Loop
            | OpCode::ClosureLong => 2,

            _ => 0,
        }
    }

    /// Convert from u8 to OpCode.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        ALL_OPCODES.get(byte as usize).copied()
    }

    /// Upper-case mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantLong => "CONSTANT_LONG",
            OpCode::Null => "NULL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::PushNegOne => "PUSH_NEG_ONE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::PushTwo => "PUSH_TWO",
            OpCode::PushThree => "PUSH_THREE",
            OpCode::PushFour => "PUSH_FOUR",
            OpCode::PushFive => "PUSH_FIVE",
            OpCode::Pop => "POP",
            OpCode::PopN => "POPN",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetUpvalue => "GET_UPVALUE",
            OpCode::SetUpvalue => "SET_UPVALUE",
            OpCode::CloseUpvalue => "CLOSE_UPVALUE",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUB",
            OpCode::Multiply => "MUL",
            OpCode::Divide => "DIV",
            OpCode::Negate => "NEGATE",
            OpCode::ShiftLeft => "SHL",
            OpCode::ShiftRight => "SHR",
            OpCode::BitAnd => "BAND",
            OpCode::BitOr => "BOR",
            OpCode::BitXor => "BXOR",
            OpCode::BitNot => "BNOT",
            OpCode::Equal => "EQ",
            OpCode::NotEqual => "NE",
            OpCode::Less => "LT",
            OpCode::LessEqual => "LE",
            OpCode::Greater => "GT",
            OpCode::GreaterEqual => "GE",
            OpCode::Not => "NOT",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Loop => "LOOP",
            OpCode::Call => "CALL",
            OpCode::Closure => "CLOSURE",
            OpCode::ClosureLong => "CLOSURE_LONG",
            OpCode::Return => "RETURN",
            OpCode::ReturnNull => "RETURN_NULL",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
