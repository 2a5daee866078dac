//! Error types for compilation and execution.

use std::fmt;

use thiserror::Error;

/// A semantic error found while lowering the syntax tree.
///
/// These never stop compilation; the compiler records them and keeps going so
/// a single run reports everything it can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("[line {line}] Too many local variables in function.")]
    TooManyLocals { line: u32 },

    #[error("[line {line}] Cannot have more than 255 parameters.")]
    TooManyParameters { line: u32 },

    #[error("[line {line}] Cannot have more than 255 arguments.")]
    TooManyArguments { line: u32 },

    #[error("[line {line}] Too many closure variables in function.")]
    TooManyUpvalues { line: u32 },

    #[error("[line {line}] Too many constants in one chunk.")]
    TooManyConstants { line: u32 },

    #[error("[line {line}] Too many global variables.")]
    TooManyGlobals { line: u32 },

    #[error("[line {line}] Cannot return from top-level code.")]
    ReturnFromTopLevel { line: u32 },

    #[error("[line {line}] Cannot read local variable '{name}' in its own initializer.")]
    OwnInitializer { name: String, line: u32 },

    #[error("[line {line}] Too much code to jump over.")]
    JumpTooLarge { line: u32 },

    #[error("[line {line}] Loop body too large.")]
    LoopTooLarge { line: u32 },

    #[error("[line {line}] {what} is not supported.")]
    Unsupported { what: String, line: u32 },
}

impl CompileError {
    pub fn line(&self) -> u32 {
        match self {
            Self::TooManyLocals { line }
            | Self::TooManyParameters { line }
            | Self::TooManyArguments { line }
            | Self::TooManyUpvalues { line }
            | Self::TooManyConstants { line }
            | Self::TooManyGlobals { line }
            | Self::ReturnFromTopLevel { line }
            | Self::OwnInitializer { line, .. }
            | Self::JumpTooLarge { line }
            | Self::LoopTooLarge { line }
            | Self::Unsupported { line, .. } => *line,
        }
    }
}

/// Every error from one compilation unit. Execution is refused when non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Found {} compilation errors, aborting.", .0.len())]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }
}

/// What went wrong at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {got}.")]
    WrongArity { expected: usize, got: usize },

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String },
}

/// One line of a runtime stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub line: u32,
    /// `None` for the top-level script.
    pub function: Option<String>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "[line {}] in {}()", self.line, name),
            None => write!(f, "[line {}] in script", self.line),
        }
    }
}

/// A runtime failure together with the frames that were active, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub trace: Vec<TraceFrame>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, trace: Vec<TraceFrame>) -> Self {
        Self { kind, trace }
    }

    /// Line of the innermost frame, if any frame was active.
    pub fn line(&self) -> Option<u32> {
        self.trace.first().map(|frame| frame.line)
    }
}

/// A unified error type for both phases.
#[derive(Debug, Error)]
pub enum PeridotError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileErrors),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
