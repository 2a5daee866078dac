//! Peridot: a dynamic-language bytecode virtual machine.
//!
//! A front end hands the compiler a syntax tree ([`ast::Program`]); the
//! compiler lowers it to bytecode, and the [`vm::Vm`] runs it with closures,
//! NaN-boxed values and a mark-and-sweep garbage collector.
//!
//! ```
//! use peridot::ast::{BinaryOp, Expr, Program, Stmt};
//! use peridot::vm::{Vm, VmConfig};
//!
//! let mut vm = Vm::with_config(VmConfig {
//!     capture_output: true,
//!     ..VmConfig::default()
//! });
//! let sum = Expr::binary(Expr::number(5.0, 1), BinaryOp::Add, Expr::number(6.0, 1), 1);
//! let program = Program::new(vec![Stmt::expression(Expr::call_named("println", vec![sum], 1))]);
//! vm.interpret(&program).unwrap();
//! assert_eq!(vm.take_output(), "11\n");
//! ```

#![allow(clippy::module_inception)]
#![allow(clippy::new_without_default)]

pub mod ast;
pub mod error;
pub mod vm;

pub use error::{CompileError, CompileErrors, PeridotError, RuntimeError, RuntimeErrorKind};
pub use vm::{Value, Vm, VmConfig};
