//! End-to-end tests: build syntax trees, compile, run, and check output.

use pretty_assertions::assert_eq;

use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, Program, Stmt, StmtKind, UnaryOp};
use crate::error::{CompileError, PeridotError, RuntimeErrorKind, TraceFrame};

use super::config::VmConfig;
use super::disassembler::disassemble;
use super::event_loop::run_event_loop;
use super::value::Value;
use super::vm::Vm;

fn test_vm() -> Vm {
    let _ = env_logger::builder().is_test(true).try_init();
    Vm::with_config(VmConfig {
        report_errors: false,
        capture_output: true,
        ..VmConfig::default()
    })
}

fn run(vm: &mut Vm, statements: Vec<Stmt>) -> Result<String, PeridotError> {
    vm.interpret(&Program::new(statements))?;
    Ok(vm.take_output())
}

fn runtime_error(result: Result<String, PeridotError>) -> RuntimeErrorKind {
    match result {
        Err(PeridotError::Runtime(error)) => error.kind,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

fn compile_errors(result: Result<String, PeridotError>) -> Vec<CompileError> {
    match result {
        Err(PeridotError::Compile(errors)) => errors.0,
        other => panic!("expected compile errors, got {:?}", other),
    }
}

fn num(n: f64) -> Expr {
    Expr::number(n, 1)
}

fn var(name: &str) -> Expr {
    Expr::variable(name, 1)
}

fn bin(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::binary(left, operator, right, 1)
}

fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    Expr::call_named(name, arguments, 1)
}

fn println(value: Expr) -> Stmt {
    Stmt::expression(call("println", vec![value]))
}

fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::assign(name, value, 1)
}

fn ret(value: Expr) -> Stmt {
    Stmt::return_value(Some(value), 1)
}

fn function(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::function(name, params, body, 1)
}

/// function make() y = 0 function inc() y = y + 1 return y end return inc end
fn make_counter() -> Stmt {
    function(
        "make",
        &[],
        vec![
            assign("y", num(0.0)),
            function(
                "inc",
                &[],
                vec![assign("y", bin(var("y"), BinaryOp::Add, num(1.0))), ret(var("y"))],
            ),
            ret(var("inc")),
        ],
    )
}

fn fib() -> Stmt {
    function(
        "fib",
        &["n"],
        vec![
            Stmt::if_else(bin(var("n"), BinaryOp::Less, num(2.0)), ret(var("n")), None, 1),
            ret(bin(
                call("fib", vec![bin(var("n"), BinaryOp::Subtract, num(1.0))]),
                BinaryOp::Add,
                call("fib", vec![bin(var("n"), BinaryOp::Subtract, num(2.0))]),
            )),
        ],
    )
}

#[test]
fn test_literal_arithmetic_precedence() {
    let mut vm = test_vm();
    let expr = bin(num(5.0), BinaryOp::Add, bin(num(2.0), BinaryOp::Multiply, num(3.0)));
    assert_eq!(run(&mut vm, vec![println(expr)]).unwrap(), "11\n");
}

#[test]
fn test_number_formatting() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            println(bin(num(1.0), BinaryOp::Divide, num(3.0))),
            println(Expr::unary(UnaryOp::Negate, num(1.0), 1)),
            println(num(1e6)),
            println(bin(num(1.0), BinaryOp::Divide, num(0.0))),
        ],
    )
    .unwrap();
    assert_eq!(out, "0.333333\n-1\n1e+06\ninf\n");
}

#[test]
fn test_shared_mutable_upvalue() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            make_counter(),
            assign("c", call("make", vec![])),
            println(call("c", vec![])),
            println(call("c", vec![])),
        ],
    )
    .unwrap();
    assert_eq!(out, "1\n2\n");
}

#[test]
fn test_closures_from_separate_calls_are_independent() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            make_counter(),
            assign("a", call("make", vec![])),
            assign("b", call("make", vec![])),
            println(call("a", vec![])),
            println(call("a", vec![])),
            println(call("b", vec![])),
        ],
    )
    .unwrap();
    assert_eq!(out, "1\n2\n1\n");
}

#[test]
fn test_block_locals_do_not_leak_into_globals() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![assign("x", num(1.0)), Stmt::block(vec![assign("y", num(2.0))], 1)],
    )
    .unwrap();
    assert_eq!(out, "");

    let kind = runtime_error(run(&mut vm, vec![println(var("y"))]));
    assert_eq!(
        kind,
        RuntimeErrorKind::UndefinedVariable {
            name: "y".to_string()
        }
    );
    assert_eq!(run(&mut vm, vec![println(var("x"))]).unwrap(), "1\n");
}

#[test]
fn test_arity_error_leaves_vm_usable() {
    let mut vm = test_vm();
    let identity = function("f", &["a"], vec![ret(var("a"))]);
    let kind = runtime_error(run(
        &mut vm,
        vec![identity, Stmt::expression(call("f", vec![num(1.0), num(2.0)]))],
    ));
    assert_eq!(kind, RuntimeErrorKind::WrongArity { expected: 1, got: 2 });
    assert!(vm.stack.is_empty());
    assert!(vm.frames.is_empty());

    assert_eq!(run(&mut vm, vec![println(call("f", vec![num(7.0)]))]).unwrap(), "7\n");
}

#[test]
fn test_runtime_error_trace_innermost_first() {
    let mut vm = test_vm();
    let program = Program::new(vec![
        Stmt::function(
            "inner",
            &[],
            vec![Stmt::return_value(
                Some(Expr::binary(Expr::number(1.0, 2), BinaryOp::Add, Expr::null(2), 2)),
                2,
            )],
            1,
        ),
        Stmt::function(
            "outer",
            &[],
            vec![Stmt::return_value(Some(Expr::call_named("inner", vec![], 4)), 4)],
            3,
        ),
        Stmt::expression(Expr::call_named("outer", vec![], 5)),
    ]);
    let error = match vm.interpret(&program) {
        Err(PeridotError::Runtime(error)) => error,
        other => panic!("expected a runtime error, got {:?}", other),
    };
    assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
    assert_eq!(
        error.trace,
        vec![
            TraceFrame {
                line: 2,
                function: Some("inner".to_string())
            },
            TraceFrame {
                line: 4,
                function: Some("outer".to_string())
            },
            TraceFrame {
                line: 5,
                function: None
            },
        ]
    );
    assert_eq!(error.line(), Some(2));
}

#[test]
fn test_type_errors() {
    let mut vm = test_vm();
    let negate_null = Expr::unary(UnaryOp::Negate, Expr::null(1), 1);
    assert_eq!(
        runtime_error(run(&mut vm, vec![println(negate_null)])),
        RuntimeErrorKind::OperandMustBeNumber
    );
    let compare = bin(Expr::string("a", 1), BinaryOp::Less, num(1.0));
    assert_eq!(
        runtime_error(run(&mut vm, vec![println(compare)])),
        RuntimeErrorKind::OperandsMustBeNumbers
    );
    let not_callable = Expr::call(num(3.0), vec![], 1);
    assert_eq!(
        runtime_error(run(&mut vm, vec![Stmt::expression(not_callable)])),
        RuntimeErrorKind::NotCallable
    );
}

#[test]
fn test_unbounded_recursion_overflows() {
    let mut vm = test_vm();
    let forever = function("r", &[], vec![ret(call("r", vec![]))]);
    let result = vm.interpret(&Program::new(vec![forever, Stmt::expression(call("r", vec![]))]));
    match result {
        Err(PeridotError::Runtime(error)) => {
            assert_eq!(error.kind, RuntimeErrorKind::StackOverflow);
            assert_eq!(error.trace.len(), vm.config().max_frames);
        }
        other => panic!("expected stack overflow, got {:?}", other),
    }
}

#[test]
fn test_return_at_top_level_is_rejected() {
    let mut vm = test_vm();
    let errors = compile_errors(run(&mut vm, vec![Stmt::return_value(None, 3)]));
    assert_eq!(errors, vec![CompileError::ReturnFromTopLevel { line: 3 }]);
}

#[test]
fn test_own_initializer_is_rejected() {
    let mut vm = test_vm();
    let block = Stmt::block(vec![assign("z", bin(var("z"), BinaryOp::Add, num(1.0)))], 1);
    let errors = compile_errors(run(&mut vm, vec![block]));
    assert_eq!(
        errors,
        vec![CompileError::OwnInitializer {
            name: "z".to_string(),
            line: 1
        }]
    );
}

#[test]
fn test_errors_accumulate_across_nested_functions() {
    let mut vm = test_vm();
    let property = Expr::new(
        ExprKind::Property {
            object: Box::new(var("obj")),
            name: "field".to_string(),
        },
        2,
    );
    let errors = compile_errors(run(
        &mut vm,
        vec![
            function("f", &[], vec![Stmt::expression(property)]),
            Stmt::return_value(None, 4),
            println(num(1.0)),
        ],
    ));
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], CompileError::Unsupported { line: 2, .. }));
    assert_eq!(errors[1], CompileError::ReturnFromTopLevel { line: 4 });
    // Nothing ran.
    assert_eq!(vm.take_output(), "");
}

#[test]
fn test_while_loop() {
    let mut vm = test_vm();
    let body = Stmt::block(
        vec![
            assign("sum", bin(var("sum"), BinaryOp::Add, var("i"))),
            assign("i", bin(var("i"), BinaryOp::Add, num(1.0))),
        ],
        1,
    );
    let out = run(
        &mut vm,
        vec![
            assign("i", num(0.0)),
            assign("sum", num(0.0)),
            Stmt::while_loop(bin(var("i"), BinaryOp::Less, num(5.0)), body, 1),
            println(var("sum")),
        ],
    )
    .unwrap();
    assert_eq!(out, "10\n");
}

#[test]
fn test_if_else_branches() {
    let mut vm = test_vm();
    let choose = |condition: bool| {
        Stmt::if_else(
            Expr::boolean(condition, 1),
            println(Expr::string("yes", 1)),
            Some(println(Expr::string("no", 1))),
            1,
        )
    };
    assert_eq!(run(&mut vm, vec![choose(true), choose(false)]).unwrap(), "yes\nno\n");
}

#[test]
fn test_logical_operators_keep_deciding_operand() {
    let mut vm = test_vm();
    let logical = |left: Expr, operator: LogicalOp, right: Expr| Expr::logical(left, operator, right, 1);
    let out = run(
        &mut vm,
        vec![
            println(logical(Expr::null(1), LogicalOp::Or, num(3.0))),
            println(logical(num(0.0), LogicalOp::And, num(1.0))),
            println(logical(num(1.0), LogicalOp::And, num(2.0))),
            println(logical(num(4.0), LogicalOp::Or, Expr::call(num(9.0), vec![], 1))),
            println(logical(Expr::boolean(false, 1), LogicalOp::Or, Expr::boolean(false, 1))),
        ],
    )
    .unwrap();
    assert_eq!(out, "3\n0\n2\n4\nfalse\n");
}

#[test]
fn test_ternary_and_not() {
    let mut vm = test_vm();
    let ternary = Expr::ternary(
        bin(num(1.0), BinaryOp::Less, num(2.0)),
        num(10.0),
        num(20.0),
        1,
    );
    let out = run(
        &mut vm,
        vec![
            println(ternary),
            println(Expr::unary(UnaryOp::Not, num(0.0), 1)),
            println(Expr::unary(UnaryOp::Not, Expr::string("", 1), 1)),
        ],
    )
    .unwrap();
    // 0 is falsy; the empty string is an object and therefore truthy.
    assert_eq!(out, "10\ntrue\nfalse\n");
}

#[test]
fn test_bitwise_operators() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            println(bin(num(6.0), BinaryOp::BitAnd, num(3.0))),
            println(bin(num(6.0), BinaryOp::BitOr, num(3.0))),
            println(bin(num(5.0), BinaryOp::BitXor, num(1.0))),
            println(bin(num(1.0), BinaryOp::ShiftLeft, num(4.0))),
            println(bin(
                Expr::unary(UnaryOp::Negate, num(8.0), 1),
                BinaryOp::ShiftRight,
                num(1.0),
            )),
            println(Expr::unary(UnaryOp::BitNot, num(0.0), 1)),
        ],
    )
    .unwrap();
    assert_eq!(out, "2\n7\n4\n16\n-4\n-1\n");
}

#[test]
fn test_equality_and_interned_strings() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            assign("a", Expr::string("hi", 1)),
            assign("b", Expr::string("hi", 1)),
            println(bin(var("a"), BinaryOp::Equal, var("b"))),
            println(bin(var("a"), BinaryOp::NotEqual, Expr::string("ho", 1))),
            println(bin(Expr::null(1), BinaryOp::Equal, Expr::boolean(false, 1))),
        ],
    )
    .unwrap();
    assert_eq!(out, "true\ntrue\nfalse\n");
}

#[test]
fn test_nan_equality_is_bitwise() {
    // NaN compares by bit pattern, so the same NaN equals itself.
    let mut vm = test_vm();
    let nan = || bin(num(0.0), BinaryOp::Divide, num(0.0));
    let out = run(&mut vm, vec![println(bin(nan(), BinaryOp::Equal, nan()))]).unwrap();
    assert_eq!(out, "true\n");
}

#[test]
fn test_recursive_global_function() {
    let mut vm = test_vm();
    let out = run(&mut vm, vec![fib(), println(call("fib", vec![num(20.0)]))]).unwrap();
    assert_eq!(out, "6765\n");
}

#[test]
fn test_recursive_local_function() {
    let mut vm = test_vm();
    let countdown = function(
        "down",
        &["n"],
        vec![
            Stmt::if_else(bin(var("n"), BinaryOp::Equal, num(0.0)), ret(num(0.0)), None, 1),
            ret(bin(
                call("down", vec![bin(var("n"), BinaryOp::Subtract, num(1.0))]),
                BinaryOp::Add,
                num(1.0),
            )),
        ],
    );
    let outer = function("outer", &[], vec![countdown, ret(call("down", vec![num(3.0)]))]);
    let out = run(&mut vm, vec![outer, println(call("outer", vec![]))]).unwrap();
    assert_eq!(out, "3\n");
}

#[test]
fn test_block_capture_is_closed_at_scope_exit() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            assign("g", Expr::null(1)),
            Stmt::block(
                vec![
                    assign("v", num(10.0)),
                    function("get", &[], vec![ret(var("v"))]),
                    assign("g", var("get")),
                ],
                1,
            ),
            println(call("g", vec![])),
        ],
    )
    .unwrap();
    assert_eq!(out, "10\n");
}

#[test]
fn test_scope_exit_batches_pops() {
    let mut vm = test_vm();
    let program = Program::new(vec![Stmt::block(
        vec![
            assign("a", num(1.0)),
            assign("b", num(2.0)),
            assign("c", num(3.0)),
            println(bin(bin(var("a"), BinaryOp::Add, var("b")), BinaryOp::Add, var("c"))),
        ],
        1,
    )]);
    let function = vm.compile(&program).unwrap();
    assert!(disassemble(vm.heap(), function).contains("POPN                 3"));

    vm.execute(function).unwrap();
    assert_eq!(vm.take_output(), "6\n");
    assert!(vm.stack.is_empty());
}

#[test]
fn test_globals_persist_across_units() {
    let mut vm = test_vm();
    run(&mut vm, vec![assign("x", num(41.0))]).unwrap();
    let out = run(&mut vm, vec![println(bin(var("x"), BinaryOp::Add, num(1.0)))]).unwrap();
    assert_eq!(out, "42\n");
    assert_eq!(vm.get_global("x"), Some(Value::number(41.0)));
}

#[test]
fn test_nested_block_reads_defined_global() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            assign("total", num(1.0)),
            Stmt::block(vec![assign("total", num(5.0))], 1),
            println(var("total")),
        ],
    )
    .unwrap();
    assert_eq!(out, "5\n");
}

#[test]
fn test_file_name_and_class_stub() {
    let mut vm = test_vm();
    let program = Program::with_file(
        "main.pd",
        vec![
            Stmt::new(
                StmtKind::Class {
                    name: "Point".to_string(),
                },
                1,
            ),
            println(Expr::new(ExprKind::File, 2)),
        ],
    );
    vm.interpret(&program).unwrap();
    assert_eq!(vm.take_output(), "main.pd\n");
}

#[test]
fn test_function_values_print_by_name() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![function("f", &[], vec![]), println(var("f")), println(var("clock")), println(call("f", vec![]))],
    )
    .unwrap();
    assert_eq!(out, "<function f>\n<native function clock>\nnull\n");
}

#[test]
fn test_host_call_entry_point() {
    let mut vm = test_vm();
    run(&mut vm, vec![fib()]).unwrap();
    let fib = vm.get_global("fib").unwrap();
    let result = vm.call(fib, &[Value::number(10.0)]).unwrap();
    assert_eq!(result, Value::number(55.0));
    assert!(vm.stack.is_empty());

    let println = vm.get_global("println").unwrap();
    assert_eq!(vm.call(println, &[Value::TRUE]).unwrap(), Value::NULL);
    assert_eq!(vm.take_output(), "true\n");

    let error = vm.call(fib, &[]).unwrap_err();
    assert_eq!(error.kind, RuntimeErrorKind::WrongArity { expected: 1, got: 0 });
}

#[test]
fn test_set_timeout_runs_after_script() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            function("later", &[], vec![println(Expr::string("later", 1))]),
            function("broken", &[], vec![println(bin(num(1.0), BinaryOp::Add, Expr::null(1)))]),
            Stmt::expression(call("setTimeout", vec![num(5.0), var("later")])),
            Stmt::expression(call("setTimeout", vec![num(1.0), var("broken")])),
            println(Expr::string("now", 1)),
        ],
    )
    .unwrap();
    assert_eq!(out, "now\n");
    assert_eq!(vm.timers.len(), 2);

    // The failing callback is reported and the loop keeps going.
    assert_eq!(run_event_loop(&mut vm).unwrap(), 2);
    assert_eq!(vm.take_output(), "later\n");
    assert!(vm.timers.is_empty());
}

#[test]
fn test_gc_collect_during_execution_keeps_live_values() {
    let mut vm = test_vm();
    let out = run(
        &mut vm,
        vec![
            make_counter(),
            assign("c", call("make", vec![])),
            assign("s", Expr::string("kept", 1)),
            Stmt::expression(call("gc_collect", vec![])),
            println(call("c", vec![])),
            println(var("s")),
        ],
    )
    .unwrap();
    assert_eq!(out, "1\nkept\n");
}

#[test]
fn test_bare_branch_locals_do_not_shift_later_slots() {
    let mut vm = test_vm();
    let branchy = function(
        "f",
        &["c"],
        vec![
            Stmt::if_else(
                var("c"),
                assign("z", num(5.0)),
                Some(assign("u", num(6.0))),
                1,
            ),
            Stmt::if_else(var("c"), assign("z", num(5.0)), None, 1),
            assign("w", num(7.0)),
            ret(var("w")),
        ],
    );
    let skipped_loop = function(
        "g",
        &[],
        vec![
            Stmt::while_loop(Expr::boolean(false, 1), assign("q", num(9.0)), 1),
            assign("k", num(42.0)),
            ret(var("k")),
        ],
    );
    let out = run(
        &mut vm,
        vec![
            branchy,
            skipped_loop,
            println(call("f", vec![Expr::boolean(false, 1)])),
            println(call("f", vec![Expr::boolean(true, 1)])),
            println(call("g", vec![])),
        ],
    )
    .unwrap();
    assert_eq!(out, "7\n7\n42\n");
    assert!(vm.stack.is_empty());
}

#[test]
fn test_inner_block_assignment_shadows_outer_local() {
    let mut vm = test_vm();
    let shadowing = function(
        "f",
        &[],
        vec![
            assign("a", num(1.0)),
            Stmt::block(vec![assign("a", num(2.0)), println(var("a"))], 1),
            ret(var("a")),
        ],
    );
    let same_scope = function(
        "h",
        &[],
        vec![assign("a", num(1.0)), assign("a", num(2.0)), ret(var("a"))],
    );
    let out = run(
        &mut vm,
        vec![
            shadowing,
            same_scope,
            println(call("f", vec![])),
            println(call("h", vec![])),
        ],
    )
    .unwrap();
    assert_eq!(out, "2\n1\n2\n");
}

#[test]
fn test_too_many_locals() {
    let mut vm = test_vm();
    // Slot 0 holds the callee, so the 256th named local is one too many.
    let body = (0..256).map(|i| assign(&format!("v{}", i), num(0.0))).collect();
    let errors = compile_errors(run(&mut vm, vec![function("f", &[], body)]));
    assert_eq!(errors, vec![CompileError::TooManyLocals { line: 1 }]);
}

/// Statements whose bytecode is well past the 2-byte jump range.
fn oversized_block() -> Stmt {
    Stmt::block((0..10_000).map(|_| println(num(1.0))).collect(), 1)
}

#[test]
fn test_jump_too_large() {
    let mut vm = test_vm();
    let program = Program::new(vec![Stmt::if_else(
        Expr::boolean(true, 1),
        oversized_block(),
        None,
        1,
    )]);
    let errors = vm.compile(&program).unwrap_err().0;
    assert_eq!(errors, vec![CompileError::JumpTooLarge { line: 1 }]);
}

#[test]
fn test_loop_too_large() {
    let mut vm = test_vm();
    let program = Program::new(vec![Stmt::while_loop(
        Expr::boolean(false, 1),
        oversized_block(),
        1,
    )]);
    let errors = vm.compile(&program).unwrap_err().0;
    assert_eq!(
        errors,
        vec![
            CompileError::LoopTooLarge { line: 1 },
            CompileError::JumpTooLarge { line: 1 },
        ]
    );
}

#[test]
fn test_too_many_constants() {
    let mut vm = test_vm();
    let statements = (0..=u16::MAX as usize + 1)
        .map(|i| Stmt::expression(num(i as f64 + 0.5)))
        .collect();
    let errors = vm.compile(&Program::new(statements)).unwrap_err().0;
    assert_eq!(errors, vec![CompileError::TooManyConstants { line: 1 }]);
}

#[test]
fn test_long_constant_and_closure_operands_execute() {
    let mut vm = test_vm();
    let mut statements: Vec<Stmt> = (0..300).map(|i| Stmt::expression(num(i as f64 + 0.5))).collect();
    statements.push(function("half", &[], vec![ret(num(7.5))]));
    statements.push(println(call("half", vec![])));
    statements.push(println(num(1234.5)));

    let function = vm.compile(&Program::new(statements)).unwrap();
    let listing = disassemble(vm.heap(), function);
    assert!(listing.contains("CLOSURE_LONG"));
    assert!(listing.contains("CONSTANT_LONG"));

    vm.execute(function).unwrap();
    assert_eq!(vm.take_output(), "7.5\n1234.5\n");
}

#[test]
fn test_call_without_room_for_locals_overflows() {
    let params: Vec<String> = (0..255).map(|i| format!("p{}", i)).collect();
    let params: Vec<&str> = params.iter().map(String::as_str).collect();
    let wide = || function("wide", &params, vec![ret(var("p0"))]);
    let args = || (0..255).map(|_| num(1.0)).collect::<Vec<_>>();

    let mut vm = test_vm();
    let out = run(&mut vm, vec![wide(), println(call("wide", args()))]).unwrap();
    assert_eq!(out, "1\n");

    // Two frames give 512 slots; 257 are in use before the call.
    let mut small = Vm::with_config(VmConfig {
        report_errors: false,
        capture_output: true,
        max_frames: 2,
        ..VmConfig::default()
    });
    let kind = runtime_error(run(&mut small, vec![wide(), println(call("wide", args()))]));
    assert_eq!(kind, RuntimeErrorKind::StackOverflow);
    assert!(small.stack.is_empty());
}
