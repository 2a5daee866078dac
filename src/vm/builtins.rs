//! Native functions installed into every VM.

use super::value::Value;
use super::vm::Vm;

/// Register all built-in functions as globals.
pub fn register(vm: &mut Vm) {
    vm.define_native("println", native_println);
    vm.define_native("print", native_print);
    vm.define_native("clock", native_clock);
    vm.define_native("gc_heap_size", native_gc_heap_size);
    vm.define_native("gc_collect", native_gc_collect);
    vm.define_native("setTimeout", native_set_timeout);
}

// println(value?) - Print a value (if any) followed by a newline
fn native_println(vm: &mut Vm, args: &[Value]) -> Value {
    let mut text = match args.first() {
        Some(&value) => vm.format_value(value),
        None => String::new(),
    };
    text.push('\n');
    vm.write_output(&text);
    Value::NULL
}

// print(value?) - Print without a trailing newline
fn native_print(vm: &mut Vm, args: &[Value]) -> Value {
    if let Some(&value) = args.first() {
        let text = vm.format_value(value);
        vm.write_output(&text);
    }
    Value::NULL
}

// clock() - Seconds since the VM was created
fn native_clock(vm: &mut Vm, _args: &[Value]) -> Value {
    Value::number(vm.uptime().as_secs_f64())
}

fn native_gc_heap_size(vm: &mut Vm, _args: &[Value]) -> Value {
    Value::number(vm.heap().bytes_allocated() as f64)
}

fn native_gc_collect(vm: &mut Vm, _args: &[Value]) -> Value {
    vm.collect_garbage();
    Value::NULL
}

// setTimeout(ms, callback) - Run a zero-argument closure after a delay
fn native_set_timeout(vm: &mut Vm, args: &[Value]) -> Value {
    if let &[delay, callback] = args {
        if let Some(ms) = delay.try_number() {
            if vm.heap().is_closure(callback) {
                vm.timers.schedule(callback, ms);
            }
        }
    }
    Value::NULL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::config::VmConfig;
    use pretty_assertions::assert_eq;

    fn quiet_vm() -> Vm {
        Vm::with_config(VmConfig {
            report_errors: false,
            capture_output: true,
            ..VmConfig::default()
        })
    }

    #[test]
    fn test_println_formats_values() {
        let mut vm = quiet_vm();
        native_println(&mut vm, &[Value::number(2.5)]);
        native_println(&mut vm, &[Value::TRUE]);
        native_println(&mut vm, &[]);
        native_print(&mut vm, &[Value::NULL]);
        assert_eq!(vm.take_output(), "2.5\ntrue\n\nnull");
    }

    #[test]
    fn test_gc_builtins() {
        let mut vm = quiet_vm();
        vm.intern("transient");
        let before = native_gc_heap_size(&mut vm, &[]).as_number();
        assert_eq!(native_gc_collect(&mut vm, &[]), Value::NULL);
        let after = native_gc_heap_size(&mut vm, &[]).as_number();
        assert!(after < before);
    }

    #[test]
    fn test_set_timeout_ignores_bad_arguments() {
        let mut vm = quiet_vm();
        let not_a_closure = vm.get_global("println").unwrap();
        native_set_timeout(&mut vm, &[Value::number(1.0), not_a_closure]);
        native_set_timeout(&mut vm, &[Value::NULL, not_a_closure]);
        native_set_timeout(&mut vm, &[Value::number(1.0)]);
        assert!(vm.timers.is_empty());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut vm = quiet_vm();
        let a = native_clock(&mut vm, &[]).as_number();
        let b = native_clock(&mut vm, &[]).as_number();
        assert!(a >= 0.0 && b >= a);
    }
}
