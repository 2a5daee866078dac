//! VM tuning knobs.

/// Operand stack slots budgeted per call frame.
pub const FRAME_SLOTS: usize = 256;

/// Configuration for a [`Vm`](super::Vm) instance.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Live bytes that trigger the first collection.
    pub initial_gc_threshold: usize,
    /// After a collection the next threshold is `live_bytes * gc_growth_factor`.
    pub gc_growth_factor: usize,
    /// Collect before every allocation.
    pub stress_gc: bool,
    /// Maximum call depth. The operand stack is bounded at `max_frames * 256`
    /// slots; a call that would leave less than 256 free slots overflows.
    pub max_frames: usize,
    /// Print runtime errors and their trace to stderr.
    pub report_errors: bool,
    /// Send builtin output to an in-memory buffer instead of stdout.
    pub capture_output: bool,
    /// Log the disassembly of every compiled unit at debug level.
    pub dump_bytecode: bool,
}

impl VmConfig {
    pub fn stack_max(&self) -> usize {
        self.max_frames * FRAME_SLOTS
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            initial_gc_threshold: 1024 * 1024,
            gc_growth_factor: 2,
            stress_gc: cfg!(feature = "gc-stress"),
            max_frames: 64,
            report_errors: true,
            capture_output: false,
            dump_bytecode: false,
        }
    }
}
