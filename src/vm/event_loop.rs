//! Deferred callbacks registered with `setTimeout`.
//!
//! The queue lives inside the VM so pending callbacks are GC roots. The loop
//! runs on a current-thread tokio runtime and re-enters the VM through
//! [`Vm::call`] once each deadline passes; callbacks never overlap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::time::{Duration, Instant};

use log::debug;

use super::value::Value;
use super::vm::Vm;

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    /// Insertion order; breaks ties between equal deadlines.
    sequence: u64,
    callback: Value,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed so the max-heap yields the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Pending timer callbacks ordered by deadline, then registration order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BinaryHeap<Timer>,
    next_sequence: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once `delay_ms` milliseconds have passed. Negative or
    /// non-finite delays fire as soon as possible.
    pub fn schedule(&mut self, callback: Value, delay_ms: f64) {
        let delay = if delay_ms.is_finite() && delay_ms > 0.0 {
            Duration::from_secs_f64(delay_ms / 1000.0)
        } else {
            Duration::ZERO
        };
        self.timers.push(Timer {
            deadline: Instant::now() + delay,
            sequence: self.next_sequence,
            callback,
        });
        self.next_sequence += 1;
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.peek().map(|timer| timer.deadline)
    }

    fn pop(&mut self) -> Option<Value> {
        self.timers.pop().map(|timer| timer.callback)
    }

    /// Every pending callback, in no particular order.
    pub(crate) fn callbacks(&self) -> impl Iterator<Item = Value> + '_ {
        self.timers.iter().map(|timer| timer.callback)
    }
}

/// Drive every pending timer to completion, including timers scheduled by
/// callbacks. Returns the number of callbacks run.
///
/// A callback that fails is reported like any other runtime error and the
/// loop moves on to the next one.
pub fn run_event_loop(vm: &mut Vm) -> io::Result<usize> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut fired = 0;
    runtime.block_on(async {
        while let Some(deadline) = vm.timers.next_deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            let Some(callback) = vm.timers.pop() else {
                break;
            };
            fired += 1;
            if let Err(error) = vm.call(callback, &[]) {
                debug!("timer callback failed: {}", error);
            }
        }
    });
    Ok(fired)
}
