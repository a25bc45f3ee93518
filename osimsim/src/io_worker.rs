//! Background I/O worker threads.
//!
//! Each I/O op spawns a fresh worker: it sleeps for the op's computed
//! cycle time, then posts a completion event onto the shared interrupt
//! queue. Workers never outlive the engine — `Engine` joins any
//! outstanding handles before returning.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::interrupt::{InterruptEvent, InterruptQueue};
use crate::timer::SimClock;

/// Builds the completion line for an `I`/`O` op, e.g.
/// `"Process: 2, hdd input end\n"`.
#[must_use]
pub fn completion_line(process_id: u32, op_name: &str, direction: &str) -> String {
    format!("Process: {process_id}, {op_name} {direction} end\n")
}

/// Spawns a background worker that sleeps for `cycle_time_ms`, then pushes
/// a completion event onto `queue`.
///
/// Returns the `JoinHandle` so the caller can either join it synchronously
/// (non-preemptive policies, where no interrupt is ever meant to be
/// observed) or stash it for later joining at shutdown (preemptive
/// policies).
pub fn spawn(
    queue: Arc<InterruptQueue>,
    process_id: u32,
    cycle_time_ms: u64,
    output_line: String,
) -> JoinHandle<()> {
    thread::spawn(move || {
        SimClock::sleep_ms(cycle_time_ms);
        queue.push(InterruptEvent { process_id, cycle_time: cycle_time_ms, output_line });
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_posts_interrupt_after_sleeping() {
        let queue = Arc::new(InterruptQueue::new());
        let handle = spawn(Arc::clone(&queue), 3, 5, completion_line(3, "hdd", "input"));
        assert!(!queue.peek_nonempty(), "worker should not post before its sleep elapses");
        handle.join().unwrap();
        assert!(queue.peek_nonempty());
        let events = queue.drain_all();
        assert_eq!(events[0].process_id, 3);
        assert_eq!(events[0].output_line, "Process: 3, hdd input end\n");
    }
}
