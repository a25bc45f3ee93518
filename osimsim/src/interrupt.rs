//! Mutex-protected queue of I/O-completion events.
//!
//! The interrupt queue is the *only* cross-thread channel in the simulator:
//! I/O worker threads push completion events, the engine thread drains
//! them. `push`/`drain_all` go through the mutex; a plain `peek_nonempty`
//! read is sound because workers only append and the engine only drains —
//! a momentarily stale "empty" observation is corrected on the engine's
//! next poll, which happens every `proc_cycle_rate` ms.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A single I/O-completion event, posted by a worker thread.
#[derive(Debug, Clone)]
pub struct InterruptEvent {
    /// The process whose I/O completed.
    pub process_id: u32,
    /// The cycle time (ms) the completed operation took.
    pub cycle_time: u64,
    /// The fully formatted completion line the worker computed for the
    /// timeline log.
    pub output_line: String,
}

/// Engine-scoped, mutex-protected FIFO queue of completion events.
///
/// This is a plain field on [`crate::engine::Engine`], not global/static
/// state — its lifetime is exactly one simulation run.
#[derive(Debug, Default)]
pub struct InterruptQueue {
    events: Mutex<VecDeque<InterruptEvent>>,
}

impl InterruptQueue {
    /// Creates an empty interrupt queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a completion event onto the tail of the queue. Called by I/O
    /// worker threads.
    pub fn push(&self, event: InterruptEvent) {
        self.events.lock().expect("interrupt queue mutex poisoned").push_back(event);
    }

    /// Returns whether the queue currently holds any events.
    ///
    /// This is a lock-free-in-spirit observation point for the engine's
    /// idle spin; taking the mutex here too would be correct but the
    /// existing `lock()` is already cheap enough that we just reuse it —
    /// see the module doc for why a momentarily stale read is harmless.
    #[must_use]
    pub fn peek_nonempty(&self) -> bool {
        !self.events.lock().expect("interrupt queue mutex poisoned").is_empty()
    }

    /// Removes and returns all queued events, in FIFO push order.
    pub fn drain_all(&self) -> Vec<InterruptEvent> {
        let mut guard = self.events.lock().expect("interrupt queue mutex poisoned");
        guard.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_all_returns_events_in_fifo_order() {
        let queue = InterruptQueue::new();
        queue.push(InterruptEvent { process_id: 0, cycle_time: 10, output_line: "a".into() });
        queue.push(InterruptEvent { process_id: 1, cycle_time: 20, output_line: "b".into() });

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].process_id, 0);
        assert_eq!(drained[1].process_id, 1);
        assert!(!queue.peek_nonempty());
    }

    #[test]
    fn peek_nonempty_reflects_pushes() {
        let queue = InterruptQueue::new();
        assert!(!queue.peek_nonempty());
        queue.push(InterruptEvent { process_id: 0, cycle_time: 1, output_line: String::new() });
        assert!(queue.peek_nonempty());
    }
}
