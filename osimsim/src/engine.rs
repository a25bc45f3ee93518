//! Engine: the top-level dispatch loop that ties every other
//! component together and produces the deterministic timeline log.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::{Config, SchedulingPolicy};
use crate::error::{EngineError, Result};
use crate::interrupt::InterruptQueue;
use crate::io_worker;
use crate::log_buffer::LogBuffer;
use crate::memory::{self, MemoryTable, MmuOutcome};
use crate::metadata::{Component, OpCode};
use crate::pcb::{Pcb, PcbTable, ProcessState};
use crate::scheduler;

/// Whether a per-op handler finished its op in place (`Continue`, the
/// dispatch loop moves on to the next op for the same process) or gave up
/// the CPU (`Return`, the engine must reselect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchControl {
    Continue,
    Return,
}

/// Per-process outcome recorded at the end of a run, used for the CLI's
/// optional machine-readable summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessSummary {
    /// The process id.
    pub id: u32,
    /// Total CPU+I/O time the process was created with.
    pub total_time_ms: i64,
    /// The state the process ended the run in (normally `Exit`).
    pub final_state: ProcessStateLabel,
}

/// Serializable mirror of [`ProcessState`] (kept separate so the core
/// state machine type doesn't have to carry a `serde` dependency just for
/// CLI output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStateLabel {
    /// See [`ProcessState::New`].
    New,
    /// See [`ProcessState::Ready`].
    Ready,
    /// See [`ProcessState::Running`].
    Running,
    /// See [`ProcessState::Blocked`].
    Blocked,
    /// See [`ProcessState::Exit`].
    Exit,
}

impl From<ProcessState> for ProcessStateLabel {
    fn from(state: ProcessState) -> Self {
        match state {
            ProcessState::New => Self::New,
            ProcessState::Ready => Self::Ready,
            ProcessState::Running => Self::Running,
            ProcessState::Blocked => Self::Blocked,
            ProcessState::Exit => Self::Exit,
        }
    }
}

/// The full result of running a simulation to completion.
#[derive(Debug)]
pub struct SimulationReport {
    /// Every timeline line, in emission order.
    pub log_lines: Vec<String>,
    /// End-of-run state for every process that was created.
    pub process_summary: Vec<ProcessSummary>,
}

/// Top-level simulator engine.
///
/// Owns every other component (C1-C7, C9): the clock, log buffer, memory
/// table, interrupt queue, PCB table, and the op-code program itself. The
/// op-code program is mutable because preemptive RR-slicing mutates the
/// `value` of the currently-executing `P` op in place — safe
/// because each process occupies disjoint indices of the same program.
pub struct Engine {
    clock: crate::timer::SimClock,
    log: LogBuffer,
    memory: MemoryTable,
    interrupts: Arc<InterruptQueue>,
    pcb_table: PcbTable,
    ops: Vec<OpCode>,
    config: Config,
    blocked: HashSet<u32>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Creates a new engine for `config` and the parsed `ops` program.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfMemory`] if the configured memory size
    /// cannot satisfy any allocation at all.
    pub fn new(config: Config, ops: Vec<OpCode>) -> Result<Self> {
        if config.mem_available_kb == 0 {
            return Err(EngineError::OutOfMemory { mem_available_kb: 0 }.into());
        }

        Ok(Self {
            clock: crate::timer::SimClock::new(),
            log: LogBuffer::new(config.log_to, config.log_file_path.clone()),
            memory: MemoryTable::new(),
            interrupts: Arc::new(InterruptQueue::new()),
            pcb_table: PcbTable::new(),
            ops,
            config,
            blocked: HashSet::new(),
            workers: Vec::new(),
        })
    }

    /// Runs the simulation to completion, returning the assembled timeline
    /// and a final summary of every process.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the log buffer to its configured file
    /// fails fatally (fatal in [`crate::log_buffer::LogTarget::File`] mode,
    /// degraded in [`crate::log_buffer::LogTarget::Both`] mode).
    pub fn run(mut self) -> Result<SimulationReport> {
        let ts = self.clock.zero();
        self.log.append(format!("  {ts}, OS: System Start\n"));

        self.log_lap("OS: Create Process Control Blocks\n");
        self.build_pcbs();
        self.log_lap("OS: All Processes initialized in NEW state\n");
        self.log_lap("OS: All Processes now set in READY state\n");

        self.dispatch_loop();

        self.log_lap("OS: System Stop\n");
        self.log.append("End Simulation - Complete\n".to_string());

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        self.log.flush()?;

        let process_summary = self
            .pcb_table
            .all()
            .iter()
            .map(|p| ProcessSummary { id: p.id, total_time_ms: p.total_time, final_state: p.state.into() })
            .collect();

        Ok(SimulationReport { log_lines: self.log.lines().to_vec(), process_summary })
    }

    /// Appends a timestamped line using the current lap time.
    fn log_lap(&mut self, body: &str) {
        let line = self.ts_line(body);
        self.log.append(line);
    }

    /// Builds `"  {lap}, {body}"` without appending it, so callers can
    /// prepend a blank line where the reference trace has one.
    fn ts_line(&self, body: &str) -> String {
        let ts = self.clock.lap();
        format!("  {ts}, {body}")
    }

    /// Parses the op-code program into PCBs: one PCB per `A(start)`,
    /// accumulating `time_remaining`/`total_time` from every P/I/O op until
    /// the matching `A(end)`; `M` ops contribute nothing (grounded in
    /// `original_source/PA04/SimUtils.c::createProcesses`).
    fn build_pcbs(&mut self) {
        let proc_rate = self.config.proc_cycle_rate_ms;
        let io_rate = self.config.io_cycle_rate_ms;
        let policy = self.config.scheduling_policy;

        let mut counter = 0u32;
        let mut current: Option<u32> = None;

        for (index, op) in self.ops.iter().enumerate() {
            match op.component {
                Component::System => {}
                Component::Application if op.name == "start" => {
                    let priority = if matches!(policy, SchedulingPolicy::FcfsN | SchedulingPolicy::FcfsP) {
                        counter
                    } else {
                        0
                    };
                    self.pcb_table.append(Pcb::new(counter, priority, index));
                    current = Some(counter);
                    counter += 1;
                }
                Component::Application => current = None, // "end"
                Component::Memory => {}
                _ => {
                    if let Some(pid) = current {
                        let cycle = cycle_time(op, proc_rate, io_rate);
                        if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                            pcb.time_remaining += cycle;
                            pcb.total_time += cycle;
                        }
                    }
                }
            }
        }
    }

    /// Top-level dispatch loop.
    fn dispatch_loop(&mut self) {
        loop {
            let has_candidate = self.pcb_table.any_ready_or_new();
            if !has_candidate && self.blocked.is_empty() {
                break;
            }

            if has_candidate {
                let pid = scheduler::select_next(&self.pcb_table, self.config.scheduling_policy)
                    .expect("any_ready_or_new just confirmed a READY/NEW candidate exists");
                self.dispatch_process(pid);
            } else {
                // All READY/NEW processes are gone but work is still
                // outstanding: spin until the interrupt queue has
                // something to service, then drain it with no running
                // process being interrupted.
                while !self.interrupts.peek_nonempty() {
                    std::thread::yield_now();
                }
                self.service_interrupts(None);
            }
        }
    }

    /// Selects `pid` to run: logs the selection/RUNNING transition, sets
    /// its state, then executes ops until it yields control back.
    fn dispatch_process(&mut self, pid: u32) {
        let time_remaining = self.pcb_table.find_by_id(pid).expect("selected pid exists").time_remaining;
        let selected_line = self.ts_line(&format!("OS: Process {pid} selected with {time_remaining} ms remaining.\n"));
        self.log.append(selected_line);

        let running_line = self.ts_line(&format!("OS: Process {pid} set in RUNNING state.\n"));
        self.log.append(running_line);
        if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
            pcb.state = ProcessState::Running;
        }

        self.run_process(pid);
    }

    /// Executes ops for `pid` until it transitions to READY (quantum
    /// expiry / interrupted), BLOCKED (I/O dispatched), or EXIT.
    fn run_process(&mut self, pid: u32) {
        loop {
            let pc = self.pcb_table.find_by_id(pid).expect("process exists while running").program_counter;
            let op = self.ops[pc].clone();

            let control = match op.component {
                Component::Application if op.name == "start" => {
                    if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                        pcb.program_counter += 1;
                    }
                    DispatchControl::Continue
                }
                Component::Application => {
                    // "end"
                    self.exit_process(pid);
                    DispatchControl::Return
                }
                Component::Memory => self.handle_memory_op(pid, pc),
                Component::Process => self.handle_process_op(pid, pc),
                Component::Input | Component::Output => self.handle_io_op(pid, pc),
                Component::System => unreachable!("system ops never appear inside a process body"),
            };

            if control == DispatchControl::Return {
                return;
            }
        }
    }

    /// Handles a single `M(allocate)`/`M(access)` op.
    fn handle_memory_op(&mut self, pid: u32, pc: usize) -> DispatchControl {
        let op = &self.ops[pc];
        let (identifier, base, offset) = memory::decode_memory_value(op.value);
        let verb = if op.name == "allocate" { "allocate" } else { "access" };

        let attempt = self.ts_line(&format!("Process: {pid}, MMU attempt to {verb} {identifier}/{base}/{offset}.\n"));
        self.log.append(attempt);

        let outcome = if op.name == "allocate" {
            self.memory.allocate(pid, identifier, base, offset, self.config.mem_available_kb)
        } else {
            self.memory.access(pid, identifier, base, offset)
        };

        match outcome {
            MmuOutcome::Ok => {
                let ok_line = self.ts_line(&format!("Process: {pid}, MMU successful {verb}.\n"));
                self.log.append(ok_line);
                if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                    pcb.program_counter += 1;
                }
                DispatchControl::Continue
            }
            MmuOutcome::Fault => {
                let fail_line = self.ts_line(&format!("Process: {pid}, MMU failed to {verb}.\n"));
                self.log.append(fail_line);
                let fault_line = self.ts_line(&format!("Process: {pid}, experiences segmentation fault.\n"));
                self.log.append(fault_line);
                self.exit_process(pid);
                DispatchControl::Return
            }
        }
    }

    /// Handles a single `P(run)` op, dispatching to the non-preemptive or
    /// preemptive (cycle-sliced) execution strategy.
    fn handle_process_op(&mut self, pid: u32, pc: usize) -> DispatchControl {
        let policy = self.config.scheduling_policy;

        let start_line = self.ts_line(&format!("Process: {pid}, run operation start\n"));
        self.log.append(format!("\n{start_line}"));

        if !policy.is_preemptive() {
            let cycle = self.ops[pc].value * i64::try_from(self.config.proc_cycle_rate_ms).unwrap_or(i64::MAX);
            #[allow(clippy::cast_sign_loss)] // cycle is always >= 0: op.value and the rate are both non-negative
            crate::timer::SimClock::sleep_ms(cycle as u64);
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.time_remaining -= cycle;
            }
            let end_line = self.ts_line(&format!("Process: {pid}, run operation end\n"));
            self.log.append(end_line);
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.program_counter += 1;
            }
            return DispatchControl::Continue;
        }

        let mut quantum_remaining: i64 =
            if matches!(policy, SchedulingPolicy::RrP) { i64::from(self.config.quantum_cycles) } else { i64::MAX };

        while quantum_remaining > 0 && self.ops[pc].value > 0 && !self.interrupts.peek_nonempty() {
            crate::timer::SimClock::sleep_ms(self.config.proc_cycle_rate_ms);
            self.ops[pc].value -= 1;
            quantum_remaining -= 1;
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.time_remaining -= i64::try_from(self.config.proc_cycle_rate_ms).unwrap_or(i64::MAX);
            }
        }

        if self.ops[pc].value == 0 {
            let end_line = self.ts_line(&format!("Process: {pid}, run operation end\n"));
            self.log.append(end_line);
            let ready_line = self.ts_line(&format!("Process: {pid}, set in READY state\n"));
            self.log.append(format!("\n{ready_line}"));
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.state = ProcessState::Ready;
                pcb.program_counter += 1;
            }
            if matches!(policy, SchedulingPolicy::RrP) {
                self.pcb_table.rotate_to_tail(pid);
            }
            return DispatchControl::Return;
        }

        if self.interrupts.peek_nonempty() {
            self.service_interrupts(Some(pid));
            if matches!(policy, SchedulingPolicy::RrP) {
                self.pcb_table.rotate_to_tail(pid);
            }
            return DispatchControl::Return;
        }

        // Quantum expired (only reachable for RR-P; every other preemptive
        // policy leaves quantum_remaining at i64::MAX). The program
        // counter is deliberately NOT advanced: RR-P requeues a
        // quantum-expired process to retry the same op on its next turn.
        let ready_line = self.ts_line(&format!("Process: {pid}, set in READY state\n"));
        self.log.append(format!("\n{ready_line}"));
        if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
            pcb.state = ProcessState::Ready;
        }
        self.pcb_table.rotate_to_tail(pid);
        DispatchControl::Return
    }

    /// Handles a single `I`/`O` op, dispatching to a synchronous join
    /// (non-preemptive) or an async worker that blocks the process
    /// (preemptive).
    fn handle_io_op(&mut self, pid: u32, pc: usize) -> DispatchControl {
        let op = self.ops[pc].clone();
        let direction = if matches!(op.component, Component::Input) { "input" } else { "output" };
        let cycle_time_ms = u64::try_from(op.value).unwrap_or(0).saturating_mul(self.config.io_cycle_rate_ms);

        let start_line = self.ts_line(&format!("Process: {pid}, {} {direction} start\n", op.name));
        self.log.append(format!("\n{start_line}"));

        if !self.config.scheduling_policy.is_preemptive() {
            let line = io_worker::completion_line(pid, &op.name, direction);
            let handle = io_worker::spawn(Arc::clone(&self.interrupts), pid, cycle_time_ms, line);
            handle.join().expect("io worker thread panicked");
            // Joined synchronously, so the event the worker just posted
            // must never be observed as an interrupt; drop it here.
            self.interrupts.drain_all();

            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                #[allow(clippy::cast_possible_wrap)]
                {
                    pcb.time_remaining -= cycle_time_ms as i64;
                }
            }
            let end_line = self.ts_line(&format!("Process: {pid}, {} {direction} end\n", op.name));
            self.log.append(end_line);
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.program_counter += 1;
            }
            DispatchControl::Continue
        } else {
            let line = io_worker::completion_line(pid, &op.name, direction);
            let handle = io_worker::spawn(Arc::clone(&self.interrupts), pid, cycle_time_ms, line);
            self.workers.push(handle);

            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                // Full cycle time is debited at dispatch, not completion:
                // the process stays charged for the whole operation even
                // though it may be interrupted and rescheduled before the
                // worker actually finishes.
                #[allow(clippy::cast_possible_wrap)]
                {
                    pcb.time_remaining -= cycle_time_ms as i64;
                }
            }

            let blocked_line = self.ts_line(&format!("OS: Process {pid} set in BLOCKED state.\n"));
            self.log.append(format!("\n{blocked_line}"));
            if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
                pcb.state = ProcessState::Blocked;
                pcb.program_counter += 1;
            }
            self.blocked.insert(pid);
            DispatchControl::Return
        }
    }

    /// Sets `pid` to EXIT and logs the termination line common to both
    /// natural completion (`A(end)`) and segment faults.
    fn exit_process(&mut self, pid: u32) {
        let line = self.ts_line(&format!("OS: Process {pid} ended and set in EXIT state.\n"));
        self.log.append(line);
        if let Some(pcb) = self.pcb_table.find_by_id_mut(pid) {
            pcb.state = ProcessState::Exit;
        }
    }

    /// Drains and services every currently queued interrupt.
    ///
    /// When `interrupted` is `Some(pid)`, `pid` was running and is being
    /// preempted by the drained completions: an extra "interrupted by"
    /// line is emitted and `pid` is set READY before the completion lines.
    /// When `None` (the idle-wait path), only the plain "Interrupt called
    /// by process N" + completion + READY lines are emitted.
    fn service_interrupts(&mut self, interrupted: Option<u32>) {
        let events = self.interrupts.drain_all();
        for event in events {
            if let Some(interrupted_pid) = interrupted {
                let interrupted_line =
                    self.ts_line(&format!("OS: Process {interrupted_pid} interrupted by process {}.", event.process_id));
                self.log.append(interrupted_line);

                let ready_line =
                    self.ts_line(&format!("OS: Process {interrupted_pid} put in READY state.\n"));
                self.log.append(format!("\n{ready_line}"));

                if let Some(pcb) = self.pcb_table.find_by_id_mut(interrupted_pid) {
                    pcb.state = ProcessState::Ready;
                }
            } else {
                let idle_line = self.ts_line(&format!("OS: Interrupt called by process {}.\n", event.process_id));
                self.log.append(idle_line);
            }

            let completion_line = self.ts_line(&event.output_line);
            self.log.append(completion_line);

            let unblocked_ready_line = self.ts_line(&format!("OS: Process {} put in READY state.\n", event.process_id));
            self.log.append(unblocked_ready_line);

            if let Some(pcb) = self.pcb_table.find_by_id_mut(event.process_id) {
                pcb.state = ProcessState::Ready;
            }
            self.blocked.remove(&event.process_id);

            if matches!(self.config.scheduling_policy, SchedulingPolicy::RrP) {
                self.pcb_table.rotate_to_tail(event.process_id);
            }
        }
    }
}

/// Computes an op's contribution to `time_remaining`/`total_time`: `P` ops
/// scale by the CPU cycle rate, `I`/`O` ops by the I/O cycle rate,
/// everything else (including `M`) contributes zero.
fn cycle_time(op: &OpCode, proc_rate_ms: u64, io_rate_ms: u64) -> i64 {
    let rate = match op.component {
        Component::Process => proc_rate_ms,
        Component::Input | Component::Output => io_rate_ms,
        Component::System | Component::Application | Component::Memory => return 0,
    };
    op.value.saturating_mul(i64::try_from(rate).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_buffer::LogTarget;
    use std::path::PathBuf;

    fn fast_config(policy: SchedulingPolicy, quantum: u32) -> Config {
        Config {
            version: "test".into(),
            meta_path: PathBuf::from("unused.mdf"),
            scheduling_policy: policy,
            quantum_cycles: quantum,
            mem_available_kb: 2048,
            proc_cycle_rate_ms: 1,
            io_cycle_rate_ms: 1,
            log_to: LogTarget::Monitor,
            log_file_path: PathBuf::from("unused.lgf"),
        }
    }

    #[test]
    fn fcfs_n_runs_single_process_to_exit() {
        let ops = crate::metadata::parse("S(start)0, A(start)0, P(run)2, A(end)0, S(end)0.").unwrap();
        let engine = Engine::new(fast_config(SchedulingPolicy::FcfsN, 4), ops).unwrap();
        let report = engine.run().unwrap();

        assert_eq!(report.process_summary.len(), 1);
        assert_eq!(report.process_summary[0].final_state, ProcessStateLabel::Exit);
        assert!(report.log_lines.iter().any(|l| l.contains("System Start")));
        assert!(report.log_lines.iter().any(|l| l.contains("System Stop")));
        assert!(report.log_lines.iter().any(|l| l.contains("run operation start")));
        assert!(report.log_lines.iter().any(|l| l.contains("run operation end")));
        assert!(report.log_lines.iter().any(|l| l.contains("ended and set in EXIT state")));
    }

    #[test]
    fn sjf_n_runs_shorter_job_first() {
        let ops = crate::metadata::parse(
            "S(start)0, A(start)0, P(run)5, A(end)0, A(start)1, P(run)2, A(end)1, S(end)0.",
        )
        .unwrap();
        let engine = Engine::new(fast_config(SchedulingPolicy::SjfN, 4), ops).unwrap();
        let report = engine.run().unwrap();

        let selected_order: Vec<u32> = report
            .log_lines
            .iter()
            .filter_map(|line| {
                line.split("Process ")
                    .nth(1)
                    .filter(|_| line.contains("selected with"))
                    .and_then(|rest| rest.split_whitespace().next())
                    .and_then(|id| id.parse().ok())
            })
            .collect();

        assert_eq!(selected_order.first(), Some(&1), "process 1 has the shorter total_time and must run first");
    }

    #[test]
    fn segment_fault_terminates_only_the_faulting_process() {
        let ops = crate::metadata::parse(
            "S(start)0, A(start)0, M(allocate)0, M(access)1000, A(end)0, S(end)0.",
        )
        .unwrap();
        let engine = Engine::new(fast_config(SchedulingPolicy::FcfsN, 4), ops).unwrap();
        let report = engine.run().unwrap();

        assert!(report.log_lines.iter().any(|l| l.contains("experiences segmentation fault")));
        assert_eq!(report.process_summary[0].final_state, ProcessStateLabel::Exit);
    }

    #[test]
    fn allocation_rejected_when_base_exceeds_available_memory() {
        let ops = crate::metadata::parse("S(start)0, A(start)0, M(allocate)2002500, A(end)0, S(end)0.").unwrap();
        let mut config = fast_config(SchedulingPolicy::FcfsN, 4);
        config.mem_available_kb = 1024;
        let engine = Engine::new(config, ops).unwrap();
        let report = engine.run().unwrap();

        assert!(report.log_lines.iter().any(|l| l.contains("MMU failed to allocate")));
    }

    #[test]
    fn out_of_memory_is_rejected_at_construction() {
        let ops = crate::metadata::parse("S(start)0, A(start)0, A(end)0, S(end)0.").unwrap();
        let mut config = fast_config(SchedulingPolicy::FcfsN, 4);
        config.mem_available_kb = 0;
        let err = Engine::new(config, ops).unwrap_err();
        assert!(matches!(err, crate::error::SimError::Engine(EngineError::OutOfMemory { .. })));
    }

    #[test]
    fn round_robin_requeues_without_advancing_program_counter_on_quantum_expiry() {
        let ops = crate::metadata::parse(
            "S(start)0, A(start)0, P(run)6, A(end)0, A(start)1, P(run)6, A(end)1, S(end)0.",
        )
        .unwrap();
        let engine = Engine::new(fast_config(SchedulingPolicy::RrP, 4), ops).unwrap();
        let report = engine.run().unwrap();

        assert_eq!(report.process_summary.len(), 2);
        assert!(report.process_summary.iter().all(|p| p.final_state == ProcessStateLabel::Exit));

        let run_starts = report.log_lines.iter().filter(|l| l.contains("run operation start")).count();
        assert!(run_starts >= 4, "each process needs at least two dispatches to exhaust 6 cycles at quantum 4");
    }
}
