//! Process control blocks: the per-process state machine and the
//! insertion-ordered table that holds them.

/// The lifecycle state of a simulated process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Created but not yet admitted to the ready set.
    New,
    /// Admitted, waiting for the CPU.
    Ready,
    /// Currently holding the CPU.
    Running,
    /// Waiting on an outstanding I/O operation.
    Blocked,
    /// Terminated; never rescheduled.
    Exit,
}

/// A process control block.
#[derive(Debug, Clone)]
pub struct Pcb {
    /// Unique id, assigned in creation order.
    pub id: u32,
    /// Equal to `id` for FCFS variants, `0` otherwise; reserved for future
    /// use beyond that.
    pub priority: u32,
    /// Current lifecycle state.
    pub state: ProcessState,
    /// Index into the shared op-code program of the *next* op to execute.
    pub program_counter: usize,
    /// Milliseconds of CPU+I/O still owed.
    pub time_remaining: i64,
    /// Initial sum of CPU+I/O time, immutable after creation.
    pub total_time: i64,
}

impl Pcb {
    /// Creates a new PCB in the [`ProcessState::New`] state.
    #[must_use]
    pub fn new(id: u32, priority: u32, program_counter: usize) -> Self {
        Self { id, priority, state: ProcessState::New, program_counter, time_remaining: 0, total_time: 0 }
    }
}

/// Insertion-ordered collection of PCBs, with the handful of lookup/rotate
/// operations the scheduler needs.
#[derive(Debug, Default)]
pub struct PcbTable {
    processes: Vec<Pcb>,
}

impl PcbTable {
    /// Creates an empty PCB table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a PCB to the end of the table.
    pub fn append(&mut self, pcb: Pcb) {
        self.processes.push(pcb);
    }

    /// Returns a reference to every PCB, in table order.
    #[must_use]
    pub fn all(&self) -> &[Pcb] {
        &self.processes
    }

    /// Finds a PCB by id.
    #[must_use]
    pub fn find_by_id(&self, id: u32) -> Option<&Pcb> {
        self.processes.iter().find(|p| p.id == id)
    }

    /// Finds a mutable PCB by id.
    pub fn find_by_id_mut(&mut self, id: u32) -> Option<&mut Pcb> {
        self.processes.iter_mut().find(|p| p.id == id)
    }

    /// Returns the first PCB (in current table order) whose state is
    /// [`ProcessState::Ready`] or [`ProcessState::New`].
    #[must_use]
    pub fn find_next_ready_linear(&self) -> Option<u32> {
        self.processes
            .iter()
            .find(|p| matches!(p.state, ProcessState::Ready | ProcessState::New))
            .map(|p| p.id)
    }

    /// Returns the id of the READY/NEW PCB with the minimum value of
    /// `key`, breaking ties by keeping the first one encountered (which is
    /// equivalent to FCFS for equal keys).
    pub fn find_min_by<K: PartialOrd>(&self, key: impl Fn(&Pcb) -> K) -> Option<u32> {
        self.processes
            .iter()
            .filter(|p| matches!(p.state, ProcessState::Ready | ProcessState::New))
            .fold(None::<(&Pcb, K)>, |best, candidate| {
                let candidate_key = key(candidate);
                match best {
                    None => Some((candidate, candidate_key)),
                    Some((_, ref best_key)) if candidate_key < *best_key => Some((candidate, candidate_key)),
                    Some(existing) => Some(existing),
                }
            })
            .map(|(pcb, _)| pcb.id)
    }

    /// Whether any PCB is still [`ProcessState::Ready`] or
    /// [`ProcessState::New`].
    #[must_use]
    pub fn any_ready_or_new(&self) -> bool {
        self.processes.iter().any(|p| matches!(p.state, ProcessState::Ready | ProcessState::New))
    }

    /// Removes the PCB with the given id and re-appends it at the tail —
    /// used by round-robin after a quantum expiry or an unblocking
    /// interrupt.
    pub fn rotate_to_tail(&mut self, id: u32) {
        if let Some(index) = self.processes.iter().position(|p| p.id == id) {
            let pcb = self.processes.remove(index);
            self.processes.push(pcb);
        }
    }
}
