//! # osimsim
//!
//! A single-CPU operating system simulator: it reads a configuration file
//! and a metadata program describing a handful of processes, then runs
//! them to completion against one of five CPU scheduling policies,
//! producing a deterministic, timestamped timeline of every state
//! transition, CPU burst, I/O operation, and memory access.
//!
//! **Status**: This crate is in early development. The API is not yet
//! stable.
//!
//! ## Key Properties
//!
//! - A real monotonic clock, not a virtualized one — two runs of the same
//!   program differ only in nondeterministic interrupt interleaving, never
//!   in timestamp magnitude
//! - Five scheduling policies: FCFS-N, FCFS-P, SJF-N, SRTF-P, RR-P
//! - A bookkeeping-only MMU: no real memory is allocated, only segment
//!   conflicts and out-of-range accesses are tracked
//! - I/O runs on real background threads, synchronized back to the engine
//!   through a single mutex-protected interrupt queue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use osimsim::config::Config;
//! use osimsim::engine::Engine;
//! use osimsim::metadata;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Path::new("program.cnf"))?;
//! let contents = std::fs::read_to_string(&config.meta_path)?;
//! let ops = metadata::parse(&contents)?;
//! let report = Engine::new(config, ops)?.run()?;
//! for line in &report.log_lines {
//!     print!("{line}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] — Configuration file parsing and the scheduling policy enum
//! - [`metadata`] — Metadata program parsing into an op-code sequence
//! - [`engine`] — Top-level dispatch loop; ties every other module together
//! - [`scheduler`] — Policy-dependent selection of the next process to run
//! - [`pcb`] — Process control blocks and the table that holds them
//! - [`memory`] — Bookkeeping-only memory table and MMU fault checking
//! - [`interrupt`] — Mutex-protected queue of I/O-completion events
//! - [`io_worker`] — Background I/O worker threads
//! - [`timer`] — Monotonic wall-clock timestamping
//! - [`log_buffer`] — The deterministic timeline log
//! - [`error`] — Error types

pub mod config;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod io_worker;
pub mod log_buffer;
pub mod memory;
pub mod metadata;
pub mod pcb;
pub mod scheduler;
pub mod timer;

// Re-export primary API types at crate root for convenience.
pub use config::Config;
pub use engine::{Engine, ProcessSummary, SimulationReport};
pub use error::{Result, SimError};
pub use metadata::OpCode;
