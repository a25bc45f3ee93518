//! Configuration file parsing.
//!
//! Grounded in `original_source/512,388/ConfigAccess.c`: a fixed header
//! line followed by nine `key: value` lines, order-independent.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::log_buffer::LogTarget;

const HEADER: &str = "Start Simulator Configuration File:";

const KEY_VERSION: &str = "Version/Phase";
const KEY_META_PATH: &str = "File Path";
const KEY_SCHED: &str = "CPU Scheduling Code";
const KEY_QUANTUM: &str = "Quantum Time (cycles)";
const KEY_MEMORY: &str = "Memory Available (MB)";
const KEY_PROC_RATE: &str = "Processor Cycle Time (msec)";
const KEY_IO_RATE: &str = "I/O Cycle Time (msec)";
const KEY_LOG_TO: &str = "Log To";
const KEY_LOG_PATH: &str = "Log File Path";

/// A CPU scheduling policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    /// First-come-first-served, non-preemptive.
    FcfsN,
    /// Shortest-job-first, non-preemptive.
    SjfN,
    /// Shortest-remaining-time-first, preemptive.
    SrtfP,
    /// First-come-first-served, preemptive (interrupt-driven only).
    FcfsP,
    /// Round-robin, preemptive.
    RrP,
}

impl SchedulingPolicy {
    /// Whether this policy preempts a running process (on interrupt, and
    /// for RR-P, also on quantum expiry).
    #[must_use]
    pub fn is_preemptive(self) -> bool {
        matches!(self, Self::SrtfP | Self::FcfsP | Self::RrP)
    }

    fn from_config_str(s: &str) -> Self {
        // Unrecognized values default to FCFS-N; this is specified
        // behavior, not an error.
        match s.trim() {
            "SJF-N" => Self::SjfN,
            "SRTF-P" => Self::SrtfP,
            "FCFS-P" => Self::FcfsP,
            "RR-P" => Self::RrP,
            _ => Self::FcfsN,
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FcfsN => "FCFS-N",
            Self::SjfN => "SJF-N",
            Self::SrtfP => "SRTF-P",
            Self::FcfsP => "FCFS-P",
            Self::RrP => "RR-P",
        };
        write!(f, "{s}")
    }
}

/// Fully parsed simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Free-form version/phase string from the config file.
    pub version: String,
    /// Path to the metadata program file.
    pub meta_path: PathBuf,
    /// Selected CPU scheduling policy.
    pub scheduling_policy: SchedulingPolicy,
    /// Round-robin quantum, in cycles.
    pub quantum_cycles: u32,
    /// Configured memory size. Named `_kb` because the MMU compares
    /// allocation bases against `mem_available_kb / 1024` even though the
    /// config key is labeled "(MB)" — matching the original simulator's
    /// bug-compatible arithmetic. The field holds the raw config integer
    /// unchanged; only the comparison site divides.
    pub mem_available_kb: u64,
    /// Milliseconds per CPU cycle.
    pub proc_cycle_rate_ms: u64,
    /// Milliseconds per I/O cycle.
    pub io_cycle_rate_ms: u64,
    /// Where timeline log lines are sent.
    pub log_to: LogTarget,
    /// Path to the log file (used when `log_to` requires a file).
    pub log_file_path: PathBuf,
}

impl Config {
    /// Reads and parses a configuration file from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&contents)
    }

    /// Parses configuration file contents already read into memory.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents.lines();
        let header = lines.next().unwrap_or_default().trim();
        if header != HEADER {
            return Err(ConfigError::MissingHeader.into());
        }

        let mut version = None;
        let mut meta_path = None;
        let mut scheduling_policy = None;
        let mut quantum_cycles = None;
        let mut mem_available_kb = None;
        let mut proc_cycle_rate_ms = None;
        let mut io_cycle_rate_ms = None;
        let mut log_to = None;
        let mut log_file_path = None;

        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(ConfigError::MalformedLine { line: line.to_string() }.into());
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                KEY_VERSION => version = Some(value.to_string()),
                KEY_META_PATH => meta_path = Some(PathBuf::from(value)),
                KEY_SCHED => scheduling_policy = Some(SchedulingPolicy::from_config_str(value)),
                KEY_QUANTUM => {
                    quantum_cycles = Some(parse_value(KEY_QUANTUM, value)?);
                }
                KEY_MEMORY => {
                    mem_available_kb = Some(parse_value(KEY_MEMORY, value)?);
                }
                KEY_PROC_RATE => {
                    proc_cycle_rate_ms = Some(parse_value(KEY_PROC_RATE, value)?);
                }
                KEY_IO_RATE => {
                    io_cycle_rate_ms = Some(parse_value(KEY_IO_RATE, value)?);
                }
                KEY_LOG_TO => {
                    log_to = Some(match value {
                        "Monitor" => LogTarget::Monitor,
                        "File" => LogTarget::File,
                        "Both" => LogTarget::Both,
                        _ => {
                            return Err(
                                ConfigError::InvalidValue { key: KEY_LOG_TO, value: value.to_string() }.into(),
                            );
                        }
                    });
                }
                KEY_LOG_PATH => log_file_path = Some(PathBuf::from(value)),
                // Unknown keys are ignored, matching the original parser's
                // behavior of silently skipping lines it doesn't recognize.
                _ => {}
            }
        }

        Ok(Self {
            version: version.ok_or(ConfigError::MissingKey { key: KEY_VERSION })?,
            meta_path: meta_path.ok_or(ConfigError::MissingKey { key: KEY_META_PATH })?,
            scheduling_policy: scheduling_policy.ok_or(ConfigError::MissingKey { key: KEY_SCHED })?,
            quantum_cycles: quantum_cycles.ok_or(ConfigError::MissingKey { key: KEY_QUANTUM })?,
            mem_available_kb: mem_available_kb.ok_or(ConfigError::MissingKey { key: KEY_MEMORY })?,
            proc_cycle_rate_ms: proc_cycle_rate_ms.ok_or(ConfigError::MissingKey { key: KEY_PROC_RATE })?,
            io_cycle_rate_ms: io_cycle_rate_ms.ok_or(ConfigError::MissingKey { key: KEY_IO_RATE })?,
            log_to: log_to.ok_or(ConfigError::MissingKey { key: KEY_LOG_TO })?,
            log_file_path: log_file_path.ok_or(ConfigError::MissingKey { key: KEY_LOG_PATH })?,
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue { key, value: value.to_string() }.into())
}

impl fmt::Display for Config {
    /// Renders the canonical "Config File Display" block, field order and
    /// labels matching the original source's `logConfigData` so that
    /// parse → display is a stable round-trip.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config File Display")?;
        writeln!(f, "===================\n")?;
        writeln!(f, "Version                : {}", self.version)?;
        writeln!(f, "Program file name      : {}", self.meta_path.display())?;
        writeln!(f, "CPU schedule selection : {}", self.scheduling_policy)?;
        writeln!(f, "Quantum time           : {}", self.quantum_cycles)?;
        writeln!(f, "Memory Available       : {}", self.mem_available_kb)?;
        writeln!(f, "Process cycle rate     : {}", self.proc_cycle_rate_ms)?;
        writeln!(f, "I/O cycle rate         : {}", self.io_cycle_rate_ms)?;
        let log_style = match self.log_to {
            LogTarget::Monitor => "Monitor",
            LogTarget::File => "File",
            LogTarget::Both => "Both",
        };
        writeln!(f, "Log to selection       : {log_style}")?;
        writeln!(f, "Log file name          : {}", self.log_file_path.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Start Simulator Configuration File:\n\
Version/Phase: 4.00\n\
File Path: program.mdf\n\
CPU Scheduling Code: RR-P\n\
Quantum Time (cycles): 4\n\
Memory Available (MB): 2048\n\
Processor Cycle Time (msec): 10\n\
I/O Cycle Time (msec): 20\n\
Log To: Both\n\
Log File Path: out.lgf\n";

    #[test]
    fn parses_all_fields_in_any_order() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.version, "4.00");
        assert_eq!(config.meta_path, PathBuf::from("program.mdf"));
        assert_eq!(config.scheduling_policy, SchedulingPolicy::RrP);
        assert_eq!(config.quantum_cycles, 4);
        assert_eq!(config.mem_available_kb, 2048);
        assert_eq!(config.proc_cycle_rate_ms, 10);
        assert_eq!(config.io_cycle_rate_ms, 20);
        assert_eq!(config.log_to, LogTarget::Both);
        assert_eq!(config.log_file_path, PathBuf::from("out.lgf"));
    }

    #[test]
    fn rejects_missing_header() {
        let bad = SAMPLE.replacen("Start Simulator Configuration File:", "Wrong header", 1);
        assert!(matches!(Config::parse(&bad), Err(crate::error::SimError::Config(ConfigError::MissingHeader))));
    }

    #[test]
    fn unrecognized_scheduling_code_defaults_to_fcfs_n() {
        let config_text = SAMPLE.replace("RR-P", "BOGUS-CODE");
        let config = Config::parse(&config_text).unwrap();
        assert_eq!(config.scheduling_policy, SchedulingPolicy::FcfsN);
    }

    #[test]
    fn unrecognized_log_to_is_a_hard_error() {
        let config_text = SAMPLE.replace("Both", "Sometimes");
        assert!(Config::parse(&config_text).is_err());
    }

    #[test]
    fn display_round_trips_to_the_same_canonical_form_every_time() {
        let config = Config::parse(SAMPLE).unwrap();
        let first = config.to_string();
        let second = config.to_string();
        assert_eq!(first, second);
        assert!(first.contains("CPU schedule selection : RR-P"));
    }
}
