//! Append-only ordered log of timestamped timeline lines.
//!
//! This is the deterministic simulated timeline — distinct from the
//! `tracing` diagnostics the CLI binary emits for its own operational
//! visibility (see `osimsim-cli`). Nothing in this module ever touches
//! `tracing`.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};

/// Where log lines are sent as they are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LogTarget {
    /// Print to stdout only; never touch the log file.
    Monitor,
    /// Buffer only; the buffer is written to the log file at shutdown.
    File,
    /// Print to stdout as lines are appended, *and* flush the full buffer
    /// to the log file at shutdown.
    Both,
}

/// Append-only sequence of timeline lines.
///
/// Append order equals emission order. In [`LogTarget::Monitor`] and
/// [`LogTarget::Both`] mode, each `append` immediately prints the line to
/// stdout; [`LogTarget::File`] only buffers it.
#[derive(Debug)]
pub struct LogBuffer {
    target: LogTarget,
    file_path: PathBuf,
    lines: Vec<String>,
}

impl LogBuffer {
    /// Creates a log buffer that writes to `file_path` (when `target`
    /// requires it) at [`LogBuffer::flush`] time.
    #[must_use]
    pub fn new(target: LogTarget, file_path: PathBuf) -> Self {
        Self { target, file_path, lines: Vec::new() }
    }

    /// Appends a line to the buffer, immediately printing it to stdout if
    /// the target is [`LogTarget::Monitor`] or [`LogTarget::Both`].
    pub fn append(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.target != LogTarget::File {
            print!("{line}");
        }
        self.lines.push(line);
    }

    /// Returns all lines appended so far, in append order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Flushes the buffer to the configured log file, if the target
    /// requires it ([`LogTarget::File`] or [`LogTarget::Both`]).
    ///
    /// A write failure is fatal in [`LogTarget::File`] mode (propagated as
    /// [`LogError::FileWrite`]) but degrades to
    /// [`LogTarget::Monitor`]-equivalent behavior in [`LogTarget::Both`]
    /// mode — the lines have already reached stdout, so the run is allowed
    /// to report success even though the file never got written.
    pub fn flush(&mut self) -> Result<()> {
        if self.target == LogTarget::Monitor {
            return Ok(());
        }

        match self.write_file() {
            Ok(()) => Ok(()),
            Err(source) => {
                let err = LogError::FileWrite { path: self.file_path.clone(), source };
                match self.target {
                    LogTarget::Both => {
                        // Degrade to Monitor: stdout already has everything.
                        Ok(())
                    }
                    LogTarget::File => Err(err.into()),
                    LogTarget::Monitor => unreachable!("handled above"),
                }
            }
        }
    }

    fn write_file(&self) -> std::io::Result<()> {
        if let Some(parent) = Path::new(&self.file_path).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&self.file_path)?;
        for line in &self.lines {
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}
