//! Error types for the osimsim operating system simulator.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for all osimsim operations.
///
/// Covers everything that can go wrong from reading the configuration file
/// through running the simulation to completion. Per-process failures
/// (segment faults) are *not* represented here — they terminate only the
/// offending process and are reported through [`crate::memory::MmuOutcome`]
/// instead, never through this `Result` channel.
#[derive(Error, Debug)]
pub enum SimError {
    /// Error reading or parsing the configuration file.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error reading or parsing the metadata file.
    #[error("metadata error: {0}")]
    Meta(#[from] MetaError),

    /// Error writing the log buffer to the configured sink.
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// Error raised by the engine itself (currently only out-of-memory at
    /// startup; segment faults are handled per-process, not here).
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Errors that can occur while reading or parsing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be opened or read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file's first line is not the expected header.
    #[error("config file missing required header 'Start Simulator Configuration File:'")]
    MissingHeader,

    /// A required `key: value` line was never seen.
    #[error("config file missing required key '{key}'")]
    MissingKey {
        /// The key that was never supplied.
        key: &'static str,
    },

    /// A `key: value` line had no colon separator.
    #[error("config line '{line}' has no ':' separator")]
    MalformedLine {
        /// The offending raw line.
        line: String,
    },

    /// A value could not be parsed into the type its key requires.
    #[error("config key '{key}' has invalid value '{value}'")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// The offending raw value text.
        value: String,
    },
}

/// Errors that can occur while reading or parsing the metadata file.
#[derive(Error, Debug)]
pub enum MetaError {
    /// The metadata file could not be opened or read.
    #[error("failed to read metadata file '{}': {source}", path.display())]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A token did not match the `L(name)value` shape.
    #[error("malformed metadata token '{token}'")]
    MalformedToken {
        /// The offending raw token.
        token: String,
    },

    /// The component letter is not one of S, A, P, I, O, M.
    #[error("unknown component letter '{letter}' in token '{token}'")]
    UnknownComponent {
        /// The offending letter.
        letter: char,
        /// The offending raw token.
        token: String,
    },

    /// The program does not start with `S(start)0` and end with `S(end)0`.
    #[error("metadata program must start with S(start)0 and end with S(end)0")]
    MissingStartOrEnd,

    /// An `A(start)`/`A(end)` pair is unbalanced at the given token index.
    #[error("unbalanced A(start)/A(end) markers at token {index}")]
    UnbalancedProcessMarkers {
        /// The index of the offending token.
        index: usize,
    },
}

/// Errors that can occur while writing the log buffer to its sink.
#[derive(Error, Debug)]
pub enum LogError {
    /// Writing the accumulated log buffer to the configured file failed.
    #[error("failed to write log file '{}': {source}", path.display())]
    FileWrite {
        /// The log file path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised directly by the engine, outside the per-process fault path.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configured memory size is too small to be usable at all.
    #[error("configured memory ({mem_available_kb} KB) is insufficient to run the simulation")]
    OutOfMemory {
        /// The configured memory size, in KB.
        mem_available_kb: u64,
    },
}

/// Type alias for `Result<T, SimError>`.
pub type Result<T> = std::result::Result<T, SimError>;
