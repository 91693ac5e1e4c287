//! Error taxonomy shared by both simulation backends.

use thiserror::Error;

/// Errors surfaced by the simulation engines, the benchmark runner and configuration loading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Parameters rejected before any allocation took place.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// No adapter or device with compute capability could be acquired.
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device refused a buffer of the requested size.
    #[error("buffer allocation of {requested} bytes failed (device limit {limit} bytes)")]
    AllocationError { requested: u64, limit: u64 },

    /// Host mapping of the readback buffer failed or was abandoned.
    #[error("buffer mapping failed: {0}")]
    MapError(String),

    /// The compute kernel failed validation or pipeline creation.
    #[error("kernel compilation failed: {0}")]
    KernelCompileError(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing results to a file or stream failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl SimulationError {
    /// Whether a fresh engine call may succeed after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MapError(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimulationError>;
