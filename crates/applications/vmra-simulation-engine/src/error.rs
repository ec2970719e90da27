//! Error types for the simulator

use thiserror::Error;
use vmra_core::{BackendError, VmId};

/// Simulator result type
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur in the simulator
///
/// Every session error is a rejected operation: the session is left exactly
/// as it was before the call.
#[derive(Error, Debug)]
pub enum SimError {
    /// Start or dispatch attempted with no VMs
    #[error("No VMs available to schedule tasks")]
    EmptyFleet,

    /// Admission or allocation would push total CPU over the ceiling
    #[error("CPU capacity exceeded: requested {requested} with {total} in use (ceiling {ceiling})")]
    CapacityExceeded { requested: u32, total: u32, ceiling: u32 },

    /// Restart, fleet mutation or a second start attempted mid-run
    #[error("A run is in progress")]
    RunInProgress,

    /// Tick requested while no run is active
    #[error("No run is in progress")]
    NotRunning,

    /// Restart attempted before any run has finished
    #[error("No completed run to restart")]
    NotCompleted,

    /// VM not found
    #[error("VM {0} not found")]
    VmNotFound(VmId),

    /// VM workload already drained
    #[error("VM {0} has completed its workload")]
    VmCompleted(VmId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend collaborator error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl SimError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
