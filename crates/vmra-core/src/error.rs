//! Error types for backend collaborator calls

use thiserror::Error;

/// Error returned by a [`FleetBackend`](crate::FleetBackend) call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("VM not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl BackendError {
    /// Map an HTTP status and the backend's error message to a variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            400 => Self::Rejected(message),
            _ => Self::Status { status, message },
        }
    }
}
