//! Core traits for VMRA
//!
//! The FleetBackend trait is the REST surface of the resource backend. The
//! simulator never depends on a concrete client, only on this interface.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::*;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Resource backend collaborator.
#[async_trait]
pub trait FleetBackend: Send + Sync {
    /// `GET /vms`
    async fn list_vms(&self) -> Result<Vec<VmSnapshot>>;

    /// `GET /summary`
    async fn summary(&self) -> Result<FleetSummary>;

    /// `GET /predict`
    async fn predict(&self) -> Result<Vec<Prediction>>;

    /// `POST /allocate`
    async fn allocate(&self, request: &AllocationRequest) -> Result<AllocationResponse>;

    /// `POST /schedule`
    async fn schedule(&self) -> Result<ScheduleAck>;
}
