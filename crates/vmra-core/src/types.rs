//! Types shared between the simulator and the VMRA backend

use serde::{Deserialize, Serialize};

/// Unique identifier for a virtual machine
pub type VmId = u64;

/// VM lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VmStatus {
    #[default]
    Scheduled,
    Running,
    Completed,
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmStatus::Scheduled => write!(f, "Scheduled"),
            VmStatus::Running => write!(f, "Running"),
            VmStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Point-in-time view of a VM, as displayed in the fleet table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub id: VmId,
    pub name: String,
    pub cpu_usage: u32,
    pub memory_usage: u64,
    pub status: VmStatus,

    // The backend does not track workloads; absent means nothing scheduled yet
    #[serde(default, alias = "remainingTasks")]
    pub remaining_task_units: u32,
}

/// Aggregate fleet usage (`GET /summary`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    #[serde(default)]
    pub total_cpu_usage: u32,
    #[serde(default)]
    pub total_memory_usage: u64,
    #[serde(default)]
    pub vm_count: usize,
}

/// Forecasted usage for one VM (`GET /predict`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub vm_id: VmId,
    pub predicted_cpu: f64,
    pub predicted_memory: f64,
}

/// Body of `POST /allocate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub vm_id: VmId,
    pub cpu: u32,
    pub memory: u64,
}

impl AllocationRequest {
    pub fn new(vm_id: VmId, cpu: u32, memory: u64) -> Self {
        Self { vm_id, cpu, memory }
    }

    /// Top-up request used by the fleet table (+10 CPU, +512 MB)
    pub fn top_up(vm: &VmSnapshot) -> Self {
        Self {
            vm_id: vm.id,
            cpu: vm.cpu_usage.saturating_add(10),
            memory: vm.memory_usage.saturating_add(512),
        }
    }
}

/// Successful `POST /allocate` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub message: String,
    pub vm: VmSnapshot,
}

/// Successful `POST /schedule` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAck {
    pub message: String,
    /// Server-side time slice in seconds
    pub time_slice: u64,
    #[serde(default)]
    pub vms: Vec<VmSnapshot>,
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
