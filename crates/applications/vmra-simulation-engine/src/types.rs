//! Core types for the simulation engine

use serde::{Deserialize, Serialize};
use vmra_core::{VmId, VmSnapshot, VmStatus};

/// Simulated timestamp, in simulated time units
pub type SimTime = u64;

/// Resources requested for a new VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSpec {
    pub cpu_usage: u32,
    pub memory_usage: u64,
}

impl VmSpec {
    pub fn new(cpu_usage: u32, memory_usage: u64) -> Self {
        Self { cpu_usage, memory_usage }
    }
}

impl std::str::FromStr for VmSpec {
    type Err = String;

    /// Parse `cpu:memory`, e.g. `20:2048`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cpu, memory) = s
            .split_once(':')
            .ok_or_else(|| format!("expected CPU:MEMORY, got '{}'", s))?;
        let cpu_usage = cpu
            .trim()
            .parse()
            .map_err(|e| format!("invalid CPU '{}': {}", cpu, e))?;
        let memory_usage = memory
            .trim()
            .parse()
            .map_err(|e| format!("invalid memory '{}': {}", memory, e))?;
        Ok(VmSpec { cpu_usage, memory_usage })
    }
}

/// A simulated virtual machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: VmId,
    pub name: String,
    pub cpu_usage: u32,
    pub memory_usage: u64,
    pub status: VmStatus,
    pub remaining_task_units: u32,

    // Workload size this VM was enrolled with, used for task ordinals
    pub workload_units: u32,
}

impl VirtualMachine {
    /// Create a VM that is not yet part of a run
    pub fn new(id: VmId, spec: VmSpec, workload_units: u32) -> Self {
        VirtualMachine {
            id,
            name: format!("VM{}", id),
            cpu_usage: spec.cpu_usage,
            memory_usage: spec.memory_usage,
            status: VmStatus::Scheduled,
            remaining_task_units: workload_units,
            workload_units,
        }
    }

    /// Reset the workload and mark the VM as running
    pub fn enroll(&mut self, workload_units: u32) {
        self.workload_units = workload_units;
        self.remaining_task_units = workload_units;
        self.status = VmStatus::Running;
    }

    pub fn is_drained(&self) -> bool {
        self.remaining_task_units == 0
    }

    pub fn is_completed(&self) -> bool {
        self.status == VmStatus::Completed
    }

    /// Execute one task-unit.
    ///
    /// Returns the 1-based ordinal of the executed unit, or `None` if the
    /// workload was already drained.
    pub fn execute_unit(&mut self, cpu_step: u32, memory_step: u64) -> Option<u32> {
        if self.is_drained() {
            return None;
        }

        self.remaining_task_units -= 1;
        if self.remaining_task_units == 0 {
            // Workload fully drained
            self.cpu_usage = 0;
            self.memory_usage = 0;
            self.status = VmStatus::Completed;
        } else {
            self.cpu_usage = self.cpu_usage.saturating_sub(cpu_step);
            self.memory_usage = self.memory_usage.saturating_sub(memory_step);
            self.status = VmStatus::Running;
        }

        Some(self.workload_units - self.remaining_task_units)
    }

    pub fn snapshot(&self) -> VmSnapshot {
        VmSnapshot {
            id: self.id,
            name: self.name.clone(),
            cpu_usage: self.cpu_usage,
            memory_usage: self.memory_usage,
            status: self.status,
            remaining_task_units: self.remaining_task_units,
        }
    }
}

/// One executed task-unit on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInterval {
    pub vm_id: VmId,
    /// 1-based ordinal of the task within the VM's workload
    pub sequence: u32,
    pub start_time: SimTime,
    pub end_time: SimTime,
    pub color_key: String,
}

impl TaskInterval {
    /// Display label, e.g. `Task 3`
    pub fn label(&self) -> String {
        format!("Task {}", self.sequence)
    }

    pub fn duration(&self) -> SimTime {
        self.end_time - self.start_time
    }
}

/// Run controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "Idle"),
            RunPhase::Running => write!(f, "Running"),
            RunPhase::Completed => write!(f, "Completed"),
        }
    }
}
