//! Simulator configuration
//!
//! Every field has a serde default so a config file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SimError};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Task-units assigned to each VM when a run starts
    #[serde(default = "default_workload_units")]
    pub workload_units: u32,

    /// CPU released per executed task-unit
    #[serde(default = "default_cpu_step")]
    pub cpu_step: u32,

    /// Memory (MB) released per executed task-unit
    #[serde(default = "default_memory_step_mb")]
    pub memory_step_mb: u64,

    /// Fleet-wide CPU ceiling enforced at admission
    #[serde(default = "default_cpu_ceiling")]
    pub cpu_ceiling: u32,

    /// Simulated time advanced by one tick
    #[serde(default = "default_tick_duration")]
    pub tick_duration: u64,

    /// Wall-clock pacing between ticks (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Timeline colors, handed out to VMs in first-seen order
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Upper bound (exclusive) for randomly admitted VM CPU
    #[serde(default = "default_random_cpu_max")]
    pub random_cpu_max: u32,

    /// Upper bound (exclusive) for randomly admitted VM memory (MB)
    #[serde(default = "default_random_memory_max_mb")]
    pub random_memory_max_mb: u64,
}

fn default_workload_units() -> u32 {
    5
}

fn default_cpu_step() -> u32 {
    2
}

fn default_memory_step_mb() -> u64 {
    128
}

fn default_cpu_ceiling() -> u32 {
    100
}

fn default_tick_duration() -> u64 {
    1
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_palette() -> Vec<String> {
    [
        "#FF5733", "#33FF57", "#3357FF", "#FF33A1", "#33FFF3", "#A133FF", "#FFC733",
        "#33FF8A", "#FF3333", "#33A1FF", "#8AFF33", "#FF8A33", "#8A33FF", "#33FFC7",
        "#FF338A", "#A1FF33", "#5733FF", "#FFA133", "#33FFA1", "#4CAF50",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_random_cpu_max() -> u32 {
    50
}

fn default_random_memory_max_mb() -> u64 {
    5000
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            workload_units: default_workload_units(),
            cpu_step: default_cpu_step(),
            memory_step_mb: default_memory_step_mb(),
            cpu_ceiling: default_cpu_ceiling(),
            tick_duration: default_tick_duration(),
            tick_interval_ms: default_tick_interval_ms(),
            palette: default_palette(),
            random_cpu_max: default_random_cpu_max(),
            random_memory_max_mb: default_random_memory_max_mb(),
        }
    }
}

impl SimConfig {
    /// Load a JSON config file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the per-VM workload
    pub fn with_workload_units(mut self, units: u32) -> Self {
        self.workload_units = units;
        self
    }

    /// Set the CPU ceiling
    pub fn with_cpu_ceiling(mut self, ceiling: u32) -> Self {
        self.cpu_ceiling = ceiling;
        self
    }

    /// Set the simulated tick duration
    pub fn with_tick_duration(mut self, duration: u64) -> Self {
        self.tick_duration = duration;
        self
    }

    /// Set the wall-clock pacing between ticks
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Replace the timeline palette
    pub fn with_palette<I, S>(mut self, palette: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.palette = palette.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workload_units == 0 {
            return Err(SimError::config("workload_units must be at least 1"));
        }
        if self.tick_duration == 0 {
            return Err(SimError::config("tick_duration must be at least 1"));
        }
        if self.cpu_ceiling == 0 {
            return Err(SimError::config("cpu_ceiling must be positive"));
        }
        if self.palette.is_empty() {
            return Err(SimError::config("palette must contain at least one color"));
        }
        Ok(())
    }
}
