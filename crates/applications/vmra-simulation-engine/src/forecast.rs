//! Usage forecasting
//!
//! Fits an ordinary least-squares line to each VM's usage history (counter
//! against sample index) and extrapolates one sample ahead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vmra_core::{Prediction, VmId};

use crate::registry::VmRegistry;
use crate::types::VirtualMachine;

/// One observation of a VM's counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub cpu: f64,
    pub memory: f64,
}

impl From<&VirtualMachine> for UsageSample {
    fn from(vm: &VirtualMachine) -> Self {
        UsageSample {
            cpu: vm.cpu_usage as f64,
            memory: vm.memory_usage as f64,
        }
    }
}

/// Per-VM usage history
#[derive(Debug, Clone, Default)]
pub struct UsageHistory {
    samples: HashMap<VmId, Vec<UsageSample>>,
}

impl UsageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, vm: &VirtualMachine) {
        self.samples.entry(vm.id).or_default().push(UsageSample::from(vm));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Forecast the next sample for every VM with history, in registry order
    pub fn predict(&self, registry: &VmRegistry) -> Vec<Prediction> {
        registry
            .all()
            .iter()
            .filter_map(|vm| {
                let samples = self.samples.get(&vm.id)?;
                let cpu: Vec<f64> = samples.iter().map(|s| s.cpu).collect();
                let memory: Vec<f64> = samples.iter().map(|s| s.memory).collect();

                Some(Prediction {
                    vm_id: vm.id,
                    predicted_cpu: round2(extrapolate(&cpu)?.max(0.0)),
                    predicted_memory: round2(extrapolate(&memory)?.max(0.0)),
                })
            })
            .collect()
    }
}

/// Least-squares fit of `ys` against `0..n`, evaluated at `n`
fn extrapolate(ys: &[f64]) -> Option<f64> {
    let n = ys.len();
    if n == 0 {
        return None;
    }

    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / n_f;

    let (covariance, variance) = ys.iter().enumerate().fold((0.0, 0.0), |(cov, var), (x, y)| {
        let dx = x as f64 - x_mean;
        (cov + dx * (y - y_mean), var + dx * dx)
    });

    // A single sample has no slope
    let slope = if variance == 0.0 { 0.0 } else { covariance / variance };
    Some(y_mean + slope * (n_f - x_mean))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
