//! Resource ledger
//!
//! Aggregates are always recomputed from the registry, so tick mutations
//! show up in the summary without separate bookkeeping.

use tracing::debug;
use vmra_core::{FleetSummary, VmId};

use crate::error::{Result, SimError};
use crate::registry::VmRegistry;
use crate::types::{VirtualMachine, VmSpec};

/// Enforces the fleet-wide CPU ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLedger {
    cpu_ceiling: u32,
}

impl ResourceLedger {
    pub fn new(cpu_ceiling: u32) -> Self {
        ResourceLedger { cpu_ceiling }
    }

    pub fn ceiling(&self) -> u32 {
        self.cpu_ceiling
    }

    /// Total CPU in use across the registry
    pub fn total_cpu(&self, registry: &VmRegistry) -> u32 {
        registry.all().iter().map(|vm| vm.cpu_usage).sum()
    }

    /// CPU still admissible under the ceiling
    pub fn headroom(&self, registry: &VmRegistry) -> u32 {
        self.cpu_ceiling.saturating_sub(self.total_cpu(registry))
    }

    // Widened so oversized requests are rejected instead of wrapping
    fn exceeds(&self, base: u32, cpu: u32) -> bool {
        u64::from(base) + u64::from(cpu) > u64::from(self.cpu_ceiling)
    }

    /// Admit a VM, rejecting it if total CPU would exceed the ceiling
    pub fn admit<'a>(
        &self,
        registry: &'a mut VmRegistry,
        spec: VmSpec,
        workload_units: u32,
    ) -> Result<&'a VirtualMachine> {
        let total = self.total_cpu(registry);
        if self.exceeds(total, spec.cpu_usage) {
            return Err(SimError::CapacityExceeded {
                requested: spec.cpu_usage,
                total,
                ceiling: self.cpu_ceiling,
            });
        }

        Ok(registry.add(spec, workload_units))
    }

    /// Check that replacing a VM's CPU with `cpu` stays under the ceiling
    pub fn check_allocation(&self, registry: &VmRegistry, vm_id: VmId, cpu: u32) -> Result<()> {
        let vm = registry.get(vm_id).ok_or(SimError::VmNotFound(vm_id))?;
        let others = self.total_cpu(registry) - vm.cpu_usage;

        if self.exceeds(others, cpu) {
            debug!(vm_id, cpu, others, "Allocation exceeds CPU ceiling");
            return Err(SimError::CapacityExceeded {
                requested: cpu,
                total: others,
                ceiling: self.cpu_ceiling,
            });
        }
        Ok(())
    }

    pub fn summarize(&self, registry: &VmRegistry) -> FleetSummary {
        FleetSummary {
            total_cpu_usage: self.total_cpu(registry),
            total_memory_usage: registry.all().iter().map(|vm| vm.memory_usage).sum(),
            vm_count: registry.len(),
        }
    }
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_within_ceiling() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();

        ledger.admit(&mut registry, VmSpec::new(60, 1024), 5).unwrap();
        ledger.admit(&mut registry, VmSpec::new(40, 2048), 5).unwrap();

        let summary = ledger.summarize(&registry);
        assert_eq!(summary.total_cpu_usage, 100);
        assert_eq!(summary.total_memory_usage, 3072);
        assert_eq!(summary.vm_count, 2);
    }

    #[test]
    fn test_admission_rejected_over_ceiling() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(95, 1024), 5).unwrap();

        let result = ledger.admit(&mut registry, VmSpec::new(10, 512), 5);
        assert!(matches!(
            result,
            Err(SimError::CapacityExceeded { requested: 10, total: 95, ceiling: 100 })
        ));

        // Ledger unchanged
        let summary = ledger.summarize(&registry);
        assert_eq!(summary.total_cpu_usage, 95);
        assert_eq!(summary.total_memory_usage, 1024);
        assert_eq!(summary.vm_count, 1);
    }

    #[test]
    fn test_summary_tracks_vm_mutation() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(30, 1000), 5).unwrap();

        if let Some(vm) = registry.get_mut(1) {
            vm.execute_unit(2, 128);
        }
        let summary = ledger.summarize(&registry);
        assert_eq!(summary.total_cpu_usage, 28);
        assert_eq!(summary.total_memory_usage, 872);
    }

    #[test]
    fn test_allocation_excludes_current_usage() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(50, 1000), 5).unwrap();
        ledger.admit(&mut registry, VmSpec::new(40, 1000), 5).unwrap();

        // 40 + 60 = 100: allowed
        assert!(ledger.check_allocation(&registry, 1, 60).is_ok());
        // 40 + 61 > 100: rejected
        assert!(matches!(
            ledger.check_allocation(&registry, 1, 61),
            Err(SimError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            ledger.check_allocation(&registry, 7, 1),
            Err(SimError::VmNotFound(7))
        ));
    }

    #[test]
    fn test_admission_rejects_max_cpu() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(10, 100), 5).unwrap();

        let result = ledger.admit(&mut registry, VmSpec::new(u32::MAX, 1), 5);
        assert!(matches!(
            result,
            Err(SimError::CapacityExceeded { requested: u32::MAX, total: 10, ceiling: 100 })
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(ledger.total_cpu(&registry), 10);
    }

    #[test]
    fn test_allocation_rejects_max_cpu() {
        let ledger = ResourceLedger::default();
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(10, 100), 5).unwrap();
        ledger.admit(&mut registry, VmSpec::new(20, 100), 5).unwrap();

        assert!(matches!(
            ledger.check_allocation(&registry, 1, u32::MAX - 5),
            Err(SimError::CapacityExceeded { total: 20, .. })
        ));
        assert!(matches!(
            ledger.check_allocation(&registry, 2, u32::MAX),
            Err(SimError::CapacityExceeded { total: 10, .. })
        ));
    }

    #[test]
    fn test_headroom() {
        let ledger = ResourceLedger::new(80);
        let mut registry = VmRegistry::new();
        ledger.admit(&mut registry, VmSpec::new(30, 0), 5).unwrap();
        assert_eq!(ledger.headroom(&registry), 50);
    }
}
