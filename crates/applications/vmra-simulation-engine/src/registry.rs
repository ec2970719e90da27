//! VM registry
//!
//! Insertion order is the round-robin cycle order.

use vmra_core::VmId;

use crate::types::{VirtualMachine, VmSpec};

/// The set of VMs participating in the current session
#[derive(Debug, Clone)]
pub struct VmRegistry {
    vms: Vec<VirtualMachine>,
    next_id: VmId,
}

impl VmRegistry {
    pub fn new() -> Self {
        VmRegistry {
            vms: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a VM, assigning the next id
    pub fn add(&mut self, spec: VmSpec, workload_units: u32) -> &VirtualMachine {
        let id = self.next_id;
        self.next_id += 1;

        self.vms.push(VirtualMachine::new(id, spec, workload_units));
        &self.vms[self.vms.len() - 1]
    }

    /// Remove every VM and restart id assignment
    pub fn reset(&mut self) {
        self.vms.clear();
        self.next_id = 1;
    }

    pub fn all(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VirtualMachine> {
        self.vms.iter_mut()
    }

    pub fn ids(&self) -> Vec<VmId> {
        self.vms.iter().map(|vm| vm.id).collect()
    }

    pub fn get(&self, id: VmId) -> Option<&VirtualMachine> {
        self.vms.iter().find(|vm| vm.id == id)
    }

    pub fn get_mut(&mut self, id: VmId) -> Option<&mut VirtualMachine> {
        self.vms.iter_mut().find(|vm| vm.id == id)
    }

    pub fn len(&self) -> usize {
        self.vms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    /// True if every VM has drained its workload
    pub fn all_drained(&self) -> bool {
        self.vms.iter().all(VirtualMachine::is_drained)
    }
}

impl Default for VmRegistry {
    fn default() -> Self {
        Self::new()
    }
}
