//! Round-robin dispatcher
//!
//! Each call to [`Dispatcher::advance`] is one tick: exactly one task-unit of
//! the VM under the cursor, then the cursor moves on. The cycle is the list
//! of VM ids captured when the run started, so its length never changes
//! mid-run. Drained VMs keep their slot but do no work and emit nothing.

use tracing::debug;
use vmra_core::VmId;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::registry::VmRegistry;
use crate::timeline::TimelineRecorder;
use crate::types::{SimTime, TaskInterval};

/// Outcome of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// 1-based tick count within the run
    pub index: u64,
    /// VM under the cursor for this tick
    pub visited: VmId,
    /// Interval recorded, if the VM had work left
    pub interval: Option<TaskInterval>,
    /// Every VM in the cycle has drained its workload
    pub fleet_complete: bool,
}

/// Discrete-time round-robin step function
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cycle: Vec<VmId>,
    clock: SimTime,
    ticks: u64,

    // Configuration
    tick_duration: SimTime,
    cpu_step: u32,
    memory_step: u64,
}

impl Dispatcher {
    /// Capture the cycle for a new run, starting the clock at `clock`
    pub fn start(registry: &VmRegistry, config: &SimConfig, clock: SimTime) -> Result<Self> {
        if registry.is_empty() {
            return Err(SimError::EmptyFleet);
        }

        Ok(Dispatcher {
            cycle: registry.ids(),
            clock,
            ticks: 0,
            tick_duration: config.tick_duration,
            cpu_step: config.cpu_step,
            memory_step: config.memory_step_mb,
        })
    }

    /// Reset every VM's workload and mark it running before the first tick
    pub fn enroll_all(registry: &mut VmRegistry, workload_units: u32) {
        for vm in registry.iter_mut() {
            vm.enroll(workload_units);
        }
    }

    /// Execute one tick
    pub fn advance(
        &mut self,
        cursor: &mut usize,
        registry: &mut VmRegistry,
        timeline: &mut TimelineRecorder,
    ) -> Result<Tick> {
        if self.cycle.is_empty() {
            return Err(SimError::EmptyFleet);
        }

        let vm_id = self.cycle[*cursor % self.cycle.len()];
        let vm = registry.get_mut(vm_id).ok_or(SimError::VmNotFound(vm_id))?;
        self.ticks += 1;

        let interval = match vm.execute_unit(self.cpu_step, self.memory_step) {
            Some(sequence) => {
                let start_time = self.clock;
                self.clock += self.tick_duration;

                let interval = TaskInterval {
                    vm_id,
                    sequence,
                    start_time,
                    end_time: self.clock,
                    color_key: timeline.color_key(vm_id),
                };
                debug!(
                    tick = self.ticks,
                    vm_id,
                    sequence,
                    start_time,
                    end_time = self.clock,
                    remaining = vm.remaining_task_units,
                    "Executed task-unit"
                );
                timeline.record(interval.clone());
                Some(interval)
            }
            None => {
                debug!(tick = self.ticks, vm_id, "Skipping drained VM");
                None
            }
        };

        *cursor = (*cursor + 1) % self.cycle.len();

        let fleet_complete = self
            .cycle
            .iter()
            .all(|id| registry.get(*id).is_none_or(|vm| vm.is_drained()));

        Ok(Tick {
            index: self.ticks,
            visited: vm_id,
            interval,
            fleet_complete,
        })
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cycle(&self) -> &[VmId] {
        &self.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VmSpec;
    use vmra_core::VmStatus;

    fn setup(specs: &[(u32, u64)], workload: u32) -> (VmRegistry, TimelineRecorder, SimConfig) {
        let config = SimConfig::default().with_workload_units(workload);
        let mut registry = VmRegistry::new();
        for &(cpu, memory) in specs {
            registry.add(VmSpec::new(cpu, memory), workload);
        }
        (registry, TimelineRecorder::new(config.palette.clone()), config)
    }

    #[test]
    fn test_start_rejects_empty_fleet() {
        let (registry, _, config) = setup(&[], 5);
        assert!(matches!(
            Dispatcher::start(&registry, &config, 0),
            Err(SimError::EmptyFleet)
        ));
    }

    #[test]
    fn test_enroll_all_marks_running() {
        let (mut registry, _, _) = setup(&[(10, 100), (20, 200)], 5);
        Dispatcher::enroll_all(&mut registry, 3);

        for vm in registry.all() {
            assert_eq!(vm.status, VmStatus::Running);
            assert_eq!(vm.remaining_task_units, 3);
        }
    }

    #[test]
    fn test_cycle_order_is_fixed() {
        let (mut registry, mut timeline, config) = setup(&[(10, 100), (10, 100), (10, 100)], 2);
        // B only has one unit, so it drains first but keeps its slot
        Dispatcher::enroll_all(&mut registry, 2);
        registry.get_mut(2).unwrap().remaining_task_units = 1;

        let mut dispatcher = Dispatcher::start(&registry, &config, 0).unwrap();
        let mut cursor = 0;
        let mut visited = Vec::new();
        for _ in 0..6 {
            let tick = dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
            visited.push(tick.visited);
        }

        assert_eq!(visited, vec![1, 2, 3, 1, 2, 3]);
        // The second visit to VM 2 executed nothing
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.intervals_for(2).count(), 1);
    }

    #[test]
    fn test_skipped_slot_does_not_advance_clock() {
        let (mut registry, mut timeline, config) = setup(&[(10, 100), (10, 100)], 2);
        Dispatcher::enroll_all(&mut registry, 2);
        registry.get_mut(1).unwrap().remaining_task_units = 0;

        let mut dispatcher = Dispatcher::start(&registry, &config, 10).unwrap();
        let mut cursor = 0;

        let tick = dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
        assert!(tick.interval.is_none());
        assert_eq!(dispatcher.clock(), 10);
        assert_eq!(cursor, 1);

        let tick = dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
        let interval = tick.interval.unwrap();
        assert_eq!((interval.start_time, interval.end_time), (10, 11));
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_single_vm_two_units() {
        let (mut registry, mut timeline, config) = setup(&[(30, 1024)], 2);
        Dispatcher::enroll_all(&mut registry, 2);
        let mut dispatcher = Dispatcher::start(&registry, &config, 0).unwrap();
        let mut cursor = 0;

        let tick = dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
        let vm = registry.get(1).unwrap();
        assert_eq!(vm.remaining_task_units, 1);
        assert_eq!(vm.status, VmStatus::Running);
        assert_eq!(timeline.len(), 1);
        assert!(!tick.fleet_complete);

        let tick = dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
        let vm = registry.get(1).unwrap();
        assert_eq!(vm.remaining_task_units, 0);
        assert_eq!(vm.status, VmStatus::Completed);
        assert_eq!((vm.cpu_usage, vm.memory_usage), (0, 0));
        assert_eq!(timeline.len(), 2);
        assert!(tick.fleet_complete);
    }

    #[test]
    fn test_intervals_carry_vm_color() {
        let (mut registry, mut timeline, config) = setup(&[(10, 100), (10, 100)], 1);
        Dispatcher::enroll_all(&mut registry, 1);
        let mut dispatcher = Dispatcher::start(&registry, &config, 0).unwrap();
        let mut cursor = 0;

        dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();
        dispatcher.advance(&mut cursor, &mut registry, &mut timeline).unwrap();

        let intervals = timeline.intervals();
        assert_eq!(intervals[0].color_key, config.palette[0]);
        assert_eq!(intervals[1].color_key, config.palette[1]);
    }
}
