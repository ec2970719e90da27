//! Run controller and the session aggregate
//!
//! A [`Session`] owns everything one interactive session needs: the VM
//! registry, the ledger, the timeline, usage history and the run state.
//! State machine:
//!
//! ```text
//! Idle ──start_run──▶ Running ──(fleet drained)──▶ Completed ──restart──▶ Idle
//!                                                      │
//!                                                      └──start_run──▶ Running
//! ```
//!
//! Every rejected operation leaves the session untouched.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use vmra_core::{FleetSummary, Prediction, VmId, VmSnapshot};

use crate::config::SimConfig;
use crate::dispatcher::{Dispatcher, Tick};
use crate::error::{Result, SimError};
use crate::forecast::UsageHistory;
use crate::ledger::ResourceLedger;
use crate::registry::VmRegistry;
use crate::timeline::TimelineRecorder;
use crate::types::{RunPhase, SimTime, TaskInterval, VmSpec};

/// Controller-owned run state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub phase: RunPhase,
    /// Round-robin position; only the dispatcher moves it
    pub cursor: usize,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn can_restart(&self) -> bool {
        self.phase == RunPhase::Completed
    }
}

/// One interactive simulation session
#[derive(Debug)]
pub struct Session {
    config: SimConfig,
    registry: VmRegistry,
    ledger: ResourceLedger,
    timeline: TimelineRecorder,
    history: UsageHistory,
    state: RunState,
    dispatcher: Option<Dispatcher>,

    // Simulated time carried across runs so timelines never overlap
    clock: SimTime,
}

impl Session {
    /// Create an empty session. Fails if the config is invalid.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        Ok(Session {
            ledger: ResourceLedger::new(config.cpu_ceiling),
            timeline: TimelineRecorder::new(config.palette.clone()),
            registry: VmRegistry::new(),
            history: UsageHistory::new(),
            state: RunState::default(),
            dispatcher: None,
            clock: 0,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Admit a new VM
    pub fn add_vm(&mut self, spec: VmSpec) -> Result<VmSnapshot> {
        if self.state.is_running() {
            return Err(SimError::RunInProgress);
        }

        let vm = self
            .ledger
            .admit(&mut self.registry, spec, self.config.workload_units)?;
        self.history.observe(vm);
        info!(vm_id = vm.id, cpu = vm.cpu_usage, memory = vm.memory_usage, "VM admitted");

        let snapshot = vm.snapshot();
        // Fleet changed, so the finished run can no longer be restarted as-is
        if self.state.phase == RunPhase::Completed {
            self.state.phase = RunPhase::Idle;
        }
        Ok(snapshot)
    }

    /// Admit a VM with random usage, capped at the remaining CPU headroom
    pub fn add_random_vm<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<VmSnapshot> {
        if self.state.is_running() {
            return Err(SimError::RunInProgress);
        }

        let headroom = self.ledger.headroom(&self.registry);
        if headroom == 0 {
            return Err(SimError::CapacityExceeded {
                requested: 0,
                total: self.ledger.total_cpu(&self.registry),
                ceiling: self.ledger.ceiling(),
            });
        }

        let cpu = rng.gen_range(0..self.config.random_cpu_max.max(1)).min(headroom);
        let memory = rng.gen_range(0..self.config.random_memory_max_mb.max(1));
        self.add_vm(VmSpec::new(cpu, memory))
    }

    /// Set a VM's counters, subject to the CPU ceiling
    pub fn allocate(&mut self, vm_id: VmId, cpu: u32, memory: u64) -> Result<VmSnapshot> {
        let vm = self.registry.get(vm_id).ok_or(SimError::VmNotFound(vm_id))?;
        if vm.is_completed() {
            return Err(SimError::VmCompleted(vm_id));
        }
        self.ledger.check_allocation(&self.registry, vm_id, cpu)?;

        let vm = self
            .registry
            .get_mut(vm_id)
            .ok_or(SimError::VmNotFound(vm_id))?;
        vm.cpu_usage = cpu;
        vm.memory_usage = memory;
        self.history.observe(vm);
        info!(vm_id, cpu, memory, "Resources allocated");

        Ok(vm.snapshot())
    }

    /// Start a run over the current fleet
    pub fn start_run(&mut self) -> Result<()> {
        if self.state.is_running() {
            return Err(SimError::RunInProgress);
        }

        let dispatcher = Dispatcher::start(&self.registry, &self.config, self.clock)?;
        Dispatcher::enroll_all(&mut self.registry, self.config.workload_units);

        info!(
            vms = dispatcher.cycle().len(),
            workload = self.config.workload_units,
            start_time = self.clock,
            "Run started"
        );
        self.dispatcher = Some(dispatcher);
        self.state.cursor = 0;
        self.state.phase = RunPhase::Running;
        Ok(())
    }

    /// Execute one tick of the active run
    pub fn advance(&mut self) -> Result<Tick> {
        if self.registry.is_empty() {
            return Err(SimError::EmptyFleet);
        }
        let dispatcher = match (self.state.phase, self.dispatcher.as_mut()) {
            (RunPhase::Running, Some(dispatcher)) => dispatcher,
            _ => return Err(SimError::NotRunning),
        };

        let tick = dispatcher.advance(&mut self.state.cursor, &mut self.registry, &mut self.timeline)?;
        self.clock = dispatcher.clock();

        if tick.interval.is_some() {
            if let Some(vm) = self.registry.get(tick.visited) {
                self.history.observe(vm);
            }
        }

        if tick.fleet_complete {
            info!(ticks = tick.index, end_time = self.clock, "Run completed");
            self.state.phase = RunPhase::Completed;
            self.dispatcher = None;
        }
        Ok(tick)
    }

    /// Start a run and tick until the whole fleet has drained
    pub fn run_to_completion(&mut self) -> Result<Vec<Tick>> {
        self.start_run()?;

        let mut ticks = Vec::new();
        loop {
            let tick = self.advance()?;
            let done = tick.fleet_complete;
            ticks.push(tick);
            if done {
                return Ok(ticks);
            }
        }
    }

    /// Clear the session back to empty once a run has completed
    pub fn restart(&mut self) -> Result<()> {
        match self.state.phase {
            RunPhase::Running => return Err(SimError::RunInProgress),
            RunPhase::Idle => return Err(SimError::NotCompleted),
            RunPhase::Completed => {}
        }

        self.registry.reset();
        self.timeline.clear();
        self.history.clear();
        self.state = RunState::default();
        self.dispatcher = None;
        self.clock = 0;
        info!("Session restarted");
        Ok(())
    }

    pub fn summary(&self) -> FleetSummary {
        self.ledger.summarize(&self.registry)
    }

    pub fn timeline(&self) -> &[TaskInterval] {
        self.timeline.intervals()
    }

    pub fn recorder(&self) -> &TimelineRecorder {
        &self.timeline
    }

    pub fn fleet_snapshot(&self) -> Vec<VmSnapshot> {
        self.registry.all().iter().map(|vm| vm.snapshot()).collect()
    }

    pub fn predict(&self) -> Vec<Prediction> {
        self.history.predict(&self.registry)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn can_restart(&self) -> bool {
        self.state.can_restart()
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }
}
