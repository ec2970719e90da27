//! Paced run driver
//!
//! Drives a [`Session`] to completion with a wall-clock ticker. The session
//! sits behind a mutex and every tick runs with the lock held, so anyone
//! reading between ticks sees a fully applied state. The ticker is dropped
//! exactly once, when the fleet drains.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use vmra_core::FleetBackend;

use crate::controller::Session;
use crate::dispatcher::Tick;
use crate::error::Result;
use crate::types::SimTime;

/// Session shared between the driver and readers
pub type SharedSession = Arc<Mutex<Session>>;

/// Wrap a session for use with the [`Driver`]
pub fn shared(session: Session) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Summary of one driven run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub ticks: u64,
    pub intervals: usize,
    pub vm_count: usize,
    pub sim_start: SimTime,
    pub sim_end: SimTime,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drives runs at a fixed cadence
pub struct Driver {
    cadence: Duration,
    backend: Option<Arc<dyn FleetBackend>>,
}

impl Driver {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            backend: None,
        }
    }

    /// Notify a backend with `POST /schedule` when each run starts
    pub fn with_backend(mut self, backend: Arc<dyn FleetBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Start a run and tick it to completion
    pub async fn run(&self, session: SharedSession) -> Result<RunReport> {
        self.run_with(session, |_, _| {}).await
    }

    /// Like [`run`](Self::run), calling `observe` after every tick with the
    /// lock still held
    pub async fn run_with<F>(&self, session: SharedSession, mut observe: F) -> Result<RunReport>
    where
        F: FnMut(&Tick, &Session),
    {
        let (sim_start, intervals_before, vm_count) = {
            let mut guard = session.lock().await;
            guard.start_run()?;
            (guard.clock(), guard.timeline().len(), guard.summary().vm_count)
        };
        let started_at = Utc::now();
        self.notify_backend();

        let mut ticker = (!self.cadence.is_zero()).then(|| {
            let mut ticker = interval(self.cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        if let Some(ticker) = ticker.as_mut() {
            // The first tick of a tokio interval fires immediately
            ticker.tick().await;
        }

        loop {
            match ticker.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => tokio::task::yield_now().await,
            }

            let mut guard = session.lock().await;
            let tick = guard.advance()?;
            observe(&tick, &*guard);

            if tick.fleet_complete {
                let report = RunReport {
                    ticks: tick.index,
                    intervals: guard.timeline().len() - intervals_before,
                    vm_count,
                    sim_start,
                    sim_end: guard.clock(),
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(ticks = report.ticks, intervals = report.intervals, "Driver finished");
                return Ok(report);
            }
        }
    }

    /// Fire-and-forget `POST /schedule`; the local session stays authoritative
    fn notify_backend(&self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        tokio::spawn(async move {
            match backend.schedule().await {
                Ok(ack) => debug!(time_slice = ack.time_slice, "Backend acknowledged schedule: {}", ack.message),
                Err(e) => warn!("Backend schedule call failed: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::error::SimError;
    use crate::types::VmSpec;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use vmra_core::{
        AllocationRequest, AllocationResponse, BackendError, FleetSummary, Prediction,
        ScheduleAck, VmSnapshot, VmStatus,
    };

    /// Backend whose schedule call always fails, reporting each attempt
    struct FailingBackend {
        calls: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl FleetBackend for FailingBackend {
        async fn list_vms(&self) -> vmra_core::Result<Vec<VmSnapshot>> {
            Ok(Vec::new())
        }

        async fn summary(&self) -> vmra_core::Result<FleetSummary> {
            Ok(FleetSummary::default())
        }

        async fn predict(&self) -> vmra_core::Result<Vec<Prediction>> {
            Ok(Vec::new())
        }

        async fn allocate(&self, request: &AllocationRequest) -> vmra_core::Result<AllocationResponse> {
            Err(BackendError::NotFound(request.vm_id.to_string()))
        }

        async fn schedule(&self) -> vmra_core::Result<ScheduleAck> {
            let _ = self.calls.send(());
            Err(BackendError::Network("connection refused".to_string()))
        }
    }

    fn fleet(workload: u32, vms: usize) -> SharedSession {
        let mut session = Session::new(SimConfig::default().with_workload_units(workload)).unwrap();
        for _ in 0..vms {
            session.add_vm(VmSpec::new(10, 1024)).unwrap();
        }
        shared(session)
    }

    #[tokio::test]
    async fn test_drive_to_completion() {
        let session = fleet(3, 2);
        let report = Driver::new(Duration::from_millis(1)).run(session.clone()).await.unwrap();

        assert_eq!(report.ticks, 6);
        assert_eq!(report.intervals, 6);
        assert_eq!(report.vm_count, 2);
        assert_eq!((report.sim_start, report.sim_end), (0, 6));
        assert!(report.finished_at >= report.started_at);

        let guard = session.lock().await;
        assert!(guard.can_restart());
        assert!(guard.fleet_snapshot().iter().all(|vm| vm.status == VmStatus::Completed));
    }

    #[tokio::test]
    async fn test_zero_cadence_runs_unpaced() {
        let session = fleet(5, 3);
        let report = Driver::new(Duration::ZERO).run(session).await.unwrap();
        assert_eq!(report.intervals, 15);
    }

    #[tokio::test]
    async fn test_drive_empty_fleet() {
        let session = fleet(5, 0);
        let result = Driver::new(Duration::from_millis(1)).run(session).await;
        assert!(matches!(result, Err(SimError::EmptyFleet)));
    }

    #[tokio::test]
    async fn test_observer_sees_consistent_state() {
        let session = fleet(2, 2);
        let mut observed = Vec::new();

        Driver::new(Duration::ZERO)
            .run_with(session, |tick, session| {
                let summary = session.summary();
                let cpu: u32 = session.fleet_snapshot().iter().map(|vm| vm.cpu_usage).sum();
                assert_eq!(summary.total_cpu_usage, cpu);
                observed.push(tick.visited);
            })
            .await
            .unwrap();

        assert_eq!(observed, vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_reader_between_ticks() {
        let session = fleet(4, 2);
        let reader_session = session.clone();

        let reader = tokio::spawn(async move {
            for _ in 0..20 {
                {
                    let guard = reader_session.lock().await;
                    for vm in guard.fleet_snapshot() {
                        if vm.remaining_task_units == 0 && vm.status == VmStatus::Completed {
                            assert_eq!((vm.cpu_usage, vm.memory_usage), (0, 0));
                        }
                    }
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        Driver::new(Duration::from_millis(1)).run(session).await.unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_block_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FailingBackend { calls: tx });
        let session = fleet(1, 1);

        let report = Driver::new(Duration::ZERO)
            .with_backend(backend)
            .run(session.clone())
            .await
            .unwrap();
        assert_eq!(report.intervals, 1);

        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(session.lock().await.can_restart());
    }
}
