//! VMRA Simulation Engine
//!
//! Discrete-time round-robin scheduler simulation over a fleet of VMs.
//!
//! ```text
//! Session
//! ├── VmRegistry        (fleet, insertion = cycle order)
//! ├── ResourceLedger    (CPU ceiling, summaries)
//! ├── Dispatcher        (one task-unit per tick)
//! ├── TimelineRecorder  (Gantt intervals)
//! └── UsageHistory      (forecasts)
//! ```
//!
//! [`controller::Session`] is the entry point; [`driver::Driver`] paces a
//! session against the wall clock.

pub mod backend;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod forecast;
pub mod ledger;
pub mod registry;
pub mod render;
pub mod timeline;
pub mod types;

pub use backend::{HttpBackend, DEFAULT_BACKEND_URL};
pub use config::SimConfig;
pub use controller::{RunState, Session};
pub use dispatcher::{Dispatcher, Tick};
pub use driver::{Driver, RunReport, SharedSession};
pub use error::{Result, SimError};
pub use types::{RunPhase, SimTime, TaskInterval, VirtualMachine, VmSpec};
