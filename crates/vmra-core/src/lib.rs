//! VMRA Core - Shared types and traits
//!
//! This crate defines the abstractions shared by:
//! - vmra-simulation-engine (local round-robin simulator)
//! - backend clients talking to the VMRA REST service
//!
//! Key types:
//! - FleetBackend trait (interface for the resource backend)
//! - VM snapshots, fleet summaries and forecasts
//! - Error types

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
