//! DRC Core - Shared types and traits
//!
//! This crate defines the core abstractions used across:
//! - drc-simulation-engine (fleet/sensor generators, phase machine, virtual clock)
//! - drc-orchestrator (live runtime, SMS alerts)
//!
//! Key types:
//! - Fleet entities (drones, network extenders, map overlays)
//! - Environmental entities (sensor readings, disaster predictions, hotspots)
//! - Scheduler and SmsGateway traits
//! - Error types

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
