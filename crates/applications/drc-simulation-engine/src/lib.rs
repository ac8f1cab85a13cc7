//! DRC Simulation Engine
//!
//! Deterministic disaster response simulation: synthetic drone fleet and
//! sensor grid, prediction clustering, alert trigger and phase progression,
//! all driven by an injected scheduler and a seeded RNG.

pub mod config;
pub mod error;
pub mod fleet;
pub mod hotspots;
pub mod overlays;
pub mod phase;
pub mod predictions;
pub mod random;
pub mod scheduler;
pub mod sensors;
pub mod simulator;

pub use config::SimulationConfig;
pub use error::{Result, SimulationError};
pub use fleet::{FleetState, FleetTickReport};
pub use phase::{PhaseController, ProgressStep};
pub use scheduler::VirtualScheduler;
pub use sensors::{SensorState, SensorTickReport};
pub use simulator::{
    DashboardSnapshot, SimEvent, SimNotice, SimulationStats, SimulationSummary, Simulator,
};
