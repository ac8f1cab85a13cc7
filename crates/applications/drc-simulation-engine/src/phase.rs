//! Alert trigger and operations phase machine
//!
//! ```text
//!              accept()                    progress 66        progress 99
//! monitoring ───────────▶ surveillance ───────────▶ search ───────────▶ relief ──▶ complete (100)
//!     ▲  │ consider(): hold first high-confidence prediction
//!     └──┘ dismiss(): drop it, nothing else changes
//! ```
//!
//! Automatic progression is linear and never cycles back. `select()` is an
//! operator override and may jump to any phase.

use drc_core::{DisasterPrediction, Hotspot, MissionPhase, OperationsPhase};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hotspots::crowded_count;

/// Progress values at which the phase advances
pub const SURVEILLANCE_AT: u8 = 33;
pub const SEARCH_AT: u8 = 66;
pub const RELIEF_AT: u8 = 99;
pub const COMPLETE_AT: u8 = 100;

/// Outcome of one progress tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStep {
    /// Not running, or already complete
    Idle,
    /// Counter moved without a phase change
    Advanced(u8),
    /// Counter crossed a phase threshold
    Entered(MissionPhase),
    /// Counter reached 100
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseController {
    phase: OperationsPhase,
    progress: u8,
    active: bool,
    complete: bool,
    held_alert: Option<DisasterPrediction>,
    incident: Option<DisasterPrediction>,
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseController {
    pub fn new() -> Self {
        Self {
            phase: OperationsPhase::Monitoring,
            progress: 0,
            active: false,
            complete: false,
            held_alert: None,
            incident: None,
        }
    }

    pub fn phase(&self) -> OperationsPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// A response is running (or has run to completion)
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Prediction waiting for operator confirmation
    pub fn held_alert(&self) -> Option<&DisasterPrediction> {
        self.held_alert.as_ref()
    }

    /// Accepted prediction driving the current response
    pub fn incident(&self) -> Option<&DisasterPrediction> {
        self.incident.as_ref()
    }

    /// Hold the first prediction that warrants an alert. Ignored while a
    /// response is active or another alert is already held.
    ///
    /// Returns the newly held prediction.
    pub fn consider(&mut self, predictions: &[DisasterPrediction]) -> Option<&DisasterPrediction> {
        if self.active || self.held_alert.is_some() {
            return None;
        }

        let candidate = predictions.iter().find(|p| p.warrants_alert())?;
        self.held_alert = Some(candidate.clone());
        self.held_alert.as_ref()
    }

    /// Confirm the held alert and start the response from surveillance.
    /// Returns false when nothing is held.
    pub fn accept(&mut self) -> bool {
        let Some(alert) = self.held_alert.take() else {
            return false;
        };

        info!(
            prediction_id = %alert.id,
            kind = %alert.kind,
            location = %alert.location.name,
            "Disaster response activated"
        );

        self.incident = Some(alert);
        self.active = true;
        self.complete = false;
        self.phase = OperationsPhase::Surveillance;
        self.progress = 0;
        true
    }

    /// Drop the held alert. Returns the dismissed prediction, if any.
    pub fn dismiss(&mut self) -> Option<DisasterPrediction> {
        self.held_alert.take()
    }

    /// Advance the progress counter by one
    pub fn tick_progress(&mut self) -> ProgressStep {
        if !self.active || self.complete {
            return ProgressStep::Idle;
        }

        let next = self.progress + 1;
        if next >= COMPLETE_AT {
            self.progress = COMPLETE_AT;
            self.complete = true;
            info!(phase = %self.phase, "Disaster response complete");
            return ProgressStep::Completed;
        }

        self.progress = next;
        let entered = match next {
            SURVEILLANCE_AT => Some(MissionPhase::Surveillance),
            SEARCH_AT => Some(MissionPhase::Search),
            RELIEF_AT => Some(MissionPhase::Relief),
            _ => None,
        };

        match entered {
            Some(phase) => {
                self.phase = phase.into();
                info!(phase = %phase, progress = next, "Phase entered");
                ProgressStep::Entered(phase)
            }
            None => ProgressStep::Advanced(next),
        }
    }

    /// Operator override. Returns the mission phase drones should be
    /// relabelled to (none for monitoring).
    pub fn select(&mut self, phase: OperationsPhase) -> Option<MissionPhase> {
        self.phase = phase;
        phase.mission_phase()
    }

    /// Relief is underway and some hotspot is crowded enough to message
    pub fn relief_messaging_needed(&self, hotspots: &[Hotspot]) -> bool {
        self.phase == OperationsPhase::Relief && crowded_count(hotspots) > 0
    }
}
