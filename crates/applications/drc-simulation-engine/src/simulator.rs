//! Event-driven disaster response simulator
//!
//! Owns the fleet, sensor grid and phase machine, and reacts to timer events
//! delivered by a [`Scheduler`]:
//!
//! ```text
//! FleetTick     (2s) ──▶ FleetState::tick     ──▶ ExtenderOffline
//! SensorTick    (5s) ──▶ SensorState::tick    ──▶ AlertRaised
//! PhaseProgress (1s) ──▶ PhaseController::tick_progress
//!                        (only after an alert   ──▶ PhaseEntered / ResponseComplete
//!                         is accepted)
//! ```
//!
//! Each event carries the token of the timer that produced it. An event whose
//! token is no longer the armed one for its loop is dropped, so a timer
//! cancelled and re-armed never ticks twice.
//!
//! Every handler replaces a whole snapshot, so there is never a partially
//! updated state to observe. The same simulator runs on the virtual clock
//! (tests, `drc-sim`) and on tokio intervals (live runtime).

use std::time::Duration;

use chrono::{DateTime, Utc};
use drc_core::{
    CancelToken, DisasterPrediction, Drone, Hotspot, MapOverlay, MissionPhase, NetworkExtender,
    OperationsPhase, Scheduler, SensorReading,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::fleet::FleetState;
use crate::hotspots::crowded_count;
use crate::phase::{PhaseController, ProgressStep};
use crate::scheduler::VirtualScheduler;
use crate::sensors::SensorState;

/// Timer events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimEvent {
    FleetTick,
    SensorTick,
    PhaseProgress,
}

/// Things an operator (or the live runtime) should react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SimNotice {
    /// A prediction is held awaiting confirmation
    AlertRaised(DisasterPrediction),
    /// A network extender dropped below its battery floor
    ExtenderOffline(String),
    /// Automatic progression entered a phase
    PhaseEntered(MissionPhase),
    /// Progress reached 100
    ResponseComplete,
    /// Relief is underway with this many crowded hotspots to message
    ReliefMessagingNeeded(usize),
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub fleet_ticks: u64,
    pub sensor_ticks: u64,
    pub progress_ticks: u64,
    pub alerts_raised: u64,
    pub alerts_accepted: u64,
    pub alerts_dismissed: u64,
    pub extenders_offline: u64,
    pub hotspot_refreshes: u64,
}

/// Full dashboard state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub timestamp: DateTime<Utc>,
    pub phase: OperationsPhase,
    pub progress: u8,
    pub response_active: bool,
    pub held_alert: Option<DisasterPrediction>,
    pub incident: Option<DisasterPrediction>,
    pub drones: Vec<Drone>,
    pub network_extenders: Vec<NetworkExtender>,
    pub overlays: Vec<MapOverlay>,
    pub sensors: Vec<SensorReading>,
    pub predictions: Vec<DisasterPrediction>,
    pub hotspots: Vec<Hotspot>,
}

/// End-of-run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub elapsed_secs: f64,
    pub phase: OperationsPhase,
    pub progress: u8,
    pub response_complete: bool,
    pub incident: Option<String>,
    pub active_drones: usize,
    pub total_drones: usize,
    pub active_extenders: usize,
    pub total_extenders: usize,
    pub abnormal_readings: usize,
    pub predictions: usize,
    pub hotspots: usize,
    pub people_in_hotspots: u32,
    pub stats: SimulationStats,
}

pub struct Simulator<S: Scheduler<SimEvent>> {
    config: SimulationConfig,
    scheduler: S,
    rng: StdRng,
    fleet: FleetState,
    sensors: SensorState,
    phase: PhaseController,
    started_at: DateTime<Utc>,

    // Armed timers
    fleet_timer: Option<CancelToken>,
    sensor_timer: Option<CancelToken>,
    progress_timer: Option<CancelToken>,

    stats: SimulationStats,
}

impl<S: Scheduler<SimEvent>> Simulator<S> {
    /// Build the initial fleet and sensor grid. Nothing runs until
    /// [`Simulator::start`].
    pub fn new(config: SimulationConfig, scheduler: S) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let now = scheduler.now();
        let fleet = FleetState::create(&mut rng, &config, now);
        let sensors = SensorState::create(&mut rng, now);

        info!(
            seed = ?config.seed,
            drones = fleet.drones.len(),
            extenders = fleet.extenders.len(),
            sensors = sensors.readings.len(),
            "Simulator created"
        );

        Ok(Self {
            config,
            scheduler,
            rng,
            fleet,
            sensors,
            phase: PhaseController::new(),
            started_at: now,
            fleet_timer: None,
            sensor_timer: None,
            progress_timer: None,
            stats: SimulationStats::default(),
        })
    }

    /// Arm the fleet and sensor loops and check the initial predictions
    pub fn start(&mut self) -> Vec<SimNotice> {
        self.set_fleet_running(true);
        self.set_sensor_running(true);
        self.consider_predictions().into_iter().collect()
    }

    /// Teardown: cancel every timer
    pub fn stop(&mut self) {
        self.set_fleet_running(false);
        self.set_sensor_running(false);
        self.stop_progress();
        debug!("Simulator stopped");
    }

    pub fn set_fleet_running(&mut self, running: bool) {
        let interval = self.config.fleet_interval();
        let timer = &mut self.fleet_timer;
        Self::toggle(&mut self.scheduler, timer, running, interval, SimEvent::FleetTick);
    }

    pub fn set_sensor_running(&mut self, running: bool) {
        let interval = self.config.sensor_interval();
        let timer = &mut self.sensor_timer;
        Self::toggle(&mut self.scheduler, timer, running, interval, SimEvent::SensorTick);
    }

    pub fn is_fleet_running(&self) -> bool {
        self.fleet_timer.is_some()
    }

    pub fn is_sensor_running(&self) -> bool {
        self.sensor_timer.is_some()
    }

    fn toggle(
        scheduler: &mut S,
        timer: &mut Option<CancelToken>,
        running: bool,
        interval: Duration,
        event: SimEvent,
    ) {
        match (running, timer.take()) {
            (true, None) => *timer = Some(scheduler.schedule(interval, event)),
            (true, Some(token)) => *timer = Some(token),
            (false, Some(token)) => {
                scheduler.cancel(token);
            }
            (false, None) => {}
        }
    }

    fn stop_progress(&mut self) {
        if let Some(token) = self.progress_timer.take() {
            self.scheduler.cancel(token);
        }
    }

    /// React to one timer event fired by `token`. Events from a timer that
    /// is no longer armed for their loop are ignored.
    pub fn handle_event(&mut self, token: CancelToken, event: SimEvent) -> Vec<SimNotice> {
        let armed = match event {
            SimEvent::FleetTick => self.fleet_timer,
            SimEvent::SensorTick => self.sensor_timer,
            SimEvent::PhaseProgress => self.progress_timer,
        };
        if armed != Some(token) {
            debug!(?event, %token, "Ignoring event from cancelled timer");
            return Vec::new();
        }

        match event {
            SimEvent::FleetTick => self.on_fleet_tick(),
            SimEvent::SensorTick => self.on_sensor_tick(),
            SimEvent::PhaseProgress => self.on_progress_tick(),
        }
    }

    fn on_fleet_tick(&mut self) -> Vec<SimNotice> {
        let now = self.scheduler.now();
        let report = self.fleet.tick(&mut self.rng, now);
        self.stats.fleet_ticks += 1;
        self.stats.extenders_offline += report.extenders_offline.len() as u64;

        debug!(
            active = report.active_drones,
            depleted = report.depleted_drones.len(),
            "Fleet tick"
        );

        report
            .extenders_offline
            .into_iter()
            .map(SimNotice::ExtenderOffline)
            .collect()
    }

    fn on_sensor_tick(&mut self) -> Vec<SimNotice> {
        let now = self.scheduler.now();
        let report = self
            .sensors
            .tick(&mut self.rng, now, self.config.hotspot_refresh_probability);
        self.stats.sensor_ticks += 1;
        let mut notices: Vec<SimNotice> = self.consider_predictions().into_iter().collect();
        if report.hotspots_refreshed {
            self.stats.hotspot_refreshes += 1;
            notices.extend(self.relief_messaging_notice());
        }
        notices
    }

    fn on_progress_tick(&mut self) -> Vec<SimNotice> {
        self.stats.progress_ticks += 1;
        match self.phase.tick_progress() {
            ProgressStep::Entered(phase) => {
                self.fleet.set_mission_phase(phase, &mut self.rng);
                let mut notices = vec![SimNotice::PhaseEntered(phase)];
                notices.extend(self.relief_messaging_notice());
                notices
            }
            ProgressStep::Completed => {
                self.stop_progress();
                vec![SimNotice::ResponseComplete]
            }
            ProgressStep::Advanced(_) => Vec::new(),
            ProgressStep::Idle => {
                self.stop_progress();
                Vec::new()
            }
        }
    }

    fn consider_predictions(&mut self) -> Option<SimNotice> {
        let held = self.phase.consider(&self.sensors.predictions)?.clone();
        self.stats.alerts_raised += 1;
        warn!(
            prediction_id = %held.id,
            kind = %held.kind,
            severity = %held.severity,
            probability = held.probability,
            location = %held.location.name,
            "Disaster alert raised"
        );
        Some(SimNotice::AlertRaised(held))
    }

    /// Confirm the held alert: surveillance starts and the progress timer is
    /// armed. Returns false when nothing is held.
    pub fn accept_alert(&mut self) -> bool {
        if !self.phase.accept() {
            return false;
        }

        self.stats.alerts_accepted += 1;
        self.fleet.set_mission_phase(MissionPhase::Surveillance, &mut self.rng);

        self.stop_progress();
        let token = self
            .scheduler
            .schedule(self.config.progress_interval(), SimEvent::PhaseProgress);
        self.progress_timer = Some(token);
        true
    }

    /// Drop the held alert without changing anything else
    pub fn dismiss_alert(&mut self) -> Option<DisasterPrediction> {
        let dismissed = self.phase.dismiss()?;
        self.stats.alerts_dismissed += 1;
        info!(prediction_id = %dismissed.id, "Disaster alert dismissed");
        Some(dismissed)
    }

    /// Operator phase override
    pub fn select_phase(&mut self, phase: OperationsPhase) -> Vec<SimNotice> {
        if let Some(mission) = self.phase.select(phase) {
            self.fleet.set_mission_phase(mission, &mut self.rng);
        }
        info!(phase = %phase, "Phase selected");
        self.relief_messaging_notice().into_iter().collect()
    }

    /// Apply an operator edit to one drone. Returns false for an unknown id.
    pub fn update_drone<F>(&mut self, drone_id: &str, update: F) -> bool
    where
        F: FnOnce(&mut Drone),
    {
        let now = self.scheduler.now();
        self.fleet.update_drone(drone_id, now, update)
    }

    pub fn held_alert(&self) -> Option<&DisasterPrediction> {
        self.phase.held_alert()
    }

    pub fn incident(&self) -> Option<&DisasterPrediction> {
        self.phase.incident()
    }

    pub fn phase(&self) -> &PhaseController {
        &self.phase
    }

    pub fn fleet(&self) -> &FleetState {
        &self.fleet
    }

    pub fn sensors(&self) -> &SensorState {
        &self.sensors
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Drones shown for the current phase
    pub fn visible_drones(&self) -> Vec<&Drone> {
        self.fleet.drones_for_phase(self.phase.phase())
    }

    /// Relief is underway and a crowded hotspot needs messaging
    pub fn relief_messaging_needed(&self) -> bool {
        self.phase.relief_messaging_needed(&self.sensors.hotspots)
    }

    fn relief_messaging_notice(&self) -> Option<SimNotice> {
        self.relief_messaging_needed()
            .then(|| SimNotice::ReliefMessagingNeeded(crowded_count(&self.sensors.hotspots)))
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            timestamp: self.scheduler.now(),
            phase: self.phase.phase(),
            progress: self.phase.progress(),
            response_active: self.phase.is_active(),
            held_alert: self.phase.held_alert().cloned(),
            incident: self.phase.incident().cloned(),
            drones: self.fleet.drones.clone(),
            network_extenders: self.fleet.extenders.clone(),
            overlays: self.fleet.overlays.clone(),
            sensors: self.sensors.readings.clone(),
            predictions: self.sensors.predictions.clone(),
            hotspots: self.sensors.hotspots.clone(),
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        let elapsed = self.scheduler.now() - self.started_at;
        SimulationSummary {
            elapsed_secs: elapsed.num_milliseconds() as f64 / 1000.0,
            phase: self.phase.phase(),
            progress: self.phase.progress(),
            response_complete: self.phase.is_complete(),
            incident: self.phase.incident().map(|p| p.id.clone()),
            active_drones: self.fleet.drones.iter().filter(|d| d.is_active()).count(),
            total_drones: self.fleet.drones.len(),
            active_extenders: self
                .fleet
                .extenders
                .iter()
                .filter(|e| e.status == drc_core::ExtenderStatus::Active)
                .count(),
            total_extenders: self.fleet.extenders.len(),
            abnormal_readings: self.sensors.abnormal_count(),
            predictions: self.sensors.predictions.len(),
            hotspots: self.sensors.hotspots.len(),
            people_in_hotspots: self.sensors.hotspots.iter().map(|h| h.people_count).sum(),
            stats: self.stats.clone(),
        }
    }
}

impl Simulator<VirtualScheduler<SimEvent>> {
    /// Run the virtual clock forward by `duration`, handling every timer that
    /// falls due. Returns the notices in firing order.
    pub fn advance(&mut self, duration: Duration) -> Vec<SimNotice> {
        let target = self.scheduler.elapsed() + duration;
        let mut notices = Vec::new();

        while let Some((token, event)) = self.scheduler.pop_due(target) {
            notices.extend(self.handle_event(token, event));
        }

        self.scheduler.advance_clock(target);
        notices
    }
}
