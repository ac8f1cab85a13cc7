//! Drone fleet and network extender simulation
//!
//! Builds a fixed roster per category around a base coordinate and perturbs
//! it every fleet tick:
//!
//! ```text
//! Surveillance x8 ─┐
//! Scanner      x6 ─┤  tick: random walk on position/heading/speed/sensors,
//! NetExtend    x3 ─┤        fixed battery drain (active drones only)
//! Relief       x8 ─┘
//! Extenders    xN ──  tick: battery drain, signal jitter, offline below 10%
//! ```
//!
//! Tick functions are pure transforms from the old snapshot to a new one.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use drc_core::{
    Drone, DroneCategory, DroneStatus, ExtenderStatus, GeoPosition, LatLng, MapOverlay,
    MissionPhase, NetworkExtender, OperationsPhase, PayloadKind, PayloadStatus, SensorBundle,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::overlays::generate_overlays;
use crate::random::{between, choose, jitter, unit};

/// Battery drained per tick by an active drone (percentage points)
pub const DRONE_BATTERY_DRAIN: f64 = 0.1;

/// Battery drained per tick by a network extender (percentage points)
pub const EXTENDER_BATTERY_DRAIN: f64 = 0.05;

/// Extenders go offline below this battery level
pub const EXTENDER_LOW_BATTERY: f64 = 10.0;

/// Drones never descend below this altitude (meters)
const MIN_ALTITUDE: f64 = 20.0;

/// Placeholder camera feed
const CAMERA_FEED_BASE: &str = "https://picsum.photos/320/240?random=";

/// A `base + r * span` range
#[derive(Debug, Clone, Copy)]
struct Span {
    base: f64,
    span: f64,
}

const fn span(base: f64, span: f64) -> Span {
    Span { base, span }
}

impl Span {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        between(rng, self.base, self.span)
    }
}

/// Initial attribute ranges for one drone category
struct CategoryProfile {
    category: DroneCategory,
    count: usize,
    phase: MissionPhase,
    position_jitter: f64,
    altitude: Span,
    battery: Span,
    /// Probability the drone starts in maintenance
    maintenance_probability: f64,
    thermal: Span,
    infrared: Span,
    signal: Span,
    speed: Span,
    /// Offset of the camera feed seed
    camera_seed: usize,
    /// Offsets of thermal / body-scan image seeds (scanners only)
    imaging_seeds: Option<(usize, usize)>,
    carries_payload: bool,
}

const ROSTER: [CategoryProfile; 4] = [
    CategoryProfile {
        category: DroneCategory::Surveillance,
        count: 8,
        phase: MissionPhase::Surveillance,
        position_jitter: 0.03,
        altitude: span(150.0, 100.0),
        battery: span(70.0, 30.0),
        maintenance_probability: 0.2,
        thermal: span(20.0, 15.0),
        infrared: span(0.5, 0.5),
        signal: span(0.0, 1.0),
        speed: span(15.0, 10.0),
        camera_seed: 0,
        imaging_seeds: None,
        carries_payload: false,
    },
    CategoryProfile {
        category: DroneCategory::Scanner,
        count: 6,
        phase: MissionPhase::Search,
        position_jitter: 0.02,
        altitude: span(80.0, 60.0),
        battery: span(60.0, 40.0),
        maintenance_probability: 0.1,
        thermal: span(30.0, 20.0),
        infrared: span(0.7, 0.3),
        signal: span(0.6, 0.4),
        speed: span(10.0, 8.0),
        camera_seed: 8,
        imaging_seeds: Some((20, 30)),
        carries_payload: false,
    },
    CategoryProfile {
        category: DroneCategory::NetworkExtender,
        count: 3,
        phase: MissionPhase::Search,
        position_jitter: 0.025,
        altitude: span(200.0, 100.0),
        battery: span(75.0, 25.0),
        maintenance_probability: 0.0,
        thermal: span(5.0, 5.0),
        infrared: span(0.2, 0.2),
        signal: span(0.8, 0.2),
        speed: span(5.0, 5.0),
        camera_seed: 14,
        imaging_seeds: None,
        carries_payload: false,
    },
    CategoryProfile {
        category: DroneCategory::Relief,
        count: 8,
        phase: MissionPhase::Relief,
        position_jitter: 0.035,
        altitude: span(100.0, 50.0),
        battery: span(65.0, 35.0),
        maintenance_probability: 0.15,
        thermal: span(10.0, 10.0),
        infrared: span(0.3, 0.3),
        signal: span(0.5, 0.5),
        speed: span(12.0, 8.0),
        camera_seed: 17,
        imaging_seeds: None,
        carries_payload: true,
    },
];

/// Number of drones generated for a category
pub fn roster_size(category: DroneCategory) -> usize {
    ROSTER
        .iter()
        .find(|p| p.category == category)
        .map(|p| p.count)
        .unwrap_or(0)
}

fn camera_url(seed: usize) -> String {
    format!("{}{}", CAMERA_FEED_BASE, seed)
}

fn generate_drone<R: Rng + ?Sized>(
    profile: &CategoryProfile,
    index: usize,
    rng: &mut R,
    base: GeoPosition,
    now: DateTime<Utc>,
) -> Drone {
    let position = GeoPosition {
        latitude: base.latitude + jitter(rng, profile.position_jitter),
        longitude: base.longitude + jitter(rng, profile.position_jitter),
        altitude: profile.altitude.sample(rng),
    };
    let battery = profile.battery.sample(rng);
    let status = if unit(rng) < profile.maintenance_probability {
        DroneStatus::Maintenance
    } else {
        DroneStatus::Active
    };

    let sensors = SensorBundle {
        thermal: profile.thermal.sample(rng),
        infrared: profile.infrared.sample(rng),
        signal_strength: Some(profile.signal.sample(rng)),
        camera_url: camera_url(index + profile.camera_seed),
        thermal_image_url: profile.imaging_seeds.map(|(thermal, _)| camera_url(index + thermal)),
        body_scan_image_url: profile.imaging_seeds.map(|(_, body)| camera_url(index + body)),
    };

    let payload = if profile.carries_payload {
        PayloadStatus {
            kind: *choose(rng, &[PayloadKind::Medical, PayloadKind::Food, PayloadKind::Water]),
            attached: true,
            capacity: 10,
            delivered: rng.gen_range(0..5),
        }
    } else {
        PayloadStatus::empty()
    };

    Drone {
        id: format!("{}-{:03}", profile.category.id_prefix(), index + 1),
        name: format!("{} {}", profile.category.display_name(), index + 1),
        category: profile.category,
        position,
        battery,
        status,
        mission_phase: profile.phase,
        sensors,
        payload,
        last_update: now,
        speed: profile.speed.sample(rng),
        heading: unit(rng) * 360.0,
    }
}

/// Generate the full drone roster (8 surveillance, 6 scanner, 3 network
/// extender, 8 relief)
pub fn generate_drones<R: Rng + ?Sized>(
    rng: &mut R,
    base: GeoPosition,
    now: DateTime<Utc>,
) -> Vec<Drone> {
    let mut drones = Vec::with_capacity(ROSTER.iter().map(|p| p.count).sum());
    for profile in &ROSTER {
        for index in 0..profile.count {
            drones.push(generate_drone(profile, index, rng, base, now));
        }
    }
    drones
}

/// Generate ground network extender nodes
pub fn generate_network_extenders<R: Rng + ?Sized>(
    rng: &mut R,
    base: GeoPosition,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<NetworkExtender> {
    (0..count)
        .map(|i| {
            let position = LatLng {
                lat: base.latitude + jitter(rng, 0.02),
                lng: base.longitude + jitter(rng, 0.02),
            };
            let coverage = between(rng, 500.0, 500.0);
            let status = if unit(rng) > 0.2 {
                ExtenderStatus::Active
            } else {
                ExtenderStatus::Inactive
            };
            let battery = between(rng, 40.0, 60.0);
            let signal = between(rng, 60.0, 40.0);
            // Deployed within the last hour
            let deployed_ago = ChronoDuration::milliseconds((unit(rng) * 3_600_000.0) as i64);

            NetworkExtender {
                id: format!("NE-{:03}", i + 1),
                name: format!("Network Extender {}", i + 1),
                position,
                coverage,
                status,
                battery,
                signal,
                deployed_at: now - deployed_ago,
            }
        })
        .collect()
}

/// Advance one drone by a tick. Non-active drones are returned unchanged.
pub fn tick_drone<R: Rng + ?Sized>(drone: &Drone, rng: &mut R, now: DateTime<Utc>) -> Drone {
    if !drone.is_active() {
        return drone.clone();
    }

    let position = GeoPosition {
        latitude: drone.position.latitude + jitter(rng, 0.0001),
        longitude: drone.position.longitude + jitter(rng, 0.0001),
        altitude: (drone.position.altitude + jitter(rng, 5.0)).max(MIN_ALTITUDE),
    };

    let signal = drone.sensors.signal_strength.unwrap_or(0.0);
    let sensors = SensorBundle {
        thermal: (drone.sensors.thermal + jitter(rng, 2.0)).max(0.0),
        infrared: (drone.sensors.infrared + jitter(rng, 0.1)).clamp(0.0, 1.0),
        signal_strength: Some((signal + jitter(rng, 0.1)).clamp(0.0, 1.0)),
        ..drone.sensors.clone()
    };

    Drone {
        position,
        sensors,
        battery: (drone.battery - DRONE_BATTERY_DRAIN).max(0.0),
        speed: (drone.speed + jitter(rng, 2.0)).max(0.0),
        heading: (drone.heading + jitter(rng, 10.0)).rem_euclid(360.0),
        last_update: now,
        ..drone.clone()
    }
}

/// Advance the whole roster by a tick
pub fn tick_drones<R: Rng + ?Sized>(
    drones: &[Drone],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<Drone> {
    drones.iter().map(|d| tick_drone(d, rng, now)).collect()
}

/// Advance one extender by a tick. Once offline it stays offline.
pub fn tick_extender<R: Rng + ?Sized>(extender: &NetworkExtender, rng: &mut R) -> NetworkExtender {
    let battery = (extender.battery - EXTENDER_BATTERY_DRAIN).max(0.0);
    let signal = (extender.signal + jitter(rng, 5.0)).clamp(0.0, 100.0);
    let status = if battery < EXTENDER_LOW_BATTERY {
        ExtenderStatus::Inactive
    } else {
        extender.status
    };

    NetworkExtender {
        battery,
        signal,
        status,
        ..extender.clone()
    }
}

/// Advance all extenders by a tick
pub fn tick_extenders<R: Rng + ?Sized>(
    extenders: &[NetworkExtender],
    rng: &mut R,
) -> Vec<NetworkExtender> {
    extenders.iter().map(|e| tick_extender(e, rng)).collect()
}

/// What changed during a fleet tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetTickReport {
    /// Drones that moved this tick
    pub active_drones: usize,
    /// Drones that hit 0% battery this tick
    pub depleted_drones: Vec<String>,
    /// Extenders that switched to inactive this tick
    pub extenders_offline: Vec<String>,
}

/// Owned fleet snapshot: drones, extenders and the current phase overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetState {
    pub drones: Vec<Drone>,
    pub extenders: Vec<NetworkExtender>,
    pub overlays: Vec<MapOverlay>,
    base: GeoPosition,
}

impl FleetState {
    /// Build the initial fleet with surveillance overlays
    pub fn create<R: Rng + ?Sized>(
        rng: &mut R,
        config: &SimulationConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let base = config.base();
        let drones = generate_drones(rng, base, now);
        let overlays = generate_overlays(MissionPhase::Surveillance, rng, base);
        let extenders = generate_network_extenders(rng, base, config.network_extender_count, now);

        debug!(
            drones = drones.len(),
            extenders = extenders.len(),
            "Fleet created"
        );

        Self {
            drones,
            extenders,
            overlays,
            base,
        }
    }

    /// Replace drones and extenders with their next-tick snapshot
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Utc>) -> FleetTickReport {
        let drones = tick_drones(&self.drones, rng, now);
        let extenders = tick_extenders(&self.extenders, rng);

        let mut report = FleetTickReport {
            active_drones: self.drones.iter().filter(|d| d.is_active()).count(),
            ..Default::default()
        };

        for (old, new) in self.drones.iter().zip(&drones) {
            if old.battery > 0.0 && new.battery == 0.0 {
                report.depleted_drones.push(new.id.clone());
            }
        }

        for (old, new) in self.extenders.iter().zip(&extenders) {
            if old.status == ExtenderStatus::Active && new.status == ExtenderStatus::Inactive {
                warn!(extender_id = %new.id, battery = new.battery, "Network extender offline");
                report.extenders_offline.push(new.id.clone());
            }
        }

        self.drones = drones;
        self.extenders = extenders;
        report
    }

    /// Regenerate overlays for `phase` and relabel every drone. Positions are
    /// left untouched.
    pub fn set_mission_phase<R: Rng + ?Sized>(&mut self, phase: MissionPhase, rng: &mut R) {
        self.overlays = generate_overlays(phase, rng, self.base);
        self.drones = self
            .drones
            .iter()
            .map(|d| Drone {
                mission_phase: phase,
                ..d.clone()
            })
            .collect();
        debug!(phase = %phase, overlays = self.overlays.len(), "Mission phase applied");
    }

    /// Apply an operator edit to one drone and stamp it. Returns false for an
    /// unknown id.
    pub fn update_drone<F>(&mut self, drone_id: &str, now: DateTime<Utc>, update: F) -> bool
    where
        F: FnOnce(&mut Drone),
    {
        match self.drones.iter_mut().find(|d| d.id == drone_id) {
            Some(drone) => {
                update(drone);
                drone.last_update = now;
                true
            }
            None => false,
        }
    }

    /// Drones shown for a dashboard phase (none while monitoring)
    pub fn drones_for_phase(&self, phase: OperationsPhase) -> Vec<&Drone> {
        match phase.mission_phase() {
            None => Vec::new(),
            Some(mission) => self.drones.iter().filter(|d| d.mission_phase == mission).collect(),
        }
    }

    pub fn drone(&self, drone_id: &str) -> Option<&Drone> {
        self.drones.iter().find(|d| d.id == drone_id)
    }
}
