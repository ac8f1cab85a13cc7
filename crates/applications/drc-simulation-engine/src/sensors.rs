//! Environmental sensor grid
//!
//! One reading per (type, location) over a fixed set of Sikkim sites. Every
//! sensor tick perturbs each value with a type-specific delta, recomputes its
//! status, re-derives predictions from scratch and occasionally refreshes the
//! population hotspots.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use drc_core::{
    DisasterPrediction, Hotspot, SensorLocation, SensorReading, SensorStatus, SensorType,
    Thresholds,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hotspots::generate_hotspots;
use crate::predictions::derive_predictions;
use crate::random::{between, jitter, unit};

/// Named sensor sites (name, latitude, longitude)
pub const SENSOR_SITES: [(&str, f64, f64); 9] = [
    ("Gangtok", 27.3389, 88.6065),
    ("Namchi", 27.1667, 88.3639),
    ("Mangan", 27.5167, 88.5333),
    ("Rangpo", 27.1772, 88.5340),
    ("Singtam", 27.2333, 88.5019),
    ("Pakyong", 27.2320, 88.6086),
    ("Ravangla", 27.3000, 88.3667),
    ("Jorethang", 27.1075, 88.3236),
    ("Pelling", 27.3000, 88.2400),
];

/// Only the first sites carry instruments
pub const INSTRUMENTED_SITES: usize = 3;

/// Initial value range, unit and thresholds for a sensor type
#[derive(Debug, Clone, Copy)]
pub struct SensorProfile {
    pub value_base: f64,
    pub value_span: f64,
    pub unit: &'static str,
    pub thresholds: Thresholds,
}

pub fn profile(kind: SensorType) -> SensorProfile {
    let (value_base, value_span, unit, warning, critical) = match kind {
        SensorType::Temperature => (15.0, 15.0, "°C", 30.0, 40.0),
        SensorType::Seismic => (0.0, 6.0, "Richter", 3.0, 5.0),
        SensorType::Barometric => (950.0, 100.0, "hPa", 970.0, 950.0),
        SensorType::Rainfall => (0.0, 50.0, "mm/h", 15.0, 30.0),
        SensorType::Wind => (0.0, 80.0, "km/h", 40.0, 60.0),
        SensorType::Humidity => (40.0, 60.0, "%", 80.0, 95.0),
    };
    SensorProfile {
        value_base,
        value_span,
        unit,
        thresholds: Thresholds { warning, critical },
    }
}

/// Dual-sided status rule: a value far below a threshold counts the same as
/// one above it.
///
/// critical: `v >= critical || v <= 0.5 * critical`
/// warning:  `v >= warning  || v <= 0.7 * warning`
pub fn classify(value: f64, thresholds: &Thresholds) -> SensorStatus {
    if value >= thresholds.critical || value <= thresholds.critical * 0.5 {
        SensorStatus::Critical
    } else if value >= thresholds.warning || value <= thresholds.warning * 0.7 {
        SensorStatus::Warning
    } else {
        SensorStatus::Normal
    }
}

/// Sensor sites as locations
pub fn sensor_locations() -> Vec<SensorLocation> {
    SENSOR_SITES
        .iter()
        .map(|(name, latitude, longitude)| SensorLocation {
            name: name.to_string(),
            latitude: *latitude,
            longitude: *longitude,
        })
        .collect()
}

/// Build the initial reading set: every type at each instrumented site,
/// timestamps spread over the past hour.
pub fn create_sensors<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<SensorReading> {
    let locations = sensor_locations();
    let mut readings = Vec::with_capacity(SensorType::ALL.len() * INSTRUMENTED_SITES);

    for kind in SensorType::ALL {
        let profile = profile(kind);
        for (index, location) in locations.iter().enumerate().take(INSTRUMENTED_SITES) {
            let value = between(rng, profile.value_base, profile.value_span);
            let age = ChronoDuration::milliseconds((unit(rng) * 3_600_000.0) as i64);

            readings.push(SensorReading {
                id: format!("{}-{}", kind, index),
                kind,
                value,
                unit: profile.unit.to_string(),
                location: location.clone(),
                timestamp: now - age,
                status: classify(value, &profile.thresholds),
                thresholds: profile.thresholds,
            });
        }
    }

    readings
}

/// Next value for a reading, clamped per type
pub fn perturb<R: Rng + ?Sized>(kind: SensorType, value: f64, rng: &mut R) -> f64 {
    match kind {
        SensorType::Temperature => value + jitter(rng, 2.0),
        SensorType::Seismic => {
            // Occasional spike, otherwise background tremor
            if unit(rng) > 0.95 {
                between(rng, 3.0, 2.0)
            } else {
                unit(rng) * 1.5
            }
        }
        SensorType::Barometric => value + jitter(rng, 3.0),
        SensorType::Rainfall => (value + (unit(rng) - 0.2) * 2.0).max(0.0),
        SensorType::Wind => (value + jitter(rng, 5.0)).max(0.0),
        SensorType::Humidity => (value + jitter(rng, 3.0)).clamp(0.0, 100.0),
    }
}

/// Advance one reading: new value, recomputed status, fresh timestamp
pub fn tick_reading<R: Rng + ?Sized>(
    reading: &SensorReading,
    rng: &mut R,
    now: DateTime<Utc>,
) -> SensorReading {
    let value = perturb(reading.kind, reading.value, rng);
    SensorReading {
        value,
        status: classify(value, &reading.thresholds),
        timestamp: now,
        ..reading.clone()
    }
}

/// Advance every reading
pub fn tick_sensors<R: Rng + ?Sized>(
    readings: &[SensorReading],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<SensorReading> {
    readings.iter().map(|r| tick_reading(r, rng, now)).collect()
}

/// What changed during a sensor tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorTickReport {
    pub abnormal_readings: usize,
    pub critical_readings: usize,
    pub predictions: usize,
    pub hotspots_refreshed: bool,
}

/// Owned environmental snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    pub readings: Vec<SensorReading>,
    pub predictions: Vec<DisasterPrediction>,
    pub hotspots: Vec<Hotspot>,
}

impl SensorState {
    /// Initial readings, predictions derived from those same readings, and
    /// a first set of hotspots
    pub fn create<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let readings = create_sensors(rng, now);
        let predictions = derive_predictions(&readings, rng, now);
        let hotspots = generate_hotspots(rng, now);
        Self {
            readings,
            predictions,
            hotspots,
        }
    }

    /// Replace readings and predictions with the next snapshot; hotspots are
    /// regenerated with `hotspot_refresh_probability`.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
        hotspot_refresh_probability: f64,
    ) -> SensorTickReport {
        self.readings = tick_sensors(&self.readings, rng, now);
        self.predictions = derive_predictions(&self.readings, rng, now);

        let hotspots_refreshed = unit(rng) < hotspot_refresh_probability;
        if hotspots_refreshed {
            self.hotspots = generate_hotspots(rng, now);
        }

        let report = SensorTickReport {
            abnormal_readings: self.abnormal_count(),
            critical_readings: self
                .readings
                .iter()
                .filter(|r| r.status == SensorStatus::Critical)
                .count(),
            predictions: self.predictions.len(),
            hotspots_refreshed,
        };

        debug!(
            abnormal = report.abnormal_readings,
            critical = report.critical_readings,
            predictions = report.predictions,
            hotspots_refreshed,
            "Sensor tick"
        );

        report
    }

    pub fn abnormal_count(&self) -> usize {
        self.readings.iter().filter(|r| r.status.is_abnormal()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_classify_dual_sided() {
        let t = Thresholds { warning: 30.0, critical: 40.0 };
        assert_eq!(classify(25.0, &t), SensorStatus::Normal);
        assert_eq!(classify(30.0, &t), SensorStatus::Warning);
        assert_eq!(classify(40.0, &t), SensorStatus::Critical);
        // Low side: <= 0.7 * warning is a warning, <= 0.5 * critical is critical
        assert_eq!(classify(21.0, &t), SensorStatus::Warning);
        assert_eq!(classify(20.0, &t), SensorStatus::Critical);
        assert_eq!(classify(21.5, &t), SensorStatus::Normal);
    }

    #[test]
    fn test_classify_inverted_thresholds() {
        // Barometric critical sits below warning, so anything >= 950 is critical
        let t = profile(SensorType::Barometric).thresholds;
        assert_eq!(classify(1013.0, &t), SensorStatus::Critical);
        assert_eq!(classify(949.0, &t), SensorStatus::Normal);
    }

    #[test]
    fn test_create_sensors_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let readings = create_sensors(&mut rng, now());

        assert_eq!(readings.len(), 18);
        assert_eq!(readings[0].id, "temperature-0");
        assert_eq!(readings[0].location.name, "Gangtok");
        assert_eq!(readings[17].id, "humidity-2");
        assert_eq!(readings[17].location.name, "Mangan");

        for reading in &readings {
            let p = profile(reading.kind);
            assert!(reading.value >= p.value_base && reading.value < p.value_base + p.value_span);
            assert_eq!(reading.status, classify(reading.value, &reading.thresholds));
            assert!(reading.timestamp <= now());
            assert!(reading.timestamp > now() - ChronoDuration::hours(1));
        }
    }

    #[test]
    fn test_tick_respects_type_clamps() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut readings = create_sensors(&mut rng, now());

        for _ in 0..2000 {
            readings = tick_sensors(&readings, &mut rng, now());
            for reading in &readings {
                match reading.kind {
                    SensorType::Humidity => assert!((0.0..=100.0).contains(&reading.value)),
                    SensorType::Rainfall | SensorType::Wind => assert!(reading.value >= 0.0),
                    SensorType::Seismic => assert!((0.0..5.0).contains(&reading.value)),
                    _ => {}
                }
                assert_eq!(reading.status, classify(reading.value, &reading.thresholds));
                assert_eq!(reading.timestamp, now());
            }
        }
    }

    #[test]
    fn test_seismic_spikes_over_background_tremor() {
        let mut rng = StdRng::seed_from_u64(6);
        let values: Vec<f64> = (0..2000)
            .map(|_| perturb(SensorType::Seismic, 0.0, &mut rng))
            .collect();

        let (spikes, tremor): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|v| *v >= 1.5);
        assert!(tremor.iter().all(|v| (0.0..1.5).contains(v)));
        assert!(spikes.iter().all(|v| (3.0..5.0).contains(v)));

        // Roughly one draw in twenty spikes
        assert!(spikes.len() > 40 && spikes.len() < 200, "{} spikes", spikes.len());

        // A spike is at least a warning
        let thresholds = profile(SensorType::Seismic).thresholds;
        assert!(spikes.iter().all(|v| classify(*v, &thresholds).is_abnormal()));
    }

    #[test]
    fn test_humidity_pinned_at_ceiling() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let v = perturb(SensorType::Humidity, 100.0, &mut rng);
            assert!(v <= 100.0 && v >= 98.5);
        }
    }

    #[test]
    fn test_sensor_state_tick_refresh_probability() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = SensorState::create(&mut rng, now());
        let hotspots = state.hotspots.clone();

        let report = state.tick(&mut rng, now(), 0.0);
        assert!(!report.hotspots_refreshed);
        assert_eq!(state.hotspots, hotspots);
        assert_eq!(report.predictions, state.predictions.len());
        assert_eq!(report.abnormal_readings, state.abnormal_count());

        let report = state.tick(&mut rng, now(), 1.0);
        assert!(report.hotspots_refreshed);
    }

    #[test]
    fn test_initial_predictions_come_from_published_readings() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = SensorState::create(&mut rng, now());
        for prediction in &state.predictions {
            for trigger in &prediction.triggered_by {
                assert!(state.readings.contains(trigger));
            }
        }
    }
}
