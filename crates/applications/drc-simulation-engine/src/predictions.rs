//! Disaster prediction derivation
//!
//! Predictions are never created directly: they are recomputed from scratch
//! out of every sensor snapshot.
//!
//! 1. Keep abnormal (warning/critical) readings
//! 2. Group them by exact site coordinates, in first-seen order
//! 3. Every group with at least two readings yields a candidate:
//!    - type: seismic critical > rainfall critical (flood|landslide) >
//!      wind warning (storm) > uniform pick
//!    - probability: 0.7..1.0 with any critical reading, else 0.3..0.7
//!    - emitted when probability > 0.5, or on a 30% coin flip
//! 4. If nothing was emitted but abnormal readings exist, emit a default
//!    earthquake prediction from the first abnormal reading

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use drc_core::{
    DisasterPrediction, DisasterType, PredictionArea, SensorLocation, SensorReading,
    SensorStatus, SensorType, Severity,
};
use rand::Rng;

use crate::random::{between, choose, unit};

/// Minimum abnormal readings at one site to form a cluster
pub const MIN_CLUSTER_SIZE: usize = 2;

/// Id of the fallback prediction
pub const DEFAULT_PREDICTION_ID: &str = "pred-default";

/// Bit-exact coordinate key, matching readings that share a site
fn location_key(location: &SensorLocation) -> (u64, u64) {
    (location.latitude.to_bits(), location.longitude.to_bits())
}

/// Group abnormal readings by site, preserving first-seen order
pub fn cluster_abnormal(sensors: &[SensorReading]) -> Vec<Vec<&SensorReading>> {
    let mut groups: Vec<((u64, u64), Vec<&SensorReading>)> = Vec::new();

    for reading in sensors.iter().filter(|r| r.status.is_abnormal()) {
        let key = location_key(&reading.location);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(reading),
            None => groups.push((key, vec![reading])),
        }
    }

    groups.into_iter().map(|(_, members)| members).collect()
}

fn has(group: &[&SensorReading], kind: SensorType, status: SensorStatus) -> bool {
    group.iter().any(|r| r.kind == kind && r.status == status)
}

/// Pick the disaster type for a cluster
pub fn classify_cluster<R: Rng + ?Sized>(group: &[&SensorReading], rng: &mut R) -> DisasterType {
    if has(group, SensorType::Seismic, SensorStatus::Critical) {
        DisasterType::Earthquake
    } else if has(group, SensorType::Rainfall, SensorStatus::Critical) {
        if unit(rng) > 0.5 {
            DisasterType::Flood
        } else {
            DisasterType::Landslide
        }
    } else if has(group, SensorType::Wind, SensorStatus::Warning) {
        DisasterType::Storm
    } else {
        *choose(rng, &DisasterType::ALL)
    }
}

/// Derive predictions from a sensor snapshot
pub fn derive_predictions<R: Rng + ?Sized>(
    sensors: &[SensorReading],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<DisasterPrediction> {
    let mut predictions = Vec::new();

    for group in cluster_abnormal(sensors) {
        if group.len() < MIN_CLUSTER_SIZE {
            continue;
        }

        let location = &group[0].location;
        let has_critical = group.iter().any(|r| r.status == SensorStatus::Critical);
        let kind = classify_cluster(&group, rng);

        let probability = if has_critical {
            between(rng, 0.7, 0.3)
        } else {
            between(rng, 0.3, 0.4)
        };
        let severity = Severity::from_probability(probability);

        if probability > 0.5 || unit(rng) > 0.7 {
            let radius = between(rng, 500.0, 2000.0);
            let eta_ms = (unit(rng) * 3_600_000.0 * 6.0) as i64;

            predictions.push(DisasterPrediction {
                id: format!("pred-{}", predictions.len() + 1),
                kind,
                probability,
                location: PredictionArea {
                    name: location.name.clone(),
                    latitude: location.latitude,
                    longitude: location.longitude,
                    radius,
                },
                estimated_time: now + ChronoDuration::milliseconds(eta_ms),
                severity,
                description: format!(
                    "Potential {} {} in the {} area based on {} abnormal sensor readings.",
                    severity,
                    kind,
                    location.name,
                    group.len()
                ),
                affected_areas: vec![location.name.clone()],
                triggered_by: group.into_iter().cloned().collect(),
            });
        }
    }

    if predictions.is_empty() {
        if let Some(first) = sensors.iter().find(|r| r.status.is_abnormal()) {
            predictions.push(default_prediction(first, now));
        }
    }

    predictions
}

/// Fallback prediction so an abnormal snapshot is never silent
pub fn default_prediction(reading: &SensorReading, now: DateTime<Utc>) -> DisasterPrediction {
    let location = &reading.location;
    DisasterPrediction {
        id: DEFAULT_PREDICTION_ID.to_string(),
        kind: DisasterType::Earthquake,
        probability: 0.7,
        location: PredictionArea {
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            radius: 1000.0,
        },
        estimated_time: now + ChronoDuration::minutes(30),
        severity: Severity::High,
        description: format!(
            "Potential high severity earthquake in the {} area based on seismic sensor readings.",
            location.name
        ),
        affected_areas: vec![location.name.clone()],
        triggered_by: vec![reading.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{classify, profile, sensor_locations};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// Reading at site `site` with the given value; status follows the rule
    fn reading(kind: SensorType, site: usize, value: f64) -> SensorReading {
        let p = profile(kind);
        SensorReading {
            id: format!("{}-{}", kind, site),
            kind,
            value,
            unit: p.unit.to_string(),
            location: sensor_locations()[site].clone(),
            timestamp: now(),
            status: classify(value, &p.thresholds),
            thresholds: p.thresholds,
        }
    }

    #[test]
    fn test_cluster_groups_by_site_in_order() {
        let sensors = vec![
            reading(SensorType::Wind, 1, 45.0),        // warning @ Namchi
            reading(SensorType::Temperature, 0, 25.0), // normal @ Gangtok
            reading(SensorType::Seismic, 0, 5.5),      // critical @ Gangtok
            reading(SensorType::Rainfall, 1, 35.0),    // critical @ Namchi
        ];
        let groups = cluster_abnormal(&sensors);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].location.name, "Namchi");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_critical_seismic_cluster_is_earthquake() {
        let sensors = vec![
            reading(SensorType::Seismic, 0, 5.5),      // critical
            reading(SensorType::Wind, 0, 45.0),        // warning
            reading(SensorType::Temperature, 1, 25.0), // normal elsewhere
            reading(SensorType::Humidity, 2, 60.0),    // normal elsewhere
        ];
        assert_eq!(sensors[0].status, SensorStatus::Critical);
        assert_eq!(sensors[1].status, SensorStatus::Warning);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let predictions = derive_predictions(&sensors, &mut rng, now());

            assert_eq!(predictions.len(), 1);
            let p = &predictions[0];
            assert_eq!(p.kind, DisasterType::Earthquake);
            assert_eq!(p.location.name, "Gangtok");
            assert!(p.probability >= 0.7 && p.probability < 1.0);
            assert!(p.severity >= Severity::High);
            assert_eq!(p.id, "pred-1");
            assert_eq!(p.triggered_by.len(), 2);
            assert_eq!(p.affected_areas, vec!["Gangtok".to_string()]);
            assert!((500.0..2500.0).contains(&p.location.radius));
            assert!(p.estimated_time >= now());
            assert!(p.estimated_time <= now() + ChronoDuration::hours(6));
        }
    }

    #[test]
    fn test_rainfall_and_wind_classification() {
        let mut rng = StdRng::seed_from_u64(1);

        let flood_or_slide = vec![
            reading(SensorType::Rainfall, 0, 35.0), // critical
            reading(SensorType::Wind, 0, 45.0),     // warning
        ];
        let group: Vec<&SensorReading> = flood_or_slide.iter().collect();
        for _ in 0..20 {
            let kind = classify_cluster(&group, &mut rng);
            assert!(matches!(kind, DisasterType::Flood | DisasterType::Landslide));
        }

        let storm = vec![
            reading(SensorType::Wind, 0, 45.0),        // warning
            reading(SensorType::Temperature, 0, 35.0), // warning
        ];
        let group: Vec<&SensorReading> = storm.iter().collect();
        assert_eq!(classify_cluster(&group, &mut rng), DisasterType::Storm);
    }

    #[test]
    fn test_forced_default_when_no_cluster() {
        // One abnormal reading per site: no cluster can form
        let sensors = vec![
            reading(SensorType::Temperature, 0, 25.0), // normal
            reading(SensorType::Seismic, 1, 5.5),      // critical, alone
            reading(SensorType::Wind, 2, 45.0),        // warning, alone
        ];
        let mut rng = StdRng::seed_from_u64(2);
        let predictions = derive_predictions(&sensors, &mut rng, now());

        assert_eq!(predictions.len(), 1);
        let p = &predictions[0];
        assert_eq!(p.id, DEFAULT_PREDICTION_ID);
        assert_eq!(p.kind, DisasterType::Earthquake);
        assert_eq!(p.probability, 0.7);
        assert_eq!(p.severity, Severity::High);
        assert_eq!(p.location.name, "Namchi");
        assert_eq!(p.location.radius, 1000.0);
        assert_eq!(p.estimated_time, now() + ChronoDuration::minutes(30));
        assert_eq!(p.triggered_by, vec![sensors[1].clone()]);
        assert!(!p.description.is_empty());
    }

    #[test]
    fn test_all_normal_yields_nothing() {
        let sensors = vec![
            reading(SensorType::Temperature, 0, 25.0),
            reading(SensorType::Humidity, 0, 60.0),
        ];
        assert!(sensors.iter().all(|r| r.status == SensorStatus::Normal));

        let mut rng = StdRng::seed_from_u64(3);
        assert!(derive_predictions(&sensors, &mut rng, now()).is_empty());
        assert!(derive_predictions(&[], &mut rng, now()).is_empty());
    }

    #[test]
    fn test_warning_only_cluster_probability_range() {
        let sensors = vec![
            reading(SensorType::Temperature, 0, 35.0), // warning
            reading(SensorType::Humidity, 0, 85.0),    // warning
        ];
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            for p in derive_predictions(&sensors, &mut rng, now()) {
                if p.id == DEFAULT_PREDICTION_ID {
                    continue;
                }
                assert!(p.probability >= 0.3 && p.probability < 0.7);
                assert!(p.severity <= Severity::High);
                assert_eq!(
                    p.description,
                    format!(
                        "Potential {} {} in the Gangtok area based on 2 abnormal sensor readings.",
                        p.severity, p.kind
                    )
                );
            }
        }
    }
}
