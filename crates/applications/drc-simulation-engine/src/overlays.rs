//! Phase-specific map overlays
//!
//! Purely decorative zones, regenerated wholesale whenever the mission phase
//! changes.

use drc_core::{GeoPosition, MapOverlay, MissionPhase, OverlayKind};
use rand::Rng;

use crate::random::{between, jitter, unit};

/// Jitter span (degrees) of overlay centers around the base
const OVERLAY_JITTER: f64 = 0.025;

/// How to draw one group of overlays
struct OverlayGroup {
    kind: OverlayKind,
    count: usize,
    radius_base: f64,
    radius_span: f64,
    intensity_base: f64,
    intensity_span: f64,
    color: &'static str,
}

fn groups_for(phase: MissionPhase) -> &'static [OverlayGroup] {
    const SURVEILLANCE: &[OverlayGroup] = &[OverlayGroup {
        kind: OverlayKind::Damage,
        count: 5,
        radius_base: 100.0,
        radius_span: 200.0,
        intensity_base: 0.0,
        intensity_span: 1.0,
        color: "#ef4444",
    }];
    const SEARCH: &[OverlayGroup] = &[
        OverlayGroup {
            kind: OverlayKind::Search,
            count: 4,
            radius_base: 150.0,
            radius_span: 100.0,
            intensity_base: 0.0,
            intensity_span: 1.0,
            color: "#f59e0b",
        },
        OverlayGroup {
            kind: OverlayKind::Connectivity,
            count: 3,
            radius_base: 200.0,
            radius_span: 150.0,
            intensity_base: 0.3,
            intensity_span: 0.4,
            color: "#3b82f6",
        },
    ];
    const RELIEF: &[OverlayGroup] = &[OverlayGroup {
        kind: OverlayKind::Delivery,
        count: 6,
        radius_base: 50.0,
        radius_span: 100.0,
        intensity_base: 0.0,
        intensity_span: 1.0,
        color: "#10b981",
    }];

    match phase {
        MissionPhase::Surveillance => SURVEILLANCE,
        MissionPhase::Search => SEARCH,
        MissionPhase::Relief => RELIEF,
    }
}

/// Generate the overlay set for a phase
pub fn generate_overlays<R: Rng + ?Sized>(
    phase: MissionPhase,
    rng: &mut R,
    base: GeoPosition,
) -> Vec<MapOverlay> {
    let mut overlays = Vec::new();

    for group in groups_for(phase) {
        for i in 0..group.count {
            let coordinates = GeoPosition {
                latitude: base.latitude + jitter(rng, OVERLAY_JITTER),
                longitude: base.longitude + jitter(rng, OVERLAY_JITTER),
                altitude: 0.0,
            };
            let radius = between(rng, group.radius_base, group.radius_span);
            let intensity = group.intensity_base + unit(rng) * group.intensity_span;

            overlays.push(MapOverlay {
                id: format!("{}-{}", group.kind.as_str(), i),
                kind: group.kind,
                coordinates,
                radius,
                intensity,
                color: group.color.to_string(),
                phase,
            });
        }
    }

    overlays
}
