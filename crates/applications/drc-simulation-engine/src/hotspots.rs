//! Population hotspots
//!
//! Display-only clusters of people scattered uniformly over the operating
//! region. They carry no relation to sensor state.

use chrono::{DateTime, Utc};
use drc_core::{Hotspot, LatLng};
use rand::Rng;

use crate::random::{between, unit};

/// Operating region bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn contains(&self, location: &LatLng) -> bool {
        (self.south..=self.north).contains(&location.lat)
            && (self.west..=self.east).contains(&location.lng)
    }
}

pub const SIKKIM_BOUNDS: Bounds = Bounds {
    north: 28.10,
    south: 27.05,
    east: 88.93,
    west: 88.00,
};

/// Hotspots with more people than this need relief messaging
pub const CROWDED_HOTSPOT: u32 = 100;

/// Number of hotspots above [`CROWDED_HOTSPOT`]
pub fn crowded_count(hotspots: &[Hotspot]) -> usize {
    hotspots.iter().filter(|h| h.people_count > CROWDED_HOTSPOT).count()
}

/// Generate 3 to 5 hotspots inside [`SIKKIM_BOUNDS`]
pub fn generate_hotspots<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<Hotspot> {
    let count = 3 + (unit(rng) * 3.0) as usize;
    let b = SIKKIM_BOUNDS;

    (0..count)
        .map(|i| Hotspot {
            id: format!("hotspot-{}", i + 1),
            location: LatLng {
                lat: between(rng, b.south, b.north - b.south),
                lng: between(rng, b.west, b.east - b.west),
            },
            radius: between(rng, 100.0, 400.0),
            people_count: 50 + (unit(rng) * 200.0) as u32,
            timestamp: now,
        })
        .collect()
}
