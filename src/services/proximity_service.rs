//! Proximity Service
//!
//! Finds indoor places close enough to stand in for an outdoor visit.
//! Distances are straight-line (haversine); categories are split into
//! sightseeing vs. everything else, and a substitute has to stay on the
//! same side of that split.

use crate::models::place::Place;
use crate::models::schedule::{Category, ScheduleEntry};

const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct ProximityConfig {
    pub max_distance_km: f64,
    /// Cap on alternatives per entry, `None` keeps every match
    pub max_alternatives: Option<usize>,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            max_alternatives: None,
        }
    }
}

/// Great-circle distance between two (lat, lng) points in kilometres.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1_rad = from.0.to_radians();
    let lat2_rad = to.0.to_radians();
    let delta_lat = (to.0 - from.0).to_radians();
    let delta_lon = (to.1 - from.1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Sightseeing only pairs with sightseeing; every other category pairs with
/// every other non-sightseeing category.
pub fn categories_compatible(a: Category, b: Category) -> bool {
    a.is_sightseeing() == b.is_sightseeing()
}

pub struct ProximityMatcher {
    config: ProximityConfig,
}

impl Default for ProximityMatcher {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}

impl ProximityMatcher {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Distance to the candidate when it qualifies as an indoor stand-in, `None` otherwise.
    fn matching_distance(&self, target: &ScheduleEntry, candidate: &Place) -> Option<f64> {
        if !candidate.indoor {
            return None;
        }
        let from = target.coordinates()?;
        let to = candidate.coordinates()?;

        if !categories_compatible(target.category, candidate.category) {
            return None;
        }

        let distance = haversine_km(from, to);
        (distance <= self.config.max_distance_km).then_some(distance)
    }

    pub fn is_compatible(&self, target: &ScheduleEntry, candidate: &Place) -> bool {
        self.matching_distance(target, candidate).is_some()
    }

    /// Every indoor candidate that can replace `target`, nearest first.
    ///
    /// Returns an empty list when the target has no coordinate.
    pub fn recommend(&self, target: &ScheduleEntry, candidates: &[Place]) -> Vec<Place> {
        if target.coordinates().is_none() {
            return Vec::new();
        }

        let mut matches: Vec<(f64, &Place)> = candidates
            .iter()
            .filter_map(|candidate| {
                self.matching_distance(target, candidate)
                    .map(|distance| (distance, candidate))
            })
            .collect();

        // stable, so equidistant candidates keep pool order
        matches.sort_by(|a, b| a.0.total_cmp(&b.0));

        let limit = self.config.max_alternatives.unwrap_or(usize::MAX);
        matches
            .into_iter()
            .take(limit)
            .map(|(_, place)| place.clone())
            .collect()
    }
}
