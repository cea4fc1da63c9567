//! Rain Risk Service
//!
//! Checks every outdoor entry of a trip against the forecast for its date and
//! suggests indoor places nearby for the ones likely to get rained on.
//!
//! Forecast lookups run concurrently, one per entry. A lookup that fails or
//! times out turns into a fallback sample for that entry only, and a fallback
//! sample is never treated as risky.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use futures::future::join_all;

use crate::models::forecast::{ForecastSample, RiskEntry};
use crate::models::place::Place;
use crate::models::schedule::{ScheduleEntry, ScheduleValidationError};
use crate::services::grid_projection_service::project;
use crate::services::place_service::IndoorCandidatePool;
use crate::services::proximity_service::ProximityMatcher;
use crate::services::weather_service::WeatherSource;

const DEFAULT_POP_THRESHOLD: u8 = 60;
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Clone)]
pub struct RiskRules {
    /// Precipitation probability (percent) at which an entry counts as risky
    pub pop_threshold: u8,
    pub lookup_timeout: Duration,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            pop_threshold: DEFAULT_POP_THRESHOLD,
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
        }
    }
}

/// Rain risk for one sample: likely precipitation, or any wet precipitation type.
pub fn is_at_risk(sample: &ForecastSample, rules: &RiskRules) -> bool {
    if sample.is_fallback() {
        return false;
    }

    let likely = sample.pop.map_or(false, |pop| pop >= rules.pop_threshold);
    likely || sample.precipitation.is_wet()
}

/// Calendar date of a 1-based trip day, `None` past the end of the calendar.
pub fn date_for_day(trip_start: NaiveDate, day: u32) -> Option<NaiveDate> {
    trip_start.checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
}

/// Reject a schedule holding a day that cannot be placed on the calendar.
pub fn check_trip_days(
    schedule: &[ScheduleEntry],
    trip_start: NaiveDate,
) -> Result<(), ScheduleValidationError> {
    match schedule
        .iter()
        .find(|e| date_for_day(trip_start, e.day).is_none())
    {
        Some(entry) => Err(ScheduleValidationError::DayOutOfRange {
            id: entry.id.clone(),
            day: entry.day,
        }),
        None => Ok(()),
    }
}

pub struct RainRiskService {
    weather: Arc<dyn WeatherSource>,
    indoor_pool: Arc<dyn IndoorCandidatePool>,
    matcher: ProximityMatcher,
    rules: RiskRules,
}

impl RainRiskService {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        indoor_pool: Arc<dyn IndoorCandidatePool>,
        matcher: ProximityMatcher,
        rules: RiskRules,
    ) -> Self {
        Self {
            weather,
            indoor_pool,
            matcher,
            rules,
        }
    }

    async fn lookup(
        &self,
        entry: &ScheduleEntry,
        lat: f64,
        lng: f64,
        date: NaiveDate,
    ) -> ForecastSample {
        let grid = project(lat, lng);
        let fetch = self.weather.fetch(grid, date);
        match tokio::time::timeout(self.rules.lookup_timeout, fetch).await {
            Ok(sample) => sample,
            Err(_) => {
                log::warn!(
                    "Forecast lookup for entry '{}' timed out after {:?}",
                    entry.id,
                    self.rules.lookup_timeout
                );
                ForecastSample::fallback(date, grid)
            }
        }
    }

    async fn alternatives_for(&self, entry: &ScheduleEntry) -> Vec<Place> {
        let Some(center) = entry.coordinates() else {
            return Vec::new();
        };

        let radius_km = self.matcher.config().max_distance_km;
        match self.indoor_pool.indoor_candidates(center, radius_km).await {
            Ok(pool) => self.matcher.recommend(entry, &pool),
            Err(e) => {
                log::warn!(
                    "Indoor candidates for entry '{}' unavailable: {}",
                    entry.id,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Forecast and risk verdict for every outdoor entry that has a coordinate.
    /// Alternatives are only looked up for the risky ones.
    pub async fn assess(
        &self,
        schedule: &[ScheduleEntry],
        trip_start: NaiveDate,
    ) -> Vec<RiskEntry> {
        let outdoor: Vec<(&ScheduleEntry, f64, f64, NaiveDate)> = schedule
            .iter()
            .filter(|e| e.is_outdoor())
            .filter_map(|e| e.coordinates().map(|(lat, lng)| (e, lat, lng)))
            .filter_map(|(e, lat, lng)| match date_for_day(trip_start, e.day) {
                Some(date) => Some((e, lat, lng, date)),
                None => {
                    log::warn!(
                        "Entry '{}' on day {} has no calendar date, skipped",
                        e.id,
                        e.day
                    );
                    None
                }
            })
            .collect();

        let lookups = outdoor
            .iter()
            .map(|(entry, lat, lng, date)| self.lookup(entry, *lat, *lng, *date));
        let samples = join_all(lookups).await;

        let assessments = outdoor
            .into_iter()
            .zip(samples)
            .map(|((entry, ..), forecast)| async move {
                let at_risk = is_at_risk(&forecast, &self.rules);
                let alternatives = if at_risk {
                    self.alternatives_for(entry).await
                } else {
                    Vec::new()
                };

                RiskEntry {
                    entry: entry.clone(),
                    forecast,
                    at_risk,
                    alternatives,
                }
            });

        join_all(assessments).await
    }

    /// Only the outdoor entries at risk of rain, with their indoor alternatives.
    pub async fn check_rain_risk(
        &self,
        schedule: &[ScheduleEntry],
        trip_start: NaiveDate,
    ) -> Vec<RiskEntry> {
        let risky: Vec<RiskEntry> = self
            .assess(schedule, trip_start)
            .await
            .into_iter()
            .filter(|r| r.at_risk)
            .collect();

        log::info!("{} outdoor entries at risk of rain", risky.len());
        risky
    }
}
