use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sightseeing,
    Food,
    Cafe,
    Lodging,
    Transit,
    #[serde(other)]
    Other,
}

impl Category {
    pub fn is_sightseeing(&self) -> bool {
        matches!(self, Category::Sightseeing)
    }
}

const TIME_FORMAT: &str = "%H:%M";

fn serialize_hh_mm<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
}

/// A single visit on one day of a trip.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub id: String,
    /// 1-based day of the trip
    pub day: u32,
    #[serde(serialize_with = "serialize_hh_mm")]
    pub time: NaiveTime,
    pub name: String,
    pub category: Category,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub locked: bool,
    pub indoor: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl ScheduleEntry {
    /// Both halves of the coordinate, or nothing.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Outdoor items are the ones exposed to the weather: not flagged indoor,
    /// and not a stay or a transfer.
    pub fn is_outdoor(&self) -> bool {
        !self.indoor && !matches!(self.category, Category::Lodging | Category::Transit)
    }

    pub fn minute_of_day(&self) -> i64 {
        minute_of_day(self.time)
    }
}

pub fn minute_of_day(time: NaiveTime) -> i64 {
    use chrono::Timelike;
    (time.num_seconds_from_midnight() / 60) as i64
}

/// Wire form of a schedule entry as the caller sends it. Converting into
/// `ScheduleEntry` is where malformed input gets rejected.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleEntryPayload {
    pub id: String,
    pub day: u32,
    pub time: String,
    #[serde(default)]
    pub name: String,
    pub category: Category,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub indoor: bool,
    pub duration_minutes: Option<u32>,
    pub place_id: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleValidationError {
    #[error("Entry '{id}' has an invalid time '{value}', expected HH:MM")]
    InvalidTime { id: String, value: String },

    #[error("Entry '{id}' has day index {day}, days start at 1")]
    InvalidDay { id: String, day: u32 },

    #[error("Entry '{id}' has an out-of-range coordinate ({lat}, {lng})")]
    InvalidCoordinate { id: String, lat: f64, lng: f64 },

    #[error("Day {day} has more than one locked entry at {time}")]
    DuplicateLockedTime { day: u32, time: String },

    #[error("Entry '{id}' is on day {day}, which has no calendar date from the trip start")]
    DayOutOfRange { id: String, day: u32 },
}

impl TryFrom<ScheduleEntryPayload> for ScheduleEntry {
    type Error = ScheduleValidationError;

    fn try_from(payload: ScheduleEntryPayload) -> Result<Self, Self::Error> {
        let time = NaiveTime::parse_from_str(payload.time.trim(), TIME_FORMAT).map_err(|_| {
            ScheduleValidationError::InvalidTime {
                id: payload.id.clone(),
                value: payload.time.clone(),
            }
        })?;

        if payload.day == 0 {
            return Err(ScheduleValidationError::InvalidDay {
                id: payload.id,
                day: payload.day,
            });
        }

        if let (Some(lat), Some(lng)) = (payload.lat, payload.lng) {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(ScheduleValidationError::InvalidCoordinate {
                    id: payload.id,
                    lat,
                    lng,
                });
            }
        }

        Ok(ScheduleEntry {
            id: payload.id,
            day: payload.day,
            time,
            name: payload.name,
            category: payload.category,
            lat: payload.lat,
            lng: payload.lng,
            locked: payload.locked,
            indoor: payload.indoor,
            duration_minutes: payload.duration_minutes,
            place_id: payload.place_id,
        })
    }
}

/// Validate a whole schedule coming in over the wire.
pub fn validate_schedule(
    payloads: Vec<ScheduleEntryPayload>,
) -> Result<Vec<ScheduleEntry>, ScheduleValidationError> {
    let entries = payloads
        .into_iter()
        .map(ScheduleEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for entry in entries.iter().filter(|e| e.locked) {
        if !seen.insert((entry.day, entry.time)) {
            return Err(ScheduleValidationError::DuplicateLockedTime {
                day: entry.day,
                time: entry.time.format(TIME_FORMAT).to_string(),
            });
        }
    }

    Ok(entries)
}

/// A free interval within one day, bounded by locked entries or the day window.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Gap {
    pub day: u32,
    #[serde(serialize_with = "serialize_hh_mm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "serialize_hh_mm")]
    pub end: NaiveTime,
    pub duration_minutes: i64,
    /// Locked entry right before the gap, `None` at the window start
    pub previous_locked: Option<String>,
    /// Locked entry right after the gap, `None` at the window end
    pub next_locked: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: &str, time: &str, locked: bool) -> ScheduleEntryPayload {
        ScheduleEntryPayload {
            id: id.to_string(),
            day: 1,
            time: time.to_string(),
            name: "Seongsan Ilchulbong".to_string(),
            category: Category::Sightseeing,
            lat: Some(33.458),
            lng: Some(126.942),
            locked,
            indoor: false,
            duration_minutes: None,
            place_id: None,
        }
    }

    #[test]
    fn test_valid_payload_converts() {
        let entry = ScheduleEntry::try_from(payload("a", "09:30", true)).unwrap();
        assert_eq!(entry.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(entry.coordinates(), Some((33.458, 126.942)));
        assert_eq!(entry.minute_of_day(), 570);
    }

    #[test]
    fn test_unparsable_time_is_rejected() {
        let err = ScheduleEntry::try_from(payload("a", "25:99", false)).unwrap_err();
        assert_eq!(
            err,
            ScheduleValidationError::InvalidTime {
                id: "a".to_string(),
                value: "25:99".to_string()
            }
        );
    }

    #[test]
    fn test_day_zero_is_rejected() {
        let mut p = payload("a", "10:00", false);
        p.day = 0;
        assert!(matches!(
            ScheduleEntry::try_from(p),
            Err(ScheduleValidationError::InvalidDay { .. })
        ));
    }

    #[test]
    fn test_out_of_range_coordinate_is_rejected() {
        let mut p = payload("a", "10:00", false);
        p.lat = Some(123.0);
        assert!(matches!(
            ScheduleEntry::try_from(p),
            Err(ScheduleValidationError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_half_coordinate_counts_as_missing() {
        let mut p = payload("a", "10:00", false);
        p.lng = None;
        let entry = ScheduleEntry::try_from(p).unwrap();
        assert_eq!(entry.coordinates(), None);
    }

    #[test]
    fn test_duplicate_locked_times_are_rejected() {
        let result = validate_schedule(vec![
            payload("a", "12:00", true),
            payload("b", "12:00", true),
        ]);
        assert!(matches!(
            result,
            Err(ScheduleValidationError::DuplicateLockedTime { day: 1, .. })
        ));

        // unlocked duplicates are fine
        let ok = validate_schedule(vec![
            payload("a", "12:00", true),
            payload("b", "12:00", false),
        ]);
        assert_eq!(ok.unwrap().len(), 2);
    }

    #[test]
    fn test_outdoor_classification() {
        let mut entry = ScheduleEntry::try_from(payload("a", "10:00", false)).unwrap();
        assert!(entry.is_outdoor());
        entry.indoor = true;
        assert!(!entry.is_outdoor());
        entry.indoor = false;
        entry.category = Category::Lodging;
        assert!(!entry.is_outdoor());
    }

    #[test]
    fn test_entry_serializes_time_as_hh_mm() {
        let entry = ScheduleEntry::try_from(payload("a", "07:05", false)).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["time"], "07:05");
        assert_eq!(json["category"], "sightseeing");
    }

    #[test]
    fn test_unknown_category_reads_as_other() {
        let json = serde_json::json!({
            "id": "x", "day": 2, "time": "10:00", "category": "shopping"
        });
        let p: ScheduleEntryPayload = serde_json::from_value(json).unwrap();
        assert_eq!(p.category, Category::Other);
        assert!(!p.locked);
    }
}
