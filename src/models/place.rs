use std::collections::HashMap;

use chrono::NaiveTime;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::schedule::{Category, ScheduleEntry};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

/// Value stored under a free-form detail key (opening hours, fees, parking...).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DetailValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

/// A place from the repository that can be dropped into a schedule.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Place {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub indoor: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub seasonal_tags: HashMap<Season, Vec<String>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, DetailValue>,
}

impl Place {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.themes.iter().any(|t| t.eq_ignore_ascii_case(theme))
    }

    /// Turn the place into a fresh, unlocked schedule entry at the given slot.
    pub fn to_schedule_entry(&self, day: u32, time: NaiveTime) -> ScheduleEntry {
        ScheduleEntry {
            id: Uuid::new_v4().to_string(),
            day,
            time,
            name: self.name.clone(),
            category: self.category,
            lat: self.lat,
            lng: self.lng,
            locked: false,
            indoor: self.indoor,
            duration_minutes: None,
            place_id: self.id.map(|id| id.to_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_reads_typed_details_and_seasons() {
        let json = serde_json::json!({
            "name": "Jeju Museum of Art",
            "category": "sightseeing",
            "themes": ["indoor", "photo"],
            "indoor": true,
            "lat": 33.452,
            "lng": 126.489,
            "seasonal_tags": { "summer": ["air-conditioned"], "winter": ["heated"] },
            "details": {
                "fee": 2000,
                "parking": true,
                "hours": "09:00-18:00",
                "languages": ["ko", "en"]
            }
        });

        let place: Place = serde_json::from_value(json).unwrap();
        assert_eq!(place.seasonal_tags[&Season::Summer], vec!["air-conditioned"]);
        assert_eq!(place.details["fee"], DetailValue::Number(2000.0));
        assert_eq!(place.details["parking"], DetailValue::Flag(true));
        assert_eq!(
            place.details["hours"],
            DetailValue::Text("09:00-18:00".to_string())
        );
        assert!(matches!(place.details["languages"], DetailValue::List(_)));
        assert!(place.has_theme("Indoor"));
    }

    #[test]
    fn test_to_schedule_entry_copies_place_data() {
        let place = Place {
            id: Some(ObjectId::new()),
            name: "Dongmun Market".to_string(),
            category: Category::Food,
            themes: vec!["food".to_string()],
            indoor: true,
            lat: Some(33.512),
            lng: Some(126.528),
            seasonal_tags: HashMap::new(),
            details: HashMap::new(),
        };

        let time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        let first = place.to_schedule_entry(2, time);
        let second = place.to_schedule_entry(2, time);

        assert_eq!(first.day, 2);
        assert_eq!(first.time, time);
        assert!(!first.locked);
        assert!(first.indoor);
        assert_eq!(first.category, Category::Food);
        assert_eq!(first.place_id, place.id.map(|id| id.to_hex()));
        assert_ne!(first.id, second.id);
    }
}
