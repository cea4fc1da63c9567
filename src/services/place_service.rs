//! Place repository access.
//!
//! Two narrow contracts sit between the planner and wherever places live:
//! theme lookups for filling gaps, and a geographically pre-filtered pool of
//! indoor places for weather substitutes. MongoDB backs them in production,
//! an in-memory repository backs local runs and tests.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection};

use crate::models::place::Place;

const DATABASE: &str = "Replan";
const PLACES_COLLECTION: &str = "Places";
pub const DEFAULT_CANDIDATE_FETCH_LIMIT: i64 = 50;

// Rough kilometres per degree, good enough for a pre-filter box
const KM_PER_DEGREE_LAT: f64 = 111.0;
const KM_PER_DEGREE_LNG_AT_EQUATOR: f64 = 111.32;

pub type PlaceSourceResult<T> = Result<T, PlaceSourceError>;

#[derive(Debug, thiserror::Error)]
pub enum PlaceSourceError {
    #[error("Place query failed: {0}")]
    QueryError(String),

    #[error("Place repository unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for PlaceSourceError {
    fn from(err: mongodb::error::Error) -> Self {
        PlaceSourceError::QueryError(err.to_string())
    }
}

/// Places matching a theme, used to fill open gaps.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn by_theme(&self, theme: &str) -> PlaceSourceResult<Vec<Place>>;
}

/// Indoor places around a point, used as rain substitutes.
#[async_trait]
pub trait IndoorCandidatePool: Send + Sync {
    async fn indoor_candidates(
        &self,
        center: (f64, f64),
        radius_km: f64,
    ) -> PlaceSourceResult<Vec<Place>>;
}

/// (min_lat, max_lat, min_lng, max_lng) box enclosing a circle of `radius_km`.
pub fn bounding_box(center: (f64, f64), radius_km: f64) -> (f64, f64, f64, f64) {
    let lat_delta = radius_km / KM_PER_DEGREE_LAT;
    let lng_scale = (KM_PER_DEGREE_LNG_AT_EQUATOR * center.0.to_radians().cos()).max(1e-6);
    let lng_delta = radius_km / lng_scale;

    (
        center.0 - lat_delta,
        center.0 + lat_delta,
        center.1 - lng_delta,
        center.1 + lng_delta,
    )
}

/// Whole-value, case-insensitive match against any entry of `themes`.
pub fn theme_filter(theme: &str) -> Document {
    doc! {
        "themes": {
            "$regex": format!("^{}$", regex::escape(theme)),
            "$options": "i",
        }
    }
}

fn inside_box(place: &Place, bbox: (f64, f64, f64, f64)) -> bool {
    match place.coordinates() {
        Some((lat, lng)) => lat >= bbox.0 && lat <= bbox.1 && lng >= bbox.2 && lng <= bbox.3,
        None => false,
    }
}

pub struct MongoPlaceRepository {
    client: Arc<Client>,
    fetch_limit: i64,
}

impl MongoPlaceRepository {
    pub fn with_limit(client: Arc<Client>, fetch_limit: i64) -> Self {
        Self {
            client,
            fetch_limit,
        }
    }

    fn collection(&self) -> Collection<Place> {
        self.client.database(DATABASE).collection(PLACES_COLLECTION)
    }
}

#[async_trait]
impl CandidateSource for MongoPlaceRepository {
    async fn by_theme(&self, theme: &str) -> PlaceSourceResult<Vec<Place>> {
        let cursor = self
            .collection()
            .find(theme_filter(theme))
            .sort(doc! { "name": 1 })
            .limit(self.fetch_limit)
            .await?;
        let places: Vec<Place> = cursor.try_collect().await?;

        log::debug!("Found {} places for theme '{}'", places.len(), theme);
        Ok(places)
    }
}

#[async_trait]
impl IndoorCandidatePool for MongoPlaceRepository {
    async fn indoor_candidates(
        &self,
        center: (f64, f64),
        radius_km: f64,
    ) -> PlaceSourceResult<Vec<Place>> {
        let (min_lat, max_lat, min_lng, max_lng) = bounding_box(center, radius_km);
        let filter = doc! {
            "indoor": true,
            "lat": { "$gte": min_lat, "$lte": max_lat },
            "lng": { "$gte": min_lng, "$lte": max_lng },
        };

        let cursor = self.collection().find(filter).limit(self.fetch_limit).await?;
        let places: Vec<Place> = cursor.try_collect().await?;

        log::debug!(
            "Found {} indoor places around ({:.4}, {:.4})",
            places.len(),
            center.0,
            center.1
        );
        Ok(places)
    }
}

/// In-memory place repository with the same filtering rules as the Mongo one.
#[derive(Clone, Default)]
pub struct InMemoryPlaceRepository {
    places: Arc<RwLock<Vec<Place>>>,
}

impl InMemoryPlaceRepository {
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            places: Arc::new(RwLock::new(places)),
        }
    }

    pub fn insert(&self, place: Place) -> PlaceSourceResult<()> {
        let mut places = self
            .places
            .write()
            .map_err(|e| PlaceSourceError::Unavailable(e.to_string()))?;
        places.push(place);
        Ok(())
    }

    fn snapshot(&self) -> PlaceSourceResult<Vec<Place>> {
        self.places
            .read()
            .map(|places| places.clone())
            .map_err(|e| PlaceSourceError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CandidateSource for InMemoryPlaceRepository {
    async fn by_theme(&self, theme: &str) -> PlaceSourceResult<Vec<Place>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|p| p.has_theme(theme))
            .collect())
    }
}

#[async_trait]
impl IndoorCandidatePool for InMemoryPlaceRepository {
    async fn indoor_candidates(
        &self,
        center: (f64, f64),
        radius_km: f64,
    ) -> PlaceSourceResult<Vec<Place>> {
        let bbox = bounding_box(center, radius_km);
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|p| p.indoor && inside_box(p, bbox))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::Category;
    use std::collections::HashMap;

    fn place(name: &str, themes: &[&str], indoor: bool, lat: f64, lng: f64) -> Place {
        Place {
            id: None,
            name: name.to_string(),
            category: Category::Cafe,
            themes: themes.iter().map(|t| t.to_string()).collect(),
            indoor,
            lat: Some(lat),
            lng: Some(lng),
            seasonal_tags: HashMap::new(),
            details: HashMap::new(),
        }
    }

    #[test]
    fn test_bounding_box_encloses_radius() {
        let (min_lat, max_lat, min_lng, max_lng) = bounding_box((33.45, 126.56), 5.0);
        assert!(min_lat < 33.41 && max_lat > 33.49);
        assert!(min_lng < 126.51 && max_lng > 126.61);
    }

    #[actix_rt::test]
    async fn test_in_memory_by_theme() {
        let repo = InMemoryPlaceRepository::new(vec![
            place("Ocean view cafe", &["cafe", "photo"], true, 33.5, 126.5),
            place("Olle trail 7", &["walk"], false, 33.24, 126.53),
        ]);

        let cafes = repo.by_theme("CAFE").await.unwrap();
        assert_eq!(cafes.len(), 1);
        assert_eq!(cafes[0].name, "Ocean view cafe");
        assert!(repo.by_theme("nightlife").await.unwrap().is_empty());
    }

    #[test]
    fn test_theme_filter_is_case_insensitive_whole_match() {
        let filter = theme_filter("Cafe");
        let themes = filter.get_document("themes").unwrap();
        let pattern = themes.get_str("$regex").unwrap();
        assert_eq!(pattern, "^Cafe$");
        assert_eq!(themes.get_str("$options").unwrap(), "i");

        // same verdicts as the in-memory repository
        let matcher = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap();
        let cafe = place("Ocean view cafe", &["cafe", "photo"], true, 33.5, 126.5);
        for stored in ["cafe", "CAFE", "Cafe", "cafes", "cafe bar"] {
            let mut p = cafe.clone();
            p.themes = vec![stored.to_string()];
            assert_eq!(matcher.is_match(stored), p.has_theme("Cafe"), "{}", stored);
        }
    }

    #[test]
    fn test_theme_filter_escapes_metacharacters() {
        let filter = theme_filter("k-pop (live)");
        let pattern = filter
            .get_document("themes")
            .unwrap()
            .get_str("$regex")
            .unwrap()
            .to_string();
        let matcher = regex::Regex::new(&pattern).unwrap();
        assert!(matcher.is_match("k-pop (live)"));
        assert!(!matcher.is_match("k-pop live"));
    }

    #[actix_rt::test]
    async fn test_in_memory_indoor_candidates() {
        let repo = InMemoryPlaceRepository::default();
        repo.insert(place("Near indoor", &[], true, 33.46, 126.565)).unwrap();
        repo.insert(place("Near outdoor", &[], false, 33.46, 126.565)).unwrap();
        repo.insert(place("Far indoor", &[], true, 33.25, 126.41)).unwrap();

        let pool = repo.indoor_candidates((33.45, 126.56), 5.0).await.unwrap();
        let names: Vec<&str> = pool.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Near indoor"]);
    }
}
