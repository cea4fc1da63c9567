#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App};
use async_trait::async_trait;
use chrono::NaiveDate;

use replan_api::config::AppConfig;
use replan_api::models::forecast::{
    ForecastSample, ForecastSource, GridCell, PrecipitationType, SkyCondition,
};
use replan_api::models::place::Place;
use replan_api::models::schedule::Category;
use replan_api::routes;
use replan_api::services::place_service::InMemoryPlaceRepository;
use replan_api::services::weather_service::WeatherSource;
use replan_api::state::AppState;

pub const TRIP_START: &str = "2026-07-01";

pub fn trip_start() -> NaiveDate {
    NaiveDate::parse_from_str(TRIP_START, "%Y-%m-%d").unwrap()
}

/// Forecasts keyed by date. Dates without an entry come back as fallback,
/// the same as a failed provider call.
pub struct StubWeatherSource {
    pub by_date: HashMap<NaiveDate, (Option<u8>, PrecipitationType)>,
}

impl StubWeatherSource {
    pub fn new(days: &[(NaiveDate, Option<u8>, PrecipitationType)]) -> Self {
        Self {
            by_date: days.iter().map(|(d, pop, pty)| (*d, (*pop, *pty))).collect(),
        }
    }
}

#[async_trait]
impl WeatherSource for StubWeatherSource {
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample {
        match self.by_date.get(&date) {
            Some((pop, precipitation)) => ForecastSample {
                date,
                grid,
                sky: SkyCondition::Overcast,
                precipitation: *precipitation,
                pop: *pop,
                temperature: Some(23.0),
                source: ForecastSource::ShortTerm,
            },
            None => ForecastSample::fallback(date, grid),
        }
    }
}

/// Never answers within any sane timeout.
pub struct StalledWeatherSource;

#[async_trait]
impl WeatherSource for StalledWeatherSource {
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample {
        tokio::time::sleep(Duration::from_secs(30)).await;
        ForecastSample::fallback(date, grid)
    }
}

pub fn place(
    name: &str,
    category: Category,
    themes: &[&str],
    indoor: bool,
    coords: Option<(f64, f64)>,
) -> Place {
    Place {
        id: None,
        name: name.to_string(),
        category,
        themes: themes.iter().map(|t| t.to_string()).collect(),
        indoor,
        lat: coords.map(|c| c.0),
        lng: coords.map(|c| c.1),
        seasonal_tags: HashMap::new(),
        details: HashMap::new(),
    }
}

/// A handful of places around Jeju City.
pub fn jeju_places() -> Vec<Place> {
    vec![
        place("Cafe Haeng", Category::Cafe, &["cafe"], true, None),
        place("Moonlight Roastery", Category::Cafe, &["cafe", "photo"], true, None),
        place(
            "Jeju Folklore Museum",
            Category::Sightseeing,
            &["indoor"],
            true,
            Some((33.460, 126.565)),
        ),
        place(
            "Dongmun Market Food Hall",
            Category::Food,
            &["indoor", "food"],
            true,
            Some((33.512, 126.528)),
        ),
        place(
            "Yongduam Rock",
            Category::Sightseeing,
            &["photo", "walk"],
            false,
            Some((33.516, 126.512)),
        ),
    ]
}

pub struct TestApp {
    pub state: web::Data<AppState>,
}

impl TestApp {
    pub fn new(weather: Arc<dyn WeatherSource>) -> Self {
        Self::with_config(AppConfig::default(), weather)
    }

    pub fn with_config(config: AppConfig, weather: Arc<dyn WeatherSource>) -> Self {
        let repo = Arc::new(InMemoryPlaceRepository::new(jeju_places()));
        let state = AppState::new(&config, repo.clone(), repo, weather);
        Self {
            state: web::Data::new(state),
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(routes::configure)
    }
}
