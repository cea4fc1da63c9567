use std::sync::Arc;

use mongodb::Client;

use crate::config::AppConfig;
use crate::services::place_service::{
    CandidateSource, InMemoryPlaceRepository, IndoorCandidatePool, MongoPlaceRepository,
};
use crate::services::proximity_service::ProximityMatcher;
use crate::services::replan_service::ReplanService;
use crate::services::weather_risk_service::RainRiskService;
use crate::services::weather_service::{
    CachedWeatherSource, KmaWeatherService, UnavailableWeatherSource, WeatherSource,
};

/// Shared handler state.
pub struct AppState {
    pub replan: ReplanService,
    pub rain_risk: RainRiskService,
    pub mongo: Option<Arc<Client>>,
    pub weather_configured: bool,
}

impl AppState {
    /// Wire services around explicit collaborators.
    pub fn new(
        config: &AppConfig,
        candidates: Arc<dyn CandidateSource>,
        indoor_pool: Arc<dyn IndoorCandidatePool>,
        weather: Arc<dyn WeatherSource>,
    ) -> Self {
        Self {
            replan: ReplanService::with_rules(candidates, config.gap_rules.clone()),
            rain_risk: RainRiskService::new(
                weather,
                indoor_pool,
                ProximityMatcher::new(config.proximity.clone()),
                config.risk_rules.clone(),
            ),
            mongo: None,
            weather_configured: false,
        }
    }

    /// Production wiring: MongoDB places when a client is given, KMA forecasts
    /// when a key is configured, and degraded stand-ins otherwise.
    pub fn from_config(config: &AppConfig, mongo: Option<Arc<Client>>) -> Self {
        let (candidates, indoor_pool): (Arc<dyn CandidateSource>, Arc<dyn IndoorCandidatePool>) =
            match &mongo {
                Some(client) => {
                    let repo = Arc::new(MongoPlaceRepository::with_limit(
                        client.clone(),
                        config.candidate_fetch_limit,
                    ));
                    let candidates: Arc<dyn CandidateSource> = repo.clone();
                    let indoor_pool: Arc<dyn IndoorCandidatePool> = repo;
                    (candidates, indoor_pool)
                }
                None => {
                    log::warn!("No MongoDB configured, using an empty in-memory place repository");
                    let repo = Arc::new(InMemoryPlaceRepository::default());
                    let candidates: Arc<dyn CandidateSource> = repo.clone();
                    let indoor_pool: Arc<dyn IndoorCandidatePool> = repo;
                    (candidates, indoor_pool)
                }
            };

        let (weather, weather_configured): (Arc<dyn WeatherSource>, bool) =
            match KmaWeatherService::from_env() {
                Ok(service) => {
                    log::info!("KMA weather service initialized");
                    let cached: Arc<dyn WeatherSource> =
                        Arc::new(CachedWeatherSource::new(service, config.forecast_cache_ttl));
                    (cached, true)
                }
                Err(e) => {
                    log::warn!(
                        "Weather service not available: {}. Every forecast will be a fallback.",
                        e
                    );
                    let unavailable: Arc<dyn WeatherSource> = Arc::new(UnavailableWeatherSource);
                    (unavailable, false)
                }
            };

        Self {
            mongo,
            weather_configured,
            ..Self::new(config, candidates, indoor_pool, weather)
        }
    }
}
