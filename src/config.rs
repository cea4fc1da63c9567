use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

use crate::services::gap_analysis_service::GapRules;
use crate::services::place_service::DEFAULT_CANDIDATE_FETCH_LIMIT;
use crate::services::proximity_service::ProximityConfig;
use crate::services::weather_risk_service::RiskRules;
use crate::services::weather_service::DEFAULT_CACHE_TTL_SECS;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_uri: Option<String>,
    pub gap_rules: GapRules,
    pub risk_rules: RiskRules,
    pub proximity: ProximityConfig,
    pub forecast_cache_ttl: Duration,
    pub candidate_fetch_limit: i64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_time_or(key: &str, default: NaiveTime) -> NaiveTime {
    env::var(key)
        .ok()
        .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            mongo_uri: None,
            gap_rules: GapRules::default(),
            risk_rules: RiskRules::default(),
            proximity: ProximityConfig::default(),
            forecast_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            candidate_fetch_limit: DEFAULT_CANDIDATE_FETCH_LIMIT,
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables, keeping the default for
    /// anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut gap_rules = GapRules {
            day_start_time: env_time_or("DAY_WINDOW_START", defaults.gap_rules.day_start_time),
            day_end_time: env_time_or("DAY_WINDOW_END", defaults.gap_rules.day_end_time),
            locked_dwell_minutes: env_or(
                "LOCKED_DWELL_MINUTES",
                defaults.gap_rules.locked_dwell_minutes,
            ),
            min_gap_minutes: env_or("MIN_GAP_MINUTES", defaults.gap_rules.min_gap_minutes),
        };
        if gap_rules.day_end_time <= gap_rules.day_start_time {
            log::warn!("Day window end is not after its start, using the default window");
            gap_rules.day_start_time = defaults.gap_rules.day_start_time;
            gap_rules.day_end_time = defaults.gap_rules.day_end_time;
        }

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            mongo_uri: env::var("MONGODB_URI").ok().filter(|uri| !uri.trim().is_empty()),
            gap_rules,
            risk_rules: RiskRules {
                pop_threshold: env_or("RAIN_POP_THRESHOLD", defaults.risk_rules.pop_threshold),
                lookup_timeout: Duration::from_secs(env_or(
                    "FORECAST_TIMEOUT_SECS",
                    defaults.risk_rules.lookup_timeout.as_secs(),
                )),
            },
            proximity: ProximityConfig {
                max_distance_km: env_or("INDOOR_RADIUS_KM", defaults.proximity.max_distance_km),
                max_alternatives: env::var("MAX_INDOOR_ALTERNATIVES")
                    .ok()
                    .and_then(|s| s.trim().parse().ok()),
            },
            forecast_cache_ttl: Duration::from_secs(env_or(
                "FORECAST_CACHE_TTL_SECS",
                defaults.forecast_cache_ttl.as_secs(),
            )),
            candidate_fetch_limit: env_or("CANDIDATE_FETCH_LIMIT", defaults.candidate_fetch_limit),
        }
    }
}
