//! Weather Service with KMA forecast API integration
//!
//! Looks up a single midday forecast sample for a grid cell and date.
//!
//! ## Setup
//! 1. Get a service key for the KMA open API from data.go.kr
//! 2. Set the environment variable: `KMA_SERVICE_KEY=your_key_here`
//! 3. Optionally point `KMA_BASE_URL` somewhere else (defaults to apis.data.go.kr)
//!
//! ## Horizon
//! - 0-2 days ahead: short-term village forecast, keyed by grid cell
//! - 3-10 days ahead: mid-term land forecast, keyed by region
//! - anything else: fallback sample, no request is made
//!
//! Every failure (transport, provider status, unexpected payload, missing
//! sample) ends up as a fallback sample. Callers never see an error.

use std::collections::HashMap;
use std::env;
use std::sync::RwLock;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;

use crate::models::forecast::{
    ForecastSample, ForecastSource, GridCell, PrecipitationType, SkyCondition,
};

const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/1360000";
const KST_OFFSET_HOURS: i64 = 9;

/// Only the midday sample of each day is evaluated
const SAMPLE_TIME: &str = "1200";

const SHORT_TERM_MAX_DAYS: i64 = 2;
const MID_TERM_MIN_DAYS: i64 = 3;
const MID_TERM_MAX_DAYS: i64 = 10;

// Short-term forecasts are published every three hours from 02:00 and
// become available about ten minutes later
const SHORT_TERM_BASE_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];
const PUBLISH_DELAY_MINUTES: i64 = 10;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Forecast for `grid` on `date`. Must hand back a fallback sample rather
    /// than fail.
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample;
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Forecast request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Forecast provider error: {0}")]
    Provider(String),

    #[error("Failed to parse forecast response: {0}")]
    Parse(String),

    #[error("No forecast data: {0}")]
    NoData(String),
}

#[derive(Debug, Deserialize)]
struct KmaResponse<T> {
    response: KmaResponseInner<T>,
}

#[derive(Debug, Deserialize)]
struct KmaResponseInner<T> {
    header: KmaHeader,
    body: Option<KmaBody<T>>,
}

#[derive(Debug, Deserialize)]
struct KmaHeader {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg")]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct KmaBody<T> {
    items: KmaItems<T>,
}

#[derive(Debug, Deserialize)]
struct KmaItems<T> {
    item: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ShortTermItem {
    category: String,
    #[serde(rename = "fcstDate")]
    fcst_date: String,
    #[serde(rename = "fcstTime")]
    fcst_time: String,
    #[serde(rename = "fcstValue")]
    fcst_value: String,
}

type MidTermItem = serde_json::Map<String, serde_json::Value>;

fn unwrap_items<T>(body: &str) -> Result<Vec<T>, WeatherError>
where
    T: for<'de> Deserialize<'de>,
{
    let parsed: KmaResponse<T> =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let header = parsed.response.header;
    if header.result_code != "00" {
        return Err(WeatherError::Provider(format!(
            "{} ({})",
            header.result_msg, header.result_code
        )));
    }

    parsed
        .response
        .body
        .map(|b| b.items.item)
        .ok_or_else(|| WeatherError::NoData("response has no body".to_string()))
}

/// Pick the midday sample for `date` out of a short-term forecast response.
pub fn parse_short_term(
    body: &str,
    grid: GridCell,
    date: NaiveDate,
) -> Result<ForecastSample, WeatherError> {
    let items: Vec<ShortTermItem> = unwrap_items(body)?;
    let target_date = date.format("%Y%m%d").to_string();

    let values: HashMap<&str, &str> = items
        .iter()
        .filter(|item| item.fcst_date == target_date && item.fcst_time == SAMPLE_TIME)
        .map(|item| (item.category.as_str(), item.fcst_value.as_str()))
        .collect();

    if values.is_empty() {
        return Err(WeatherError::NoData(format!(
            "no {} sample for {}",
            SAMPLE_TIME, target_date
        )));
    }

    Ok(ForecastSample {
        date,
        grid,
        sky: values
            .get("SKY")
            .map(|v| SkyCondition::from_code(v))
            .unwrap_or(SkyCondition::Unknown),
        precipitation: values
            .get("PTY")
            .map(|v| PrecipitationType::from_code(v))
            .unwrap_or(PrecipitationType::Unknown),
        pop: values.get("POP").and_then(|v| v.trim().parse::<u8>().ok()),
        temperature: values.get("TMP").and_then(|v| v.trim().parse::<f64>().ok()),
        source: ForecastSource::ShortTerm,
    })
}

/// Sky condition from a mid-term weather description such as "구름많고 비".
pub fn sky_from_text(text: &str) -> SkyCondition {
    if text.starts_with("맑") {
        SkyCondition::Clear
    } else if text.contains("구름많") {
        SkyCondition::MostlyCloudy
    } else if text.contains('흐') {
        SkyCondition::Overcast
    } else {
        SkyCondition::Unknown
    }
}

/// Precipitation type from a mid-term weather description.
pub fn precipitation_from_text(text: &str) -> PrecipitationType {
    if text.is_empty() {
        PrecipitationType::Unknown
    } else if text.contains("비/눈") {
        PrecipitationType::RainSnow
    } else if text.contains("소나기") {
        PrecipitationType::Shower
    } else if text.contains('비') {
        PrecipitationType::Rain
    } else if text.contains('눈') {
        PrecipitationType::Snow
    } else {
        PrecipitationType::None
    }
}

/// Read the `offset_days` afternoon fields out of a mid-term land forecast.
pub fn parse_mid_term(
    body: &str,
    grid: GridCell,
    date: NaiveDate,
    offset_days: i64,
) -> Result<ForecastSample, WeatherError> {
    let items: Vec<MidTermItem> = unwrap_items(body)?;
    let item = items
        .first()
        .ok_or_else(|| WeatherError::NoData("empty mid-term item list".to_string()))?;

    // days 8+ are reported for the whole day, earlier ones split am/pm
    let suffix = if offset_days >= 8 {
        offset_days.to_string()
    } else {
        format!("{}Pm", offset_days)
    };

    let pop = item.get(&format!("rnSt{}", suffix)).and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().map(|p| p.min(100) as u8),
        serde_json::Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    });
    let text = item
        .get(&format!("wf{}", suffix))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if pop.is_none() && text.is_empty() {
        return Err(WeatherError::NoData(format!(
            "no mid-term fields for day +{}",
            offset_days
        )));
    }

    Ok(ForecastSample {
        date,
        grid,
        sky: sky_from_text(text),
        precipitation: precipitation_from_text(text),
        pop,
        temperature: None,
        source: ForecastSource::MidTerm,
    })
}

/// Mid-term land forecast region for a grid cell. Coarse on purpose: the
/// provider only publishes these per province group.
pub fn mid_term_region(grid: GridCell) -> &'static str {
    let GridCell { x, y } = grid;
    if y < 50 {
        "11G00000" // Jeju
    } else if y >= 110 {
        if x < 70 {
            "11B00000" // Seoul, Incheon, Gyeonggi
        } else if x < 85 {
            "11D10000" // Gangwon west
        } else {
            "11D20000" // Gangwon east
        }
    } else if y >= 90 {
        if x < 68 {
            "11C20000" // Daejeon, Sejong, Chungnam
        } else if x < 80 {
            "11C10000" // Chungbuk
        } else {
            "11H10000" // Daegu, Gyeongbuk
        }
    } else if x < 75 {
        if y >= 75 {
            "11F10000" // Jeonbuk
        } else {
            "11F20000" // Gwangju, Jeonnam
        }
    } else {
        "11H20000" // Busan, Ulsan, Gyeongnam
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastPlan {
    ShortTerm { base_date: NaiveDate, base_hour: u32 },
    MidTerm { tm_fc: NaiveDateTime, offset_days: i64 },
    OutOfRange,
}

/// Decide which product (if any) serves `date` when asked at `now` (KST).
pub fn plan_request(date: NaiveDate, now: NaiveDateTime) -> ForecastPlan {
    let days_ahead = (date - now.date()).num_days();

    if (0..=SHORT_TERM_MAX_DAYS).contains(&days_ahead) {
        let usable = now - Duration::minutes(PUBLISH_DELAY_MINUTES);
        let hour = usable.hour();
        return match SHORT_TERM_BASE_HOURS.iter().rev().find(|&&h| h <= hour) {
            Some(&base_hour) => ForecastPlan::ShortTerm {
                base_date: usable.date(),
                base_hour,
            },
            None => ForecastPlan::ShortTerm {
                base_date: usable.date() - Duration::days(1),
                base_hour: 23,
            },
        };
    }

    if (MID_TERM_MIN_DAYS..=MID_TERM_MAX_DAYS).contains(&days_ahead) {
        let today = now.date();
        let tm_fc = if now.hour() >= 18 {
            today.and_hms_opt(18, 0, 0)
        } else if now.hour() >= 6 {
            today.and_hms_opt(6, 0, 0)
        } else {
            (today - Duration::days(1)).and_hms_opt(18, 0, 0)
        };

        if let Some(tm_fc) = tm_fc {
            let offset_days = (date - tm_fc.date()).num_days();
            if (MID_TERM_MIN_DAYS..=MID_TERM_MAX_DAYS).contains(&offset_days) {
                return ForecastPlan::MidTerm { tm_fc, offset_days };
            }
        }
    }

    ForecastPlan::OutOfRange
}

fn now_kst() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(KST_OFFSET_HOURS)
}

pub struct KmaWeatherService {
    http_client: reqwest::Client,
    service_key: String,
    base_url: String,
}

impl KmaWeatherService {
    pub fn new(service_key: String, base_url: String) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            service_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let service_key = env::var("KMA_SERVICE_KEY")
            .map_err(|_| "KMA_SERVICE_KEY environment variable not set")?;
        let base_url = env::var("KMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self::new(service_key, base_url)
    }

    async fn get_text(&self, url: &str) -> Result<String, WeatherError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Provider(format!("HTTP {}", status)));
        }
        Ok(text)
    }

    async fn fetch_short_term(
        &self,
        grid: GridCell,
        date: NaiveDate,
        base_date: NaiveDate,
        base_hour: u32,
    ) -> Result<ForecastSample, WeatherError> {
        let url = format!(
            "{}/VilageFcstInfoService_2.0/getVilageFcst?serviceKey={}&pageNo=1&numOfRows=1000&dataType=JSON&base_date={}&base_time={:02}00&nx={}&ny={}",
            self.base_url,
            self.service_key,
            base_date.format("%Y%m%d"),
            base_hour,
            grid.x,
            grid.y
        );

        let body = self.get_text(&url).await?;
        parse_short_term(&body, grid, date)
    }

    async fn fetch_mid_term(
        &self,
        grid: GridCell,
        date: NaiveDate,
        tm_fc: NaiveDateTime,
        offset_days: i64,
    ) -> Result<ForecastSample, WeatherError> {
        let url = format!(
            "{}/MidFcstInfoService/getMidLandFcst?serviceKey={}&pageNo=1&numOfRows=10&dataType=JSON&regId={}&tmFc={}",
            self.base_url,
            self.service_key,
            mid_term_region(grid),
            tm_fc.format("%Y%m%d%H%M")
        );

        let body = self.get_text(&url).await?;
        parse_mid_term(&body, grid, date, offset_days)
    }
}

#[async_trait]
impl WeatherSource for KmaWeatherService {
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample {
        let result = match plan_request(date, now_kst()) {
            ForecastPlan::ShortTerm {
                base_date,
                base_hour,
            } => self.fetch_short_term(grid, date, base_date, base_hour).await,
            ForecastPlan::MidTerm { tm_fc, offset_days } => {
                self.fetch_mid_term(grid, date, tm_fc, offset_days).await
            }
            ForecastPlan::OutOfRange => {
                log::debug!("{} is outside the forecast horizon", date);
                return ForecastSample::fallback(date, grid);
            }
        };

        result.unwrap_or_else(|e| {
            log::warn!(
                "Forecast lookup for ({}, {}) on {} failed: {}",
                grid.x,
                grid.y,
                date,
                e
            );
            ForecastSample::fallback(date, grid)
        })
    }
}

/// Stand-in used when no provider is configured.
pub struct UnavailableWeatherSource;

#[async_trait]
impl WeatherSource for UnavailableWeatherSource {
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample {
        ForecastSample::fallback(date, grid)
    }
}

struct CachedForecast {
    sample: ForecastSample,
    expires_at: Instant,
}

/// Read-through cache keyed by (grid cell, date). Fallback samples are not
/// stored, so a miss always behaves like a cold lookup.
pub struct CachedWeatherSource<S> {
    inner: S,
    ttl: StdDuration,
    entries: RwLock<HashMap<(GridCell, NaiveDate), CachedForecast>>,
}

impl<S: WeatherSource> CachedWeatherSource<S> {
    pub fn new(inner: S, ttl: StdDuration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &(GridCell, NaiveDate)) -> Option<ForecastSample> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.sample.clone())
    }

    /// Drop expired entries, returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                let now = Instant::now();
                entries.retain(|_, cached| cached.expires_at > now);
                before - entries.len()
            }
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl<S: WeatherSource> WeatherSource for CachedWeatherSource<S> {
    async fn fetch(&self, grid: GridCell, date: NaiveDate) -> ForecastSample {
        let key = (grid, date);
        if let Some(sample) = self.cached(&key) {
            log::debug!("Using cached forecast for ({}, {}) on {}", grid.x, grid.y, date);
            return sample;
        }

        let sample = self.inner.fetch(grid, date).await;

        if !sample.is_fallback() {
            self.purge_expired();
            if let Ok(mut entries) = self.entries.write() {
                entries.insert(
                    key,
                    CachedForecast {
                        sample: sample.clone(),
                        expires_at: Instant::now() + self.ttl,
                    },
                );
            }
        }

        sample
    }
}
