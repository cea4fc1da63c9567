use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::models::place::Place;
use crate::models::schedule::ScheduleEntry;

/// Cell of the forecast provider's Lambert conformal conic grid.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SkyCondition {
    Clear,
    MostlyCloudy,
    Overcast,
    Unknown,
}

impl SkyCondition {
    /// Short-term `SKY` code.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => SkyCondition::Clear,
            "3" => SkyCondition::MostlyCloudy,
            "4" => SkyCondition::Overcast,
            _ => SkyCondition::Unknown,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PrecipitationType {
    None,
    Rain,
    RainSnow,
    Snow,
    Shower,
    Unknown,
}

impl PrecipitationType {
    /// Short-term `PTY` code.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => PrecipitationType::None,
            "1" => PrecipitationType::Rain,
            "2" => PrecipitationType::RainSnow,
            "3" => PrecipitationType::Snow,
            "4" => PrecipitationType::Shower,
            _ => PrecipitationType::Unknown,
        }
    }

    pub fn is_wet(&self) -> bool {
        !matches!(self, PrecipitationType::None | PrecipitationType::Unknown)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ForecastSource {
    ShortTerm,
    MidTerm,
    Fallback,
}

fn serialize_pop<S>(pop: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match pop {
        Some(value) => serializer.serialize_u8(*value),
        None => serializer.serialize_str("-"),
    }
}

/// One forecast reading for a grid cell on a date.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ForecastSample {
    pub date: NaiveDate,
    pub grid: GridCell,
    pub sky: SkyCondition,
    pub precipitation: PrecipitationType,
    /// Precipitation probability in percent
    #[serde(serialize_with = "serialize_pop")]
    pub pop: Option<u8>,
    pub temperature: Option<f64>,
    pub source: ForecastSource,
}

impl ForecastSample {
    /// Sentinel sample for a lookup that could not be served.
    pub fn fallback(date: NaiveDate, grid: GridCell) -> Self {
        Self {
            date,
            grid,
            sky: SkyCondition::Unknown,
            precipitation: PrecipitationType::Unknown,
            pop: None,
            temperature: None,
            source: ForecastSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ForecastSource::Fallback
    }
}

/// An outdoor entry paired with its forecast and any indoor substitutes nearby.
#[derive(Debug, Serialize, Clone)]
pub struct RiskEntry {
    pub entry: ScheduleEntry,
    pub forecast: ForecastSample,
    pub at_risk: bool,
    pub alternatives: Vec<Place>,
}
