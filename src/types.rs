//! Core types for the forecasting service

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ForecastError;

/// Minimum number of observations a model window consumes
pub const MIN_HISTORY_LENGTH: usize = 60;

/// Daily market snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    pub date: NaiveDateTime,
    #[serde(rename = "tradingCode")]
    pub trading_code: String,
    /// Last traded price
    pub ltp: f64,
    pub high: f64,
    pub low: f64,
    pub openp: f64,
    pub closep: f64,
    /// Yesterday's closing price
    pub ycp: f64,
    pub trade: i64,
    pub value: f64,
    pub volume: i64,
}

impl Observation {
    /// Feedback record built from a predicted price.
    ///
    /// Every price-like field carries the prediction and the activity fields
    /// are zero, so it can never be mistaken for real market data.
    pub fn synthetic(template: &Observation, date: NaiveDateTime, price: f64) -> Self {
        Self {
            id: template.id,
            date,
            trading_code: template.trading_code.clone(),
            ltp: price,
            high: price,
            low: price,
            openp: price,
            closep: price,
            ycp: price,
            trade: 0,
            value: 0.0,
            volume: 0,
        }
    }
}

fn serialize_date<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// Parse RFC 3339, naive datetime or plain `YYYY-MM-DD` input
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Supported forecast horizons in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ForecastHorizon {
    OneDay = 1,
    ThreeDays = 3,
    SevenDays = 7,
    FifteenDays = 15,
    ThirtyDays = 30,
}

impl ForecastHorizon {
    pub fn all() -> [ForecastHorizon; 5] {
        [
            ForecastHorizon::OneDay,
            ForecastHorizon::ThreeDays,
            ForecastHorizon::SevenDays,
            ForecastHorizon::FifteenDays,
            ForecastHorizon::ThirtyDays,
        ]
    }

    pub fn days(&self) -> u32 {
        *self as u32
    }

    /// Horizons no model is trained on directly
    pub fn is_derived(&self) -> bool {
        matches!(self, ForecastHorizon::FifteenDays | ForecastHorizon::ThirtyDays)
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = ForecastError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        ForecastHorizon::all()
            .into_iter()
            .find(|h| h.days() == days)
            .ok_or_else(|| {
                ForecastError::InvalidRequest(format!(
                    "Unsupported prediction horizon: {}. Supported values: [1, 3, 7, 15, 30]",
                    days
                ))
            })
    }
}

impl From<ForecastHorizon> for u32 {
    fn from(h: ForecastHorizon) -> u32 {
        h.days()
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

/// Model topology used to serve a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// One scaler and one model per horizon for every instrument
    #[serde(alias = "seperate")]
    Separate,
    /// One shared model per horizon conditioned on an entity id
    Unified,
}

impl ModelFamily {
    /// Horizons with a directly trained model
    pub fn trained_horizons(&self) -> &'static [u32] {
        match self {
            ModelFamily::Separate => &[1, 3, 7],
            ModelFamily::Unified => &[1, 3],
        }
    }

    /// Largest horizon a single inference call may cover
    pub fn max_step(&self) -> u32 {
        match self {
            ModelFamily::Separate => 7,
            ModelFamily::Unified => 3,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Separate => write!(f, "separate"),
            ModelFamily::Unified => write!(f, "unified"),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "separate" | "seperate" => Ok(ModelFamily::Separate),
            "unified" => Ok(ModelFamily::Unified),
            other => Err(ForecastError::InvalidRequest(format!(
                "Unsupported model: {}. Supported models: separate, unified",
                other
            ))),
        }
    }
}

/// Dated forecast for one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub predicted_prices: Vec<f64>,
    pub dates: Vec<String>,
    pub final_price: f64,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.predicted_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted_prices.is_empty()
    }

    /// (date, price) pairs in forecast order
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.dates
            .iter()
            .map(String::as_str)
            .zip(self.predicted_prices.iter().copied())
    }
}

/// Step a date forward by whole days; dates past chrono's range are rejected
pub fn add_days(date: NaiveDateTime, days: i64) -> crate::error::Result<NaiveDateTime> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| ForecastError::InvalidRequest("forecast dates out of range".into()))
}
