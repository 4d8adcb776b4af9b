//! Forecast output formatting

use crate::error::{ForecastError, Result};
use crate::types::{add_days, ForecastResult};
use chrono::NaiveDateTime;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn round2(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Date each price one day after the previous, starting the day after `anchor`
pub fn format(anchor: NaiveDateTime, prices: &[f64]) -> Result<ForecastResult> {
    let predicted_prices: Vec<f64> = prices.iter().copied().map(round2).collect();
    let final_price = *predicted_prices.last().ok_or(ForecastError::EmptyForecast)?;

    let dates = (1..=prices.len() as i64)
        .map(|day| add_days(anchor, day).map(|d| d.format(DATE_FORMAT).to_string()))
        .collect::<Result<Vec<_>>>()?;

    Ok(ForecastResult {
        predicted_prices,
        dates,
        final_price,
    })
}
