//! Shared OHLCV model conditioned on an entity id

use super::{leading, plan, Plan};
use crate::artifacts::UnifiedArtifacts;
use crate::error::{ForecastError, Result};
use crate::model::{InferenceModel, ModelInput};
use crate::scaling::{decode, encode, FeatureLayout, Scaler};
use crate::types::{add_days, ForecastHorizon, ModelFamily, Observation};
use tracing::debug;

const LAYOUT: FeatureLayout = FeatureLayout::Ohlcv;

/// Forecast `horizon` closing prices with the shared model.
///
/// Derived horizons append synthetic observations to a copy of the history
/// and re-encode it before every step.
pub fn forecast(
    artifacts: &UnifiedArtifacts,
    history: &[Observation],
    trading_code: &str,
    horizon: ForecastHorizon,
    window_length: usize,
) -> Result<Vec<f64>> {
    let entity_id = artifacts.entity_index.entity_id(trading_code)?;
    let scaler = artifacts.scaler.as_ref();

    match plan(&artifacts.models, ModelFamily::Unified, horizon)? {
        Plan::Direct(model) => {
            let batch = encode(history, scaler, LAYOUT, window_length)?;
            let output = model.predict(&ModelInput::new(batch).with_entity(entity_id))?;
            decode(leading(&output, horizon.days() as usize)?, scaler, LAYOUT)
        }
        Plan::Extend { step, model } => extend(
            model,
            scaler,
            history,
            entity_id,
            step as usize,
            horizon.days() as usize,
            window_length,
        ),
    }
}

fn extend(
    model: &dyn InferenceModel,
    scaler: &dyn Scaler,
    history: &[Observation],
    entity_id: i64,
    step: usize,
    horizon: usize,
    window_length: usize,
) -> Result<Vec<f64>> {
    let mut extended = history.to_vec();
    let mut prices = Vec::with_capacity(horizon);
    let mut remaining = horizon;

    while remaining > 0 {
        let batch = encode(&extended, scaler, LAYOUT, window_length)?;
        let output = model.predict(&ModelInput::new(batch).with_entity(entity_id))?;
        let take = step.min(remaining);
        let batch_prices = decode(leading(&output, take)?, scaler, LAYOUT)?;

        let last = extended
            .last()
            .cloned()
            .ok_or_else(|| ForecastError::Internal("extended history is empty".into()))?;
        for (day, &price) in batch_prices.iter().enumerate() {
            let date = add_days(last.date, day as i64 + 1)?;
            extended.push(Observation::synthetic(&last, date, price));
        }

        prices.extend(batch_prices);
        remaining -= take;
        debug!(
            "Appended {} synthetic observations, {} days remaining",
            take, remaining
        );
    }

    Ok(prices)
}
