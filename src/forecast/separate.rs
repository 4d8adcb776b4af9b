//! Per-instrument models over the closing price

use super::{leading, plan, Plan};
use super::window::RollingWindow;
use crate::artifacts::InstrumentArtifacts;
use crate::error::Result;
use crate::model::{InferenceModel, ModelInput};
use crate::scaling::{decode, encode, FeatureLayout, Scaler};
use crate::types::{ForecastHorizon, ModelFamily, Observation};
use tracing::debug;

const LAYOUT: FeatureLayout = FeatureLayout::Close;

/// Forecast `horizon` closing prices for one instrument.
///
/// Derived horizons feed scaled predictions back through a rolling window.
pub fn forecast(
    artifacts: &InstrumentArtifacts,
    history: &[Observation],
    horizon: ForecastHorizon,
    window_length: usize,
) -> Result<Vec<f64>> {
    let scaler = artifacts.scaler.as_ref();
    let batch = encode(history, scaler, LAYOUT, window_length)?;

    match plan(&artifacts.models, ModelFamily::Separate, horizon)? {
        Plan::Direct(model) => {
            let output = model.predict(&ModelInput::new(batch))?;
            decode(leading(&output, horizon.days() as usize)?, scaler, LAYOUT)
        }
        Plan::Extend { step, model } => {
            let window = RollingWindow::from_batch(&batch)?;
            extend(model, scaler, window, step as usize, horizon.days() as usize)
        }
    }
}

fn extend(
    model: &dyn InferenceModel,
    scaler: &dyn Scaler,
    mut window: RollingWindow,
    step: usize,
    horizon: usize,
) -> Result<Vec<f64>> {
    let mut prices = Vec::with_capacity(horizon);
    let mut remaining = horizon;

    while remaining > 0 {
        let output = model.predict(&ModelInput::new(window.to_batch()))?;
        let take = step.min(remaining);
        let scaled = leading(&output, take)?;

        prices.extend(decode(scaled, scaler, LAYOUT)?);
        window.shift_in(scaled);
        remaining -= take;
        debug!("Rolled {} scaled values into the window, {} days remaining", take, remaining);
    }

    Ok(prices)
}
