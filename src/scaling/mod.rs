//! Scaling pipeline
//!
//! Maps raw observations into the normalized feature space a model was
//! trained on, and maps scaled model output back to prices:
//! - `Close`: one feature, the closing price
//! - `Ohlcv`: open, high, low, close, volume
//!
//! A fitted scaler can only invert whole feature rows, so decoding a single
//! target column rebuilds positionally correct rows around it.

mod fitted;
#[cfg(test)]
mod tests;

pub use fitted::FittedScaler;

use crate::error::{ForecastError, Result};
use crate::types::{ModelFamily, Observation};
use ndarray::{Array2, Array3, ArrayView1, Axis};

/// Reversible, row-wise feature transform
pub trait Scaler: Send + Sync {
    /// Number of columns the scaler was fitted on
    fn n_features(&self) -> usize;

    fn transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>>;

    fn inverse_transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Column layout of the model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureLayout {
    Close,
    Ohlcv,
}

impl FeatureLayout {
    pub fn for_family(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Separate => FeatureLayout::Close,
            ModelFamily::Unified => FeatureLayout::Ohlcv,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            FeatureLayout::Close => 1,
            FeatureLayout::Ohlcv => 5,
        }
    }

    /// Column holding the forecast target
    pub fn target_column(&self) -> usize {
        match self {
            FeatureLayout::Close => 0,
            FeatureLayout::Ohlcv => 3,
        }
    }

    fn push_row(&self, obs: &Observation, out: &mut Vec<f64>) {
        match self {
            FeatureLayout::Close => out.push(obs.closep),
            FeatureLayout::Ohlcv => out.extend_from_slice(&[
                obs.openp,
                obs.high,
                obs.low,
                obs.closep,
                obs.volume as f64,
            ]),
        }
    }
}

/// Raw feature rows for a slice of observations
pub fn feature_matrix(observations: &[Observation], layout: FeatureLayout) -> Array2<f64> {
    let n_features = layout.n_features();
    let mut values = Vec::with_capacity(observations.len() * n_features);
    for obs in observations {
        layout.push_row(obs, &mut values);
    }
    // Length is rows * cols by construction
    Array2::from_shape_vec((observations.len(), n_features), values)
        .unwrap_or_else(|_| Array2::zeros((0, n_features)))
}

fn check_layout(scaler: &dyn Scaler, layout: FeatureLayout) -> Result<()> {
    if scaler.n_features() != layout.n_features() {
        return Err(ForecastError::Shape(format!(
            "scaler expects {} features, layout {:?} has {}",
            scaler.n_features(),
            layout,
            layout.n_features()
        )));
    }
    Ok(())
}

/// Scale the trailing `window_length` observations into a `(1, window, features)` batch.
pub fn encode(
    history: &[Observation],
    scaler: &dyn Scaler,
    layout: FeatureLayout,
    window_length: usize,
) -> Result<Array3<f64>> {
    if history.len() < window_length {
        return Err(ForecastError::InsufficientHistory {
            required: window_length,
            actual: history.len(),
        });
    }
    check_layout(scaler, layout)?;

    let tail = &history[history.len() - window_length..];
    let scaled = scaler.transform(&feature_matrix(tail, layout))?;
    Ok(scaled.insert_axis(Axis(0)))
}

/// Recover prices from scaled target values, floored at zero.
pub fn decode(scaled: &[f64], scaler: &dyn Scaler, layout: FeatureLayout) -> Result<Vec<f64>> {
    check_layout(scaler, layout)?;

    let target = layout.target_column();
    let mut rows = Array2::<f64>::zeros((scaled.len(), layout.n_features()));
    rows.column_mut(target).assign(&ArrayView1::from(scaled));

    let restored = scaler.inverse_transform(&rows)?;
    Ok(restored.column(target).iter().map(|&p| floor_price(p)).collect())
}

/// Prices are never reported negative
pub fn floor_price(price: f64) -> f64 {
    price.max(0.0)
}
