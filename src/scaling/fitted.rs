//! Scalers fitted offline and exported as JSON
//!
//! Field names follow scikit-learn's fitted attributes so an export is a
//! plain dump of `scale_`, `min_` and `mean_`.

use super::Scaler;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    /// `x * scale + min`
    MinMax {
        #[serde(rename = "scale_", alias = "scale")]
        scale: Vec<f64>,
        #[serde(rename = "min_", alias = "min")]
        min: Vec<f64>,
    },
    /// `(x - mean) / scale`
    Standard {
        #[serde(rename = "mean_", alias = "mean")]
        mean: Vec<f64>,
        #[serde(rename = "scale_", alias = "scale")]
        scale: Vec<f64>,
    },
}

impl FittedScaler {
    /// Min-max scaler onto [0, 1] from per-column data ranges
    pub fn min_max(data_min: &[f64], data_max: &[f64]) -> Result<Self> {
        if data_min.len() != data_max.len() {
            return Err(ForecastError::Shape(format!(
                "data_min has {} columns, data_max has {}",
                data_min.len(),
                data_max.len()
            )));
        }
        let scale: Vec<f64> = data_min
            .iter()
            .zip(data_max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range == 0.0 { 1.0 } else { 1.0 / range }
            })
            .collect();
        let min = data_min.iter().zip(&scale).map(|(lo, s)| -lo * s).collect();
        Ok(FittedScaler::MinMax { scale, min })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let scaler: FittedScaler = serde_json::from_slice(bytes)?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<()> {
        let (a, b) = match self {
            FittedScaler::MinMax { scale, min } => (scale, min),
            FittedScaler::Standard { mean, scale } => (scale, mean),
        };
        if a.is_empty() || a.len() != b.len() {
            return Err(ForecastError::Shape(format!(
                "scaler parameters have mismatched lengths {} and {}",
                a.len(),
                b.len()
            )));
        }
        let scale = match self {
            FittedScaler::MinMax { scale, .. } | FittedScaler::Standard { scale, .. } => scale,
        };
        if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(ForecastError::Shape("scaler has a zero or non-finite scale".into()));
        }
        Ok(())
    }

    fn check_columns(&self, rows: &Array2<f64>) -> Result<()> {
        if rows.ncols() != self.n_features() {
            return Err(ForecastError::Shape(format!(
                "expected {} columns, got {}",
                self.n_features(),
                rows.ncols()
            )));
        }
        Ok(())
    }
}

impl Scaler for FittedScaler {
    fn n_features(&self) -> usize {
        match self {
            FittedScaler::MinMax { scale, .. } | FittedScaler::Standard { scale, .. } => scale.len(),
        }
    }

    fn transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(rows)?;
        Ok(match self {
            FittedScaler::MinMax { scale, min } => {
                rows * &Array1::from(scale.clone()) + &Array1::from(min.clone())
            }
            FittedScaler::Standard { mean, scale } => {
                (rows - &Array1::from(mean.clone())) / &Array1::from(scale.clone())
            }
        })
    }

    fn inverse_transform(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(rows)?;
        Ok(match self {
            FittedScaler::MinMax { scale, min } => {
                (rows - &Array1::from(min.clone())) / &Array1::from(scale.clone())
            }
            FittedScaler::Standard { mean, scale } => {
                rows * &Array1::from(scale.clone()) + &Array1::from(mean.clone())
            }
        })
    }
}
