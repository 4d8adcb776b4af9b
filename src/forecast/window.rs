//! Fixed-length scaled input buffer

use crate::error::{ForecastError, Result};
use ndarray::Array3;

/// Single-feature scaled window fed back into a model between steps
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    values: Vec<f64>,
}

impl RollingWindow {
    /// Take ownership of an encoded `(1, len, 1)` batch
    pub fn from_batch(batch: &Array3<f64>) -> Result<Self> {
        let (batches, len, features) = batch.dim();
        if batches != 1 || features != 1 || len == 0 {
            return Err(ForecastError::Shape(format!(
                "rolling window needs a (1, n, 1) batch, got ({}, {}, {})",
                batches, len, features
            )));
        }
        Ok(Self {
            values: batch.iter().copied().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Drop the oldest `incoming.len()` values and append `incoming` at the tail.
    ///
    /// Length never changes; when more values arrive than the window holds,
    /// only the newest fit.
    pub fn shift_in(&mut self, incoming: &[f64]) {
        let len = self.values.len();
        let k = incoming.len().min(len);
        self.values.rotate_left(k);
        self.values[len - k..].copy_from_slice(&incoming[incoming.len() - k..]);
    }

    /// Current contents as a model batch
    pub fn to_batch(&self) -> Array3<f64> {
        Array3::from_shape_fn((1, self.values.len(), 1), |(_, i, _)| self.values[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn window(values: &[f64]) -> RollingWindow {
        let batch = Array3::from_shape_fn((1, values.len(), 1), |(_, i, _)| values[i]);
        RollingWindow::from_batch(&batch).unwrap()
    }

    #[test]
    fn test_shift_in() {
        let mut w = window(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        w.shift_in(&[6.0, 7.0]);
        assert_eq!(w.values(), &[3.0, 4.0, 5.0, 6.0, 7.0]);

        w.shift_in(&[]);
        assert_eq!(w.len(), 5);
        assert_eq!(w.values(), &[3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_shift_in_longer_than_window() {
        let mut w = window(&[1.0, 2.0, 3.0]);
        w.shift_in(&[10.0, 11.0, 12.0, 13.0]);
        assert_eq!(w.values(), &[11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_batch_round_trip() {
        let w = window(&[0.1, 0.2, 0.3]);
        let batch = w.to_batch();
        assert_eq!(batch.dim(), (1, 3, 1));
        assert_eq!(batch[[0, 2, 0]], 0.3);
        assert_eq!(RollingWindow::from_batch(&batch).unwrap(), w);
    }

    #[test]
    fn test_rejects_multi_feature_batch() {
        let batch = Array3::<f64>::zeros((1, 60, 5));
        assert!(matches!(
            RollingWindow::from_batch(&batch),
            Err(ForecastError::Shape(_))
        ));
    }
}
