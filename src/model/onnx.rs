//! ONNX Runtime backed models

use super::{InferenceModel, ModelInput};
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;

fn onnx_err(e: ort::Error) -> ForecastError {
    ForecastError::Internal(format!("onnx runtime: {}", e))
}

/// Model exported to ONNX.
///
/// Inputs are the `(1, window, features)` f32 batch and, for shared models,
/// a `(1, 1)` i64 entity id. The first output is read as the scaled forecast.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_memory(bytes))
            .map_err(onnx_err)?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl InferenceModel for OnnxModel {
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>> {
        let window = Tensor::from_array(input.window.mapv(|v| v as f32)).map_err(onnx_err)?;

        let mut session = self.session.lock();
        let outputs = match input.entity_id {
            Some(id) => {
                let ids = Tensor::from_array(Array2::from_elem((1, 1), id)).map_err(onnx_err)?;
                session.run(ort::inputs![window, ids])
            }
            None => session.run(ort::inputs![window]),
        }
        .map_err(onnx_err)?;

        let (_, values) = outputs[0].try_extract_tensor::<f32>().map_err(onnx_err)?;
        Ok(values.iter().map(|v| *v as f64).collect())
    }
}
