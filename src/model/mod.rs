//! Inference models
//!
//! Trained sequence models are opaque to the forecasting engine: a model
//! takes one scaled window (plus an entity id for shared models) and returns
//! scaled target values, one per forecast day.

mod lstm;
#[cfg(feature = "onnx")]
mod onnx;

pub use lstm::LstmModel;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use crate::config::ModelFormat;
use crate::error::{ForecastError, Result};
use ndarray::Array3;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One inference request: a `(1, window, features)` batch
#[derive(Debug, Clone)]
pub struct ModelInput {
    pub window: Array3<f64>,
    /// Entity id for models shared across instruments
    pub entity_id: Option<i64>,
}

impl ModelInput {
    pub fn new(window: Array3<f64>) -> Self {
        Self { window, entity_id: None }
    }

    pub fn with_entity(mut self, entity_id: i64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }
}

/// Trait for trained forecast models
#[cfg_attr(test, mockall::automock)]
pub trait InferenceModel: Send + Sync {
    /// Scaled predictions for the steps following the window
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>>;
}

/// Loaded models keyed by the horizon they were trained on
pub type ModelSet = BTreeMap<u32, Arc<dyn InferenceModel>>;

/// Builds runnable models from artifact bytes
pub trait ModelLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn InferenceModel>>;

    /// File extension of artifacts this loader understands
    fn extension(&self) -> &'static str;
}

/// Loader for Keras LSTM weights exported as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl ModelLoader for JsonModelLoader {
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn InferenceModel>> {
        Ok(Arc::new(LstmModel::from_json(bytes)?))
    }

    fn extension(&self) -> &'static str {
        ModelFormat::Json.extension()
    }
}

#[cfg(feature = "onnx")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxModelLoader;

#[cfg(feature = "onnx")]
impl ModelLoader for OnnxModelLoader {
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn InferenceModel>> {
        Ok(Arc::new(OnnxModel::from_bytes(bytes)?))
    }

    fn extension(&self) -> &'static str {
        ModelFormat::Onnx.extension()
    }
}

/// Pick the loader for the configured artifact format
pub fn loader_for(format: ModelFormat) -> Result<Arc<dyn ModelLoader>> {
    match format {
        ModelFormat::Json => Ok(Arc::new(JsonModelLoader)),
        #[cfg(feature = "onnx")]
        ModelFormat::Onnx => Ok(Arc::new(OnnxModelLoader)),
        #[cfg(not(feature = "onnx"))]
        ModelFormat::Onnx => Err(ForecastError::Internal(
            "ONNX models require building with the `onnx` feature".to_string(),
        )),
    }
}
