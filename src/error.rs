//! Error types for the forecasting service

use crate::types::ModelFamily;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Forecasting errors
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Not enough historical data. Need at least {required} days, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Unknown trading code: {0}")]
    UnknownInstrument(String),

    #[error("Horizon {horizon} is not supported by the {family} model family")]
    HorizonUnsupported { family: ModelFamily, horizon: u32 },

    #[error("No predicted prices to format")]
    EmptyForecast,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Model output error: {0}")]
    ModelOutput(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForecastError {
    /// True for failures caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientHistory { .. }
                | ForecastError::UnknownInstrument(_)
                | ForecastError::HorizonUnsupported { .. }
                | ForecastError::InvalidRequest(_)
        )
    }
}
