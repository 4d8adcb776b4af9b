//! StockCast price forecasting service
//!
//! Serves multi-horizon closing price forecasts from pretrained sequence
//! models, extending the directly trained horizons autoregressively.
//!
//! ## Architecture
//!
//! ```text
//! API → Artifact Cache (Hub / Local) → Scaling (encode) → Extender → Scaling (decode) → Formatter
//!                                                            ↑
//!                                                   Inference Model (LSTM / ONNX)
//! ```

pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod scaling;
pub mod types;

#[cfg(test)]
pub mod testing;
