//! Multi-horizon forecasting engine
//!
//! A request resolves artifacts for its model family, encodes the trailing
//! window and calls the model once per step:
//! - trained horizons are answered by a single call to their own model
//! - derived horizons (and unified 7-day) repeat the largest loaded step
//!   model, feeding each batch of predictions back into the input
//!
//! Model evaluation is CPU-bound and runs on the blocking pool.

pub mod format;
mod separate;
mod unified;
mod window;

pub use format::format;
pub use window::RollingWindow;

use crate::artifacts::ArtifactCache;
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::model::{InferenceModel, ModelSet};
use crate::types::{ForecastHorizon, ForecastResult, ModelFamily, Observation};
use std::sync::Arc;
use tracing::{info, warn};

/// How a horizon is served from a model set
pub(crate) enum Plan<'a> {
    Direct(&'a dyn InferenceModel),
    Extend {
        step: u32,
        model: &'a dyn InferenceModel,
    },
}

/// Trained horizons use their own model; anything else steps with the largest
/// loaded model within the family's single-call limit.
pub(crate) fn plan(models: &ModelSet, family: ModelFamily, horizon: ForecastHorizon) -> Result<Plan<'_>> {
    let days = horizon.days();
    let unsupported = || ForecastError::HorizonUnsupported { family, horizon: days };

    if family.trained_horizons().contains(&days) {
        return models
            .get(&days)
            .map(|m| Plan::Direct(m.as_ref()))
            .ok_or_else(unsupported);
    }

    models
        .range(..=family.max_step())
        .next_back()
        .map(|(&step, m)| Plan::Extend { step, model: m.as_ref() })
        .ok_or_else(unsupported)
}

/// Horizon of the unified model needed to serve `horizon`
pub fn unified_model_horizon(horizon: ForecastHorizon) -> u32 {
    let days = horizon.days();
    if ModelFamily::Unified.trained_horizons().contains(&days) {
        days
    } else {
        ModelFamily::Unified.max_step()
    }
}

/// First `n` values of a model output; a short output is an error, never padded
pub(crate) fn leading(output: &[f64], n: usize) -> Result<&[f64]> {
    output.get(..n).ok_or_else(|| {
        ForecastError::ModelOutput(format!(
            "model returned {} values, {} needed",
            output.len(),
            n
        ))
    })
}

/// Entry point used by the HTTP API and the CLI
pub struct ForecastService {
    cache: Arc<ArtifactCache>,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(cache: Arc<ArtifactCache>, config: ForecastConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `horizon` days past the latest observation in `history`
    pub async fn forecast(
        &self,
        trading_code: &str,
        mut history: Vec<Observation>,
        horizon: ForecastHorizon,
        family: ModelFamily,
    ) -> Result<ForecastResult> {
        let window_length = self.config.window_length;
        let required = window_length.max(1);
        if history.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                actual: history.len(),
            });
        }
        history.sort_by_key(|o| o.date);

        if family == ModelFamily::Separate && self.config.validate_trading_codes {
            self.check_listed(trading_code).await?;
        }

        let anchor = history
            .last()
            .map(|o| o.date)
            .ok_or_else(|| ForecastError::Internal("history is empty".into()))?;

        let prices = match family {
            ModelFamily::Separate => {
                let artifacts = self.cache.resolve_instrument(trading_code).await?;
                run_blocking(move || separate::forecast(&artifacts, &history, horizon, window_length))
                    .await?
            }
            ModelFamily::Unified => {
                let artifacts = self.cache.resolve_unified(unified_model_horizon(horizon)).await?;
                let code = trading_code.to_string();
                run_blocking(move || unified::forecast(&artifacts, &history, &code, horizon, window_length))
                    .await?
            }
        };

        let result = format(anchor, &prices)?;
        info!(
            "Forecast {} {}d ({}): final price {:.2}",
            trading_code, horizon, family, result.final_price
        );
        Ok(result)
    }

    /// First `limit` trading codes with per-instrument artifacts
    pub async fn list_trading_codes(&self, limit: Option<usize>) -> Vec<String> {
        let limit = limit.unwrap_or(self.config.listed_codes_limit);
        let mut codes = self.cache.list_trading_codes().await;
        codes.truncate(limit);
        codes
    }

    async fn check_listed(&self, trading_code: &str) -> Result<()> {
        let codes = self.cache.list_trading_codes().await;
        if codes.is_empty() {
            warn!("Trading code listing is empty, skipping validation of {}", trading_code);
            return Ok(());
        }
        if !codes.iter().any(|c| c == trading_code) {
            let preview: Vec<_> = codes.iter().take(self.config.listed_codes_limit).collect();
            return Err(ForecastError::UnknownInstrument(format!(
                "{}. Available codes: {:?}...",
                trading_code, preview
            )));
        }
        Ok(())
    }
}

async fn run_blocking<F>(f: F) -> Result<Vec<f64>>
where
    F: FnOnce() -> Result<Vec<f64>> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ForecastError::Internal(format!("inference task failed: {}", e)))?
}
