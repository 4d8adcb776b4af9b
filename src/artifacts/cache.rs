//! Artifact resolver with a process-wide cache
//!
//! Entries are loaded lazily and never evicted. Each key owns a
//! `tokio::sync::OnceCell`, so concurrent requests for an uncached key wait
//! on the single in-flight load instead of fetching again. A failed load
//! drops its slot and the next request retries.

use super::{ArtifactLayout, ArtifactSource, EntityIndex};
use crate::error::{ForecastError, Result};
use crate::model::{InferenceModel, ModelLoader, ModelSet};
use crate::scaling::{FittedScaler, Scaler};
use crate::types::ModelFamily;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Scaler and per-horizon models for one instrument
pub struct InstrumentArtifacts {
    pub scaler: Arc<dyn Scaler>,
    pub models: ModelSet,
}

/// Shared-model artifacts for one trained horizon
pub struct UnifiedArtifacts {
    pub scaler: Arc<dyn Scaler>,
    pub models: ModelSet,
    pub entity_index: Arc<EntityIndex>,
}

struct UnifiedShared {
    scaler: Arc<dyn Scaler>,
    entity_index: Arc<EntityIndex>,
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

fn slot<K: Hash + Eq, T>(slots: &Mutex<HashMap<K, Slot<T>>>, key: K) -> Slot<T> {
    slots.lock().entry(key).or_default().clone()
}

/// Load through the key's cell; a failed load leaves no slot behind once the
/// last waiter has given up
async fn resolve<K, T, F, Fut>(slots: &Mutex<HashMap<K, Slot<T>>>, key: K, load: F) -> Result<Arc<T>>
where
    K: Hash + Eq + Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<T>>>,
{
    let cell = slot(slots, key.clone());
    let result = cell.get_or_try_init(load).await.cloned();

    if result.is_err() {
        let mut slots = slots.lock();
        // Release our handle under the lock so the last failing waiter sees
        // the map as the sole holder
        drop(cell);
        let orphaned = slots
            .get(&key)
            .is_some_and(|c| !c.initialized() && Arc::strong_count(c) == 1);
        if orphaned {
            slots.remove(&key);
        }
    }
    result
}

pub struct ArtifactCache {
    source: Arc<dyn ArtifactSource>,
    loader: Arc<dyn ModelLoader>,
    layout: ArtifactLayout,
    instruments: Mutex<HashMap<String, Slot<InstrumentArtifacts>>>,
    unified_models: Mutex<HashMap<u32, Slot<UnifiedArtifacts>>>,
    unified_shared: OnceCell<Arc<UnifiedShared>>,
}

impl ArtifactCache {
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        loader: Arc<dyn ModelLoader>,
        layout: ArtifactLayout,
    ) -> Self {
        let layout = layout.with_extension(loader.extension());
        Self {
            source,
            loader,
            layout,
            instruments: Mutex::new(HashMap::new()),
            unified_models: Mutex::new(HashMap::new()),
            unified_shared: OnceCell::new(),
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Keys currently holding a slot: (instruments, unified horizons)
    #[cfg(test)]
    pub(crate) fn slot_counts(&self) -> (usize, usize) {
        (self.instruments.lock().len(), self.unified_models.lock().len())
    }

    /// Scaler and available models for one instrument.
    ///
    /// Missing horizon models are skipped; the load fails only when the
    /// scaler or every model is missing.
    pub async fn resolve_instrument(&self, trading_code: &str) -> Result<Arc<InstrumentArtifacts>> {
        resolve(&self.instruments, trading_code.to_string(), || {
            self.load_instrument(trading_code)
        })
        .await
    }

    /// Global scaler, entity index and the model trained on `horizon`
    pub async fn resolve_unified(&self, horizon: u32) -> Result<Arc<UnifiedArtifacts>> {
        resolve(&self.unified_models, horizon, || self.load_unified(horizon)).await
    }

    /// Trading codes with per-instrument artifacts; listing failures yield none
    pub async fn list_trading_codes(&self) -> Vec<String> {
        match self.source.list(&self.layout.separate_repo).await {
            Ok(paths) => self.layout.trading_codes(paths.iter().map(String::as_str)),
            Err(e) => {
                warn!("Could not list trading codes from {}: {}", self.layout.separate_repo, e);
                Vec::new()
            }
        }
    }

    async fn fetch_required(&self, repo: &str, path: &str, what: &str) -> Result<Vec<u8>> {
        match self.source.fetch(repo, path).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(ForecastError::ArtifactNotFound(format!(
                "{} not found in {} ({})",
                what, repo, path
            ))),
            Err(e) => Err(ForecastError::ArtifactNotFound(format!(
                "{} could not be fetched from {}: {}",
                what, repo, e
            ))),
        }
    }

    fn parse_scaler(bytes: &[u8], what: &str) -> Result<Arc<dyn Scaler>> {
        let scaler = FittedScaler::from_json(bytes)
            .map_err(|e| ForecastError::ArtifactNotFound(format!("{} is unreadable: {}", what, e)))?;
        Ok(Arc::new(scaler))
    }

    async fn load_model(&self, repo: &str, path: &str) -> Result<Option<Arc<dyn InferenceModel>>> {
        match self.source.fetch(repo, path).await? {
            Some(bytes) => self.loader.load(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn load_instrument(&self, code: &str) -> Result<Arc<InstrumentArtifacts>> {
        let repo = self.layout.separate_repo.clone();
        let what = format!("Scaler for {}", code);
        let bytes = self
            .fetch_required(&repo, &self.layout.separate_scaler(code), &what)
            .await?;
        let scaler = Self::parse_scaler(&bytes, &what)?;

        let mut models = ModelSet::new();
        for &horizon in ModelFamily::Separate.trained_horizons() {
            let path = self.layout.separate_model(code, horizon);
            match self.load_model(&repo, &path).await {
                Ok(Some(model)) => {
                    models.insert(horizon, model);
                }
                Ok(None) => warn!("Model for horizon {} not found for {}. Skipping.", horizon, code),
                Err(e) => warn!("Model for horizon {} failed to load for {}: {}. Skipping.", horizon, code, e),
            }
        }

        if models.is_empty() {
            return Err(ForecastError::ArtifactNotFound(format!(
                "No models found for {} in {}",
                code, repo
            )));
        }

        info!(
            "Loaded artifacts for {} (horizons {:?})",
            code,
            models.keys().collect::<Vec<_>>()
        );
        Ok(Arc::new(InstrumentArtifacts { scaler, models }))
    }

    async fn shared(&self) -> Result<Arc<UnifiedShared>> {
        self.unified_shared
            .get_or_try_init(|| self.load_shared())
            .await
            .cloned()
    }

    async fn load_shared(&self) -> Result<Arc<UnifiedShared>> {
        let repo = &self.layout.unified_repo;
        let what = "Unified scaler";
        let bytes = self.fetch_required(repo, self.layout.unified_scaler(), what).await?;
        let scaler = Self::parse_scaler(&bytes, what)?;

        let bytes = self
            .fetch_required(repo, self.layout.entity_index(), "Entity index")
            .await?;
        let entity_index = EntityIndex::from_json(&bytes).map_err(|e| {
            ForecastError::ArtifactNotFound(format!("Entity index is unreadable: {}", e))
        })?;

        info!("Loaded unified scaler and entity index ({} instruments)", entity_index.len());
        Ok(Arc::new(UnifiedShared {
            scaler,
            entity_index: Arc::new(entity_index),
        }))
    }

    async fn load_unified(&self, horizon: u32) -> Result<Arc<UnifiedArtifacts>> {
        let shared = self.shared().await?;
        let repo = &self.layout.unified_repo;
        let path = self.layout.unified_model(horizon);

        let model = match self.load_model(repo, &path).await {
            Ok(Some(model)) => model,
            Ok(None) => {
                return Err(ForecastError::ArtifactNotFound(format!(
                    "Model for horizon {} not found in {}",
                    horizon, repo
                )))
            }
            Err(e) => {
                return Err(ForecastError::ArtifactNotFound(format!(
                    "Model for horizon {} in {} failed to load: {}",
                    horizon, repo, e
                )))
            }
        };

        info!("Loaded unified model for horizon {}", horizon);
        let mut models = ModelSet::new();
        models.insert(horizon, model);
        Ok(Arc::new(UnifiedArtifacts {
            scaler: shared.scaler.clone(),
            models,
            entity_index: shared.entity_index.clone(),
        }))
    }
}
