//! Model artifacts
//!
//! Scalers, entity indexes and model weights live in a model registry laid
//! out like a Hugging Face Hub repository. Sources fetch raw bytes; the cache
//! turns them into shared, immutable artifacts.

mod cache;
mod hub;
mod local;

pub use cache::{ArtifactCache, InstrumentArtifacts, UnifiedArtifacts};
pub use hub::HubSource;
pub use local::LocalSource;

use crate::config::RegistryConfig;
use crate::error::{ForecastError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// Where artifact bytes come from
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Raw file contents, `None` when the file does not exist
    async fn fetch(&self, repo: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Every file path in a repository
    async fn list(&self, repo: &str) -> Result<Vec<String>>;
}

/// Trading code to the integer id a shared model is conditioned on
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct EntityIndex(HashMap<String, i64>);

impl EntityIndex {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn get(&self, trading_code: &str) -> Option<i64> {
        self.0.get(trading_code).copied()
    }

    pub fn entity_id(&self, trading_code: &str) -> Result<i64> {
        self.get(trading_code).ok_or_else(|| {
            ForecastError::UnknownInstrument(format!(
                "{} not found in the unified model entity index",
                trading_code
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for EntityIndex {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// File naming inside the registry repositories
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub separate_repo: String,
    pub unified_repo: String,
    pub models_subdir: String,
    pub window_length: usize,
    pub extension: &'static str,
}

impl ArtifactLayout {
    pub fn new(config: &RegistryConfig, window_length: usize) -> Self {
        Self {
            separate_repo: config.separate_repo.clone(),
            unified_repo: config.unified_repo.clone(),
            models_subdir: config.models_subdir.clone(),
            window_length,
            extension: config.model_format.extension(),
        }
    }

    pub fn with_extension(mut self, extension: &'static str) -> Self {
        self.extension = extension;
        self
    }

    pub fn separate_scaler(&self, code: &str) -> String {
        format!("{}/{}/scaler_{}.json", self.models_subdir, code, code)
    }

    pub fn separate_model(&self, code: &str, horizon: u32) -> String {
        format!(
            "{}/{}/lstm_{}_seq{}_nahead{}.{}",
            self.models_subdir, code, code, self.window_length, horizon, self.extension
        )
    }

    pub fn unified_scaler(&self) -> &'static str {
        "global_scaler.json"
    }

    pub fn entity_index(&self) -> &'static str {
        "scrip_to_id.json"
    }

    pub fn unified_model(&self, horizon: u32) -> String {
        format!("unified_lstm_nahead{}.{}", horizon, self.extension)
    }

    /// Trading codes with a directory under the models folder, sorted
    pub fn trading_codes<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let prefix = format!("{}/", self.models_subdir);
        paths
            .into_iter()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/'))
            .map(|(code, _)| code)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
