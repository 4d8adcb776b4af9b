//! Configuration management
//!
//! Settings come from an optional TOML file overlaid with
//! `STOCKCAST__<SECTION>__<KEY>` environment variables.

use crate::error::Result;
use crate::types::MIN_HISTORY_LENGTH;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// On-disk encoding of model artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Keras LSTM weights exported to JSON
    #[default]
    Json,
    /// ONNX graph (requires the `onnx` feature)
    Onnx,
}

impl ModelFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Json => "json",
            ModelFormat::Onnx => "onnx",
        }
    }
}

/// Model registry settings
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_separate_repo")]
    pub separate_repo: String,
    #[serde(default = "default_unified_repo")]
    pub unified_repo: String,
    #[serde(default = "default_models_subdir")]
    pub models_subdir: String,
    /// Bearer token for private repositories
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Write-through cache for downloaded artifacts
    #[serde(default)]
    pub cache_dir: Option<String>,
    /// Serve artifacts from this directory instead of the network
    #[serde(default)]
    pub local_dir: Option<String>,
    #[serde(default)]
    pub model_format: ModelFormat,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            separate_repo: default_separate_repo(),
            unified_repo: default_unified_repo(),
            models_subdir: default_models_subdir(),
            token: None,
            timeout_secs: default_timeout_secs(),
            cache_dir: None,
            local_dir: None,
            model_format: ModelFormat::default(),
        }
    }
}

impl RegistryConfig {
    /// Download cache directory with `~` and env vars expanded
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_dir.as_deref().map(expand_path)
    }

    pub fn local_path(&self) -> Option<PathBuf> {
        self.local_dir.as_deref().map(expand_path)
    }
}

fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

/// Forecast engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    #[serde(default = "default_listed_codes_limit")]
    pub listed_codes_limit: usize,
    /// Reject separate-family requests for codes missing from the registry listing
    #[serde(default = "default_true")]
    pub validate_trading_codes: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            listed_codes_limit: default_listed_codes_limit(),
            validate_trading_codes: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_base_url() -> String {
    "https://huggingface.co".to_string()
}
fn default_separate_repo() -> String {
    "StockCast/seperate".to_string()
}
fn default_unified_repo() -> String {
    "StockCast/unified".to_string()
}
fn default_models_subdir() -> String {
    "models".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_window_length() -> usize {
    MIN_HISTORY_LENGTH
}
fn default_listed_codes_limit() -> usize {
    5
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file (optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("STOCKCAST")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
