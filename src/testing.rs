//! Test fixtures shared across modules

use crate::artifacts::ArtifactSource;
use crate::error::{ForecastError, Result};
use crate::types::Observation;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory registry that counts fetches per file
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    fetches: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Option<Duration>,
    fail_listing: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn insert(&self, repo: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .insert((repo.to_string(), path.to_string()), bytes.into());
    }

    /// Number of fetches for one path, hits and misses alike
    pub fn fetches(&self, path: &str) -> usize {
        self.fetches.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactSource for MemorySource {
    async fn fetch(&self, repo: &str, path: &str) -> Result<Option<Vec<u8>>> {
        *self.fetches.lock().entry(path.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .files
            .lock()
            .get(&(repo.to_string(), path.to_string()))
            .cloned())
    }

    async fn list(&self, repo: &str) -> Result<Vec<String>> {
        if self.fail_listing {
            return Err(ForecastError::Registry("listing unavailable".into()));
        }
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|(r, _)| r == repo)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

/// `len` daily observations with closes rising from 100 by one per day
pub fn history(len: usize) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..len)
        .map(|i| {
            let close = 100.0 + i as f64;
            Observation {
                id: i as i64,
                date: start + chrono::Duration::days(i as i64),
                trading_code: "GP".to_string(),
                ltp: close,
                high: close + 2.0,
                low: close - 2.0,
                openp: close - 1.0,
                closep: close,
                ycp: close - 1.0,
                trade: 25,
                value: 3.5,
                volume: 1000 + i as i64,
            }
        })
        .collect()
}

/// Min-max scaler JSON mapping [lo, hi] onto [0, 1] for every column
pub fn scaler_json(columns: usize, lo: f64, hi: f64) -> Vec<u8> {
    let scale = 1.0 / (hi - lo);
    json!({
        "kind": "min_max",
        "scale_": vec![scale; columns],
        "min_": vec![-lo * scale; columns],
    })
    .to_string()
    .into_bytes()
}

/// LSTM export emitting `outputs` constant values equal to `bias`
pub fn constant_model_json(features: usize, outputs: usize, bias: f64) -> Vec<u8> {
    json!({
        "lstm": [{
            "kernel": vec![vec![0.0; 4]; features],
            "recurrent_kernel": [[0.0, 0.0, 0.0, 0.0]],
            "bias": [0.0, 0.0, 0.0, 0.0]
        }],
        "dense": [{
            "kernel": [vec![0.0; outputs]],
            "bias": vec![bias; outputs]
        }]
    })
    .to_string()
    .into_bytes()
}
