//! Hugging Face Hub style registry client

use super::ArtifactSource;
use crate::config::RegistryConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Registry client fetching files over HTTP
#[derive(Clone)]
pub struct HubSource {
    http: Client,
    base_url: String,
    token: Option<String>,
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<RepoFile>,
}

#[derive(Debug, Deserialize)]
struct RepoFile {
    rfilename: String,
}

impl HubSource {
    /// Create a new registry client
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            cache_dir: config.cache_path(),
        })
    }

    pub fn file_url(&self, repo: &str, path: &str) -> String {
        format!("{}/{}/resolve/main/{}", self.base_url, repo, path)
    }

    pub fn listing_url(&self, repo: &str) -> String {
        format!("{}/api/models/{}", self.base_url, repo)
    }

    fn cached_path(&self, repo: &str, path: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(repo).join(path))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn store(&self, target: PathBuf, bytes: &[u8]) {
        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create cache dir {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&target, bytes).await {
            warn!("Failed to cache artifact {}: {}", target.display(), e);
        }
    }
}

#[async_trait]
impl ArtifactSource for HubSource {
    async fn fetch(&self, repo: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let cached = self.cached_path(repo, path);
        if let Some(file) = &cached {
            if let Ok(bytes) = tokio::fs::read(file).await {
                debug!("Artifact {}/{} served from disk cache", repo, path);
                return Ok(Some(bytes));
            }
        }

        let url = self.file_url(repo, path);
        debug!("Downloading {}", url);
        let resp = self.authorize(self.http.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = resp.error_for_status()?.bytes().await?.to_vec();

        if let Some(file) = cached {
            self.store(file, &bytes).await;
        }
        Ok(Some(bytes))
    }

    async fn list(&self, repo: &str) -> Result<Vec<String>> {
        let info: RepoInfo = self
            .authorize(self.http.get(self.listing_url(repo)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(info.siblings.into_iter().map(|f| f.rfilename).collect())
    }
}
