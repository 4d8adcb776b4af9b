//! Registry mirror on the local filesystem

use super::ArtifactSource;
use crate::error::{ForecastError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Serves `{root}/{repo}/{path}` from disk
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn walk(dir: &Path, base: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, base, out)?;
        } else if let Ok(rel) = path.strip_prefix(base) {
            let parts: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

#[async_trait]
impl ArtifactSource for LocalSource {
    async fn fetch(&self, repo: &str, path: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.root.join(repo).join(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, repo: &str) -> Result<Vec<String>> {
        let base = self.root.join(repo);
        let mut files = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            walk(&base, &base, &mut out).map(|_| out)
        })
        .await
        .map_err(|e| ForecastError::Internal(format!("listing task failed: {}", e)))??;

        files.sort();
        Ok(files)
    }
}
