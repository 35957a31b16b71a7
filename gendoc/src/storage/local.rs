use super::{FetchRequest, StorageClient, UploadRequest};
use crate::files;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// A directory on the local file system.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: PathBuf) -> Self {
        LocalStorage { root }
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn fetch(&self, request: &FetchRequest) -> Result<()> {
        let entries = files::list_files(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;
        for entry in entries {
            let relative = entry.path.strip_prefix(&self.root).unwrap_or(&entry.path);
            let dest = request.emit_path.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::copy(&entry.path, &dest).await.with_context(|| {
                format!("failed to copy {} to {}", entry.path.display(), dest.display())
            })?;
        }
        debug!(from = %self.root.display(), to = %request.emit_path.display(), "fetched");
        Ok(())
    }

    async fn upload(&self, request: &UploadRequest) -> Result<()> {
        let dest = self.root.join(&request.key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&dest, &request.body)
            .await
            .with_context(|| format!("failed to write {}", dest.display()))?;
        debug!(path = %dest.display(), bytes = request.body.len(), "written");
        Ok(())
    }
}
