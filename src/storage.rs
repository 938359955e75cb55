use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use walkdir::WalkDir;

/// One child of a storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Keyed file store rooted at the paper library. Keys are `/`-separated paths
/// relative to the root, e.g. `2024/AI/report.md`; the empty key is the root.
#[async_trait]
pub trait PaperStorage: Send + Sync + 'static {
    async fn root_exists(&self) -> bool;

    /// Immediate children of `key`, sorted by name.
    async fn list_dir(&self, key: &str) -> Result<Vec<StorageEntry>>;

    /// Writes `bytes` at `key`, creating parent directories and replacing any
    /// existing file.
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes the file at `key`. Returns `false` when nothing was there.
    async fn delete_object(&self, key: &str) -> Result<bool>;
}

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl PaperStorage for LocalStorage {
    async fn root_exists(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn list_dir(&self, key: &str) -> Result<Vec<StorageEntry>> {
        let dir = self.resolve(key);
        tokio::task::spawn_blocking(move || -> Result<Vec<StorageEntry>> {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .follow_links(true)
                .sort_by_file_name()
            {
                let entry = entry
                    .with_context(|| format!("failed to list directory {}", dir.display()))?;
                entries.push(StorageEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir: entry.file_type().is_dir(),
                });
            }
            Ok(entries)
        })
        .await
        .context("directory listing task panicked")?
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn delete_object(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("failed to delete {}", path.display()))
            }
        }
    }
}
