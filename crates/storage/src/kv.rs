//! Flat key-value file: a single JSON object mapping string keys to string values.
//!
//! Every write rewrites the whole file through a temporary sibling followed by a
//! rename, so readers see either the old or the new snapshot.

use crate::StorageError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct KvFile {
    path: PathBuf,
}

impl KvFile {
    /// Opens (without creating) the file at `path`, creating parent directories.
    /// Fails if the location cannot hold a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if path.is_dir() {
            return Err(StorageError::Corrupt(format!(
                "{} is a directory",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut map = self.read_all().await?;
        Ok(map.remove(key))
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(&map).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(&map).await?;
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(map)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "kv snapshot written");
        Ok(())
    }
}
