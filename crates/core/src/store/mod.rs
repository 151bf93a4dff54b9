//! Record store: one interface over two persistence backends.
//!
//! The backend is chosen once, in [`RecordStore::initialize`], and stays fixed
//! for the lifetime of the store. Callers never branch on it.

pub mod fallback;
pub mod indexed;

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::models::{Category, NewRecord, Record};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{info, warn};

pub use fallback::FallbackBackend;
pub use indexed::IndexedBackend;

#[async_trait::async_trait]
pub trait RecordBackend: Send + Sync {
    /// All records, in backend order.
    async fn list_all(&self) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Record>, StoreError>;

    /// Persists a new record and returns the id assigned to it.
    async fn insert(&self, record: NewRecord) -> Result<i64, StoreError>;

    /// Replaces the stored record with the same id. `NotFound` if absent.
    async fn update(&self, record: &Record) -> Result<(), StoreError>;

    /// Removes the record; absent ids are not an error.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn list_by_category(&self, category: Category) -> Result<Vec<Record>, StoreError> {
        let mut records = self.list_all().await?;
        records.retain(|r| r.category == category);
        Ok(records)
    }

    /// Records carrying `tag`, compared case-insensitively.
    async fn list_by_tag(&self, tag: &str) -> Result<Vec<Record>, StoreError> {
        let mut records = self.list_all().await?;
        records.retain(|r| r.has_tag(tag));
        Ok(records)
    }

    /// Records created in `[start, end)`.
    async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut records = self.list_all().await?;
        records.retain(|r| r.created_at >= start && r.created_at < end);
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Indexed,
    Fallback,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Indexed => f.write_str("indexed"),
            StoreMode::Fallback => f.write_str("fallback"),
        }
    }
}

pub struct RecordStore {
    backend: Box<dyn RecordBackend>,
    mode: StoreMode,
}

impl RecordStore {
    /// Opens the indexed backend, falling back to the key-value file when it
    /// cannot be opened or migrated. The primary is not retried afterwards.
    pub async fn initialize(config: &StorageConfig) -> Result<Self, StoreError> {
        if !config.prefer_fallback {
            match IndexedBackend::open(&config.database_path).await {
                Ok(backend) => {
                    info!(database = %config.database_path, "using indexed document store");
                    return Ok(Self::with_backend(Box::new(backend), StoreMode::Indexed));
                }
                Err(e) => {
                    warn!(error = %e, "indexed store unavailable, switching to fallback");
                }
            }
        }
        let backend = FallbackBackend::open(&config.fallback_path)
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))?;
        info!(path = %config.fallback_path, "using fallback document store");
        Ok(Self::with_backend(Box::new(backend), StoreMode::Fallback))
    }

    pub fn with_backend(backend: Box<dyn RecordBackend>, mode: StoreMode) -> Self {
        Self { backend, mode }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        self.backend.list_all().await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Record>, StoreError> {
        self.backend.get(id).await
    }

    pub async fn insert(&self, record: NewRecord) -> Result<i64, StoreError> {
        let id = self.backend.insert(record).await?;
        info!(id, mode = %self.mode, "document stored");
        Ok(id)
    }

    pub async fn update(&self, record: &Record) -> Result<(), StoreError> {
        self.backend.update(record).await?;
        info!(id = record.id, mode = %self.mode, "document updated");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.backend.delete(id).await?;
        info!(id, mode = %self.mode, "document deleted");
        Ok(())
    }

    pub async fn list_by_category(&self, category: Category) -> Result<Vec<Record>, StoreError> {
        self.backend.list_by_category(category).await
    }

    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<Record>, StoreError> {
        self.backend.list_by_tag(tag).await
    }

    pub async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Record>, StoreError> {
        self.backend.list_created_between(start, end).await
    }
}
