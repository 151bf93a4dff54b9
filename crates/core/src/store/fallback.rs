//! Fallback backend: the whole collection serialized under one key of a flat
//! key-value file. Each mutation is a read-modify-write of the full snapshot.

use super::RecordBackend;
use crate::error::StoreError;
use crate::models::{NewRecord, Record};
use std::path::Path;
use storage::kv::KvFile;
use storage::StorageError;

pub const DOCUMENTS_KEY: &str = "documents";

pub struct FallbackBackend {
    kv: KvFile,
}

impl FallbackBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self {
            kv: KvFile::open(path)?,
        })
    }

    async fn load(&self) -> Result<Vec<Record>, StoreError> {
        match self.kv.get(DOCUMENTS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.kv.set(DOCUMENTS_KEY, raw).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordBackend for FallbackBackend {
    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        self.load().await
    }

    async fn get(&self, id: i64) -> Result<Option<Record>, StoreError> {
        Ok(self.load().await?.into_iter().find(|r| r.id == id))
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, StoreError> {
        let mut records = self.load().await?;
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(Record::from_new(id, record.at_store_precision()));
        self.save(&records).await?;
        Ok(id)
    }

    async fn update(&self, record: &Record) -> Result<(), StoreError> {
        let mut records = self.load().await?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        *slot = record.clone().at_store_precision();
        self.save(&records).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() != before {
            self.save(&records).await?;
        }
        Ok(())
    }
}
