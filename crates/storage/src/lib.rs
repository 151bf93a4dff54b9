//! Storage layer: the on-device media behind the document store.
//!
//! Holds the SQLite pool setup and migration runner for the indexed backend,
//! and the flat key-value file used by the fallback backend.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;

pub mod kv;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

/// Turns a plain filesystem path into a `sqlite:` URL; URLs pass through.
pub fn database_url(database: &str) -> String {
    if database.starts_with("sqlite:") {
        return database.to_string();
    }
    let path = std::path::PathBuf::from(database);
    let norm = path.to_string_lossy().replace('\\', "/");
    if path.is_absolute() {
        format!("sqlite:///{}", norm.trim_start_matches('/'))
    } else {
        format!("sqlite://{}", norm)
    }
}

pub async fn connect(database: &str) -> Result<SqlitePool, StorageError> {
    if !database.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    let url = database_url(database);
    let opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut pool_opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        pool_opts = pool_opts.max_connections(1);
    } else {
        pool_opts = pool_opts.max_connections(5);
    }
    let pool = pool_opts.connect_with(opts).await?;
    tracing::debug!(%url, "sqlite pool connected");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), StorageError> {
    // Applies migrations located in crates/storage/migrations; idempotent.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
