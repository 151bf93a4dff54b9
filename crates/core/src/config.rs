use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file (or `sqlite:` URL) for the indexed backend.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Key-value file used when the indexed backend cannot be opened.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
    /// Skip the indexed backend entirely.
    #[serde(default)]
    pub prefer_fallback: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            fallback_path: default_fallback_path(),
            prefer_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_database_path() -> String {
    "data/docshelf.db".to_string()
}

fn default_fallback_path() -> String {
    "data/docshelf.json".to_string()
}

fn default_max_bytes() -> usize {
    crate::upload::MAX_UPLOAD_BYTES
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix("DOCSHELF").separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
