use crate::payload::PayloadError;
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("a title is required")]
    MissingTitle,
    #[error("a file is required")]
    MissingFile,
    #[error("file type {0} is not allowed (pdf, docx, txt, jpg, png, mp4)")]
    DisallowedType(String),
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

/// Failure to pick up a file from disk for upload.
#[derive(Debug, Error)]
pub enum UploadReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid upload: {0}")]
    Validation(#[from] ValidationError),
    #[error("document {0} not found")]
    NotFound(i64),
}

impl StoreError {
    /// Message shown to the user when an operation is abandoned.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::BackendUnavailable(_) => {
                "Storage is unavailable; documents cannot be saved right now.".to_string()
            }
            StoreError::Storage(e) => format!("Could not complete the operation: {e}"),
            StoreError::Validation(e) => {
                let mut msg = e.to_string();
                if let Some(first) = msg.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{msg}.")
            }
            StoreError::NotFound(id) => format!("Document {id} no longer exists."),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Storage(StorageError::Db(e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(StorageError::Json(e))
    }
}

impl From<PayloadError> for StoreError {
    fn from(e: PayloadError) -> Self {
        StoreError::Storage(StorageError::Corrupt(e.to_string()))
    }
}
