//! Inline payload encoding: `data:<mime>;base64,<data>`.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("payload is not a data URL")]
    NotDataUrl,
    #[error("payload is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Size of the original content, before encoding.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// The full base64 body is rarely useful in logs.
impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

impl FromStr for DataUrl {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("data:").ok_or(PayloadError::NotDataUrl)?;
        let (header, data) = rest.split_once(',').ok_or(PayloadError::NotDataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(PayloadError::NotBase64)?;
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| PayloadError::Decode(e.to_string()))?;
        Ok(Self {
            mime: mime.to_string(),
            bytes,
        })
    }
}

impl Serialize for DataUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
