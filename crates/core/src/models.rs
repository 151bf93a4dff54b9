use crate::payload::DataUrl;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TXT: &str = "text/plain";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_MP4: &str = "video/mp4";

/// Current time at the precision the stores keep (milliseconds).
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
    Txt,
    Jpg,
    Png,
    Mp4,
}

impl FileKind {
    pub const ALL: [FileKind; 6] = [
        FileKind::Pdf,
        FileKind::Docx,
        FileKind::Txt,
        FileKind::Jpg,
        FileKind::Png,
        FileKind::Mp4,
    ];

    /// Maps an allowed MIME type to its kind; anything else is `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            MIME_PDF => Some(FileKind::Pdf),
            MIME_DOCX => Some(FileKind::Docx),
            MIME_TXT => Some(FileKind::Txt),
            MIME_JPEG => Some(FileKind::Jpg),
            MIME_PNG => Some(FileKind::Png),
            MIME_MP4 => Some(FileKind::Mp4),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => MIME_PDF,
            FileKind::Docx => MIME_DOCX,
            FileKind::Txt => MIME_TXT,
            FileKind::Jpg => MIME_JPEG,
            FileKind::Png => MIME_PNG,
            FileKind::Mp4 => MIME_MP4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Txt => "txt",
            FileKind::Jpg => "jpg",
            FileKind::Png => "png",
            FileKind::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown file kind: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Document,
}

impl Category {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Category::Image
        } else if mime.starts_with("video/") {
            Category::Video
        } else {
            Category::Document
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Document => "document",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Category::Image),
            "video" => Ok(Category::Video),
            "document" => Ok(Category::Document),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A validated document that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_kind: FileKind,
    pub category: Category,
    pub payload: DataUrl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored file plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_kind: FileKind,
    pub category: Category,
    pub payload: DataUrl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewRecord {
    /// Drops sub-millisecond precision so every backend round-trips exactly.
    pub fn at_store_precision(mut self) -> Self {
        self.created_at = self.created_at.trunc_subsecs(3);
        self.updated_at = self.updated_at.trunc_subsecs(3);
        self
    }
}

impl Record {
    pub fn at_store_precision(mut self) -> Self {
        self.created_at = self.created_at.trunc_subsecs(3);
        self.updated_at = self.updated_at.trunc_subsecs(3);
        self
    }

    pub fn from_new(id: i64, new: NewRecord) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            tags: new.tags,
            file_name: new.file_name,
            file_kind: new.file_kind,
            category: new.category,
            payload: new.payload,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.trim().to_lowercase() == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_mime_family() {
        assert_eq!(Category::from_mime("image/png"), Category::Image);
        assert_eq!(Category::from_mime("video/mp4"), Category::Video);
        assert_eq!(Category::from_mime(MIME_PDF), Category::Document);
        assert_eq!(Category::from_mime("text/plain"), Category::Document);
    }

    #[test]
    fn only_allowed_mimes_have_a_kind() {
        assert_eq!(FileKind::from_mime("IMAGE/JPEG"), Some(FileKind::Jpg));
        assert_eq!(FileKind::from_mime(MIME_DOCX), Some(FileKind::Docx));
        assert_eq!(FileKind::from_mime("image/gif"), None);
        assert_eq!(FileKind::from_mime("application/zip"), None);
        for kind in FileKind::ALL {
            assert_eq!(FileKind::from_mime(kind.mime()), Some(kind));
            assert_eq!(kind.as_str().parse::<FileKind>().unwrap(), kind);
        }
    }

    #[test]
    fn store_precision_keeps_whole_milliseconds() {
        use chrono::{Duration, TimeZone};
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::nanoseconds(123_456_789);
        let record = Record {
            id: 1,
            title: "A".into(),
            description: None,
            tags: Vec::new(),
            file_name: "a.txt".into(),
            file_kind: FileKind::Txt,
            category: Category::Document,
            payload: DataUrl::new(MIME_TXT, b"a".to_vec()),
            created_at: at,
            updated_at: at,
        }
        .at_store_precision();
        assert_eq!(record.created_at.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(record.updated_at, record.created_at);
    }
}
