//! Upload validation: turns what the user submitted into a [`NewRecord`].
//!
//! All checks run before any storage call, so a rejected upload leaves the
//! store untouched.

use crate::config::UploadConfig;
use crate::error::{UploadReadError, ValidationError};
use crate::models::{Category, FileKind, NewRecord};
use crate::payload::DataUrl;
use chrono::{DateTime, SubsecRound, Utc};
use std::path::Path;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    /// Content type as declared by the caller, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Reads a file for upload. Files over `max_bytes` are rejected from
    /// their metadata without being read.
    pub async fn from_path(path: &Path, max_bytes: usize) -> Result<Self, UploadReadError> {
        let size = tokio::fs::metadata(path).await?.len();
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        if size > max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: max_bytes,
            }
            .into());
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            content_type: None,
            bytes,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    /// Comma-separated tag list as typed by the user.
    pub tags: String,
    pub file: Option<FileUpload>,
}

/// Splits a comma-separated tag list; entries are trimmed and empties dropped.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the MIME type: declared type, then magic bytes, then extension.
pub fn detect_mime(file: &FileUpload) -> String {
    if let Some(declared) = file
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        return declared.to_ascii_lowercase();
    }
    if let Some(kind) = infer::get(&file.bytes) {
        return kind.mime_type().to_string();
    }
    mime_from_extension(&file.file_name).to_string()
}

fn mime_from_extension(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "pdf" => crate::models::MIME_PDF,
        "docx" => crate::models::MIME_DOCX,
        "txt" | "text" => crate::models::MIME_TXT,
        "jpg" | "jpeg" => crate::models::MIME_JPEG,
        "png" => crate::models::MIME_PNG,
        "mp4" => crate::models::MIME_MP4,
        _ => "application/octet-stream",
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Validates a form carrying a file and builds the record to insert.
pub fn validate_upload(
    form: UploadForm,
    limits: &UploadConfig,
    now: DateTime<Utc>,
) -> Result<NewRecord, ValidationError> {
    let title = non_empty(&form.title).ok_or(ValidationError::MissingTitle)?;
    let now = now.trunc_subsecs(3);
    let file = form.file.ok_or(ValidationError::MissingFile)?;
    let file_name = file.file_name.clone();
    let (kind, payload) = validate_file(file, limits)?;
    Ok(NewRecord {
        title,
        description: non_empty(&form.description),
        tags: parse_tags(&form.tags),
        file_name,
        file_kind: kind,
        category: Category::from_mime(&payload.mime),
        payload,
        created_at: now,
        updated_at: now,
    })
}

/// Type and size checks for a single file; shared by uploads and edits.
pub fn validate_file(
    file: FileUpload,
    limits: &UploadConfig,
) -> Result<(FileKind, DataUrl), ValidationError> {
    let mime = detect_mime(&file);
    let kind = FileKind::from_mime(&mime).ok_or_else(|| ValidationError::DisallowedType(mime))?;
    if file.bytes.len() > limits.max_bytes {
        return Err(ValidationError::TooLarge {
            size: file.bytes.len(),
            limit: limits.max_bytes,
        });
    }
    Ok((kind, DataUrl::new(kind.mime(), file.bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> UploadConfig {
        UploadConfig::default()
    }

    fn pdf(size: usize) -> FileUpload {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(size, b' ');
        FileUpload {
            file_name: "report.pdf".into(),
            content_type: None,
            bytes,
        }
    }

    #[test]
    fn tags_are_trimmed_and_empties_dropped() {
        assert_eq!(parse_tags(" Work, ,URGENT ,"), vec!["Work", "URGENT"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn accepts_pdf_and_derives_metadata() {
        let form = UploadForm {
            title: "  Report ".into(),
            description: "   ".into(),
            tags: "Work".into(),
            file: Some(pdf(2 * 1024 * 1024)),
        };
        let rec = validate_upload(form, &limits(), Utc::now()).unwrap();
        assert_eq!(rec.title, "Report");
        assert_eq!(rec.description, None);
        assert_eq!(rec.file_kind, FileKind::Pdf);
        assert_eq!(rec.category, Category::Document);
        assert_eq!(rec.payload.mime, crate::models::MIME_PDF);
        assert_eq!(rec.payload.len(), 2 * 1024 * 1024);
    }

    #[test]
    fn checks_run_in_order() {
        let empty_title = UploadForm {
            title: " ".into(),
            ..Default::default()
        };
        assert_eq!(
            validate_upload(empty_title, &limits(), Utc::now()),
            Err(ValidationError::MissingTitle)
        );

        let no_file = UploadForm {
            title: "x".into(),
            ..Default::default()
        };
        assert_eq!(
            validate_upload(no_file, &limits(), Utc::now()),
            Err(ValidationError::MissingFile)
        );
    }

    #[test]
    fn rejects_oversized_file() {
        let form = UploadForm {
            title: "Big".into(),
            file: Some(pdf(11 * 1024 * 1024)),
            ..Default::default()
        };
        assert!(matches!(
            validate_upload(form, &limits(), Utc::now()),
            Err(ValidationError::TooLarge { limit, .. }) if limit == MAX_UPLOAD_BYTES
        ));
    }

    #[test]
    fn exactly_the_limit_is_accepted() {
        let form = UploadForm {
            title: "Edge".into(),
            file: Some(pdf(MAX_UPLOAD_BYTES)),
            ..Default::default()
        };
        assert!(validate_upload(form, &limits(), Utc::now()).is_ok());
    }

    #[test]
    fn rejects_disallowed_types() {
        let gif = FileUpload {
            file_name: "anim.gif".into(),
            content_type: Some("image/gif".into()),
            bytes: b"GIF89a".to_vec(),
        };
        let form = UploadForm {
            title: "Anim".into(),
            file: Some(gif),
            ..Default::default()
        };
        assert_eq!(
            validate_upload(form, &limits(), Utc::now()),
            Err(ValidationError::DisallowedType("image/gif".into()))
        );
    }

    #[test]
    fn plain_text_falls_back_to_extension() {
        let txt = FileUpload {
            file_name: "notes.TXT".into(),
            content_type: None,
            bytes: b"just some notes".to_vec(),
        };
        assert_eq!(detect_mime(&txt), "text/plain");
        let png = FileUpload {
            file_name: "no-extension".into(),
            content_type: None,
            bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0],
        };
        assert_eq!(detect_mime(&png), "image/png");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_reading() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("huge.pdf");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES as u64 + 1).unwrap();

        let err = FileUpload::from_path(&path, MAX_UPLOAD_BYTES).await.unwrap_err();
        assert!(matches!(
            err,
            UploadReadError::Rejected(ValidationError::TooLarge { size, limit })
                if size == MAX_UPLOAD_BYTES + 1 && limit == MAX_UPLOAD_BYTES
        ));

        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let upload = FileUpload::from_path(&path, MAX_UPLOAD_BYTES).await.unwrap();
        assert_eq!(upload.file_name, "huge.pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4");

        let missing = FileUpload::from_path(&temp.path().join("nope.pdf"), MAX_UPLOAD_BYTES).await;
        assert!(matches!(missing, Err(UploadReadError::Io(_))));
    }
}
