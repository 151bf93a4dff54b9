//! Command handlers. Each returns the text to print on success.

use crate::render::{self, RecordSummary};
use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use docshelf_core::calendar::YearMonth;
use docshelf_core::error::{StoreError, UploadReadError};
use docshelf_core::query::{TagFilter, TypeFilter};
use docshelf_core::session::{Saved, Session};
use docshelf_core::upload::{FileUpload, UploadForm};
use std::path::Path;

async fn read_upload(
    session: &Session,
    path: &Path,
    content_type: Option<String>,
) -> Result<FileUpload> {
    let mut file = match FileUpload::from_path(path, session.limits().max_bytes).await {
        Ok(file) => file,
        Err(UploadReadError::Rejected(e)) => return Err(StoreError::from(e).into()),
        Err(UploadReadError::Io(e)) => {
            return Err(anyhow::Error::new(e).context(format!("Failed to read {}", path.display())))
        }
    };
    file.content_type = content_type;
    Ok(file)
}

pub async fn add(
    session: &mut Session,
    file: &Path,
    title: &str,
    description: &str,
    tags: &str,
    content_type: Option<String>,
) -> Result<String> {
    let upload = read_upload(session, file, content_type).await?;
    let form = UploadForm {
        title: title.to_string(),
        description: description.to_string(),
        tags: tags.to_string(),
        file: Some(upload),
    };
    let saved = session.submit(form).await?;
    Ok(match saved {
        Saved::Created(id) => format!("Added document {id}."),
        Saved::Updated(id) => format!("Updated document {id}."),
    })
}

pub async fn list(
    session: &mut Session,
    search: &str,
    kind: TypeFilter,
    tag: &str,
    json: bool,
    tz: &FixedOffset,
) -> Result<String> {
    session.set_filter(search, kind, TagFilter::tag(tag));
    let records = session.visible().await?;
    if json {
        let summaries: Vec<RecordSummary<'_>> = records.iter().map(RecordSummary::from).collect();
        Ok(serde_json::to_string_pretty(&summaries)?)
    } else {
        Ok(render::record_list(&records, tz))
    }
}

pub async fn show(session: &Session, id: i64, json: bool, tz: &FixedOffset) -> Result<String> {
    let record = session.get(id).await?;
    if json {
        Ok(serde_json::to_string_pretty(&RecordSummary::from(&record))?)
    } else {
        Ok(render::record_detail(&record, tz))
    }
}

/// Fields left as `None` keep their current value.
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub file: Option<std::path::PathBuf>,
    pub content_type: Option<String>,
}

pub async fn edit(session: &mut Session, id: i64, args: EditArgs) -> Result<String> {
    let current = session.begin_edit(id).await?;
    let file = match &args.file {
        Some(path) => Some(read_upload(session, path, args.content_type.clone()).await?),
        None => None,
    };
    let form = UploadForm {
        title: args.title.unwrap_or(current.title),
        description: args
            .description
            .unwrap_or_else(|| current.description.unwrap_or_default()),
        tags: args.tags.unwrap_or_else(|| current.tags.join(", ")),
        file,
    };
    let result = session.submit(form).await;
    session.cancel_edit();
    result?;
    Ok(format!("Updated document {id}."))
}

pub async fn remove(session: &mut Session, id: i64) -> Result<String> {
    session.delete(id).await?;
    Ok(format!("Deleted document {id}."))
}

pub async fn tags(session: &mut Session) -> Result<String> {
    let index = session.tags().await?;
    if index.is_empty() {
        Ok("No tags.".to_string())
    } else {
        Ok(index.join("\n"))
    }
}

pub async fn calendar(
    session: &mut Session,
    month: Option<YearMonth>,
    day: Option<NaiveDate>,
    tz: &FixedOffset,
) -> Result<String> {
    if let Some(day) = day {
        let records = session.records_on(day).await?;
        return Ok(render::record_list(&records, tz));
    }
    if let Some(month) = month {
        session.show_month(month);
    }
    let marked = session.calendar_days().await?;
    Ok(render::calendar(session.month(), &marked))
}

/// Writes the stored file back out, next to `out` or under its original name.
pub async fn export(session: &Session, id: i64, out: Option<&Path>) -> Result<String> {
    let record = session.get(id).await?;
    let dest = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(&record.file_name).to_path_buf());
    tokio::fs::write(&dest, &record.payload.bytes)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(format!(
        "Wrote {} ({}) to {}.",
        record.file_name,
        record.payload.mime,
        dest.display()
    ))
}
