use chrono::{DateTime, FixedOffset, Utc};
use docshelf_core::calendar::YearMonth;
use docshelf_core::models::Record;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Record metadata without the payload body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary<'a> {
    pub id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub tags: &'a [String],
    pub file_name: &'a str,
    pub file_kind: String,
    pub category: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Record> for RecordSummary<'a> {
    fn from(r: &'a Record) -> Self {
        Self {
            id: r.id,
            title: &r.title,
            description: r.description.as_deref(),
            tags: &r.tags,
            file_name: &r.file_name,
            file_kind: r.file_kind.to_string(),
            category: r.category.to_string(),
            size: r.payload.len(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub fn human_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

pub fn record_line(r: &Record, tz: &FixedOffset) -> String {
    let tags = if r.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", r.tags.join(", "))
    };
    format!(
        "{:>4}  {}  {:<8} {:<4} {:>9}  {}{}",
        r.id,
        r.created_at.with_timezone(tz).format("%Y-%m-%d %H:%M"),
        r.category,
        r.file_kind,
        human_size(r.payload.len()),
        r.title,
        tags
    )
}

pub fn record_list(records: &[Record], tz: &FixedOffset) -> String {
    if records.is_empty() {
        return "No documents found.".to_string();
    }
    records
        .iter()
        .map(|r| record_line(r, tz))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn record_detail(r: &Record, tz: &FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id:          {}", r.id);
    let _ = writeln!(out, "title:       {}", r.title);
    let _ = writeln!(out, "description: {}", r.description.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "tags:        {}", r.tags.join(", "));
    let _ = writeln!(out, "file:        {} ({}, {})", r.file_name, r.file_kind, human_size(r.payload.len()));
    let _ = writeln!(out, "category:    {}", r.category);
    let _ = writeln!(out, "created:     {}", r.created_at.with_timezone(tz).to_rfc3339());
    let _ = write!(out, "updated:     {}", r.updated_at.with_timezone(tz).to_rfc3339());
    out
}

/// Month grid, Sunday first; days with documents are starred.
pub fn calendar(month: YearMonth, marked: &BTreeSet<u32>) -> String {
    let mut out = format!("{month}\n Su  Mo  Tu  We  Th  Fr  Sa\n");
    let lead = month.first_weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<String> = vec!["    ".to_string(); lead];
    for day in 1..=month.days() {
        let mark = if marked.contains(&day) { '*' } else { ' ' };
        cells.push(format!("{day:>3}{mark}"));
    }
    for week in cells.chunks(7) {
        out.push_str(week.concat().trim_end());
        out.push('\n');
    }
    let _ = write!(
        out,
        "{} day(s) with documents",
        marked.iter().filter(|d| **d >= 1 && **d <= month.days()).count()
    );
    out
}
