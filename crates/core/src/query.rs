//! Filtering, sorting and the derived tag index.

use crate::models::{Category, Record};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(Category),
}

impl TypeFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(category) => record.category == *category,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            Ok(TypeFilter::All)
        } else {
            s.parse().map(TypeFilter::Only)
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFilter::All => f.write_str(ALL),
            TypeFilter::Only(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagFilter {
    #[default]
    All,
    /// Stored lowercased.
    Tag(String),
}

impl TagFilter {
    pub fn tag(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case(ALL) {
            TagFilter::All
        } else {
            TagFilter::Tag(tag.to_lowercase())
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Tag(tag) => record.tags.iter().any(|t| t.trim().to_lowercase() == *tag),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFilter::All => f.write_str(ALL),
            TagFilter::Tag(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub search: String,
    pub kind: TypeFilter,
    pub tag: TagFilter,
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        matches_search(record, &self.search) && self.kind.matches(record) && self.tag.matches(record)
    }
}

fn matches_search(record: &Record, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    record.title.to_lowercase().contains(&term)
        || record
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(&term))
            .unwrap_or(false)
}

/// Records passing all three predicates, newest first. Ties keep input order.
pub fn filter_and_sort(records: &[Record], filter: &Filter) -> Vec<Record> {
    let mut out: Vec<Record> = records.iter().filter(|r| filter.matches(r)).cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

/// Every tag in use, lowercased, deduplicated and sorted.
pub fn tag_index(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.tags.iter())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keeps the selected tag if it is still in the index, otherwise resets to `all`.
pub fn reconcile_tag_filter(selected: &TagFilter, index: &[String]) -> TagFilter {
    match selected {
        TagFilter::Tag(tag) if index.iter().any(|t| t == tag) => selected.clone(),
        _ => TagFilter::All,
    }
}
