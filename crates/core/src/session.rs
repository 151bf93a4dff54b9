//! Session: the state a user interaction works against.
//!
//! Holds the store, the displayed month, the current edit target and the
//! active filter. Nothing here is global; callers own the session.

use crate::calendar::{self, YearMonth};
use crate::config::UploadConfig;
use crate::error::{StoreError, ValidationError};
use crate::models::{self, Category, Record};
use crate::query::{self, Filter, TagFilter, TypeFilter};
use crate::store::RecordStore;
use crate::upload::{self, UploadForm};
use chrono::{FixedOffset, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

/// Outcome of [`Session::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Created(i64),
    Updated(i64),
}

pub struct Session {
    store: RecordStore,
    limits: UploadConfig,
    tz: FixedOffset,
    month: YearMonth,
    editing: Option<i64>,
    filter: Filter,
}

impl Session {
    /// A session in the machine's current UTC offset, showing the current month.
    pub fn new(store: RecordStore, limits: UploadConfig) -> Self {
        let tz = *chrono::Local::now().offset();
        Self::with_time_zone(store, limits, tz)
    }

    pub fn with_time_zone(store: RecordStore, limits: UploadConfig, tz: FixedOffset) -> Self {
        Self {
            store,
            limits,
            tz,
            month: YearMonth::current(&tz),
            editing: None,
            filter: Filter::default(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    /// Saves the form: a new document, or a replacement of the edit target.
    /// Validation happens before the store is touched.
    pub async fn submit(&mut self, form: UploadForm) -> Result<Saved, StoreError> {
        match self.editing {
            None => {
                let record = upload::validate_upload(form, &self.limits, models::now_millis())?;
                let id = self.store.insert(record).await?;
                Ok(Saved::Created(id))
            }
            Some(id) => {
                let saved = match self.apply_edit(id, form).await {
                    Ok(updated) => self.store.update(&updated).await,
                    Err(e) => Err(e),
                };
                match saved {
                    Ok(()) => {
                        self.editing = None;
                        Ok(Saved::Updated(id))
                    }
                    // The edit target no longer exists.
                    Err(e @ StoreError::NotFound(_)) => {
                        self.editing = None;
                        Err(e)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn apply_edit(&self, id: i64, form: UploadForm) -> Result<Record, StoreError> {
        let title = form.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle.into());
        }
        let replacement = form
            .file
            .map(|file| {
                let name = file.file_name.clone();
                upload::validate_file(file, &self.limits).map(|(kind, payload)| (name, kind, payload))
            })
            .transpose()?;

        let mut record = self.store.get(id).await?.ok_or(StoreError::NotFound(id))?;
        record.title = title.to_string();
        let description = form.description.trim();
        record.description = (!description.is_empty()).then(|| description.to_string());
        record.tags = upload::parse_tags(&form.tags);
        if let Some((file_name, kind, payload)) = replacement {
            record.file_name = file_name;
            record.file_kind = kind;
            record.category = Category::from_mime(&payload.mime);
            record.payload = payload;
        }
        record.updated_at = models::now_millis();
        Ok(record)
    }

    /// Loads the record to edit; subsequent submits replace it.
    pub async fn begin_edit(&mut self, id: i64) -> Result<Record, StoreError> {
        let record = self.store.get(id).await?.ok_or(StoreError::NotFound(id))?;
        self.editing = Some(id);
        debug!(id, "editing document");
        Ok(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.store.delete(id).await?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Record, StoreError> {
        self.store.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    pub fn set_filter(&mut self, search: &str, kind: TypeFilter, tag: TagFilter) {
        self.filter = Filter {
            search: search.to_string(),
            kind,
            tag,
        };
    }

    /// Documents matching the active filter, newest first.
    pub async fn visible(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.store.list_all().await?;
        Ok(query::filter_and_sort(&records, &self.filter))
    }

    /// Current tag index; drops the tag filter if its tag is gone.
    pub async fn tags(&mut self) -> Result<Vec<String>, StoreError> {
        let records = self.store.list_all().await?;
        let index = query::tag_index(&records);
        self.filter.tag = query::reconcile_tag_filter(&self.filter.tag, &index);
        Ok(index)
    }

    pub fn show_month(&mut self, month: YearMonth) {
        self.month = month;
    }

    pub fn next_month(&mut self) -> YearMonth {
        self.month = self.month.next();
        self.month
    }

    pub fn prev_month(&mut self) -> YearMonth {
        self.month = self.month.prev();
        self.month
    }

    /// Days of the displayed month that have documents.
    pub async fn calendar_days(&self) -> Result<BTreeSet<u32>, StoreError> {
        let (start, end) = self.month.bounds(&self.tz);
        let records = self.store.list_created_between(start, end).await?;
        Ok(calendar::days_with_records(&records, self.month, &self.tz))
    }

    pub async fn records_on(&self, date: NaiveDate) -> Result<Vec<Record>, StoreError> {
        let records = self.store.list_all().await?;
        Ok(calendar::records_on(&records, date, &self.tz))
    }
}
