use super::RecordBackend;
use crate::error::StoreError;
use crate::models::{Category, NewRecord, Record};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use storage::StorageError;

const COLUMNS: &str = "id, title, description, tags_json, file_name, file_kind, category, payload, created_at, updated_at";

/// Indexed backend on SQLite: documents keyed by an auto-increment id, with
/// indices on creation time, category and (through `document_tags`) each tag.
pub struct IndexedBackend {
    pool: SqlitePool,
}

impl IndexedBackend {
    pub async fn open(database: &str) -> Result<Self, StorageError> {
        let pool = storage::connect(database).await?;
        storage::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn query_records(&self, sql: &str, binds: Vec<Bind>) -> Result<Vec<Record>, StoreError> {
        let mut query = sqlx::query(sql);
        for bind in binds {
            query = match bind {
                Bind::Int(v) => query.bind(v),
                Bind::Text(v) => query.bind(v),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }
}

enum Bind {
    Int(i64),
    Text(String),
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {ms}")).into())
}

fn record_from_row(row: &SqliteRow) -> Result<Record, StoreError> {
    let tags_json: String = row.try_get("tags_json")?;
    let file_kind: String = row.try_get("file_kind")?;
    let category: String = row.try_get("category")?;
    let payload: String = row.try_get("payload")?;
    Ok(Record {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        tags: serde_json::from_str(&tags_json)?,
        file_name: row.try_get("file_name")?,
        file_kind: file_kind.parse().map_err(StorageError::Corrupt)?,
        category: category.parse().map_err(StorageError::Corrupt)?,
        payload: payload.parse()?,
        created_at: millis_to_datetime(row.try_get("created_at")?)?,
        updated_at: millis_to_datetime(row.try_get("updated_at")?)?,
    })
}

async fn write_tags(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    tags: &[String],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM document_tags WHERE document_id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    for (position, tag) in tags.iter().enumerate() {
        sqlx::query("INSERT INTO document_tags (document_id, position, tag) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(position as i64)
            .bind(tag.trim().to_lowercase())
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl RecordBackend for IndexedBackend {
    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM documents ORDER BY id");
        self.query_records(&sql, Vec::new()).await
    }

    async fn get(&self, id: i64) -> Result<Option<Record>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, record: NewRecord) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            r#"
            INSERT INTO documents (title, description, tags_json, file_name, file_kind, category, payload, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.title)
        .bind(&record.description)
        .bind(serde_json::to_string(&record.tags)?)
        .bind(&record.file_name)
        .bind(record.file_kind.as_str())
        .bind(record.category.as_str())
        .bind(record.payload.to_string())
        .bind(record.created_at.timestamp_millis())
        .bind(record.updated_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;
        let id = res.last_insert_rowid();
        write_tags(&mut tx, id, &record.tags).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(&self, record: &Record) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            r#"
            UPDATE documents SET
                title = ?2,
                description = ?3,
                tags_json = ?4,
                file_name = ?5,
                file_kind = ?6,
                category = ?7,
                payload = ?8,
                created_at = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(serde_json::to_string(&record.tags)?)
        .bind(&record.file_name)
        .bind(record.file_kind.as_str())
        .bind(record.category.as_str())
        .bind(record.payload.to_string())
        .bind(record.created_at.timestamp_millis())
        .bind(record.updated_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        write_tags(&mut tx, record.id, &record.tags).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM document_tags WHERE document_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_by_category(&self, category: Category) -> Result<Vec<Record>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE category = ?1 ORDER BY id");
        self.query_records(&sql, vec![Bind::Text(category.as_str().to_string())])
            .await
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM documents WHERE id IN (SELECT document_id FROM document_tags WHERE tag = ?1) ORDER BY id"
        );
        self.query_records(&sql, vec![Bind::Text(tag.trim().to_lowercase())])
            .await
    }

    async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM documents WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at"
        );
        self.query_records(
            &sql,
            vec![
                Bind::Int(start.timestamp_millis()),
                Bind::Int(end.timestamp_millis()),
            ],
        )
        .await
    }
}
