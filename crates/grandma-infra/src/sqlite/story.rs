//! SQLite story repository.

use grandma_core::repository::story::StoryRepository;
use grandma_types::error::RepositoryError;
use grandma_types::story::Story;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

pub struct SqliteStoryRepository {
    pool: DatabasePool,
}

impl SqliteStoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct StoryRow {
    id: String,
    document_id: String,
    guid: String,
    title: String,
    content: String,
    content_hash: String,
    created_at: String,
    updated_at: String,
}

impl StoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            document_id: row.try_get("document_id")?,
            guid: row.try_get("guid")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            content_hash: row.try_get("content_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_story(self) -> Result<Story, RepositoryError> {
        Ok(Story {
            id: parse_uuid(&self.id, "story id")?,
            document_id: parse_uuid(&self.document_id, "document_id")?,
            guid: self.guid,
            title: self.title,
            content: self.content,
            content_hash: self.content_hash,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn map_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Story>, RepositoryError> {
    rows.iter()
        .map(|row| StoryRow::from_row(row).map_err(query_error)?.into_story())
        .collect()
}

impl StoryRepository for SqliteStoryRepository {
    async fn create(&self, story: &Story) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO stories (id, document_id, guid, title, content, content_hash, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(story.id.to_string())
        .bind(story.document_id.to_string())
        .bind(&story.guid)
        .bind(&story.title)
        .bind(&story.content)
        .bind(&story.content_hash)
        .bind(format_datetime(&story.created_at))
        .bind(format_datetime(&story.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!("story with hash {} already exists for '{}'", story.content_hash, story.guid),
            ),
            other => query_error(other),
        })?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Story>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM stories ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        map_rows(&rows)
    }

    async fn list_by_guid(&self, guid: &str) -> Result<Vec<Story>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM stories WHERE guid = ? ORDER BY created_at DESC, id DESC")
                .bind(guid)
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_error)?;
        map_rows(&rows)
    }

    async fn find_by_content_hash(
        &self,
        guid: &str,
        content_hash: &str,
    ) -> Result<Option<Story>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM stories WHERE guid = ? AND content_hash = ?")
            .bind(guid)
            .bind(content_hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| StoryRow::from_row(&row).map_err(query_error)?.into_story())
            .transpose()
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
