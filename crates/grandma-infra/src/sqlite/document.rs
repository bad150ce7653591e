//! SQLite document repository.
//!
//! Documents are ordered by `(created_at, id)`. Windows are selected newest
//! first with a `LIMIT` and then reversed, so every listing is returned
//! oldest first.

use chrono::Utc;
use grandma_core::repository::document::DocumentRepository;
use grandma_types::chat::Document;
use grandma_types::error::RepositoryError;
use grandma_types::llm::MessageRole;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

pub struct SqliteDocumentRepository {
    pool: DatabasePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// `(created_at, id)` of a cursor document within a conversation.
    async fn cursor(
        &self,
        conversation_id: &Uuid,
        before_id: &Uuid,
    ) -> Result<Option<(String, String)>, RepositoryError> {
        sqlx::query_as("SELECT created_at, id FROM documents WHERE id = ? AND conversation_id = ?")
            .bind(before_id.to_string())
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)
    }

    async fn window(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> Result<Vec<Document>, RepositoryError> {
        let cursor = match before_id {
            Some(id) => self.cursor(conversation_id, id).await?,
            None => None,
        };

        let rows = match cursor {
            Some((created_at, id)) => {
                sqlx::query(
                    r#"SELECT * FROM documents
                       WHERE conversation_id = ?
                         AND (created_at < ? OR (created_at = ? AND id < ?))
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?"#,
                )
                .bind(conversation_id.to_string())
                .bind(&created_at)
                .bind(&created_at)
                .bind(&id)
                .bind(i64::from(limit))
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    r#"SELECT * FROM documents
                       WHERE conversation_id = ?
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?"#,
                )
                .bind(conversation_id.to_string())
                .bind(i64::from(limit))
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(query_error)?;

        let mut documents = map_rows(&rows)?;
        documents.reverse();
        Ok(documents)
    }
}

struct DocumentRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    model: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            model: row.try_get("model")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_document(self) -> Result<Document, RepositoryError> {
        let role: MessageRole = self.role.parse().map_err(RepositoryError::Query)?;
        Ok(Document {
            id: parse_uuid(&self.id, "document id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            role,
            content: self.content,
            model: self.model,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn map_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Document>, RepositoryError> {
    rows.iter()
        .map(|row| DocumentRow::from_row(row).map_err(query_error)?.into_document())
        .collect()
}

impl DocumentRepository for SqliteDocumentRepository {
    async fn create(&self, document: &Document) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO documents (id, conversation_id, role, content, model, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(document.id.to_string())
        .bind(document.conversation_id.to_string())
        .bind(document.role.as_str())
        .bind(&document.content)
        .bind(&document.model)
        .bind(format_datetime(&document.created_at))
        .bind(format_datetime(&document.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| DocumentRow::from_row(&row).map_err(query_error)?.into_document())
            .transpose()
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Document>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM documents WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        map_rows(&rows)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE conversation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;
        map_rows(&rows)
    }

    async fn get_recent(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.window(conversation_id, None, limit).await
    }

    async fn get_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.window(conversation_id, before_id, limit).await
    }

    async fn get_ids_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        Ok(self
            .window(conversation_id, before_id, limit)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }

    async fn append_content(&self, id: &Uuid, text: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE documents SET content = content || ?, updated_at = ? WHERE id = ?",
        )
        .bind(text)
        .bind(format_datetime(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_content(&self, id: &Uuid, content: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE documents SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_conversation(&self, conversation_id: &Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE conversation_id = ?")
            .bind(conversation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }
}
