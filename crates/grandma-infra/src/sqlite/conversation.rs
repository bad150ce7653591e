//! SQLite conversation repository.

use chrono::Utc;
use grandma_core::repository::conversation::ConversationRepository;
use grandma_types::chat::Conversation;
use grandma_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConversationRow {
    id: String,
    title: String,
    last_document_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            last_document_id: row.try_get("last_document_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_uuid(&self.id, "conversation id")?,
            title: self.title,
            last_document_id: self
                .last_document_id
                .as_deref()
                .map(|id| parse_uuid(id, "last_document_id"))
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn map_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Conversation>, RepositoryError> {
    rows.iter()
        .map(|row| {
            ConversationRow::from_row(row)
                .map_err(query_error)?
                .into_conversation()
        })
        .collect()
}

impl ConversationRepository for SqliteConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversations (id, title, last_document_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(&conversation.title)
        .bind(conversation.last_document_id.map(|id| id.to_string()))
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("conversation {} already exists", conversation.id))
            }
            other => query_error(other),
        })?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| {
            ConversationRow::from_row(&row)
                .map_err(query_error)?
                .into_conversation()
        })
        .transpose()
    }

    async fn list(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Conversation>, u64), RepositoryError> {
        let offset = i64::from(page.max(1) - 1) * i64::from(page_size);
        let rows = sqlx::query(
            "SELECT * FROM conversations ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM conversations")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?
            .try_get("cnt")
            .map_err(query_error)?;

        Ok((map_rows(&rows)?, total as u64))
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
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

    async fn link_document(&self, id: &Uuid, document_id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE conversations SET last_document_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(document_id.to_string())
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
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::test_pool;

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let conversation = Conversation::new("Sourdough starter");
        repo.create(&conversation).await.unwrap();

        let found = repo.get(&conversation.id).await.unwrap().unwrap();
        assert_eq!(found.id, conversation.id);
        assert_eq!(found.title, "Sourdough starter");
        assert!(found.last_document_id.is_none());

        assert!(repo.get(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let conversation = Conversation::new("once");
        repo.create(&conversation).await.unwrap();
        assert!(matches!(
            repo.create(&conversation).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_activity() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let a = Conversation::new("a");
        let b = Conversation::new("b");
        let c = Conversation::new("c");
        for conversation in [&a, &b, &c] {
            repo.create(conversation).await.unwrap();
        }
        // Linking bumps `a` to the top.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.link_document(&a.id, &Uuid::now_v7()).await.unwrap();

        let (first, total) = repo.list(1, 2).await.unwrap();
        assert_eq!(total, 3);
        let titles: Vec<&str> = first.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);

        let (second, _) = repo.list(2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "b");
    }

    #[tokio::test]
    async fn test_link_and_update_title() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let conversation = Conversation::new("old");
        repo.create(&conversation).await.unwrap();

        let doc_id = Uuid::now_v7();
        repo.link_document(&conversation.id, &doc_id).await.unwrap();
        repo.update_title(&conversation.id, "new").await.unwrap();

        let found = repo.get(&conversation.id).await.unwrap().unwrap();
        assert_eq!(found.title, "new");
        assert_eq!(found.last_document_id, Some(doc_id));
        assert!(found.updated_at >= conversation.updated_at);

        let missing = Uuid::now_v7();
        assert!(matches!(
            repo.link_document(&missing, &doc_id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.update_title(&missing, "x").await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let conversation = Conversation::new("bye");
        repo.create(&conversation).await.unwrap();
        repo.delete(&conversation.id).await.unwrap();
        assert!(repo.get(&conversation.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&conversation.id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
