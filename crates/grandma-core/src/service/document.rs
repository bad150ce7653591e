//! Document browsing and editing.

use grandma_types::chat::Document;
use grandma_types::error::RepositoryError;
use uuid::Uuid;

use crate::repository::document::DocumentRepository;

/// Page size for document listings when the caller gives none.
pub const DEFAULT_DOCUMENT_LIMIT: u32 = 10;
pub const MAX_DOCUMENT_LIMIT: u32 = 100;

pub struct DocumentService<D: DocumentRepository> {
    documents: D,
}

impl<D: DocumentRepository> DocumentService<D> {
    pub fn new(documents: D) -> Self {
        Self { documents }
    }

    fn limit(limit: Option<u32>) -> u32 {
        match limit {
            None | Some(0) => DEFAULT_DOCUMENT_LIMIT,
            Some(n) => n.min(MAX_DOCUMENT_LIMIT),
        }
    }

    /// Documents older than `before_id` (or the newest ones), ascending.
    pub async fn list(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: Option<u32>,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.documents
            .get_before(conversation_id, before_id, Self::limit(limit))
            .await
    }

    /// Same window as [`list`](Self::list), ids only.
    pub async fn list_ids(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: Option<u32>,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        self.documents
            .get_ids_before(conversation_id, before_id, Self::limit(limit))
            .await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Document, RepositoryError> {
        self.documents.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Unknown ids are silently skipped.
    pub async fn get_batch(&self, ids: &[Uuid]) -> Result<Vec<Document>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.documents.get_by_ids(ids).await
    }

    pub async fn update_content(&self, id: &Uuid, content: &str) -> Result<Document, RepositoryError> {
        self.documents.update_content(id, content).await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.documents.delete(id).await
    }
}
