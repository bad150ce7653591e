//! Document repository trait definition.
//!
//! Documents within a conversation are ordered by `(created_at, id)`.
//! Every windowed read returns documents oldest-first.

use grandma_types::chat::Document;
use grandma_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for document persistence.
pub trait DocumentRepository: Send + Sync {
    /// Create a new document.
    fn create(
        &self,
        document: &Document,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a document by its unique ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Document>, RepositoryError>> + Send;

    /// Get the documents with the given ids, oldest first. Unknown ids are
    /// ignored.
    fn get_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// All documents of a conversation, oldest first.
    fn list_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// The `limit` most recent documents of a conversation, oldest first.
    fn get_recent(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// The `limit` documents strictly older than `before_id`, oldest first.
    ///
    /// With no cursor, or a cursor that does not belong to the
    /// conversation, behaves like [`get_recent`](Self::get_recent).
    fn get_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// Ids of the window [`get_before`](Self::get_before) would return.
    fn get_ids_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Uuid>, RepositoryError>> + Send;

    /// Append `text` to the document's content in one write.
    fn append_content(
        &self,
        id: &Uuid,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the document's content.
    fn update_content(
        &self,
        id: &Uuid,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete one document. Returns `NotFound` for an unknown id.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every document of a conversation. Returns the number removed.
    fn delete_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
