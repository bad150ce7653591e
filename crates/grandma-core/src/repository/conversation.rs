//! Conversation repository trait definition.

use grandma_types::chat::Conversation;
use grandma_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation persistence.
///
/// Implementations live in grandma-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConversationRepository: Send + Sync {
    /// Create a new conversation.
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a conversation by its unique ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List conversations ordered by `updated_at` DESC.
    ///
    /// `page` is 1-based. Returns the page and the total number of
    /// conversations.
    fn list(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl std::future::Future<Output = Result<(Vec<Conversation>, u64), RepositoryError>> + Send;

    /// Replace the title. Returns `NotFound` for an unknown id.
    fn update_title(
        &self,
        id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record `document_id` as the latest document and bump `updated_at`.
    fn link_document(
        &self,
        id: &Uuid,
        document_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a conversation. Returns `NotFound` for an unknown id.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
