//! Story repository trait definition.

use grandma_types::error::RepositoryError;
use grandma_types::story::Story;
use uuid::Uuid;

/// Repository trait for saved stories.
pub trait StoryRepository: Send + Sync {
    /// Insert a story. A duplicate `(guid, content_hash)` is a `Conflict`.
    fn create(
        &self,
        story: &Story,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every story, newest first.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Story>, RepositoryError>> + Send;

    /// Stories owned by `guid`, newest first.
    fn list_by_guid(
        &self,
        guid: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Story>, RepositoryError>> + Send;

    fn find_by_content_hash(
        &self,
        guid: &str,
        content_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<Story>, RepositoryError>> + Send;

    /// Delete a story. Returns `NotFound` for an unknown id.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
