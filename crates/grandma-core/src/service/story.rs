//! Story service: saved excerpts deduplicated by content hash.

use chrono::Utc;
use grandma_types::error::StoryError;
use grandma_types::story::{DEFAULT_STORY_GUID, NewStory, Story};
use tracing::info;
use uuid::Uuid;

use crate::repository::story::StoryRepository;
use crate::service::hash::ContentHasher;

pub struct StoryService<R: StoryRepository, H: ContentHasher> {
    stories: R,
    hasher: H,
}

impl<R: StoryRepository, H: ContentHasher> StoryService<R, H> {
    pub fn new(stories: R, hasher: H) -> Self {
        Self { stories, hasher }
    }

    /// Stories for `guid`, newest first. No guid, an empty one, or the
    /// default guid lists every story.
    pub async fn list(&self, guid: Option<&str>) -> Result<Vec<Story>, StoryError> {
        match guid.map(str::trim) {
            None | Some("") | Some(DEFAULT_STORY_GUID) => Ok(self.stories.list_all().await?),
            Some(guid) => Ok(self.stories.list_by_guid(guid).await?),
        }
    }

    /// Save a story.
    ///
    /// A client-supplied hash must match the server's digest of `content`.
    /// Saving content already stored under the same guid is a
    /// [`StoryError::Duplicate`].
    pub async fn create(&self, input: NewStory) -> Result<Story, StoryError> {
        if input.content.is_empty() {
            return Err(StoryError::Invalid("content must not be empty".into()));
        }

        let hash = self.hasher.compute_hash(&input.content);
        let sent = input
            .content_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());
        if let Some(sent) = sent.filter(|h| !h.eq_ignore_ascii_case(&hash)) {
            return Err(StoryError::HashMismatch {
                expected: hash,
                actual: sent.to_string(),
            });
        }

        let guid = input
            .guid
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_STORY_GUID)
            .to_string();

        if self
            .stories
            .find_by_content_hash(&guid, &hash)
            .await?
            .is_some()
        {
            return Err(StoryError::Duplicate);
        }

        let now = Utc::now();
        let story = Story {
            id: Uuid::now_v7(),
            document_id: input.document_id,
            guid,
            title: input.title.trim().to_string(),
            content: input.content,
            content_hash: hash,
            created_at: now,
            updated_at: now,
        };
        self.stories.create(&story).await?;
        info!(story_id = %story.id, guid = %story.guid, "story saved");
        Ok(story)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), StoryError> {
        Ok(self.stories.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStories;

    /// Deterministic stand-in: length plus reversed content.
    struct ReverseHasher;

    impl ContentHasher for ReverseHasher {
        fn compute_hash(&self, content: &str) -> String {
            format!("{}:{}", content.len(), content.chars().rev().collect::<String>())
        }
    }

    fn input(guid: Option<&str>, content: &str, hash: Option<&str>) -> NewStory {
        NewStory {
            guid: guid.map(str::to_string),
            document_id: Uuid::now_v7(),
            title: " A story ".into(),
            content: content.into(),
            content_hash: hash.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_guid_and_hashes_content() {
        let svc = StoryService::new(MemoryStories::default(), ReverseHasher);
        let story = svc.create(input(None, "abc", None)).await.unwrap();
        assert_eq!(story.guid, DEFAULT_STORY_GUID);
        assert_eq!(story.content_hash, "3:cba");
        assert_eq!(story.title, "A story");
    }

    #[tokio::test]
    async fn test_matching_client_hash_is_accepted() {
        let svc = StoryService::new(MemoryStories::default(), ReverseHasher);
        svc.create(input(Some("alice"), "abc", Some("3:cba")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_client_hash_is_rejected() {
        let stories = MemoryStories::default();
        let svc = StoryService::new(stories.clone(), ReverseHasher);
        let err = svc
            .create(input(None, "abc", Some("deadbeef")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoryError::HashMismatch { ref expected, ref actual }
                if expected == "3:cba" && actual == "deadbeef"
        ));
        assert_eq!(stories.len(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_content_per_guid() {
        let svc = StoryService::new(MemoryStories::default(), ReverseHasher);
        svc.create(input(Some("alice"), "same", None)).await.unwrap();
        assert!(matches!(
            svc.create(input(Some("alice"), "same", None)).await,
            Err(StoryError::Duplicate)
        ));
        // Another owner may save the same text.
        svc.create(input(Some("bob"), "same", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_by_guid_or_everything() {
        let svc = StoryService::new(MemoryStories::default(), ReverseHasher);
        svc.create(input(Some("alice"), "one", None)).await.unwrap();
        svc.create(input(Some("bob"), "two", None)).await.unwrap();
        svc.create(input(None, "three", None)).await.unwrap();

        assert_eq!(svc.list(Some("alice")).await.unwrap().len(), 1);
        assert_eq!(svc.list(Some("")).await.unwrap().len(), 3);
        assert_eq!(svc.list(Some("default")).await.unwrap().len(), 3);
        let all = svc.list(None).await.unwrap();
        assert_eq!(all[0].content, "three");
    }

    #[tokio::test]
    async fn test_empty_content_is_invalid_and_delete_reports_missing() {
        let svc = StoryService::new(MemoryStories::default(), ReverseHasher);
        assert!(matches!(
            svc.create(input(None, "", None)).await,
            Err(StoryError::Invalid(_))
        ));
        assert!(matches!(
            svc.delete(&Uuid::now_v7()).await,
            Err(StoryError::NotFound)
        ));
    }
}
