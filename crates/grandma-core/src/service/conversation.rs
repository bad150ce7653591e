//! Conversation management service.

use grandma_types::chat::{
    Conversation, ConversationDetail, ConversationPage, DEFAULT_CONVERSATION_TITLE,
};
use grandma_types::error::{ChatError, RepositoryError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::title::{generate_title, sanitize_title};
use crate::llm::selector::ProviderSelector;
use crate::repository::conversation::ConversationRepository;
use crate::repository::document::DocumentRepository;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Conversation CRUD plus LLM title generation.
pub struct ConversationService<C, D, S>
where
    C: ConversationRepository,
    D: DocumentRepository,
    S: ProviderSelector,
{
    conversations: C,
    documents: D,
    providers: S,
    /// Model alias used for title generation.
    title_model: String,
}

impl<C, D, S> ConversationService<C, D, S>
where
    C: ConversationRepository,
    D: DocumentRepository,
    S: ProviderSelector,
{
    pub fn new(conversations: C, documents: D, providers: S, title_model: impl Into<String>) -> Self {
        Self {
            conversations,
            documents,
            providers,
            title_model: title_model.into(),
        }
    }

    /// One page of conversations, most recently active first.
    ///
    /// `page` below 1 is treated as 1; `page_size` below 1 falls back to
    /// [`DEFAULT_PAGE_SIZE`] and is capped at [`MAX_PAGE_SIZE`].
    pub async fn list(&self, page: u32, page_size: u32) -> Result<ConversationPage, RepositoryError> {
        let page = page.max(1);
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        let (conversations, total) = self.conversations.list(page, page_size).await?;
        Ok(ConversationPage {
            conversations,
            total,
            page,
            page_size,
        })
    }

    pub async fn create(&self, title: Option<&str>) -> Result<Conversation, RepositoryError> {
        let conversation = Conversation::new(sanitize_title(title.unwrap_or_default()));
        self.conversations.create(&conversation).await?;
        info!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    /// Create a conversation titled from `user_inputs`.
    ///
    /// A failed title generation falls back to the default title; the
    /// conversation is still created.
    pub async fn create_with_title(
        &self,
        user_inputs: &[String],
    ) -> Result<Conversation, RepositoryError> {
        let title = match self.generate_title(user_inputs).await {
            Ok(title) => title,
            Err(err) => {
                warn!(error = %err, "title generation failed, using default title");
                DEFAULT_CONVERSATION_TITLE.to_string()
            }
        };
        self.create(Some(&title)).await
    }

    /// Generate a title without creating anything.
    pub async fn generate_title(&self, user_inputs: &[String]) -> Result<String, ChatError> {
        if user_inputs.iter().all(|input| input.trim().is_empty()) {
            return Ok(DEFAULT_CONVERSATION_TITLE.to_string());
        }
        let provider = self.providers.select(&self.title_model)?;
        Ok(generate_title(&provider, user_inputs).await?)
    }

    /// A conversation with all of its documents, oldest first.
    pub async fn get_detail(&self, id: &Uuid) -> Result<ConversationDetail, ChatError> {
        let conversation = self
            .conversations
            .get(id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*id))?;
        let documents = self.documents.list_by_conversation(id).await?;
        Ok(ConversationDetail {
            conversation,
            documents,
        })
    }

    pub async fn update_title(&self, id: &Uuid, title: &str) -> Result<Conversation, ChatError> {
        let title = sanitize_title(title);
        self.conversations
            .update_title(id, &title)
            .await
            .map_err(|e| not_found_as(e, id))?;
        self.conversations
            .get(id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*id))
    }

    /// Replace the editable fields of a conversation: the title and,
    /// when given, the latest-document pointer. That document must already
    /// belong to the conversation.
    pub async fn update(
        &self,
        id: &Uuid,
        title: &str,
        last_document_id: Option<Uuid>,
    ) -> Result<Conversation, ChatError> {
        if self.conversations.get(id).await?.is_none() {
            return Err(ChatError::ConversationNotFound(*id));
        }
        if let Some(document_id) = last_document_id {
            let owned = self
                .documents
                .get(&document_id)
                .await?
                .is_some_and(|d| d.conversation_id == *id);
            if !owned {
                return Err(ChatError::Validation(format!(
                    "document {document_id} does not belong to conversation {id}"
                )));
            }
        }

        let title = sanitize_title(title);
        self.conversations
            .update_title(id, &title)
            .await
            .map_err(|e| not_found_as(e, id))?;
        if let Some(document_id) = last_document_id {
            self.conversations
                .link_document(id, &document_id)
                .await
                .map_err(|e| not_found_as(e, id))?;
        }
        self.conversations
            .get(id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*id))
    }

    /// Delete a conversation and its documents. Returns the number of
    /// documents removed.
    pub async fn delete(&self, id: &Uuid) -> Result<u64, ChatError> {
        if self.conversations.get(id).await?.is_none() {
            return Err(ChatError::ConversationNotFound(*id));
        }
        let removed = self.documents.delete_by_conversation(id).await?;
        self.conversations
            .delete(id)
            .await
            .map_err(|e| not_found_as(e, id))?;
        info!(conversation_id = %id, documents = removed, "conversation deleted");
        Ok(removed)
    }
}

fn not_found_as(err: RepositoryError, id: &Uuid) -> ChatError {
    match err {
        RepositoryError::NotFound => ChatError::ConversationNotFound(*id),
        other => ChatError::Storage(other),
    }
}
