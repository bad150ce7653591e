//! In-memory fakes shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use grandma_types::chat::{Conversation, Document};
use grandma_types::error::RepositoryError;
use grandma_types::llm::{LlmError, Message, MessageRole};
use grandma_types::story::Story;

use crate::chat::relay::{DeltaRelay, RelayError};
use crate::llm::provider::{DeltaStream, LlmProvider};
use crate::llm::selector::ProviderSelector;
use crate::repository::conversation::ConversationRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::story::StoryRepository;

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryConversations {
    rows: Arc<Mutex<Vec<Conversation>>>,
    link_failures: Arc<AtomicUsize>,
    pub link_calls: Arc<AtomicUsize>,
}

impl MemoryConversations {
    pub fn all(&self) -> Vec<Conversation> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get_sync(&self, id: &Uuid) -> Option<Conversation> {
        self.rows.lock().unwrap().iter().find(|c| c.id == *id).cloned()
    }

    /// Make the next `n` link_document calls fail.
    pub fn fail_next_links(&self, n: usize) {
        self.link_failures.store(n, Ordering::SeqCst);
    }
}

impl ConversationRepository for MemoryConversations {
    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().push(conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.get_sync(id))
    }

    async fn list(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Conversation>, u64), RepositoryError> {
        let mut rows = self.all();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        let total = rows.len() as u64;
        let skip = ((page.max(1) - 1) * page_size) as usize;
        Ok((
            rows.into_iter().skip(skip).take(page_size as usize).collect(),
            total,
        ))
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        row.title = title.to_string();
        Ok(())
    }

    async fn link_document(&self, id: &Uuid, document_id: &Uuid) -> Result<(), RepositoryError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.link_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.link_failures.store(pending - 1, Ordering::SeqCst);
            return Err(RepositoryError::Connection);
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        row.last_document_id = Some(*document_id);
        row.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != *id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryDocuments {
    rows: Arc<Mutex<Vec<Document>>>,
    /// 1-based index of the append call that fails; 0 disables.
    fail_append_at: Arc<AtomicUsize>,
    fail_creates: Arc<Mutex<Option<MessageRole>>>,
    pub append_calls: Arc<AtomicUsize>,
}

impl MemoryDocuments {
    pub fn all(&self) -> Vec<Document> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get_sync(&self, id: &Uuid) -> Option<Document> {
        self.rows.lock().unwrap().iter().find(|d| d.id == *id).cloned()
    }

    pub fn fail_append_at(&self, call: usize) {
        self.fail_append_at.store(call, Ordering::SeqCst);
    }

    /// Reject creation of documents with the given role.
    pub fn fail_creates_for(&self, role: MessageRole) {
        *self.fail_creates.lock().unwrap() = Some(role);
    }

    pub fn insert(&self, document: Document) {
        self.rows.lock().unwrap().push(document);
    }

    fn ordered(&self, conversation_id: &Uuid) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .all()
            .into_iter()
            .filter(|d| d.conversation_id == *conversation_id)
            .collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        docs
    }
}

impl DocumentRepository for MemoryDocuments {
    async fn create(&self, document: &Document) -> Result<(), RepositoryError> {
        if *self.fail_creates.lock().unwrap() == Some(document.role) {
            return Err(RepositoryError::Query("disk full".into()));
        }
        self.insert(document.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        Ok(self.get_sync(id))
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Document>, RepositoryError> {
        let mut docs: Vec<Document> = self
            .all()
            .into_iter()
            .filter(|d| ids.contains(&d.id))
            .collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Document>, RepositoryError> {
        Ok(self.ordered(conversation_id))
    }

    async fn get_recent(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.get_before(conversation_id, None, limit).await
    }

    async fn get_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> Result<Vec<Document>, RepositoryError> {
        let docs = self.ordered(conversation_id);
        let end = before_id
            .and_then(|id| docs.iter().position(|d| d.id == *id))
            .unwrap_or(docs.len());
        let start = end.saturating_sub(limit as usize);
        Ok(docs[start..end].to_vec())
    }

    async fn get_ids_before(
        &self,
        conversation_id: &Uuid,
        before_id: Option<&Uuid>,
        limit: u32,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let docs = self.get_before(conversation_id, before_id, limit).await?;
        Ok(docs.into_iter().map(|d| d.id).collect())
    }

    async fn append_content(&self, id: &Uuid, text: &str) -> Result<(), RepositoryError> {
        let call = self.append_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_append_at.load(Ordering::SeqCst) == call {
            return Err(RepositoryError::Query("database is locked".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|d| d.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        row.content.push_str(text);
        Ok(())
    }

    async fn update_content(&self, id: &Uuid, content: &str) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|d| d.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        row.content = content.to_string();
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|d| d.id != *id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_conversation(&self, conversation_id: &Uuid) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|d| d.conversation_id != *conversation_id);
        Ok((before - rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStories {
    rows: Arc<Mutex<Vec<Story>>>,
}

impl MemoryStories {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl StoryRepository for MemoryStories {
    async fn create(&self, story: &Story) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|s| s.guid == story.guid && s.content_hash == story.content_hash)
        {
            return Err(RepositoryError::Conflict("duplicate content hash".into()));
        }
        rows.push(story.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Story>, RepositoryError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.reverse();
        Ok(rows)
    }

    async fn list_by_guid(&self, guid: &str) -> Result<Vec<Story>, RepositoryError> {
        let mut rows: Vec<Story> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.guid == guid)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn find_by_content_hash(
        &self,
        guid: &str,
        content_hash: &str,
    ) -> Result<Option<Story>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.guid == guid && s.content_hash == content_hash)
            .cloned())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| s.id != *id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

enum Reply {
    Fixed(Result<String, LlmError>),
    /// Answer with the last line of the final prompt message.
    Echo,
}

/// Scripted provider: streams `deltas` in order and answers `chat` per
/// its reply mode. Every received prompt is recorded.
#[derive(Clone)]
pub struct MockProvider {
    deltas: Vec<Result<String, LlmError>>,
    reply: Arc<Reply>,
    /// After the scripted deltas, keep yielding until cancelled.
    endless: bool,
    pub prompts: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    pub fn streaming(deltas: &[&str]) -> Self {
        Self::scripted(deltas.iter().map(|d| Ok(d.to_string())).collect())
    }

    pub fn scripted(deltas: Vec<Result<String, LlmError>>) -> Self {
        Self {
            deltas,
            reply: Arc::new(Reply::Fixed(Err(LlmError::EmptyResponse))),
            endless: false,
            prompts: Arc::default(),
        }
    }

    pub fn replying(reply: Result<String, LlmError>) -> Self {
        Self {
            reply: Arc::new(Reply::Fixed(reply)),
            ..Self::scripted(Vec::new())
        }
    }

    pub fn echo() -> Self {
        Self {
            reply: Arc::new(Reply::Echo),
            ..Self::scripted(Vec::new())
        }
    }

    pub fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    pub fn recorded_prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        match self.reply.as_ref() {
            Reply::Fixed(result) => result.clone(),
            Reply::Echo => Ok(messages
                .last()
                .and_then(|m| m.content.lines().last())
                .unwrap_or_default()
                .to_string()),
        }
    }

    fn stream_chat(&self, messages: Vec<Message>, cancel: CancellationToken) -> DeltaStream {
        self.prompts.lock().unwrap().push(messages);
        let scripted = stream::iter(self.deltas.clone());
        if !self.endless {
            return Box::pin(scripted);
        }
        let tail = async_stream::stream! {
            loop {
                if cancel.is_cancelled() {
                    yield Err(LlmError::Cancelled);
                    break;
                }
                yield Ok("tick".to_string());
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        };
        Box::pin(scripted.chain(tail))
    }
}

pub struct MockSelector {
    pub provider: Result<MockProvider, LlmError>,
}

impl MockSelector {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Ok(provider),
        }
    }

    pub fn failing(err: LlmError) -> Self {
        Self { provider: Err(err) }
    }
}

impl ProviderSelector for MockSelector {
    type Provider = MockProvider;

    fn select(&self, _model: &str) -> Result<MockProvider, LlmError> {
        self.provider.clone()
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Collects relayed chunks; fails every write after the first `fail_after`.
#[derive(Clone, Default)]
pub struct RecordingRelay {
    pub chunks: Arc<Mutex<Vec<String>>>,
    fail_after: Option<usize>,
    pub attempts: Arc<AtomicUsize>,
}

impl RecordingRelay {
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }
}

impl DeltaRelay for RecordingRelay {
    async fn relay(&mut self, chunk: &str) -> Result<(), RelayError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if attempt >= limit {
                return Err(RelayError::Disconnected);
            }
        }
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(())
    }
}

/// Never completes a write, like a client that stays connected but stops
/// reading.
pub struct StalledRelay;

impl DeltaRelay for StalledRelay {
    async fn relay(&mut self, _chunk: &str) -> Result<(), RelayError> {
        std::future::pending().await
    }
}
