//! Chat orchestrator.
//!
//! [`ChatService`] owns the lifecycle of one chat exchange. It is split in
//! two phases so the HTTP layer can report setup failures with a proper
//! status code before it commits to a streaming response:
//!
//! 1. [`ChatService::begin`] validates the request, selects the provider,
//!    resolves or creates the conversation, hydrates history, persists the
//!    user turn, and creates the empty assistant document.
//! 2. [`ChatService::stream`] drives the provider stream through a
//!    [`StreamSink`] and finalizes the conversation linkage no matter how
//!    the stream ended.

use std::time::Duration;

use futures_util::StreamExt;
use grandma_types::chat::{ChatOutcome, ChatRequest, Conversation, Document, MessageRole};
use grandma_types::config::ChatConfig;
use grandma_types::error::{ChatError, RepositoryError};
use grandma_types::llm::{LlmError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chat::relay::DeltaRelay;
use crate::chat::sink::StreamSink;
use crate::chat::title::title_from_messages;
use crate::llm::provider::LlmProvider;
use crate::llm::selector::ProviderSelector;
use crate::repository::conversation::ConversationRepository;
use crate::repository::document::DocumentRepository;

/// Setup state handed from [`ChatService::begin`] to [`ChatService::stream`].
pub struct PreparedTurn<P> {
    pub conversation_id: Uuid,
    pub user_document_id: Option<Uuid>,
    /// The empty assistant document the stream appends to.
    pub document_id: Uuid,
    /// History window followed by the caller's messages.
    pub messages: Vec<Message>,
    pub provider: P,
}

/// Orchestrates one chat request end to end.
///
/// Generic over the repositories and the provider selector so the core
/// never depends on grandma-infra.
pub struct ChatService<C, D, S>
where
    C: ConversationRepository,
    D: DocumentRepository,
    S: ProviderSelector,
{
    conversations: C,
    documents: D,
    providers: S,
    config: ChatConfig,
}

impl<C, D, S> ChatService<C, D, S>
where
    C: ConversationRepository,
    D: DocumentRepository,
    S: ProviderSelector,
{
    pub fn new(conversations: C, documents: D, providers: S, config: ChatConfig) -> Self {
        Self {
            conversations,
            documents,
            providers,
            config,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Run both phases back to back.
    pub async fn send_message<R: DeltaRelay>(
        &self,
        request: ChatRequest,
        relay: R,
        cancel: CancellationToken,
    ) -> Result<ChatOutcome, ChatError> {
        let turn = self.begin(request).await?;
        self.stream(turn, relay, cancel).await
    }

    /// Everything that must succeed before any model output exists.
    ///
    /// The provider is selected first so a configuration error never leaves
    /// a conversation or user turn behind. A failure persisting the user
    /// turn is fatal: no model call is made for an unrecorded turn.
    #[tracing::instrument(
        name = "chat.begin",
        skip(self, request),
        fields(model = %request.model, conversation_id = ?request.conversation_id)
    )]
    pub async fn begin(&self, request: ChatRequest) -> Result<PreparedTurn<S::Provider>, ChatError> {
        if request.messages.is_empty() {
            return Err(ChatError::Validation("messages must not be empty".into()));
        }

        let provider = self.providers.select(&request.model)?;

        let (conversation, existing) = match request.conversation_id {
            None => {
                let conversation = Conversation::new(title_from_messages(&request.messages));
                self.conversations.create(&conversation).await?;
                info!(conversation_id = %conversation.id, title = %conversation.title, "conversation created");
                (conversation, false)
            }
            Some(id) => {
                let conversation = self
                    .conversations
                    .get(&id)
                    .await?
                    .ok_or(ChatError::ConversationNotFound(id))?;
                (conversation, true)
            }
        };

        let mut messages = Vec::new();
        if existing {
            messages.extend(self.history(&conversation.id).await);
        }
        messages.extend(request.messages.iter().cloned());

        let mut user_document_id = None;
        if let Some(last) = request.messages.last().filter(|m| m.role == MessageRole::User) {
            let document = Document::new(
                conversation.id,
                MessageRole::User,
                last.content.clone(),
                request.model.clone(),
            );
            self.documents.create(&document).await?;
            self.conversations
                .link_document(&conversation.id, &document.id)
                .await?;
            user_document_id = Some(document.id);
        }

        let assistant = Document::new(
            conversation.id,
            MessageRole::Assistant,
            String::new(),
            request.model.clone(),
        );
        self.documents.create(&assistant).await?;

        Ok(PreparedTurn {
            conversation_id: conversation.id,
            user_document_id,
            document_id: assistant.id,
            messages,
            provider,
        })
    }

    /// Recent documents as prompt context, oldest first.
    ///
    /// Empty documents (an assistant turn that produced nothing) are
    /// skipped. A read failure degrades to no history.
    async fn history(&self, conversation_id: &Uuid) -> Vec<Message> {
        match self
            .documents
            .get_recent(conversation_id, self.config.history_limit)
            .await
        {
            Ok(documents) => documents
                .iter()
                .filter(|d| !d.content.is_empty())
                .map(Document::to_message)
                .collect(),
            Err(err) => {
                warn!(%conversation_id, error = %err, "failed to load history, continuing without it");
                Vec::new()
            }
        }
    }

    /// Stream the provider's output through the sink and finalize.
    ///
    /// Provider errors, client disconnects, timeouts, and cancellation all
    /// end in `Ok` with whatever arrived persisted; the failure is carried
    /// in [`ChatOutcome::stream_error`]. Only a storage failure in the sink
    /// is returned as an error, after the linkage has still been attempted.
    #[tracing::instrument(
        name = "chat.stream",
        skip_all,
        fields(
            conversation_id = %turn.conversation_id,
            document_id = %turn.document_id,
            provider = turn.provider.name(),
            upstream_model = turn.provider.model(),
        )
    )]
    pub async fn stream<R: DeltaRelay>(
        &self,
        turn: PreparedTurn<S::Provider>,
        relay: R,
        cancel: CancellationToken,
    ) -> Result<ChatOutcome, ChatError> {
        let PreparedTurn {
            conversation_id,
            document_id,
            messages,
            provider,
            ..
        } = turn;

        let mut deltas = provider.stream_chat(messages, cancel.clone());
        let mut sink = StreamSink::new(
            &self.documents,
            document_id,
            relay,
            self.config.flush_threshold_bytes,
        );
        let timeout = Duration::from_secs(self.config.stream_timeout_secs);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let timed_out = || {
            warn!(timeout_secs = timeout.as_secs(), "provider stream timed out");
            format!("stream timed out after {}s", timeout.as_secs())
        };

        let mut stream_error: Option<String> = None;
        loop {
            let next = tokio::select! {
                next = deltas.next() => next,
                _ = &mut deadline => {
                    cancel.cancel();
                    stream_error = Some(timed_out());
                    break;
                }
            };

            match next {
                None => break,
                Some(Ok(delta)) => {
                    // A client that stops reading must not hold the stream
                    // past its deadline or past shutdown.
                    let interrupted = tokio::select! {
                        () = sink.relay(&delta) => None,
                        _ = &mut deadline => Some(timed_out()),
                        _ = cancel.cancelled() => Some(LlmError::Cancelled.to_string()),
                    };
                    let stored = sink.persist(&delta).await;
                    if let Some(reason) = interrupted {
                        cancel.cancel();
                        stream_error = Some(reason);
                        break;
                    }
                    if stored.is_err() {
                        cancel.cancel();
                        break;
                    }
                    if self.config.abort_on_client_disconnect && sink.relay_failed() {
                        info!("client disconnected, abandoning provider stream");
                        cancel.cancel();
                        stream_error = Some(LlmError::Cancelled.to_string());
                        break;
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "provider stream ended with an error");
                    stream_error = Some(err.to_string());
                    break;
                }
            }
        }
        drop(deltas);

        let (_relay, report) = sink.finish().await;
        self.link_with_retry(&conversation_id, &document_id).await;

        if let Some(err) = report.storage_error {
            return Err(ChatError::Storage(err));
        }

        info!(
            chunks = report.chunks,
            bytes = report.bytes_persisted,
            flushes = report.flushes,
            relay_failures = report.relay_failures,
            failed = stream_error.is_some(),
            "chat stream finished"
        );

        Ok(ChatOutcome {
            conversation_id,
            document_id,
            stream_error,
            relay_interrupted: report.relay_error.is_some(),
            bytes_persisted: report.bytes_persisted,
        })
    }

    /// Link the finished assistant document, retrying once.
    ///
    /// The document itself is already stored and reachable through the
    /// conversation's document list, so a second failure is logged and
    /// dropped instead of failing the exchange.
    async fn link_with_retry(&self, conversation_id: &Uuid, document_id: &Uuid) {
        let mut last_err: Option<RepositoryError> = None;
        for attempt in 1..=2 {
            match self
                .conversations
                .link_document(conversation_id, document_id)
                .await
            {
                Ok(()) => return,
                Err(err) => {
                    warn!(attempt, error = %err, "failed to link assistant document");
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            error!(%conversation_id, %document_id, error = %err, "giving up on assistant document linkage");
        }
    }
}
