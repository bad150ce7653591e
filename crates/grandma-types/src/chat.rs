//! Conversation, document, and chat request types.
//!
//! A conversation owns an ordered set of documents. Order is defined by
//! `created_at` (ties broken by the time-sortable UUID v7 id), never by an
//! explicit index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub use crate::llm::{Message, MessageRole};

/// Title used when no usable title can be derived.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Titles are capped at this many characters.
pub const MAX_TITLE_CHARS: usize = 50;

/// A conversation between a user and one or more models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    /// Most recently linked document, if any.
    pub last_document_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh conversation with a new v7 id.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            last_document_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single stored message within a conversation.
///
/// Assistant documents are created with empty content before generation
/// starts and grow append-only while the stream runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Model alias the request named when this document was written.
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        conversation_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.into(),
            model: model.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// One page of the conversation list, newest activity first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// A conversation together with its documents, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub documents: Vec<Document>,
}

/// Inbound chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Existing conversation to continue; a new one is created when absent.
    #[serde(
        default,
        alias = "conversationId",
        deserialize_with = "deserialize_optional_uuid"
    )]
    pub conversation_id: Option<Uuid>,
    pub model: String,
    pub messages: Vec<Message>,
}

/// Result of one chat exchange.
///
/// A stream that ended early still produces an outcome: `stream_error`
/// carries the provider failure and the stored document holds whatever
/// arrived before it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub conversation_id: Uuid,
    pub document_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_error: Option<String>,
    /// The client transport failed at some point during the stream.
    pub relay_interrupted: bool,
    pub bytes_persisted: usize,
}

/// Accepts `null`, a missing field, or an empty string as "no id".
fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_snake_case() {
        let id = Uuid::now_v7();
        let json = format!(
            r#"{{"conversation_id":"{id}","model":"openai","messages":[{{"role":"user","content":"hi"}}]}}"#
        );
        let req: ChatRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.conversation_id, Some(id));
        assert_eq!(req.model, "openai");
        assert_eq!(req.messages, vec![Message::user("hi")]);
    }

    #[test]
    fn test_chat_request_camel_case_alias() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"conversationId":"{id}","model":"claude","messages":[]}}"#);
        let req: ChatRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.conversation_id, Some(id));
    }

    #[test]
    fn test_chat_request_empty_or_missing_id() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"conversation_id":"","model":"openai","messages":[]}"#)
                .unwrap();
        assert!(req.conversation_id.is_none());

        let req: ChatRequest = serde_json::from_str(r#"{"model":"openai","messages":[]}"#).unwrap();
        assert!(req.conversation_id.is_none());
    }

    #[test]
    fn test_chat_request_rejects_garbage_id() {
        let result = serde_json::from_str::<ChatRequest>(
            r#"{"conversation_id":"not-a-uuid","model":"openai","messages":[]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_omits_missing_error() {
        let outcome = ChatOutcome {
            conversation_id: Uuid::nil(),
            document_id: Uuid::nil(),
            stream_error: None,
            relay_interrupted: false,
            bytes_persisted: 0,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("stream_error").is_none());
    }

    #[test]
    fn test_new_document_is_time_ordered() {
        let conv = Conversation::new("t");
        let a = Document::new(conv.id, MessageRole::User, "a", "openai");
        let b = Document::new(conv.id, MessageRole::Assistant, "", "openai");
        assert!(a.id < b.id);
        assert!(b.content.is_empty());
    }
}
