//! Data models for joblink conversations and messages.
//!
//! These mirror the REST API payloads. Field names are the wire names; the
//! backend speaks snake_case JSON throughout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Participants ---

/// The caller's side of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Worker,
}

/// The other party in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub city: Option<String>,
}

// --- Jobs ---

/// Denormalized job fields carried on every conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub completed_by_client: bool,
    #[serde(default)]
    pub completed_by_worker: bool,
}

// --- Conversations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Active,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Denormalized preview of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: String,
}

/// A two-party message thread tied to exactly one job.
///
/// The id is immutable once created; the unread count only ever resets to
/// zero through an explicit mark-read scoped to this conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub job: JobSummary,
    pub participant: Participant,
    pub my_role: Role,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub archived: bool,
    pub status: ThreadStatus,
}

/// Filter for the conversation-list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationFilter {
    All,
    Unread,
    Archived,
}

impl ConversationFilter {
    /// Query-string value understood by the list endpoint. `All` sends none.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            ConversationFilter::All => None,
            ConversationFilter::Unread => Some("unread"),
            ConversationFilter::Archived => Some("archived"),
        }
    }
}

// --- Messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    System,
    Location,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub file_name: String,
    pub size: u64,
    pub mime: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A single message inside a conversation.
///
/// `id` is absent for an optimistic just-sent message that the server has not
/// acknowledged yet. Ordering within a conversation is always `created_at`
/// ascending. Nothing mutates a message locally except its read flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    pub body: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_mine: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

// --- REST envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub success: bool,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHistoryResponse {
    pub success: bool,
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Client-generated idempotency token; lets the backend drop a duplicate
    /// when a transport-accepted send is retried over HTTP.
    pub client_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn conversation_round_trips_with_optional_fields_missing() {
        let json = serde_json::json!({
            "id": "c-42",
            "job": { "id": "j-7", "title": "Fix the sink", "status": "in_progress" },
            "participant": { "id": "u-9", "display_name": "Mara", "role": "WORKER" },
            "my_role": "CLIENT",
            "status": "active"
        });
        let conv: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(conv.id, "c-42");
        assert_eq!(conv.unread_count, 0);
        assert_eq!(conv.last_message, None);
        assert!(!conv.archived);
        assert_eq!(conv.participant.role, Role::Worker);
    }

    #[test]
    fn unknown_thread_status_does_not_fail_decoding() {
        let status: ThreadStatus = serde_json::from_str("\"disputed\"").unwrap();
        assert_eq!(status, ThreadStatus::Unknown);
    }

    #[test]
    fn message_without_id_is_valid() {
        let json = serde_json::json!({
            "conversation_id": "c-42",
            "sender_id": "u-9",
            "sender_name": "Mara",
            "body": "On my way",
            "type": "TEXT",
            "created_at": "2025-03-01T12:00:00Z"
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.id, None);
        assert_eq!(msg.message_type, MessageType::Text);
        assert!(!msg.is_mine);
    }

    #[test]
    fn filter_query_values() {
        assert_eq!(ConversationFilter::All.query_value(), None);
        assert_eq!(ConversationFilter::Unread.query_value(), Some("unread"));
        assert_eq!(ConversationFilter::Archived.query_value(), Some("archived"));
    }
}
