//! Wire frames exchanged over the persistent chat socket.
//!
//! Inbound frames are JSON objects discriminated by a `type` field. Outbound
//! frames are heterogeneous on the wire: sends are bare objects, typing and
//! mark-read signals carry an `action` discriminant, and the heartbeat reuses
//! the `type` discriminant. The [`ClientFrame`] constructors pin those shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageType;

/// A frame pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ChatMessage {
        conversation_id: String,
        #[serde(default)]
        message_id: Option<String>,
        sender_id: String,
        sender_name: String,
        #[serde(default)]
        sender_avatar: Option<String>,
        message: String,
        message_type: MessageType,
        created_at: DateTime<Utc>,
        #[serde(default)]
        is_mine: bool,
    },
    TypingIndicator {
        conversation_id: String,
        user_id: String,
        is_typing: bool,
    },
    UserStatus {
        user_id: String,
        online: bool,
    },
    Error {
        message: String,
    },
    /// Keep-alive reply; swallowed by the connection manager.
    Pong,
}

/// A frame written by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Send(SendFrame),
    Typing(TypingFrame),
    MarkRead(MarkReadFrame),
    Ping(PingFrame),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendFrame {
    pub conversation_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingFrame {
    pub action: &'static str,
    pub conversation_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkReadFrame {
    pub action: &'static str,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
}

impl ClientFrame {
    pub fn send(
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        message_type: MessageType,
        client_ref: Option<String>,
    ) -> Self {
        ClientFrame::Send(SendFrame {
            conversation_id: conversation_id.into(),
            message: message.into(),
            message_type,
            client_ref,
        })
    }

    pub fn typing(conversation_id: impl Into<String>, is_typing: bool) -> Self {
        ClientFrame::Typing(TypingFrame {
            action: "typing",
            conversation_id: conversation_id.into(),
            is_typing,
        })
    }

    pub fn mark_read(message_id: impl Into<String>) -> Self {
        ClientFrame::MarkRead(MarkReadFrame {
            action: "mark_read",
            message_id: message_id.into(),
        })
    }

    pub fn ping() -> Self {
        ClientFrame::Ping(PingFrame { frame_type: "ping" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn send_frame_wire_shape() {
        let frame = ClientFrame::send("c-42", "hello", MessageType::Text, None);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({ "conversation_id": "c-42", "message": "hello", "type": "TEXT" })
        );
    }

    #[test]
    fn send_frame_carries_client_ref_when_present() {
        let frame = ClientFrame::send("c-42", "hello", MessageType::Text, Some("ref-1".into()));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["client_ref"], json!("ref-1"));
    }

    #[test]
    fn typing_and_mark_read_use_action_discriminant() {
        let typing = serde_json::to_value(ClientFrame::typing("c-42", true)).unwrap();
        assert_eq!(
            typing,
            json!({ "action": "typing", "conversation_id": "c-42", "is_typing": true })
        );

        let mark = serde_json::to_value(ClientFrame::mark_read("m-3")).unwrap();
        assert_eq!(mark, json!({ "action": "mark_read", "message_id": "m-3" }));
    }

    #[test]
    fn ping_uses_type_discriminant() {
        let ping = serde_json::to_value(ClientFrame::ping()).unwrap();
        assert_eq!(ping, json!({ "type": "ping" }));
    }

    #[test]
    fn inbound_chat_message_decodes() {
        let raw = json!({
            "type": "chat_message",
            "conversation_id": "c-42",
            "sender_id": "u-9",
            "sender_name": "Mara",
            "message": "On my way",
            "message_type": "TEXT",
            "created_at": "2025-03-01T12:00:00Z"
        });
        let frame: ServerFrame = serde_json::from_value(raw).unwrap();
        match frame {
            ServerFrame::ChatMessage {
                conversation_id,
                message,
                is_mine,
                ..
            } => {
                assert_eq!(conversation_id, "c-42");
                assert_eq!(message, "On my way");
                assert!(!is_mine);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn inbound_pong_decodes() {
        let frame: ServerFrame = serde_json::from_str("{\"type\":\"pong\"}").unwrap();
        assert_eq!(frame, ServerFrame::Pong);
    }

    #[test]
    fn unrecognized_frame_type_is_an_error() {
        let res = serde_json::from_str::<ServerFrame>("{\"type\":\"presence_blast\"}");
        assert!(res.is_err());
    }
}
