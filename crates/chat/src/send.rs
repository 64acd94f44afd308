//! Outbound send path: live transport first, HTTP fallback second.
//!
//! Correctness over transport purity: the socket may be mid-reconnect at
//! send time, so a rejected or impossible transport write silently degrades
//! to a REST call carrying the same payload. Both paths converge on the same
//! cache-invalidation contract, so the UI sees the sent message regardless
//! of which transport carried it. A REST failure is returned to the caller;
//! no retry loop lives at this layer.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use joblink_shared::{ApiError, ClientFrame, MessageType};

use crate::api_client::ChatApi;
use crate::store::ChatStore;
use crate::ws::ChatSocket;

/// Which transport ultimately carried a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPath {
    Transport,
    Rest,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub path: SendPath,
    /// Server echo of the stored message; only the REST path returns one.
    pub message: Option<joblink_shared::Message>,
}

pub struct MessageSender {
    socket: Arc<ChatSocket>,
    api: Arc<dyn ChatApi>,
    store: Arc<ChatStore>,
}

impl MessageSender {
    pub fn new(socket: Arc<ChatSocket>, api: Arc<dyn ChatApi>, store: Arc<ChatStore>) -> Self {
        Self { socket, api, store }
    }

    /// Deliver a user-composed message exactly once from the caller's
    /// perspective. Both paths carry the same client-generated `client_ref`
    /// so the backend can drop a duplicate if a transport write was accepted
    /// but its acknowledgment lost.
    pub async fn send(
        &self,
        conversation_id: &str,
        text: &str,
        message_type: MessageType,
    ) -> Result<SendOutcome, ApiError> {
        let client_ref = Uuid::new_v4().to_string();

        if self.socket.state().is_connected() {
            let frame = ClientFrame::send(
                conversation_id,
                text,
                message_type,
                Some(client_ref.clone()),
            );
            match self.socket.send_frame(&frame).await {
                Ok(()) => {
                    self.store.note_sent(conversation_id);
                    return Ok(SendOutcome {
                        path: SendPath::Transport,
                        message: None,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "transport send rejected, falling back to http");
                }
            }
        }

        let message = self
            .api
            .send_message(conversation_id, text, message_type, &client_ref)
            .await?;
        self.store.note_sent(conversation_id);
        Ok(SendOutcome {
            path: SendPath::Rest,
            message,
        })
    }

    /// Read receipt: live transport when available, REST otherwise. The
    /// conversation-list cache is invalidated so unread counts refetch.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<(), ApiError> {
        let frame = ClientFrame::mark_read(message_id);
        if self.socket.send_frame(&frame).await.is_err() {
            self.api.mark_read(message_id).await?;
        }
        self.store.invalidate_conversations();
        self.store.invalidate_messages(conversation_id);
        Ok(())
    }
}
