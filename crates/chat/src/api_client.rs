//! HTTP client for the conversation/message REST API.
//!
//! This is the pull side of the chat core and the fallback path for sends.
//! [`ChatApi`] is the seam the store and send path depend on, so tests can
//! substitute an in-memory backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use joblink_shared::{
    AckResponse, ApiError, ArchiveRequest, Conversation, ConversationFilter,
    ConversationListResponse, Message, MessageHistoryResponse, MessageType, SendMessageRequest,
    SendMessageResponse,
};

/// The REST collaborator endpoints the chat core consumes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// List conversations, optionally filtered to unread or archived threads.
    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>, ApiError>;

    /// Fetch one conversation's full history. The backend marks the fetched
    /// messages as read as a side effect.
    async fn fetch_messages(
        &self,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<Message>), ApiError>;

    /// Send a message over HTTP (the fallback path). `client_ref` is the
    /// idempotency token shared with the transport path.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        message_type: MessageType,
        client_ref: &str,
    ) -> Result<Option<Message>, ApiError>;

    /// Mark a message as read.
    async fn mark_read(&self, message_id: &str) -> Result<(), ApiError>;

    /// Flip a conversation's archived flag.
    async fn set_archived(&self, conversation_id: &str, archived: bool) -> Result<(), ApiError>;
}

/// `reqwest`-backed implementation of [`ChatApi`].
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
        }
    }

    /// Set the base URL for API requests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(resp).await
    }

    async fn post_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(resp).await
    }

    async fn patch_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let resp = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(resp).await
    }

    async fn read_json<TRes: DeserializeOwned>(resp: reqwest::Response) -> Result<TRes, ApiError> {
        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        let path = match filter.query_value() {
            Some(value) => format!("/api/chat/conversations?filter={value}"),
            None => "/api/chat/conversations".to_string(),
        };
        let resp: ConversationListResponse = self.get_json(&path).await?;
        if !resp.success {
            return Err(ApiError::Rejected("conversation list".into()));
        }
        Ok(resp.conversations)
    }

    async fn fetch_messages(
        &self,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<Message>), ApiError> {
        let path = format!("/api/chat/conversations/{conversation_id}/messages");
        let resp: MessageHistoryResponse = self.get_json(&path).await?;
        if !resp.success {
            return Err(ApiError::Rejected(format!(
                "message history for {conversation_id}"
            )));
        }
        Ok((resp.conversation, resp.messages))
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        message_type: MessageType,
        client_ref: &str,
    ) -> Result<Option<Message>, ApiError> {
        let body = SendMessageRequest {
            conversation_id: conversation_id.to_string(),
            message: text.to_string(),
            message_type,
            client_ref: client_ref.to_string(),
        };
        let resp: SendMessageResponse = self.post_json("/api/chat/messages", &body).await?;
        if !resp.success {
            return Err(ApiError::Rejected("send message".into()));
        }
        Ok(resp.message)
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/chat/messages/{message_id}/read");
        let resp: AckResponse = self.post_json(&path, &serde_json::json!({})).await?;
        if !resp.success {
            return Err(ApiError::Rejected(format!("mark read {message_id}")));
        }
        Ok(())
    }

    async fn set_archived(&self, conversation_id: &str, archived: bool) -> Result<(), ApiError> {
        let path = format!("/api/chat/conversations/{conversation_id}/archive");
        let resp: AckResponse = self.patch_json(&path, &ArchiveRequest { archived }).await?;
        if !resp.success {
            return Err(ApiError::Rejected(format!("archive {conversation_id}")));
        }
        Ok(())
    }
}
