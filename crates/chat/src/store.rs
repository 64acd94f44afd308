//! Read-model bridge: cached conversation-list and message-history queries.
//!
//! The store is the single source of truth the UI reads from. It serves
//! cached values while they are fresh and refetches over HTTP once a scope is
//! invalidated or its freshness window lapses. Invalidation is the only
//! synchronization between pushed frames and HTTP refetches; the one
//! exception is that a pushed message is merged into an already-cached
//! history (ordered by timestamp, deduplicated) so the view is correct in
//! the gap before the next refetch lands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use joblink_shared::{ApiError, Conversation, ConversationFilter, Message};

use crate::api_client::ChatApi;
use crate::ws::IncomingMessage;

/// One conversation's metadata plus its ordered message list.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationHistory {
    pub conversation: Conversation,
    /// Sorted by `created_at` ascending.
    pub messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(conversation: Conversation, mut messages: Vec<Message>) -> Self {
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self {
            conversation,
            messages,
        }
    }

    /// Insert a message keeping timestamp order. Returns `false` for a
    /// duplicate. Messages without a server id yet are matched on
    /// (sender, timestamp, body).
    pub fn insert(&mut self, msg: Message) -> bool {
        let duplicate = self.messages.iter().any(|m| match (&m.id, &msg.id) {
            (Some(a), Some(b)) => a == b,
            _ => {
                m.created_at == msg.created_at
                    && m.sender_id == msg.sender_id
                    && m.body == msg.body
            }
        });
        if duplicate {
            return false;
        }

        let pos = self
            .messages
            .binary_search_by(|m| m.created_at.cmp(&msg.created_at))
            .unwrap_or_else(|pos| pos);
        self.messages.insert(pos, msg);
        true
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
    stale: bool,
}

impl<T> CacheEntry<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
            stale: false,
        }
    }

    fn is_fresh(&self, window: Duration) -> bool {
        !self.stale && self.fetched_at.elapsed() < window
    }
}

/// Query-and-cache layer over [`ChatApi`].
pub struct ChatStore {
    api: Arc<dyn ChatApi>,
    stale_after: Duration,
    conversations: Mutex<HashMap<ConversationFilter, CacheEntry<Vec<Conversation>>>>,
    histories: Mutex<HashMap<String, CacheEntry<ConversationHistory>>>,
}

impl ChatStore {
    pub fn new(api: Arc<dyn ChatApi>, stale_after: Duration) -> Self {
        Self {
            api,
            stale_after,
            conversations: Mutex::new(HashMap::new()),
            histories: Mutex::new(HashMap::new()),
        }
    }

    /// Conversation list for a filter. Serves the cache while fresh.
    pub async fn conversations(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        if let Some(entry) = self.conversations.lock().unwrap().get(&filter) {
            if entry.is_fresh(self.stale_after) {
                return Ok(entry.value.clone());
            }
        }

        let fetched = self.api.list_conversations(filter).await?;
        self.conversations
            .lock()
            .unwrap()
            .insert(filter, CacheEntry::fresh(fetched.clone()));
        Ok(fetched)
    }

    /// Message history for one conversation. A refetch marks the messages as
    /// read on the backend, so the conversation-list cache is invalidated
    /// alongside. Live-pushed messages the refetch raced past are kept.
    pub async fn messages(&self, conversation_id: &str) -> Result<ConversationHistory, ApiError> {
        let previous = {
            let histories = self.histories.lock().unwrap();
            match histories.get(conversation_id) {
                Some(entry) if entry.is_fresh(self.stale_after) => {
                    return Ok(entry.value.clone());
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        let (conversation, messages) = self.api.fetch_messages(conversation_id).await?;
        let mut history = ConversationHistory::new(conversation, messages);
        if let Some(previous) = previous {
            for msg in previous.messages {
                history.insert(msg);
            }
        }

        self.histories
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), CacheEntry::fresh(history.clone()));
        // the backend reset the unread count as a side effect of this fetch
        self.invalidate_conversations();
        Ok(history)
    }

    /// Fold a live-pushed message into the read model.
    pub fn apply_push(&self, incoming: &IncomingMessage) {
        {
            let mut histories = self.histories.lock().unwrap();
            if let Some(entry) = histories.get_mut(&incoming.conversation_id) {
                entry.value.insert(to_message(incoming));
                entry.stale = true;
            }
        }
        // every inbound message moves a conversation's preview and unread count
        self.invalidate_conversations();
        debug!(conversation = %incoming.conversation_id, "push applied to read model");
    }

    /// A send completed on either path; both affected scopes must refetch.
    pub fn note_sent(&self, conversation_id: &str) {
        self.invalidate_conversations();
        self.invalidate_messages(conversation_id);
    }

    pub fn invalidate_conversations(&self) {
        for entry in self.conversations.lock().unwrap().values_mut() {
            entry.stale = true;
        }
    }

    pub fn invalidate_messages(&self, conversation_id: &str) {
        if let Some(entry) = self.histories.lock().unwrap().get_mut(conversation_id) {
            entry.stale = true;
        }
    }

    /// Window/app refocus: everything refetches on next read.
    pub fn on_focus(&self) {
        self.invalidate_conversations();
        for entry in self.histories.lock().unwrap().values_mut() {
            entry.stale = true;
        }
    }

    /// Flip the archived flag server-side and invalidate the list cache.
    pub async fn set_archived(
        &self,
        conversation_id: &str,
        archived: bool,
    ) -> Result<(), ApiError> {
        self.api.set_archived(conversation_id, archived).await?;
        self.invalidate_conversations();
        Ok(())
    }
}

fn to_message(incoming: &IncomingMessage) -> Message {
    Message {
        id: incoming.message_id.clone(),
        conversation_id: incoming.conversation_id.clone(),
        sender_id: incoming.sender_id.clone(),
        sender_name: incoming.sender_name.clone(),
        sender_avatar: incoming.sender_avatar.clone(),
        body: incoming.body.clone(),
        message_type: incoming.message_type,
        read: incoming.is_mine,
        created_at: incoming.created_at,
        is_mine: incoming.is_mine,
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::mock::{conversation, message, MockApi};
    use joblink_shared::MessageType;
    use pretty_assertions::assert_eq;

    fn incoming(conversation_id: &str, id: &str, offset_secs: i64, body: &str) -> IncomingMessage {
        let msg = message(conversation_id, id, offset_secs, body, "u-other");
        IncomingMessage {
            conversation_id: msg.conversation_id,
            message_id: msg.id,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            sender_avatar: None,
            body: msg.body,
            message_type: MessageType::Text,
            created_at: msg.created_at,
            is_mine: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_list_is_served_from_cache_while_fresh() {
        let api = MockApi::with_conversations(vec![conversation("c-1")]);
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        store.conversations(ConversationFilter::All).await.unwrap();
        store.conversations(ConversationFilter::All).await.unwrap();
        assert_eq!(api.list_calls(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        store.conversations(ConversationFilter::All).await.unwrap();
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_forces_a_refetch() {
        let api = MockApi::with_conversations(vec![conversation("c-1")]);
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        store.conversations(ConversationFilter::All).await.unwrap();
        store.invalidate_conversations();
        store.conversations(ConversationFilter::All).await.unwrap();
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn note_sent_invalidates_both_scopes() {
        let api = MockApi::with_history(
            conversation("c-1"),
            vec![message("c-1", "m-1", 0, "hey", "u-other")],
        );
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        store.conversations(ConversationFilter::All).await.unwrap();
        store.messages("c-1").await.unwrap();
        let lists_before = api.list_calls();
        let histories_before = api.history_calls();

        store.note_sent("c-1");
        store.conversations(ConversationFilter::All).await.unwrap();
        store.messages("c-1").await.unwrap();

        assert_eq!(api.list_calls(), lists_before + 1);
        assert_eq!(api.history_calls(), histories_before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn history_fetch_invalidates_the_conversation_list() {
        let api = MockApi::with_history(conversation("c-1"), Vec::new());
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        store.conversations(ConversationFilter::All).await.unwrap();
        // the fetch marks messages read server-side, so unread counts moved
        store.messages("c-1").await.unwrap();
        store.conversations(ConversationFilter::All).await.unwrap();
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pushed_message_merges_in_timestamp_order_without_duplicates() {
        let api = MockApi::with_history(
            conversation("c-1"),
            vec![
                message("c-1", "m-1", 0, "one", "u-other"),
                message("c-1", "m-2", 10, "two", "u-other"),
                message("c-1", "m-3", 20, "three", "u-other"),
            ],
        );
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));
        store.messages("c-1").await.unwrap();

        store.apply_push(&incoming("c-1", "m-4", 30, "four"));

        // the refetch now also includes m-4; the merge must not duplicate it
        api.set_history(
            conversation("c-1"),
            vec![
                message("c-1", "m-1", 0, "one", "u-other"),
                message("c-1", "m-2", 10, "two", "u-other"),
                message("c-1", "m-3", 20, "three", "u-other"),
                message("c-1", "m-4", 30, "four", "u-other"),
            ],
        );
        let history = store.messages("c-1").await.unwrap();
        let ids: Vec<_> = history
            .messages
            .iter()
            .map(|m| m.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["m-1", "m-2", "m-3", "m-4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_keeps_a_pushed_message_the_backend_raced_past() {
        let api = MockApi::with_history(
            conversation("c-1"),
            vec![message("c-1", "m-1", 0, "one", "u-other")],
        );
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));
        store.messages("c-1").await.unwrap();

        // push arrives, but the backend's history response does not include
        // it yet
        store.apply_push(&incoming("c-1", "m-2", 10, "two"));
        let history = store.messages("c-1").await.unwrap();
        let ids: Vec<_> = history
            .messages
            .iter()
            .map(|m| m.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["m-1", "m-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn list_failure_does_not_poison_history_queries() {
        let api = MockApi::with_history(conversation("c-1"), Vec::new());
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        api.fail_lists(true);
        assert!(store.conversations(ConversationFilter::All).await.is_err());
        assert!(store.messages("c-1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn archive_toggle_invalidates_the_list() {
        let api = MockApi::with_conversations(vec![conversation("c-1")]);
        let store = ChatStore::new(api.clone(), Duration::from_secs(30));

        store.conversations(ConversationFilter::All).await.unwrap();
        store.set_archived("c-1", true).await.unwrap();
        store.conversations(ConversationFilter::All).await.unwrap();

        assert_eq!(api.archive_calls(), vec![("c-1".to_string(), true)]);
        assert_eq!(api.list_calls(), 2);
    }

    #[test]
    fn insert_orders_by_timestamp() {
        let mut history = ConversationHistory::new(conversation("c-1"), Vec::new());
        history.insert(message("c-1", "m-2", 10, "two", "u-1"));
        history.insert(message("c-1", "m-1", 0, "one", "u-1"));
        history.insert(message("c-1", "m-3", 20, "three", "u-1"));

        let ids: Vec<_> = history.messages.iter().map(|m| m.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["m-1", "m-2", "m-3"]);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut history = ConversationHistory::new(conversation("c-1"), Vec::new());
        assert!(history.insert(message("c-1", "m-1", 0, "one", "u-1")));
        assert!(!history.insert(message("c-1", "m-1", 0, "one", "u-1")));
        assert_eq!(history.messages.len(), 1);
    }
}
