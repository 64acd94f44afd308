//! The injected chat service facade.
//!
//! One `ChatClient` exists per process, owned by whatever owns the UI root
//! and passed down by reference. Construction wires the dispatcher to the
//! read-model store and the typing coordinator, so pushed frames invalidate
//! and merge without any component-level glue.

use std::sync::Arc;

use tokio::sync::watch;

use joblink_shared::{ApiError, Conversation, ConversationFilter, MessageType};

use crate::api_client::{ApiClient, ChatApi};
use crate::config::ChatConfig;
use crate::drafts::DraftCache;
use crate::send::{MessageSender, SendOutcome};
use crate::store::{ChatStore, ConversationHistory};
use crate::typing::TypingCoordinator;
use crate::ws::{
    ChatEvent, ChatSocket, ConnectionState, Connector, FrameDispatcher, Subscription, WsConnector,
};

pub struct ChatClient {
    socket: Arc<ChatSocket>,
    store: Arc<ChatStore>,
    sender: MessageSender,
    typing: Arc<TypingCoordinator>,
    dispatcher: Arc<FrameDispatcher>,
    drafts: DraftCache,
    // keeps the store/typing wiring alive for the client's lifetime
    _push_wiring: Subscription,
}

impl ChatClient {
    /// Production construction: websocket transport plus `reqwest` API.
    pub fn new(config: ChatConfig) -> Self {
        let api = Arc::new(ApiClient::new().with_base_url(config.api_base_url.clone()));
        Self::with_parts(config, Arc::new(WsConnector), api)
    }

    /// Dependency-injected construction; tests and alternative transports
    /// enter here.
    pub fn with_parts(
        config: ChatConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn ChatApi>,
    ) -> Self {
        let dispatcher = Arc::new(FrameDispatcher::new());
        let socket = Arc::new(ChatSocket::new(
            config.ws_url.clone(),
            connector,
            config.reconnect.clone(),
            config.heartbeat_interval,
            dispatcher.clone(),
        ));
        let store = Arc::new(ChatStore::new(api.clone(), config.stale_after));
        let typing = Arc::new(TypingCoordinator::new(
            socket.clone(),
            config.typing_debounce,
            config.typing_expiry,
        ));
        let sender = MessageSender::new(socket.clone(), api, store.clone());

        let push_store = store.clone();
        let push_typing = typing.clone();
        let push_wiring = dispatcher.on_message(move |event| match event {
            ChatEvent::Message(incoming) => push_store.apply_push(incoming),
            ChatEvent::Typing {
                conversation_id,
                user_id,
                is_typing,
            } => push_typing.apply(conversation_id, user_id, *is_typing),
            ChatEvent::UserStatus { .. } => {}
        });

        Self {
            socket,
            store,
            sender,
            typing,
            dispatcher,
            drafts: DraftCache::new(),
            _push_wiring: push_wiring,
        }
    }

    // --- lifecycle ---

    pub async fn connect(&self) {
        self.socket.connect().await;
    }

    /// Explicit teardown on app shutdown or logout.
    pub async fn shutdown(&self) {
        self.socket.disconnect().await;
    }

    /// The application came back to the foreground: reconnect if the socket
    /// is down and mark every cached query stale.
    pub async fn on_app_foreground(&self) {
        self.socket.notify_foreground().await;
        self.store.on_focus();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.socket.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.socket.watch_state()
    }

    // --- queries ---

    pub async fn conversations(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        self.store.conversations(filter).await
    }

    pub async fn messages(&self, conversation_id: &str) -> Result<ConversationHistory, ApiError> {
        self.store.messages(conversation_id).await
    }

    // --- actions ---

    pub async fn send(
        &self,
        conversation_id: &str,
        text: &str,
        message_type: MessageType,
    ) -> Result<SendOutcome, ApiError> {
        let outcome = self.sender.send(conversation_id, text, message_type).await?;
        self.drafts.clear(conversation_id);
        Ok(outcome)
    }

    pub async fn mark_read(&self, conversation_id: &str, message_id: &str) -> Result<(), ApiError> {
        self.sender.mark_read(conversation_id, message_id).await
    }

    pub async fn set_archived(
        &self,
        conversation_id: &str,
        archived: bool,
    ) -> Result<(), ApiError> {
        self.store.set_archived(conversation_id, archived).await
    }

    pub async fn send_typing(&self, conversation_id: &str) {
        self.typing.send_typing(conversation_id).await;
    }

    pub fn typing_user(&self, conversation_id: &str) -> Option<String> {
        self.typing.typing_user(conversation_id)
    }

    pub fn drafts(&self) -> &DraftCache {
        &self.drafts
    }

    // --- event subscriptions (UI layer) ---

    pub fn on_message(
        &self,
        listener: impl Fn(&ChatEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatcher.on_message(listener)
    }

    pub fn on_connect(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.dispatcher.on_connect(listener)
    }

    pub fn on_disconnect(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.dispatcher.on_disconnect(listener)
    }

    pub fn on_error(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> Subscription {
        self.dispatcher.on_error(listener)
    }
}
