//! Real-time chat core for the joblink marketplace client.
//!
//! This crate owns everything between the UI layer and the chat backend:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      ChatClient                      │
//! │        (injected facade owned by the UI root)        │
//! └──────────────────────────────────────────────────────┘
//!        │ send / queries            │ lifecycle
//!        ▼                           ▼
//! ┌─────────────┐   fallback   ┌────────────┐
//! │MessageSender│─────────────▶│ ApiClient  │──▶ REST backend
//! └─────────────┘              └────────────┘
//!        │ transport first            ▲
//!        ▼                            │ refetch on invalidation
//! ┌─────────────┐   frames    ┌──────────────┐
//! │ ChatSocket  │────────────▶│FrameDispatch.│──▶ listeners
//! │ (reconnect, │             └──────────────┘
//! │  heartbeat) │                    │ push events
//! └─────────────┘                    ▼
//!        ▲                    ┌────────────┐
//!   ws endpoint               │ ChatStore  │──▶ UI reads
//!                             └────────────┘
//! ```
//!
//! Components read conversation and message state from [`store::ChatStore`];
//! cache invalidation is the only synchronization between pushed frames and
//! HTTP refetches. The socket is owned exclusively by [`ws::ChatSocket`];
//! nothing else opens, closes, or reassigns it.

pub mod api_client;
pub mod client;
pub mod config;
pub mod drafts;
pub mod logging;
pub mod send;
pub mod store;
pub mod typing;
pub mod ws;

pub use api_client::{ApiClient, ChatApi};
pub use client::ChatClient;
pub use config::ChatConfig;
pub use drafts::DraftCache;
pub use send::{MessageSender, SendOutcome, SendPath};
pub use store::{ChatStore, ConversationHistory};
pub use typing::TypingCoordinator;
pub use ws::{
    ChatEvent, ChatSocket, ConnectionState, FrameDispatcher, IncomingMessage, ReconnectConfig,
    Subscription,
};
