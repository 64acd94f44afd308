//! Chat client configuration.

use std::time::Duration;

use crate::ws::ReconnectConfig;

/// Tunables for the chat core. `new` gives the production defaults; tests
/// and staging builds override individual fields.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// ws:// or wss:// endpoint for the persistent connection.
    pub ws_url: String,
    /// Base URL for the REST collaborator endpoints.
    pub api_base_url: String,
    /// Reconnect backoff policy for the socket.
    pub reconnect: ReconnectConfig,
    /// Keep-alive ping cadence while connected.
    pub heartbeat_interval: Duration,
    /// Freshness window after which cached queries refetch on read.
    pub stale_after: Duration,
    /// Minimum gap between outgoing typing signals per conversation.
    pub typing_debounce: Duration,
    /// How long a received typing signal stays live without renewal.
    pub typing_expiry: Duration,
}

impl ChatConfig {
    pub fn new(ws_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_base_url: api_base_url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat_interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(30),
            typing_debounce: Duration::from_secs(2),
            typing_expiry: Duration::from_secs(5),
        }
    }

    /// Read endpoints from the environment.
    ///
    /// - `JOBLINK_WS_URL` (default: `ws://localhost:8080/ws/chat`)
    /// - `JOBLINK_API_URL` (default: `http://localhost:8080`)
    pub fn from_env() -> Self {
        let ws_url = std::env::var("JOBLINK_WS_URL")
            .unwrap_or_else(|_| "ws://localhost:8080/ws/chat".to_string());
        let api_url = std::env::var("JOBLINK_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        Self::new(ws_url, api_url)
    }
}
