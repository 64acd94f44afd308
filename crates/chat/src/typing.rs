//! Typing indicator coordinator: debounced sender, auto-expiring receiver.
//!
//! Typing state is ephemeral, keyed by conversation, and never persisted.
//! Outgoing signals are throttled to one per debounce window per
//! conversation; incoming signals expire after a fixed interval unless
//! renewed, with each renewal restarting the timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use joblink_shared::ClientFrame;

use crate::ws::ChatSocket;

struct TypingState {
    user_id: String,
    token: u64,
    timer: JoinHandle<()>,
}

pub struct TypingCoordinator {
    socket: Arc<ChatSocket>,
    debounce: Duration,
    expiry: Duration,
    next_token: AtomicU64,
    last_sent: Mutex<HashMap<String, Instant>>,
    active: Arc<Mutex<HashMap<String, TypingState>>>,
}

impl TypingCoordinator {
    pub fn new(socket: Arc<ChatSocket>, debounce: Duration, expiry: Duration) -> Self {
        Self {
            socket,
            debounce,
            expiry,
            next_token: AtomicU64::new(0),
            last_sent: Mutex::new(HashMap::new()),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Signal that the local user is composing in a conversation. Calls
    /// inside the debounce window are silently dropped, as are signals while
    /// the socket is down; typing is strictly best-effort.
    pub async fn send_typing(&self, conversation_id: &str) {
        {
            let mut last_sent = self.last_sent.lock().unwrap();
            if let Some(at) = last_sent.get(conversation_id) {
                if at.elapsed() < self.debounce {
                    return;
                }
            }
            last_sent.insert(conversation_id.to_string(), Instant::now());
        }
        let frame = ClientFrame::typing(conversation_id, true);
        if self.socket.send_frame(&frame).await.is_err() {
            trace!(conversation = conversation_id, "typing signal dropped while down");
        }
    }

    /// Apply a received typing indicator. A `true` signal (re)starts the
    /// expiry timer for the conversation; `false` clears it immediately.
    pub fn apply(&self, conversation_id: &str, user_id: &str, is_typing: bool) {
        let mut active = self.active.lock().unwrap();
        if let Some(old) = active.remove(conversation_id) {
            old.timer.abort();
        }
        if !is_typing {
            return;
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let expiry = self.expiry;
        let map = self.active.clone();
        let key = conversation_id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            let mut map = map.lock().unwrap();
            // only clear if no renewal replaced this entry in the meantime
            if map.get(&key).is_some_and(|state| state.token == token) {
                map.remove(&key);
            }
        });
        active.insert(
            conversation_id.to_string(),
            TypingState {
                user_id: user_id.to_string(),
                token,
                timer,
            },
        );
    }

    /// Who is currently typing in a conversation, if anyone.
    pub fn typing_user(&self, conversation_id: &str) -> Option<String> {
        self.active
            .lock()
            .unwrap()
            .get(conversation_id)
            .map(|state| state.user_id.clone())
    }
}
