//! Frame decoding and listener fan-out.
//!
//! The dispatcher turns raw socket text into [`ChatEvent`]s and notifies
//! listeners synchronously, in registration order. Malformed frames are
//! logged and dropped; they never surface as errors to callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use tracing::warn;

use joblink_shared::{MessageType, ServerFrame};

/// A chat message pushed over the live transport.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub body: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub is_mine: bool,
}

/// Typed events fanned out to message listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(IncomingMessage),
    Typing {
        conversation_id: String,
        user_id: String,
        is_typing: bool,
    },
    UserStatus {
        user_id: String,
        online: bool,
    },
}

type EventListener = Arc<dyn Fn(&ChatEvent) + Send + Sync>;
type VoidListener = Arc<dyn Fn() + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Multicast registry for socket events.
#[derive(Default)]
pub struct FrameDispatcher {
    next_id: AtomicU64,
    message: Mutex<Vec<(u64, EventListener)>>,
    connect: Mutex<Vec<(u64, VoidListener)>>,
    disconnect: Mutex<Vec<(u64, VoidListener)>>,
    error: Mutex<Vec<(u64, ErrorListener)>>,
}

/// Registration guard returned by the `on_*` methods. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the listener, so a subscription
/// cannot outlive the component that owns it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}

impl FrameDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw frame. Returns `None` (with a diagnostic) for anything
    /// that does not match the protocol; a bad frame is never connection-fatal.
    pub fn decode(text: &str) -> Option<ServerFrame> {
        match serde_json::from_str::<ServerFrame>(text) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, frame = text, "dropping malformed frame");
                None
            }
        }
    }

    /// Fan a decoded frame out to listeners.
    pub fn dispatch(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::ChatMessage {
                conversation_id,
                message_id,
                sender_id,
                sender_name,
                sender_avatar,
                message,
                message_type,
                created_at,
                is_mine,
            } => self.notify_message(&ChatEvent::Message(IncomingMessage {
                conversation_id,
                message_id,
                sender_id,
                sender_name,
                sender_avatar,
                body: message,
                message_type,
                created_at,
                is_mine,
            })),
            ServerFrame::TypingIndicator {
                conversation_id,
                user_id,
                is_typing,
            } => self.notify_message(&ChatEvent::Typing {
                conversation_id,
                user_id,
                is_typing,
            }),
            ServerFrame::UserStatus { user_id, online } => {
                self.notify_message(&ChatEvent::UserStatus { user_id, online })
            }
            ServerFrame::Error { message } => {
                for listener in snapshot(&self.error) {
                    listener(&message);
                }
            }
            // The connection manager filters pongs out before dispatch, but a
            // stray one is harmless.
            ServerFrame::Pong => {}
        }
    }

    pub fn on_message(
        self: &Arc<Self>,
        listener: impl Fn(&ChatEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.message.lock().unwrap().push((id, Arc::new(listener)));
        self.removal_guard(id, |d| &d.message)
    }

    pub fn on_connect(
        self: &Arc<Self>,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connect.lock().unwrap().push((id, Arc::new(listener)));
        self.removal_guard(id, |d| &d.connect)
    }

    pub fn on_disconnect(
        self: &Arc<Self>,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.disconnect
            .lock()
            .unwrap()
            .push((id, Arc::new(listener)));
        self.removal_guard(id, |d| &d.disconnect)
    }

    pub fn on_error(
        self: &Arc<Self>,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.error.lock().unwrap().push((id, Arc::new(listener)));
        self.removal_guard(id, |d| &d.error)
    }

    pub(crate) fn notify_connect(&self) {
        for listener in snapshot(&self.connect) {
            listener();
        }
    }

    pub(crate) fn notify_disconnect(&self) {
        for listener in snapshot(&self.disconnect) {
            listener();
        }
    }

    fn notify_message(&self, event: &ChatEvent) {
        for listener in snapshot(&self.message) {
            listener(event);
        }
    }

    fn removal_guard<T: Send + 'static>(
        self: &Arc<Self>,
        id: u64,
        registry: fn(&FrameDispatcher) -> &Mutex<Vec<(u64, T)>>,
    ) -> Subscription {
        let weak: Weak<FrameDispatcher> = Arc::downgrade(self);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(dispatcher) = weak.upgrade() {
                    registry(&dispatcher)
                        .lock()
                        .unwrap()
                        .retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }
}

/// Clone the listener list under the lock, invoke outside it. A callback may
/// register or drop subscriptions on the same registry without deadlocking.
fn snapshot<T: Clone>(registry: &Mutex<Vec<(u64, T)>>) -> Vec<T> {
    registry
        .lock()
        .unwrap()
        .iter()
        .map(|(_, listener)| listener.clone())
        .collect()
}
