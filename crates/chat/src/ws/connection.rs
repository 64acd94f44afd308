//! Socket lifecycle: connect/disconnect state machine, exponential backoff
//! reconnection, and the keep-alive heartbeat.
//!
//! Exactly one live transport exists at a time. The generation counter in
//! [`Lifecycle`] orphans read loops and heartbeat timers that belong to an
//! older connection, so a reconnect can never double them up.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use joblink_shared::{ClientFrame, ServerFrame, TransportError};

use super::dispatcher::FrameDispatcher;
use super::transport::{Connector, FrameSink, FrameSource};

/// Observable connection state. Owned by [`ChatSocket`]; everything else
/// reads it through [`ChatSocket::state`] or a watch subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Retry budget exhausted. Behaves as disconnected; only an explicit
    /// trigger (manual connect, foreground signal) leaves this state.
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }

    pub fn is_down(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed { .. }
        )
    }
}

/// Backoff policy for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Automatic attempts before giving up until an explicit trigger.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each consecutive failure.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// The single persistent connection to the chat endpoint.
pub struct ChatSocket {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    connector: Arc<dyn Connector>,
    config: ReconnectConfig,
    heartbeat_interval: Duration,
    dispatcher: Arc<FrameDispatcher>,
    state_tx: watch::Sender<ConnectionState>,
    lifecycle: Mutex<Lifecycle>,
    writer: tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
}

#[derive(Default)]
struct Lifecycle {
    attempt: u32,
    deliberate: bool,
    generation: u64,
    heartbeat: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl ChatSocket {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        config: ReconnectConfig,
        heartbeat_interval: Duration,
        dispatcher: Arc<FrameDispatcher>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                connector,
                config,
                heartbeat_interval,
                dispatcher,
                state_tx,
                lifecycle: Mutex::new(Lifecycle::default()),
                writer: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to state transitions instead of polling.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Open the connection. Idempotent: a call while connecting, reconnecting
    /// or connected returns immediately with no side effects.
    pub async fn connect(&self) {
        {
            let mut lc = self.inner.lifecycle.lock().unwrap();
            let state = self.inner.state_tx.borrow().clone();
            if state.is_connected() || state.is_connecting() {
                trace!(?state, "connect ignored");
                return;
            }
            lc.deliberate = false;
            lc.attempt = 0;
            self.inner.state_tx.send_replace(ConnectionState::Connecting);
        }
        Inner::connect_once(self.inner.clone()).await;
    }

    /// Deliberate close: stops the heartbeat, cancels any pending reconnect
    /// and saturates the attempt counter so no automatic reconnect follows.
    pub async fn disconnect(&self) {
        let was_connected;
        {
            let mut lc = self.inner.lifecycle.lock().unwrap();
            lc.deliberate = true;
            lc.attempt = self.inner.config.max_attempts;
            lc.generation += 1;
            if let Some(hb) = lc.heartbeat.take() {
                hb.abort();
            }
            if let Some(timer) = lc.reconnect_timer.take() {
                timer.abort();
            }
            was_connected = self
                .inner
                .state_tx
                .send_replace(ConnectionState::Disconnected)
                .is_connected();
        }
        if let Some(mut sink) = self.inner.writer.lock().await.take() {
            sink.close().await;
        }
        if was_connected {
            self.inner.dispatcher.notify_disconnect();
        }
        info!("chat socket closed deliberately");
    }

    /// Host visibility signal: reconnect if the socket is down. This is the
    /// recovery path after the retry budget was spent or the process slept.
    pub async fn notify_foreground(&self) {
        if self.state().is_down() {
            debug!("foregrounded while down, reconnecting");
            self.connect().await;
        }
    }

    /// Write one frame over the live transport. Fails fast with
    /// [`TransportError::NotConnected`] so the caller can fall back to HTTP.
    pub async fn send_frame(&self, frame: &ClientFrame) -> Result<(), TransportError> {
        if !self.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        Inner::write_frame(&self.inner, frame).await
    }
}

impl Inner {
    async fn connect_once(inner: Arc<Inner>) {
        match inner.connector.connect(&inner.url).await {
            Ok((sink, source)) => {
                let generation = {
                    let mut lc = inner.lifecycle.lock().unwrap();
                    // disconnect() raced the handshake; drop the new socket
                    if lc.deliberate {
                        return;
                    }
                    lc.attempt = 0;
                    lc.generation += 1;
                    lc.generation
                };
                *inner.writer.lock().await = Some(sink);
                inner.state_tx.send_replace(ConnectionState::Connected);
                info!(url = %inner.url, "chat socket connected");
                Inner::start_heartbeat(inner.clone(), generation);
                tokio::spawn(Inner::read_loop(inner.clone(), source, generation));
                inner.dispatcher.notify_connect();
            }
            Err(e) => {
                warn!(error = %e, url = %inner.url, "chat socket connect failed");
                Inner::schedule_reconnect(inner, e.to_string());
            }
        }
    }

    async fn read_loop(inner: Arc<Inner>, mut source: Box<dyn FrameSource>, generation: u64) {
        loop {
            match source.next_frame().await {
                Some(Ok(text)) => match FrameDispatcher::decode(&text) {
                    // keep-alive replies stop here, everything else is payload
                    Some(ServerFrame::Pong) => trace!("keep-alive reply"),
                    Some(frame) => inner.dispatcher.dispatch(frame),
                    None => {}
                },
                Some(Err(e)) => {
                    warn!(error = %e, "chat socket read error");
                    break;
                }
                None => {
                    debug!("chat socket closed by peer");
                    break;
                }
            }
        }
        Inner::connection_lost(inner, generation).await;
    }

    async fn connection_lost(inner: Arc<Inner>, generation: u64) {
        let deliberate;
        {
            let mut lc = inner.lifecycle.lock().unwrap();
            // a newer connection owns the socket now
            if lc.generation != generation {
                return;
            }
            if let Some(hb) = lc.heartbeat.take() {
                hb.abort();
            }
            deliberate = lc.deliberate;
        }
        inner.writer.lock().await.take();
        let was_connected = inner
            .state_tx
            .send_replace(ConnectionState::Disconnected)
            .is_connected();
        if was_connected {
            inner.dispatcher.notify_disconnect();
        }
        if !deliberate {
            Inner::schedule_reconnect(inner, "connection closed".to_string());
        }
    }

    fn schedule_reconnect(inner: Arc<Inner>, reason: String) {
        let mut lc = inner.lifecycle.lock().unwrap();
        if lc.deliberate {
            return;
        }
        if lc.attempt >= inner.config.max_attempts {
            warn!(
                attempts = lc.attempt,
                "retry budget exhausted, waiting for an explicit trigger"
            );
            inner
                .state_tx
                .send_replace(ConnectionState::Failed { reason });
            return;
        }
        let delay = inner.config.delay_for_attempt(lc.attempt);
        lc.attempt += 1;
        let attempt = lc.attempt;
        inner
            .state_tx
            .send_replace(ConnectionState::Reconnecting { attempt });
        debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let task_inner = inner.clone();
        lc.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let lc = task_inner.lifecycle.lock().unwrap();
                if lc.deliberate {
                    return;
                }
            }
            Inner::connect_once(task_inner).await;
        }));
    }

    fn start_heartbeat(inner: Arc<Inner>, generation: u64) {
        let task_inner = inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(task_inner.heartbeat_interval);
            // the first tick of a tokio interval fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                {
                    let lc = task_inner.lifecycle.lock().unwrap();
                    if lc.generation != generation {
                        return;
                    }
                }
                if Inner::write_frame(&task_inner, &ClientFrame::ping())
                    .await
                    .is_err()
                {
                    // the read loop notices the dead socket and reconnects
                    return;
                }
                trace!("heartbeat ping sent");
            }
        });
        let mut lc = inner.lifecycle.lock().unwrap();
        if lc.generation == generation {
            if let Some(old) = lc.heartbeat.replace(handle) {
                old.abort();
            }
        } else {
            handle.abort();
        }
    }

    async fn write_frame(inner: &Inner, frame: &ClientFrame) -> Result<(), TransportError> {
        let text =
            serde_json::to_string(frame).map_err(|e| TransportError::Serialize(e.to_string()))?;
        let mut guard = inner.writer.lock().await;
        match guard.as_mut() {
            Some(sink) => sink.send(text).await,
            None => Err(TransportError::NotConnected),
        }
    }
}
