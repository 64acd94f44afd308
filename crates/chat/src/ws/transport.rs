//! Transport seam between the connection manager and the socket library.
//!
//! The manager only needs three things from a transport: connect to a URL,
//! write text frames, and read text frames until the peer goes away. Keeping
//! that behind a trait lets tests drive the state machine with an in-memory
//! transport instead of a live server.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use joblink_shared::TransportError;

/// Write half of an established transport.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;
    /// Best-effort close notification to the peer.
    async fn close(&mut self);
}

/// Read half of an established transport.
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame. `None` means the peer closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;
}

/// Opens transports on behalf of the connection manager.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production connector backed by `tokio-tungstenite`. Supports `ws://` and
/// `wss://` URLs; TLS is negotiated by the library.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, source) = stream.split();
        Ok((Box::new(WsSink { sink }), Box::new(WsSource { source })))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
    }
}

struct WsSource {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.source.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return None,
                // Ping/pong at the websocket level is handled by tungstenite;
                // binary frames are not part of the chat protocol.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }
}

/// In-memory transport used by the state-machine tests.
#[cfg(test)]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use joblink_shared::TransportError;

    use super::{Connector, FrameSink, FrameSource};

    /// Scriptable connector: each `connect` pops the next planned outcome
    /// (`true` = accept); an empty plan accepts everything.
    pub struct MockConnector {
        plan: Mutex<VecDeque<bool>>,
        connects: AtomicU32,
        sent: Arc<Mutex<Vec<String>>>,
        current: Mutex<Option<mpsc::UnboundedSender<Result<String, TransportError>>>>,
    }

    impl MockConnector {
        pub fn accepting() -> Arc<Self> {
            Self::with_plan(Vec::new())
        }

        pub fn with_plan(plan: Vec<bool>) -> Arc<Self> {
            Arc::new(Self {
                plan: Mutex::new(plan.into()),
                connects: AtomicU32::new(0),
                sent: Arc::new(Mutex::new(Vec::new())),
                current: Mutex::new(None),
            })
        }

        pub fn connect_count(&self) -> u32 {
            self.connects.load(Ordering::SeqCst)
        }

        pub fn sent_frames(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        /// Deliver an inbound frame on the latest connection.
        pub fn push_frame(&self, text: &str) {
            if let Some(tx) = self.current.lock().unwrap().as_ref() {
                let _ = tx.send(Ok(text.to_string()));
            }
        }

        /// Simulate the peer dropping the latest connection.
        pub fn drop_connection(&self) {
            self.current.lock().unwrap().take();
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            _url: &str,
        ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let accept = self.plan.lock().unwrap().pop_front().unwrap_or(true);
            if !accept {
                return Err(TransportError::Connect("connection refused".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            *self.current.lock().unwrap() = Some(tx);
            Ok((
                Box::new(MockSink {
                    sent: self.sent.clone(),
                }),
                Box::new(MockSource { rx }),
            ))
        }
    }

    struct MockSink {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl FrameSink for MockSink {
        async fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    struct MockSource {
        rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    }

    #[async_trait]
    impl FrameSource for MockSource {
        async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
            self.rx.recv().await
        }
    }
}
