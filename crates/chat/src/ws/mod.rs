//! Persistent-connection layer: socket lifecycle and frame dispatch.
//!
//! [`ChatSocket`] owns the single live connection, its reconnect state
//! machine and the heartbeat timer. Every decoded frame except the keep-alive
//! reply is handed to [`FrameDispatcher`], which fans typed events out to
//! registered listeners in registration order.

mod connection;
mod dispatcher;
pub mod transport;

pub use connection::{ChatSocket, ConnectionState, ReconnectConfig};
pub use dispatcher::{ChatEvent, FrameDispatcher, IncomingMessage, Subscription};
pub use transport::{Connector, FrameSink, FrameSource, WsConnector};
