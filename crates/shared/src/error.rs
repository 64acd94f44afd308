//! Error types shared between the chat core and anything that consumes it.

use thiserror::Error;

/// Client-side error for REST calls against the chat API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The server answered 200 but with `success: false` in the envelope.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Errors raised by the persistent chat transport.
///
/// These never escape the connection manager's state machine except through
/// [`TransportError::NotConnected`], which the send path uses to decide when
/// to fall back to HTTP.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("socket i/o error: {0}")]
    Io(String),

    #[error("not connected")]
    NotConnected,

    #[error("frame serialization failed: {0}")]
    Serialize(String),
}
