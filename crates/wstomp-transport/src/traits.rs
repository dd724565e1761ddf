//! Transport abstraction traits for wstomp.
//!
//! These traits define the interface that all transport implementations must
//! provide, allowing the client session to be transport-agnostic.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Close code for a normal, client-initiated closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The connection could not be established.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// A lifecycle or data event reported by a transport.
///
/// Events for one connection are delivered strictly in arrival order.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is ready for frames.
    Opened,
    /// A text message arrived.
    Text(String),
    /// The peer closed the connection, or the stream ended.
    Closed {
        /// Close code reported by the peer.
        code: u16,
        /// Close reason reported by the peer.
        reason: String,
    },
    /// The connection failed.
    Failed(TransportError),
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::Opened => write!(f, "opened"),
            TransportEvent::Text(text) => write!(f, "text ({} bytes)", text.len()),
            TransportEvent::Closed { code, reason } => write!(f, "closed ({code}: {reason})"),
            TransportEvent::Failed(e) => write!(f, "failed ({e})"),
        }
    }
}

/// Receiving side of a connection.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending side of a connection.
///
/// Calls hand the data to the transport and return immediately; they never
/// wait for the bytes to reach the network.
pub trait Outbound: Send + Sync {
    /// Queue a text message.
    fn send_text(&self, text: String) -> Result<(), TransportError>;

    /// Close the connection with the given code and reason.
    ///
    /// Closing an already closed connection is a no-op.
    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError>;

    /// Check if the connection is still open for sending.
    fn is_open(&self) -> bool;
}

/// An open connection: the outbound handle plus its event stream.
pub struct Connection {
    /// Handle used to send text and close the connection.
    pub outbound: Box<dyn Outbound>,
    /// Inbound events, in arrival order.
    pub events: EventStream,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.outbound.is_open())
            .finish_non_exhaustive()
    }
}

/// Something that can open connections to a target address.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`.
    ///
    /// The returned event stream starts with [`TransportEvent::Opened`] once
    /// the connection is usable.
    async fn open(&self, url: &Url) -> Result<Connection, TransportError>;

    /// Get the transport name (e.g., "websocket", "memory").
    fn name(&self) -> &'static str;
}
