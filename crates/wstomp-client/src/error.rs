//! Client error types.

use thiserror::Error;
use wstomp_protocol::ProtocolError;
use wstomp_transport::TransportError;

/// Client errors.
#[derive(Debug, Error)]
pub enum StompError {
    /// The operation needs a CONNECTED session.
    #[error("Not connected to server")]
    NotConnected,

    /// `connect` was called while connecting or connected.
    #[error("Already connecting or connected")]
    AlreadyConnected,

    /// The session has ended; a new client is needed to reconnect.
    #[error("Session closed; create a new client to reconnect")]
    SessionClosed,

    /// `connect` needs a tokio runtime to drive the session.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// The target address could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An inbound frame could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The broker sent an ERROR frame.
    #[error("Server error: {0}")]
    Server(String),

    /// The transport reported an error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The connection was lost before or instead of completing.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The client disconnected before the broker answered CONNECT.
    #[error("Connect aborted by disconnect")]
    ConnectAborted,

    /// A subscription handler panicked.
    #[error("Message handler failed: {0}")]
    Handler(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StompError {
    /// Returns whether the error ends the session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StompError::Transport(_) | StompError::TransportFailure(_) | StompError::ConnectAborted
        )
    }

    /// Short label used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            StompError::NotConnected => "not_connected",
            StompError::AlreadyConnected => "already_connected",
            StompError::SessionClosed => "session_closed",
            StompError::NoRuntime => "no_runtime",
            StompError::InvalidUrl(_) => "invalid_url",
            StompError::Protocol(_) => "protocol",
            StompError::Server(_) => "server",
            StompError::Transport(_) => "transport",
            StompError::TransportFailure(_) => "transport",
            StompError::ConnectAborted => "connect_aborted",
            StompError::Handler(_) => "handler",
            StompError::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(StompError::NotConnected.to_string(), "Not connected to server");
        assert_eq!(
            StompError::Server("bad destination".into()).to_string(),
            "Server error: bad destination"
        );
        let err: StompError = ProtocolError::UnknownCommand("BOGUS".into()).into();
        assert_eq!(err.to_string(), "Protocol error: Unknown STOMP command: BOGUS");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(StompError::TransportFailure("reset".into()).is_fatal());
        assert!(StompError::Transport(TransportError::ConnectionClosed).is_fatal());
        assert!(!StompError::Server("oops".into()).is_fatal());
        assert!(!StompError::Protocol(ProtocolError::EmptyFrame).is_fatal());
        assert!(!StompError::NotConnected.is_fatal());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(StompError::Handler("boom".into()).kind(), "handler");
        assert_eq!(StompError::Protocol(ProtocolError::EmptyFrame).kind(), "protocol");
    }
}
