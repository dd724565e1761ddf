//! In-process transport.
//!
//! [`pair`] returns a connector for the client side and a [`MemoryPeer`]
//! that plays the broker: it injects events and observes everything the
//! client sends.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::traits::{
    Connection, Connector, EventStream, Outbound, TransportError, TransportEvent,
};

/// Something the client pushed into the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A text message.
    Text(String),
    /// A close request.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Create a connected connector/peer pair.
#[must_use]
pub fn pair() -> (MemoryConnector, MemoryPeer) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let connector = MemoryConnector {
        slot: Mutex::new(Some((event_rx, out_tx))),
        refuse: None,
    };
    let peer = MemoryPeer {
        events: event_tx,
        outgoing: out_rx,
    };

    (connector, peer)
}

/// Client half of an in-memory transport. Can be opened once.
pub struct MemoryConnector {
    slot: Mutex<Option<(EventStream, mpsc::UnboundedSender<Outgoing>)>>,
    refuse: Option<String>,
}

impl MemoryConnector {
    /// A connector whose `open` always fails with the given reason.
    #[must_use]
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(None),
            refuse: Some(reason.into()),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, url: &Url) -> Result<Connection, TransportError> {
        if let Some(reason) = &self.refuse {
            return Err(TransportError::Connect(reason.clone()));
        }

        let taken = self
            .slot
            .lock()
            .map_err(|_| TransportError::Other("memory transport poisoned".into()))?
            .take();
        let (events, tx) =
            taken.ok_or_else(|| TransportError::Other("memory transport already opened".into()))?;

        debug!(url = %url, "Memory transport opened");

        Ok(Connection {
            outbound: Box::new(MemoryOutbound {
                tx,
                open: AtomicBool::new(true),
            }),
            events,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryOutbound {
    tx: mpsc::UnboundedSender<Outgoing>,
    open: AtomicBool,
}

impl Outbound for MemoryOutbound {
    fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.tx
            .send(Outgoing::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Broker half of an in-memory transport.
pub struct MemoryPeer {
    events: mpsc::UnboundedSender<TransportEvent>,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
}

impl MemoryPeer {
    /// Report the connection as open.
    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// Deliver a text message to the client.
    pub fn text(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Text(text.into()));
    }

    /// Report a peer-initiated closure.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        self.emit(TransportEvent::Closed {
            code,
            reason: reason.into(),
        });
    }

    /// Report a transport failure.
    pub fn fail(&self, error: TransportError) {
        self.emit(TransportEvent::Failed(error));
    }

    /// Wait for the next thing the client sent.
    ///
    /// Returns `None` once the client side has been dropped.
    pub async fn recv(&mut self) -> Option<Outgoing> {
        self.outgoing.recv().await
    }

    /// Wait for the next text message, skipping close requests.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.outgoing.recv().await? {
                Outgoing::Text(text) => return Some(text),
                Outgoing::Close { .. } => continue,
            }
        }
    }

    /// Take the next outgoing item if one is already queued.
    pub fn try_recv(&mut self) -> Option<Outgoing> {
        self.outgoing.try_recv().ok()
    }

    fn emit(&self, event: TransportEvent) {
        // The client may already have stopped listening.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("ws://localhost:8080/ws").unwrap()
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let (connector, mut peer) = pair();
        let mut conn = connector.open(&url()).await.unwrap();

        peer.opened();
        peer.text("hello");
        assert!(matches!(
            conn.events.recv().await,
            Some(TransportEvent::Opened)
        ));
        match conn.events.recv().await {
            Some(TransportEvent::Text(text)) => assert_eq!(text, "hello"),
            other => panic!("Expected text event, got {:?}", other),
        }

        conn.outbound.send_text("world".into()).unwrap();
        assert_eq!(peer.recv().await, Some(Outgoing::Text("world".into())));
    }

    #[tokio::test]
    async fn test_memory_close_is_idempotent() {
        let (connector, mut peer) = pair();
        let conn = connector.open(&url()).await.unwrap();

        conn.outbound.close(1000, "Normal closure").unwrap();
        conn.outbound.close(1000, "Normal closure").unwrap();
        assert!(!conn.outbound.is_open());
        assert!(matches!(
            conn.outbound.send_text("late".into()),
            Err(TransportError::ConnectionClosed)
        ));

        assert_eq!(
            peer.recv().await,
            Some(Outgoing::Close {
                code: 1000,
                reason: "Normal closure".into()
            })
        );
        assert_eq!(peer.try_recv(), None);
    }

    #[tokio::test]
    async fn test_memory_single_use() {
        let (connector, _peer) = pair();
        assert!(connector.open(&url()).await.is_ok());
        assert!(matches!(
            connector.open(&url()).await,
            Err(TransportError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_refusing() {
        let connector = MemoryConnector::refusing("no broker");
        match connector.open(&url()).await {
            Err(TransportError::Connect(reason)) => assert_eq!(reason, "no broker"),
            other => panic!("Expected Connect error, got {:?}", other),
        }
    }
}
