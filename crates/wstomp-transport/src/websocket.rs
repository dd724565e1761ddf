//! WebSocket transport implementation.
//!
//! This module provides a WebSocket client transport using tokio-tungstenite.
//! Each connection runs a reader task that turns socket messages into
//! [`TransportEvent`]s and a writer task that drains the outbound queue.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        self,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message,
    },
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::traits::{Connection, Connector, Outbound, TransportError, TransportEvent};

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024 * 1024, // 16 MiB
        }
    }
}

/// WebSocket connector.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Create a new WebSocket connector.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &Url) -> Result<Connection, TransportError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let (ws_stream, _response) = connect_async_with_config(url.as_str(), Some(ws_config), false)
            .await
            .map_err(|e| {
                error!(url = %url, "WebSocket handshake failed: {}", e);
                TransportError::Connect(e.to_string())
            })?;

        info!(url = %url, "WebSocket connected");

        let (mut sink, mut stream) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let open = Arc::new(AtomicBool::new(true));

        let _ = event_tx.send(TransportEvent::Opened);

        // Writer: drain the outbound queue into the socket.
        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Failed to write WebSocket message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            debug!("WebSocket writer finished");
        });

        // Reader: turn socket messages into transport events.
        let reader_open = Arc::clone(&open);
        let pong_tx = out_tx.clone();
        tokio::spawn(async move {
            let last = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if event_tx.send(TransportEvent::Text(text)).is_err() {
                            // Nobody is listening any more.
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Some brokers send frames as binary messages.
                        let text = String::from_utf8_lossy(&data).into_owned();
                        if event_tx.send(TransportEvent::Text(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = pong_tx.send(Message::Pong(data));
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Received close frame");
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                        break TransportEvent::Closed { code, reason };
                    }
                    Some(Err(WsError::ConnectionClosed)) | None => {
                        debug!("WebSocket stream ended");
                        break TransportEvent::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: String::new(),
                        };
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break TransportEvent::Failed(TransportError::ReceiveFailed(
                            e.to_string(),
                        ));
                    }
                }
            };

            reader_open.store(false, Ordering::SeqCst);
            let _ = event_tx.send(last);
        });

        Ok(Connection {
            outbound: Box::new(WebSocketOutbound { tx: out_tx, open }),
            events: event_rx,
        })
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// Sending half of a WebSocket connection.
struct WebSocketOutbound {
    tx: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
}

impl Outbound for WebSocketOutbound {
    fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        self.tx
            .send(Message::Text(text))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(()); // Already closed
        }

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.tx
            .send(Message::Close(Some(frame)))
            .map_err(|e| TransportError::Other(format!("Failed to close: {}", e)))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.max_message_size, 16 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_websocket_connect_refused() {
        let connector = WebSocketConnector::default();
        // Port 9 (discard) is almost never listening locally.
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        assert!(matches!(
            connector.open(&url).await,
            Err(TransportError::Connect(_))
        ));
    }
}
