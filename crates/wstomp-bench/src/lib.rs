//! Shared fixtures for wstomp benchmarks.

use std::sync::Arc;
use wstomp_client::{StompClient, StompError};
use wstomp_protocol::{codec, Command, Frame};
use wstomp_transport::memory::{self, MemoryPeer};

/// Encoded MESSAGE frame for `subscription` with a body of `body_len` bytes.
#[must_use]
pub fn message_frame(subscription: &str, body_len: usize) -> String {
    let frame = Frame::new(Command::Message)
        .header("destination", "/topic/bench")
        .header("subscription", subscription)
        .header("message-id", "1")
        .with_body("x".repeat(body_len));
    codec::encode(&frame)
}

/// A client connected over the in-memory transport, plus the broker side.
///
/// # Errors
///
/// Returns an error if the handshake does not complete.
pub async fn connected_client() -> Result<(StompClient, MemoryPeer), StompError> {
    let (connector, mut peer) = memory::pair();
    let client = StompClient::with_connector("ws://localhost/bench", Arc::new(connector))?;

    let handle = client.connect()?;
    peer.opened();
    let _connect = peer.recv_text().await;
    peer.text("CONNECTED\nversion:1.2\n\n\0");
    handle.await?;

    Ok((client, peer))
}
