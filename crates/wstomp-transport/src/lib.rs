//! # wstomp-transport
//!
//! Transport abstraction layer for the wstomp client.
//!
//! A transport carries encoded frames as text in both directions and
//! reports its lifecycle as a stream of [`TransportEvent`]s:
//!
//! - **WebSocket** - tokio-tungstenite client connections
//! - **Memory** - an in-process pair, used for tests and benchmarks
//!
//! ## Transport Abstraction
//!
//! ```rust,ignore
//! use wstomp_transport::{Connector, TransportEvent};
//!
//! async fn pump(connector: &dyn Connector, url: &url::Url) {
//!     let mut conn = connector.open(url).await.unwrap();
//!     while let Some(event) = conn.events.recv().await {
//!         if let TransportEvent::Text(text) = event {
//!             conn.outbound.send_text(text).unwrap();
//!         }
//!     }
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use memory::{MemoryConnector, MemoryPeer, Outgoing};
pub use traits::{
    Connection, Connector, EventStream, Outbound, TransportError, TransportEvent, NORMAL_CLOSURE,
};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
