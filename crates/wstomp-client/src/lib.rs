//! # wstomp-client
//!
//! Client-side STOMP session engine.
//!
//! This crate provides the pieces that sit between an application and a
//! transport:
//!
//! - **StompClient** - connection handshake, SEND/SUBSCRIBE/UNSUBSCRIBE and
//!   inbound frame dispatch
//! - **Registry** - live subscriptions keyed by subscription id
//! - **Message** - values handed to subscription handlers
//! - **Listener** - connection lifecycle and error notifications
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  frames  ┌─────────────┐  text  ┌─────────────┐
//! │ Application │─────────▶│ StompClient │───────▶│  Transport  │
//! └─────────────┘          └─────────────┘◀───────└─────────────┘
//!        ▲                        │        events
//!        │   StompMessage         ▼
//!        └────────────────┌─────────────┐
//!                         │  Registry   │
//!                         └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use wstomp_client::{StompClient, StompMessage};
//!
//! # async fn run() -> Result<(), wstomp_client::StompError> {
//! let client = StompClient::new("ws://localhost:8080/ws")?;
//! client.add_header("login", "guest");
//! client.connect()?.await?;
//!
//! client.subscribe("/topic/news", |message: StompMessage| {
//!     println!("{}", message.body());
//! })?;
//! client.send("/topic/news", "hello")?;
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod json;
pub mod message;
pub mod metrics;
pub mod registry;

pub use client::{ConnectHandle, ConnectionState, StompClient};
pub use config::ClientConfig;
pub use error::StompError;
pub use handler::{ConnectionListener, MessageHandler};
pub use json::JsonMessage;
pub use message::StompMessage;
pub use registry::{Subscription, SubscriptionRegistry};
