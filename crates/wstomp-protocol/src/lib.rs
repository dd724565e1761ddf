//! # wstomp-protocol
//!
//! Wire protocol definitions for the wstomp STOMP client.
//!
//! This crate defines the text frame format exchanged between a STOMP
//! client and broker: the command set, the frame model, and a stateless
//! codec with header escaping.
//!
//! ## Frame Layout
//!
//! ```text
//! COMMAND\n
//! name:value\n        (zero or more, escaped)
//! \n
//! body\0              (raw, never escaped)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use wstomp_protocol::{codec, Command, Frame};
//!
//! let frame = Frame::send("/queue/test", "Hello, world!");
//!
//! let encoded = codec::encode(&frame);
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(decoded.command(), Command::Send);
//! assert_eq!(decoded.body(), "Hello, world!");
//! ```

pub mod codec;
pub mod frames;
pub mod version;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{headers, Command, Frame};
pub use version::{LINE_FEED, NULL_BYTE, PROTOCOL_VERSION};
