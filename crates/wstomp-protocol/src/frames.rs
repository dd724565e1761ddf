//! Frame types for the STOMP protocol.
//!
//! Frames are the fundamental unit of communication: a command, a set of
//! headers and a text body.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::codec::{self, ProtocolError};
use crate::version::PROTOCOL_VERSION;

/// Well-known header names.
pub mod headers {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HOST: &str = "host";
    pub const PASSCODE: &str = "passcode";
    pub const VERSION: &str = "version";
    pub const DESTINATION: &str = "destination";
    pub const ID: &str = "id";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_ID: &str = "receipt-id";
    pub const MESSAGE: &str = "message";
}

/// STOMP commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Client commands
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,

    // Server commands
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Every command, client commands first.
    pub const ALL: [Command; 15] = [
        Command::Connect,
        Command::Stomp,
        Command::Send,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Disconnect,
        Command::Ack,
        Command::Nack,
        Command::Begin,
        Command::Commit,
        Command::Abort,
        Command::Connected,
        Command::Message,
        Command::Receipt,
        Command::Error,
    ];

    /// The wire token for this command.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// Whether the command is sent by brokers rather than clients.
    #[must_use]
    pub const fn is_server_command(&self) -> bool {
        matches!(
            self,
            Command::Connected | Command::Message | Command::Receipt | Command::Error
        )
    }

    /// Whether the command is sent by clients.
    #[must_use]
    pub const fn is_client_command(&self) -> bool {
        !self.is_server_command()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

/// A protocol frame.
///
/// The command is fixed at construction. Headers keep one value per name;
/// setting a header twice keeps the last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    headers: HashMap<String, String>,
    body: String,
}

impl Frame {
    /// Create an empty frame for the given command.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    /// Get the frame command.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Set a header, replacing any previous value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Builder form of [`Frame::add_header`].
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Look up a header value.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Consume the frame, returning its headers and body.
    #[must_use]
    pub fn into_parts(self) -> (HashMap<String, String>, String) {
        (self.headers, self.body)
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Builder form of [`Frame::set_body`].
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.set_body(body);
        self
    }

    /// Get the body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Create a CONNECT frame advertising the supported protocol version.
    #[must_use]
    pub fn connect(host: impl Into<String>) -> Self {
        Frame::new(Command::Connect)
            .header(headers::ACCEPT_VERSION, PROTOCOL_VERSION)
            .header(headers::HOST, host)
    }

    /// Create a SEND frame.
    #[must_use]
    pub fn send(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Frame::new(Command::Send)
            .header(headers::DESTINATION, destination)
            .with_body(body)
    }

    /// Create a SUBSCRIBE frame.
    #[must_use]
    pub fn subscribe(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Frame::new(Command::Subscribe)
            .header(headers::ID, id)
            .header(headers::DESTINATION, destination)
    }

    /// Create an UNSUBSCRIBE frame.
    #[must_use]
    pub fn unsubscribe(id: impl Into<String>) -> Self {
        Frame::new(Command::Unsubscribe).header(headers::ID, id)
    }

    /// Create a DISCONNECT frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode(self))
    }
}
