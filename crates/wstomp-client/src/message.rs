//! Messages delivered to subscription handlers.

use std::collections::HashMap;
use std::fmt;

use wstomp_protocol::{headers, Frame};

/// A message received on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompMessage {
    destination: Option<String>,
    body: String,
    headers: HashMap<String, String>,
}

impl StompMessage {
    /// Create a new message.
    #[must_use]
    pub fn new(
        destination: Option<String>,
        body: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            destination,
            body: body.into(),
            headers,
        }
    }

    /// Build a message from a decoded MESSAGE frame.
    #[must_use]
    pub fn from_frame(frame: Frame) -> Self {
        let (frame_headers, body) = frame.into_parts();
        Self {
            destination: frame_headers.get(headers::DESTINATION).cloned(),
            body,
            headers: frame_headers,
        }
    }

    /// The destination the message was received from.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The message body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// All message headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a single header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The subscription id the broker routed this message through.
    #[must_use]
    pub fn subscription(&self) -> Option<&str> {
        self.header(headers::SUBSCRIPTION)
    }
}

impl fmt::Display for StompMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StompMessage {{ destination: {:?}, body: {:?} }}",
            self.destination, self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wstomp_protocol::Command;

    #[test]
    fn test_message_from_frame() {
        let frame = Frame::new(Command::Message)
            .header("destination", "/topic/test")
            .header("subscription", "sub-1")
            .header("message-id", "42")
            .with_body("Test message");

        let message = StompMessage::from_frame(frame);
        assert_eq!(message.destination(), Some("/topic/test"));
        assert_eq!(message.body(), "Test message");
        assert_eq!(message.subscription(), Some("sub-1"));
        assert_eq!(message.header("message-id"), Some("42"));
        assert_eq!(message.headers().len(), 3);
        assert_eq!(message.header("missing"), None);
    }

    #[test]
    fn test_message_without_destination() {
        let message = StompMessage::new(None, "", HashMap::new());
        assert_eq!(message.destination(), None);
        assert!(message.body().is_empty());
        assert!(message.to_string().contains("destination: None"));
    }
}
