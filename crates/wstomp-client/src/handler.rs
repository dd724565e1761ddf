//! Callback capabilities consumed by the client.

use crate::error::StompError;
use crate::message::StompMessage;

/// Receives messages for one subscription.
///
/// Any `Fn(StompMessage) + Send + Sync` closure is a handler. Handlers run
/// on the session's dispatch task, one message at a time, in arrival order.
pub trait MessageHandler: Send + Sync {
    /// Called once per MESSAGE frame routed to the subscription.
    fn on_message(&self, message: StompMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(StompMessage) + Send + Sync,
{
    fn on_message(&self, message: StompMessage) {
        self(message)
    }
}

/// Receives connection lifecycle and error events.
///
/// All methods default to doing nothing.
pub trait ConnectionListener: Send + Sync {
    /// The broker accepted the connection.
    fn on_connected(&self) {}

    /// The connection ended.
    fn on_disconnected(&self) {}

    /// Something went wrong that the caller did not see synchronously.
    fn on_error(&self, _error: &StompError) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Quiet;
    impl ConnectionListener for Quiet {}

    #[test]
    fn test_closure_is_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler: Box<dyn MessageHandler> = Box::new(move |message: StompMessage| {
            assert_eq!(message.body(), "hi");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handler.on_message(StompMessage::new(None, "hi", HashMap::new()));
        handler.on_message(StompMessage::new(None, "hi", HashMap::new()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_defaults() {
        let listener = Quiet;
        listener.on_connected();
        listener.on_disconnected();
        listener.on_error(&StompError::NotConnected);
    }
}
