//! JSON payload helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::client::StompClient;
use crate::error::StompError;
use crate::message::StompMessage;

const APPLICATION_JSON: &str = "application/json";

/// A message whose body was decoded as JSON.
#[derive(Debug, Clone)]
pub struct JsonMessage<T> {
    message: StompMessage,
    value: T,
}

impl<T> JsonMessage<T> {
    /// The decoded body.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The raw message.
    #[must_use]
    pub fn message(&self) -> &StompMessage {
        &self.message
    }

    /// Take the decoded body.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

impl StompClient {
    /// Send `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::Json`] if `value` cannot be serialized, or any
    /// error [`StompClient::send`] returns.
    pub fn send_json<T: Serialize + ?Sized>(
        &self,
        destination: &str,
        value: &T,
    ) -> Result<(), StompError> {
        self.send_json_with_headers(destination, value, std::iter::empty::<(String, String)>())
    }

    /// Send `value` serialized as JSON with additional headers.
    ///
    /// `content-type: application/json` is added unless the caller set a
    /// content type.
    ///
    /// # Errors
    ///
    /// Same as [`StompClient::send_json`].
    pub fn send_json_with_headers<T, I, K, V>(
        &self,
        destination: &str,
        value: &T,
        extra_headers: I,
    ) -> Result<(), StompError>
    where
        T: Serialize + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let body = serde_json::to_string(value)?;

        let mut headers: Vec<(String, String)> = extra_headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if !headers
            .iter()
            .any(|(name, _)| name == wstomp_protocol::headers::CONTENT_TYPE)
        {
            headers.push((
                wstomp_protocol::headers::CONTENT_TYPE.to_string(),
                APPLICATION_JSON.to_string(),
            ));
        }

        self.send_with_headers(destination, body, headers)
    }

    /// Subscribe to a destination whose messages carry JSON bodies.
    ///
    /// Bodies that fail to decode are reported to the connection listener
    /// as [`StompError::Json`] and the handler is not called.
    ///
    /// # Errors
    ///
    /// Same as [`StompClient::subscribe`].
    pub fn subscribe_json<T, F>(&self, destination: &str, handler: F) -> Result<String, StompError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(JsonMessage<T>) + Send + Sync + 'static,
    {
        // The registry entry must not keep the session alive.
        let client = self.downgrade();
        self.subscribe(destination, move |message: StompMessage| {
            match serde_json::from_str::<T>(message.body()) {
                Ok(value) => handler(JsonMessage { message, value }),
                Err(e) => {
                    warn!(
                        destination = message.destination().unwrap_or_default(),
                        error = %e,
                        "Failed to decode JSON message"
                    );
                    if let Some(client) = client.upgrade() {
                        client.report(StompError::Json(e));
                    }
                }
            }
        })
    }
}
