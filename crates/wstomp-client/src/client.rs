//! The STOMP client session.
//!
//! A [`StompClient`] owns one transport connection for its whole life:
//! `connect` opens it, a spawned dispatch task consumes inbound events in
//! order, and `send`/`subscribe`/`unsubscribe` push frames out from any
//! thread. Once the connection ends the client cannot be reused.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use url::Url;
use wstomp_protocol::version::is_supported_version;
use wstomp_protocol::{codec, headers, Command, Frame};
use wstomp_transport::{
    Connection, Connector, Outbound, TransportError, TransportEvent, NORMAL_CLOSURE,
};

use crate::error::StompError;
use crate::handler::{ConnectionListener, MessageHandler};
use crate::message::StompMessage;
use crate::metrics::{self, SessionMetricsGuard};
use crate::registry::{Subscription, SubscriptionRegistry};

/// Reason sent with the close frame on `disconnect`.
const NORMAL_CLOSURE_REASON: &str = "Normal closure";

/// Reason sent with the close frame when CONNECTED does not arrive in time.
const CONNECT_TIMEOUT_REASON: &str = "Connect timeout";

/// Headers whose values never reach the logs.
const REDACTED_HEADERS: [&str; 1] = [headers::PASSCODE];

/// Prefix for generated subscription ids.
const SUBSCRIPTION_ID_PREFIX: &str = "sub-";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected. Initial and final state.
    Disconnected,
    /// CONNECT issued, waiting for CONNECTED.
    Connecting,
    /// The broker accepted the connection.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Resolves once the broker answers CONNECT, or the attempt fails.
#[must_use = "the connect handle reports whether the broker accepted the connection"]
#[derive(Debug)]
pub struct ConnectHandle {
    rx: oneshot::Receiver<Result<(), StompError>>,
}

impl Future for ConnectHandle {
    type Output = Result<(), StompError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                Err(StompError::TransportFailure(
                    "session ended before CONNECTED".into(),
                ))
            })
        })
    }
}

/// How a connection ended from the transport's point of view.
enum Loss {
    Closed { code: u16, reason: String },
    Failed(TransportError),
    TimedOut(Duration),
}

/// Mutable session state, guarded by one lock.
struct Session {
    state: ConnectionState,
    /// `connect` has been called at least once.
    started: bool,
    /// `disconnect` ended the session.
    closed_locally: bool,
    outbound: Option<Box<dyn Outbound>>,
    pending_connect: Option<oneshot::Sender<Result<(), StompError>>>,
}

impl Session {
    fn ensure_connected(&self) -> Result<(), StompError> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(StompError::NotConnected)
        }
    }

    fn transmit(&self, frame: &Frame) -> Result<(), StompError> {
        let outbound = self.outbound.as_ref().ok_or(StompError::NotConnected)?;
        let text = codec::encode(frame);

        debug!(command = %frame.command(), bytes = text.len(), "Sending frame");
        trace!(frame = %loggable(frame, &text), "Outbound frame");
        metrics::record_frame(text.len(), "outbound", frame.command().as_str());

        outbound.send_text(text)?;
        Ok(())
    }
}

struct Inner {
    url: Url,
    host: String,
    connector: Arc<dyn Connector>,
    connect_headers: Mutex<BTreeMap<String, String>>,
    listener: RwLock<Option<Arc<dyn ConnectionListener>>>,
    registry: SubscriptionRegistry,
    next_id: AtomicU64,
    connect_timeout: Mutex<Option<Duration>>,
    session: Mutex<Session>,
    shutdown: Notify,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: impl FnOnce(&dyn ConnectionListener)) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(listener) = listener {
            if panic::catch_unwind(AssertUnwindSafe(|| event(listener.as_ref()))).is_err() {
                warn!("Connection listener panicked");
            }
        }
    }

    fn report(&self, error: StompError) {
        metrics::record_error(error.kind());
        self.notify(|l| l.on_error(&error));
    }

    fn connect_timeout(&self) -> Option<Duration> {
        *self
            .connect_timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn drop_subscriptions(&self) {
        if self.registry.is_empty() {
            return;
        }
        debug!(count = self.registry.len(), "Dropping subscriptions");
        self.registry.clear();
        metrics::set_active_subscriptions(0);
    }

    /// Dispatch loop: open the transport, then consume its events in order.
    async fn run(self: Arc<Self>) {
        let _metrics_guard = SessionMetricsGuard::new();

        let deadline = self
            .connect_timeout()
            .map(|timeout| (Instant::now() + timeout, timeout));

        debug!(url = %self.url, transport = self.connector.name(), "Opening transport");
        let opened = tokio::select! {
            biased;

            result = self.connector.open(&self.url) => result,

            timeout = expire(deadline) => {
                self.handle_lost(Loss::TimedOut(timeout));
                return;
            }
        };
        let Connection {
            outbound,
            mut events,
        } = match opened {
            Ok(conn) => conn,
            Err(e) => {
                self.handle_lost(Loss::Failed(e));
                return;
            }
        };

        {
            let mut session = self.session();
            if session.closed_locally {
                let _ = outbound.close(NORMAL_CLOSURE, NORMAL_CLOSURE_REASON);
                return;
            }
            session.outbound = Some(outbound);
        }

        loop {
            let awaiting_connected = self.session().state == ConnectionState::Connecting;
            let event = tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    debug!("Dispatch stopped by disconnect");
                    break;
                }

                timeout = expire(deadline), if awaiting_connected => {
                    self.handle_lost(Loss::TimedOut(timeout));
                    break;
                }

                event = events.recv() => event,
            };

            match event {
                Some(TransportEvent::Opened) => {
                    if let Err(e) = self.handle_open() {
                        self.handle_lost(Loss::Failed(TransportError::SendFailed(e.to_string())));
                        break;
                    }
                }
                Some(TransportEvent::Text(text)) => self.handle_text(&text),
                Some(TransportEvent::Closed { code, reason }) => {
                    self.handle_lost(Loss::Closed { code, reason });
                    break;
                }
                Some(TransportEvent::Failed(e)) => {
                    self.handle_lost(Loss::Failed(e));
                    break;
                }
                None => {
                    self.handle_lost(Loss::Closed {
                        code: 1006,
                        reason: "transport event stream ended".into(),
                    });
                    break;
                }
            }
        }
    }

    fn handle_open(&self) -> Result<(), StompError> {
        debug!("Transport opened");

        let mut frame = Frame::connect(self.host.as_str());
        for (name, value) in self
            .connect_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            frame.add_header(name.as_str(), value.as_str());
        }

        self.session().transmit(&frame)
    }

    fn handle_text(&self, text: &str) {
        let frame = match codec::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Error parsing STOMP frame");
                self.report(StompError::Protocol(e));
                return;
            }
        };
        trace!(frame = %loggable(&frame, text), "Inbound frame");

        metrics::record_frame(text.len(), "inbound", frame.command().as_str());
        debug!(command = %frame.command(), "Received frame");

        match frame.command() {
            Command::Connected => self.handle_connected(&frame),
            Command::Message => self.deliver(frame),
            Command::Error => {
                let summary = frame.get_header(headers::MESSAGE).unwrap_or_default();
                warn!(message = %summary, "Server sent ERROR frame");
                self.report(StompError::Server(frame.body().to_string()));
            }
            Command::Receipt => {
                debug!(
                    receipt = frame.get_header(headers::RECEIPT_ID).unwrap_or_default(),
                    "Receipt received"
                );
            }
            other => {
                warn!(
                    command = %other,
                    client_command = other.is_client_command(),
                    "Unhandled STOMP command"
                );
            }
        }
    }

    fn handle_connected(&self, frame: &Frame) {
        if let Some(version) = frame.get_header(headers::VERSION) {
            if !is_supported_version(version) {
                warn!(version = %version, "Broker negotiated an unsupported protocol version");
            }
        }

        let pending = {
            let mut session = self.session();
            if session.closed_locally {
                debug!("Ignoring CONNECTED after disconnect");
                return;
            }
            session.state = ConnectionState::Connected;
            session.pending_connect.take()
        };

        info!(url = %self.url, "Connected");
        if let Some(tx) = pending {
            let _ = tx.send(Ok(()));
        }
        self.notify(|l| l.on_connected());
    }

    fn deliver(&self, frame: Frame) {
        let Some(id) = frame.get_header(headers::SUBSCRIPTION).map(str::to_owned) else {
            trace!("Dropping MESSAGE without subscription header");
            return;
        };

        // The subscription may have been removed while the frame was in flight.
        let Some(subscription) = self.registry.get(&id) else {
            trace!(subscription = %id, "Dropping MESSAGE for unknown subscription");
            return;
        };

        let message = StompMessage::from_frame(frame);
        let handler = subscription.handler();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_message(message)))
        {
            let reason = panic_message(payload.as_ref());
            error!(subscription = %id, "Message handler panicked: {}", reason);
            self.report(StompError::Handler(reason));
        }
    }

    fn handle_lost(&self, loss: Loss) {
        let (pending, outbound, closed_locally) = {
            let mut session = self.session();
            session.state = ConnectionState::Disconnected;
            (
                session.pending_connect.take(),
                session.outbound.take(),
                session.closed_locally,
            )
        };
        self.drop_subscriptions();

        // `disconnect` already settled the handle and told the listener.
        if closed_locally {
            debug!("Transport ended after disconnect");
            return;
        }

        let description = match &loss {
            Loss::Closed { code, reason } => {
                info!(code = code, reason = %reason, "Connection closed");
                format!("connection closed ({}: {})", code, reason)
            }
            Loss::Failed(e) => {
                error!(error = %e, "Transport failure");
                e.to_string()
            }
            Loss::TimedOut(timeout) => {
                warn!(timeout = ?timeout, "Timed out waiting for CONNECTED");
                if let Some(outbound) = &outbound {
                    let _ = outbound.close(NORMAL_CLOSURE, CONNECT_TIMEOUT_REASON);
                }
                format!("timed out after {:?} waiting for CONNECTED", timeout)
            }
        };

        if let Some(tx) = pending {
            let _ = tx.send(Err(StompError::TransportFailure(description)));
        }
        if let Loss::Failed(e) = loss {
            self.report(StompError::Transport(e));
        }
        self.notify(|l| l.on_disconnected());
    }
}

/// Resolves when the connect deadline passes; never without one.
async fn expire(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, timeout)) => {
            tokio::time::sleep_until(at).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Frame text safe to log: credentials are masked.
fn loggable<'a>(frame: &Frame, text: &'a str) -> Cow<'a, str> {
    if REDACTED_HEADERS
        .iter()
        .all(|name| frame.get_header(name).is_none())
    {
        return Cow::Borrowed(text);
    }

    let mut masked = frame.clone();
    for name in REDACTED_HEADERS {
        if masked.get_header(name).is_some() {
            masked.add_header(name, "***");
        }
    }
    Cow::Owned(codec::encode(&masked))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// A STOMP client bound to one target address.
///
/// Cloning is cheap and yields another handle to the same session.
#[derive(Clone)]
pub struct StompClient {
    inner: Arc<Inner>,
}

impl StompClient {
    /// Create a client that connects over WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::InvalidUrl`] if `url` does not parse or has no
    /// host.
    #[cfg(feature = "websocket")]
    pub fn new(url: &str) -> Result<Self, StompError> {
        Self::with_connector(url, Arc::new(wstomp_transport::WebSocketConnector::default()))
    }

    /// Create a WebSocket client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::InvalidUrl`] if the configured URL is unusable.
    #[cfg(feature = "websocket")]
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self, StompError> {
        let connector = wstomp_transport::WebSocketConnector::new(
            wstomp_transport::WebSocketConfig {
                max_message_size: config.max_message_size,
            },
        );
        let client = Self::with_connector(&config.url, Arc::new(connector))?;
        for (name, value) in &config.headers {
            client.add_header(name.as_str(), value.as_str());
        }
        if config.connect_timeout_ms > 0 {
            client.set_connect_timeout(Some(config.connect_timeout()));
        }
        Ok(client)
    }

    /// Create a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::InvalidUrl`] if `url` does not parse or has no
    /// host.
    pub fn with_connector(url: &str, connector: Arc<dyn Connector>) -> Result<Self, StompError> {
        let url = Url::parse(url).map_err(|e| StompError::InvalidUrl(format!("{}: {}", url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| StompError::InvalidUrl(format!("{}: missing host", url)))?
            .to_string();

        Ok(Self {
            inner: Arc::new(Inner {
                url,
                host,
                connector,
                connect_headers: Mutex::new(BTreeMap::new()),
                listener: RwLock::new(None),
                registry: SubscriptionRegistry::new(),
                next_id: AtomicU64::new(1),
                connect_timeout: Mutex::new(None),
                session: Mutex::new(Session {
                    state: ConnectionState::Disconnected,
                    started: false,
                    closed_locally: false,
                    outbound: None,
                    pending_connect: None,
                }),
                shutdown: Notify::new(),
            }),
        })
    }

    /// Set the listener for connection events.
    pub fn set_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Add a header to be sent with the CONNECT frame.
    ///
    /// Headers added after `connect` has sent CONNECT have no effect.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .connect_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// Bound the wait for CONNECTED, counted from `connect`.
    ///
    /// On expiry the transport is closed and the [`ConnectHandle`] resolves
    /// with [`StompError::TransportFailure`]. `None` waits indefinitely,
    /// which is the default.
    pub fn set_connect_timeout(&self, timeout: Option<Duration>) {
        *self
            .inner
            .connect_timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    /// The CONNECTED wait bound, if any.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.inner.connect_timeout()
    }

    /// The target address.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.session().state
    }

    /// Check if the client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Destinations with at least one live subscription, sorted.
    #[must_use]
    pub fn destinations(&self) -> Vec<String> {
        self.inner.registry.destinations()
    }

    /// Connect to the broker.
    ///
    /// Spawns the session's dispatch task on the current tokio runtime and
    /// returns a handle that resolves when the broker answers CONNECT.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::AlreadyConnected`] while connecting or
    /// connected, [`StompError::SessionClosed`] once the session has ended,
    /// and [`StompError::NoRuntime`] outside a tokio runtime.
    pub fn connect(&self) -> Result<ConnectHandle, StompError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StompError::NoRuntime)?;
        let (tx, rx) = oneshot::channel();

        {
            let mut session = self.inner.session();
            match session.state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    return Err(StompError::AlreadyConnected);
                }
                ConnectionState::Disconnected if session.started => {
                    return Err(StompError::SessionClosed);
                }
                ConnectionState::Disconnected => {}
            }
            session.started = true;
            session.state = ConnectionState::Connecting;
            session.pending_connect = Some(tx);
        }

        info!(url = %self.inner.url, "Connecting");
        runtime.spawn(Arc::clone(&self.inner).run());

        Ok(ConnectHandle { rx })
    }

    /// Disconnect from the broker.
    ///
    /// Sends DISCONNECT, closes the transport and drops all subscriptions.
    /// Does nothing if the client is not connected. A pending connect
    /// attempt is aborted.
    pub fn disconnect(&self) {
        let pending = {
            let mut session = self.inner.session();
            match session.state {
                ConnectionState::Disconnected => return,
                ConnectionState::Connected => {
                    if let Err(e) = session.transmit(&Frame::disconnect()) {
                        warn!(error = %e, "Failed to send DISCONNECT");
                    }
                }
                ConnectionState::Connecting => {}
            }

            if let Some(outbound) = session.outbound.take() {
                if let Err(e) = outbound.close(NORMAL_CLOSURE, NORMAL_CLOSURE_REASON) {
                    warn!(error = %e, "Failed to close transport");
                }
            }
            session.state = ConnectionState::Disconnected;
            session.closed_locally = true;
            session.pending_connect.take()
        };

        info!(url = %self.inner.url, "Disconnected");
        self.inner.drop_subscriptions();
        self.inner.shutdown.notify_one();
        if let Some(tx) = pending {
            let _ = tx.send(Err(StompError::ConnectAborted));
        }
        self.inner.notify(|l| l.on_disconnected());
    }

    /// Send a message to a destination.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::NotConnected`] unless connected, or a transport
    /// error if the frame could not be queued.
    pub fn send(&self, destination: &str, body: impl Into<String>) -> Result<(), StompError> {
        self.send_with_headers(destination, body, std::iter::empty::<(String, String)>())
    }

    /// Send a message with additional headers.
    ///
    /// The `destination` header always wins over a caller-supplied one.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::NotConnected`] unless connected, or a transport
    /// error if the frame could not be queued.
    pub fn send_with_headers<I, K, V>(
        &self,
        destination: &str,
        body: impl Into<String>,
        extra_headers: I,
    ) -> Result<(), StompError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut frame = Frame::new(Command::Send);
        for (name, value) in extra_headers {
            frame.add_header(name, value);
        }
        frame.add_header(headers::DESTINATION, destination);
        frame.set_body(body);

        let session = self.inner.session();
        session.ensure_connected()?;
        session.transmit(&frame)
    }

    /// Subscribe to a destination.
    ///
    /// The handler is registered before SUBSCRIBE is sent, so a MESSAGE
    /// arriving right after can always be routed.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::NotConnected`] unless connected, or a transport
    /// error if the frame could not be queued.
    pub fn subscribe<H>(&self, destination: &str, handler: H) -> Result<String, StompError>
    where
        H: MessageHandler + 'static,
    {
        self.subscribe_shared(destination, Arc::new(handler))
    }

    /// Subscribe with a shared handler.
    ///
    /// # Errors
    ///
    /// Same as [`StompClient::subscribe`].
    pub fn subscribe_shared(
        &self,
        destination: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<String, StompError> {
        let session = self.inner.session();
        session.ensure_connected()?;

        let id = format!(
            "{}{}",
            SUBSCRIPTION_ID_PREFIX,
            self.inner.next_id.fetch_add(1, Ordering::SeqCst)
        );

        self.inner
            .registry
            .insert(Subscription::new(id.as_str(), destination, handler));

        if let Err(e) = session.transmit(&Frame::subscribe(id.as_str(), destination)) {
            self.inner.registry.remove(&id);
            return Err(e);
        }

        metrics::set_active_subscriptions(self.inner.registry.len());
        debug!(subscription = %id, destination = %destination, "Subscribed");
        Ok(id)
    }

    /// Unsubscribe from a subscription.
    ///
    /// Unknown ids are not an error; UNSUBSCRIBE is sent regardless.
    ///
    /// # Errors
    ///
    /// Returns [`StompError::NotConnected`] unless connected, or a transport
    /// error if the frame could not be queued.
    pub fn unsubscribe(&self, subscription_id: &str) -> Result<(), StompError> {
        let session = self.inner.session();
        session.ensure_connected()?;

        if self.inner.registry.remove(subscription_id).is_none() {
            debug!(subscription = %subscription_id, "Unsubscribing unknown subscription");
        }
        metrics::set_active_subscriptions(self.inner.registry.len());

        session.transmit(&Frame::unsubscribe(subscription_id))?;
        debug!(subscription = %subscription_id, "Unsubscribed");
        Ok(())
    }

    pub(crate) fn report(&self, error: StompError) {
        self.inner.report(error);
    }

    pub(crate) fn downgrade(&self) -> WeakClient {
        WeakClient(Arc::downgrade(&self.inner))
    }
}

/// Non-owning client handle.
#[derive(Clone)]
pub(crate) struct WeakClient(Weak<Inner>);

impl WeakClient {
    pub(crate) fn upgrade(&self) -> Option<StompClient> {
        self.0.upgrade().map(|inner| StompClient { inner })
    }
}

impl fmt::Debug for StompClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StompClient")
            .field("url", &self.inner.url.as_str())
            .field("state", &self.state())
            .field("subscriptions", &self.inner.registry.len())
            .finish()
    }
}
