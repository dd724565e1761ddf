//! # wstomp
//!
//! Command-line STOMP client over WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! # Subscribe with default settings
//! wstomp
//!
//! # Subscribe to a destination and publish one message to it
//! wstomp --url ws://localhost:8080/ws --destination /topic/chat --message hello
//!
//! # Run with a config file and credentials
//! wstomp --config /path/to/wstomp.toml --header login:guest --header passcode:guest
//!
//! # Run with environment variables
//! WSTOMP_URL=ws://broker:61614/stomp WSTOMP_DESTINATION=/queue/jobs wstomp
//! ```

mod config;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wstomp_client::{ConnectionListener, StompClient, StompError, StompMessage};

/// Command-line STOMP client over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "wstomp", version, about)]
struct Args {
    /// Config file; defaults to the first of wstomp.toml, /etc/wstomp/wstomp.toml
    /// and ~/.config/wstomp/wstomp.toml that exists.
    #[arg(short, long, env = "WSTOMP_CONFIG")]
    config: Option<PathBuf>,

    /// Broker address.
    #[arg(short, long)]
    url: Option<String>,

    /// Destination to subscribe to.
    #[arg(short, long)]
    destination: Option<String>,

    /// Message to send to the destination once subscribed.
    #[arg(short, long)]
    message: Option<String>,

    /// Extra CONNECT header as name:value. May be repeated.
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name:value, got '{}'", raw)),
    }
}

/// Logs connection events and wakes `main` when the session ends.
struct LoggingListener {
    closed: Arc<Notify>,
}

impl ConnectionListener for LoggingListener {
    fn on_connected(&self) {
        info!("Session established");
    }

    fn on_disconnected(&self) {
        warn!("Session ended");
        self.closed.notify_one();
    }

    fn on_error(&self, error: &StompError) {
        if error.is_fatal() {
            error!(kind = error.kind(), "{}", error);
        } else {
            warn!(kind = error.kind(), "{}", error);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wstomp=debug,wstomp_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::load()?,
    };
    if let Some(url) = args.url {
        config.url = url;
    }
    if let Some(destination) = args.destination {
        config.destination = destination;
    }
    config.headers.extend(args.headers);

    if config.metrics.enabled {
        metrics::start_metrics_server(config.metrics.port)?;
    }

    let client = StompClient::from_config(&config.client_config())
        .with_context(|| format!("Invalid broker address: {}", config.url))?;
    let closed = Arc::new(Notify::new());
    client.set_connection_listener(Arc::new(LoggingListener {
        closed: Arc::clone(&closed),
    }));

    info!("Connecting to {}", config.url);
    client.connect()?.await.context("Connect failed")?;

    let id = client.subscribe(&config.destination, |message: StompMessage| {
        println!("{}", message);
    })?;
    info!(subscription = %id, destination = %config.destination, "Listening");

    if let Some(body) = args.message {
        client.send(&config.destination, body)?;
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!(destinations = ?client.destinations(), "Shutting down");
            client.disconnect();
        }
        _ = closed.notified() => {}
    }

    Ok(())
}
