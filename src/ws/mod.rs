//! WebSocket layer — endpoint config, connection state, events.
//!
//! The transport lives in `native.rs` (`ws-native` feature, `tokio-tungstenite`).
//! This module defines the types shared with consumers.

#[cfg(feature = "ws-native")]
pub mod native;

use crate::domain::portfolio::PortfolioUpdate;
use crate::error::WsError;
use crate::network::{DEFAULT_FEED_PATH, DEFAULT_WS_BASE_URL, SUBSCRIBER_QUERY_KEY};
use crate::shared::SubscriberId;

// ─── Endpoint ────────────────────────────────────────────────────────────────

/// Where a feed lives: base address, feed path, optional subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    /// `ws://host:port` or `wss://host:port`.
    pub base_url: String,
    pub path: String,
    /// Sent as the `user_id` query parameter when set. Has no other effect.
    pub subscriber: Option<SubscriberId>,
}

impl Default for FeedEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_BASE_URL.to_string(),
            path: DEFAULT_FEED_PATH.to_string(),
            subscriber: None,
        }
    }
}

impl FeedEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Plain-text endpoint for `host:port` with the default feed path.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(format!("ws://{}:{}", host, port))
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_subscriber(mut self, subscriber: impl Into<SubscriberId>) -> Self {
        self.subscriber = Some(subscriber.into());
        self
    }

    /// The full feed URL.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        let mut url = if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        };

        if let Some(subscriber) = &self.subscriber {
            let sep = if url.contains('?') { '&' } else { '?' };
            url.push(sep);
            url.push_str(SUBSCRIBER_QUERY_KEY);
            url.push('=');
            url.push_str(&urlencoding::encode(subscriber.as_str()));
        }
        url
    }

    /// Checks the scheme is `ws` or `wss`.
    pub fn validate(&self) -> Result<(), WsError> {
        let base = self.base_url.trim();
        if base.starts_with("ws://") || base.starts_with("wss://") {
            Ok(())
        } else {
            Err(WsError::InvalidUrl(format!(
                "expected ws:// or wss:// base URL, got `{}`",
                self.base_url
            )))
        }
    }
}

// ─── Transport config ────────────────────────────────────────────────────────

/// Configuration for one feed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    /// Give up establishing the connection after this long.
    pub connect_timeout_ms: u64,
    /// Bound of the event queue between the transport task and the consumer.
    /// The transport waits when it is full; nothing is dropped. The terminal
    /// event has its own slot on top of this.
    pub event_channel_capacity: usize,
    /// How long `close()` waits for the transport task before aborting it.
    pub close_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            event_channel_capacity: 256,
            close_timeout_ms: 5_000,
        }
    }
}

// ─── Connection state ────────────────────────────────────────────────────────

/// Lifecycle of a single connection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closed,
            _ => Self::Disconnected,
        }
    }
}

// ─── FeedEvent ───────────────────────────────────────────────────────────────

/// Events delivered by a feed connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Handshake completed.
    Connected,
    /// One decoded feed message.
    Update(PortfolioUpdate),
    /// Transport failure or unexpected close. Terminal.
    Error(WsError),
    /// Normal closure, by either side. Terminal.
    Closed { code: Option<u16>, reason: String },
}

impl FeedEvent {
    /// Whether nothing further will be delivered after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedEvent::Error(_) | FeedEvent::Closed { .. })
    }
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub connection_id: uuid::Uuid,
    /// Text frames received, decodable or not.
    pub messages_received: u64,
    /// Text frames dropped because they did not decode.
    pub decode_failures: u64,
}
