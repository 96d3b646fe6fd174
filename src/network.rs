//! Network defaults for the portfolio feed.

/// Default feed host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default feed port.
pub const DEFAULT_PORT: u16 = 8080;

/// Path the feed server upgrades to a WebSocket.
pub const DEFAULT_FEED_PATH: &str = "/portfolio_stream";

/// Default WebSocket base URL (no path).
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8080";

/// Query parameter carrying the subscriber identifier, when one is configured.
pub const SUBSCRIBER_QUERY_KEY: &str = "user_id";
