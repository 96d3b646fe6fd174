//! # Portfolio Stream
//!
//! Live portfolio-value feed client: subscribes to a WebSocket feed, keeps the
//! most recent N samples in a bounded FIFO window, and hands chart-ready
//! snapshots to a pluggable renderer.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core** — Wire types, samples, the sliding window, formatting (always available)
//! 2. **WebSocket** — `FeedConnection` on `tokio-tungstenite` (`ws-native` feature)
//! 3. **Glue** — `RenderAdapter` and the `LiveSeriesView` lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portfolio_stream::prelude::*;
//!
//! let config = ViewConfig {
//!     endpoint: FeedEndpoint::from_host_port("localhost", 8080),
//!     capacity: 20,
//!     ..Default::default()
//! };
//! let mut view = LiveSeriesView::new(config, |snapshot: &SeriesSnapshot| {
//!     println!("{:?} {:?}", snapshot.labels, snapshot.values);
//! })?;
//! view.run().await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes, time parsing, and display formatting.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified error types.
pub mod error;

/// Network defaults.
pub mod network;

// ── Layer 2: WebSocket ───────────────────────────────────────────────────────

/// Feed connection: endpoint, config, events.
pub mod ws;

// ── Layer 3: Glue ────────────────────────────────────────────────────────────

/// Render adapters.
pub mod render;

/// `LiveSeriesView`: one connection, one window, one adapter.
#[cfg(feature = "ws-native")]
pub mod view;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared
    pub use crate::shared::{LabelFormat, LabelZone, SubscriberId};

    // Domain
    pub use crate::domain::portfolio::{
        decode_update, Holdings, PortfolioUpdate, Sample, SeriesSnapshot, SeriesWindow,
        DEFAULT_WINDOW_CAPACITY,
    };

    // Errors
    pub use crate::error::{DecodeError, StreamError, WsError};

    // WebSocket
    pub use crate::ws::{ConnectionState, ConnectionStats, FeedEndpoint, FeedEvent, WsConfig};
    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::FeedConnection;

    // Glue
    pub use crate::render::{Headless, RenderAdapter};
    #[cfg(feature = "ws-native")]
    pub use crate::render::{snapshot_stream, SnapshotPublisher};
    #[cfg(feature = "ws-native")]
    pub use crate::view::{LiveSeriesView, ReconnectPolicy, ViewConfig, ViewExit};
}
