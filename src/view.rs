//! Live series view — one feed connection driving one window and one adapter.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::portfolio::{
    decode_update, Holdings, PortfolioUpdate, SeriesSnapshot, SeriesWindow,
    DEFAULT_WINDOW_CAPACITY,
};
use crate::error::{StreamError, WsError};
use crate::render::RenderAdapter;
use crate::shared::LabelFormat;
use crate::ws::native::FeedConnection;
use crate::ws::{FeedEndpoint, FeedEvent, WsConfig};

const RECONNECT_JITTER_MS: u64 = 500;

// ─── Config ──────────────────────────────────────────────────────────────────

/// What the view does when the feed fails.
///
/// Only failures are retried; a normal close from the server ends the view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Surface the failure to the caller.
    #[default]
    Manual,
    /// Reopen after an exponentially growing delay, up to `max_attempts`
    /// consecutive failures.
    Backoff {
        max_attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based), or `None` to give up.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Manual => None,
            ReconnectPolicy::Backoff {
                max_attempts,
                base_delay_ms,
                max_delay_ms,
            } => {
                if attempt == 0 || attempt > max_attempts {
                    return None;
                }
                let exp = (attempt - 1).min(10);
                let base = base_delay_ms.saturating_mul(1u64 << exp);
                let jitter = rand::random::<u64>() % RECONNECT_JITTER_MS;
                let delay = base.saturating_add(jitter).min(max_delay_ms);
                Some(Duration::from_millis(delay))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub endpoint: FeedEndpoint,
    pub ws: WsConfig,
    /// Window capacity N.
    pub capacity: usize,
    pub label_format: LabelFormat,
    pub reconnect: ReconnectPolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            endpoint: FeedEndpoint::default(),
            ws: WsConfig::default(),
            capacity: DEFAULT_WINDOW_CAPACITY,
            label_format: LabelFormat::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// How a view run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewExit {
    /// The shutdown signal fired.
    Stopped,
    /// The server closed the feed normally.
    FeedClosed { code: Option<u16>, reason: String },
}

enum Outcome {
    Shutdown,
    Closed { code: Option<u16>, reason: String },
    Failed { error: WsError, connected: bool },
}

// ─── LiveSeriesView ──────────────────────────────────────────────────────────

/// Owns the window and the adapter for the lifetime of one chart.
///
/// Every accepted sample is pushed into the window and the adapter is handed
/// the fresh snapshot before the next sample is read. The window survives
/// reconnects and the end of `run`, so the last series stays readable.
pub struct LiveSeriesView<R> {
    config: ViewConfig,
    window: SeriesWindow,
    latest_holdings: Option<Holdings>,
    adapter: R,
}

impl<R: RenderAdapter> LiveSeriesView<R> {
    pub fn new(config: ViewConfig, adapter: R) -> Result<Self, StreamError> {
        config.endpoint.validate()?;
        let window = SeriesWindow::new(config.capacity, config.label_format.clone())?;
        Ok(Self {
            config,
            window,
            latest_holdings: None,
            adapter,
        })
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn window(&self) -> &SeriesWindow {
        &self.window
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        self.window.snapshot()
    }

    /// Holdings from the most recent message that carried them.
    pub fn latest_holdings(&self) -> Option<&Holdings> {
        self.latest_holdings.as_ref()
    }

    pub fn adapter(&self) -> &R {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut R {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> R {
        self.adapter
    }

    /// Push one decoded update and render.
    pub fn apply_update(&mut self, update: PortfolioUpdate) {
        self.window.push(update.sample);
        if let Some(holdings) = update.holdings {
            self.latest_holdings = Some(holdings);
        }
        let snapshot = self.window.snapshot();
        self.adapter.render(&snapshot);
    }

    /// Decode one raw payload and apply it. Returns whether the window changed.
    pub fn ingest_text(&mut self, raw: &str) -> bool {
        match decode_update(raw) {
            Ok(update) => {
                self.apply_update(update);
                true
            }
            Err(e) => {
                tracing::warn!("ignoring undecodable feed payload: {}", e);
                false
            }
        }
    }

    /// Run until the feed ends. See [`run_until`](Self::run_until).
    pub async fn run(&mut self) -> Result<ViewExit, StreamError> {
        self.run_until(std::future::pending()).await
    }

    /// Connect and apply updates until `shutdown` resolves or the feed ends.
    ///
    /// The connection is closed on every exit path. Feed failures are
    /// retried per the configured [`ReconnectPolicy`]; once it gives up the
    /// failure is returned as `StreamError::Ws`.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<ViewExit, StreamError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut attempt: u32 = 0;

        loop {
            let mut conn = FeedConnection::open(&self.config.endpoint, self.config.ws.clone())?;
            let outcome = self.drive(&mut conn, shutdown.as_mut()).await;

            if let Err(e) = conn.close().await {
                tracing::warn!(connection_id = %conn.id(), "error closing feed: {}", e);
            }
            let stats = conn.stats();
            tracing::info!(
                connection_id = %stats.connection_id,
                messages = stats.messages_received,
                decode_failures = stats.decode_failures,
                "feed connection finished"
            );

            match outcome {
                Outcome::Shutdown => return Ok(ViewExit::Stopped),
                Outcome::Closed { code, reason } => {
                    return Ok(ViewExit::FeedClosed { code, reason })
                }
                Outcome::Failed { error, connected } => {
                    if connected {
                        attempt = 0;
                    }
                    attempt += 1;

                    let Some(delay) = self.config.reconnect.delay_for(attempt) else {
                        tracing::error!("feed failed, not reconnecting: {}", error);
                        return Err(StreamError::Ws(error));
                    };

                    tracing::info!(
                        "feed failed ({}), reconnect attempt {} in {}ms",
                        error,
                        attempt,
                        delay.as_millis()
                    );
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => return Ok(ViewExit::Stopped),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn drive<S>(&mut self, conn: &mut FeedConnection, mut shutdown: Pin<&mut S>) -> Outcome
    where
        S: Future<Output = ()>,
    {
        let mut connected = false;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => return Outcome::Shutdown,
                event = conn.next_event() => match event {
                    Some(FeedEvent::Connected) => connected = true,
                    Some(FeedEvent::Update(update)) => self.apply_update(update),
                    Some(FeedEvent::Closed { code, reason }) => {
                        return Outcome::Closed { code, reason }
                    }
                    Some(FeedEvent::Error(error)) => {
                        return Outcome::Failed { error, connected }
                    }
                    None => {
                        return Outcome::Failed {
                            error: WsError::Closed {
                                code: None,
                                reason: "Feed task ended".into(),
                            },
                            connected,
                        }
                    }
                },
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
