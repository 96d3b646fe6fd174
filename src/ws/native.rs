//! Native feed connection — `tokio-tungstenite`.
//!
//! - Background tokio task owns the socket for its whole life
//! - Payloads decoded on the task; undecodable frames dropped and counted
//! - Stream-based, order-preserving event delivery to the consumer
//! - No reconnection: a connection instance ends at its first terminal event

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use pin_project_lite::pin_project;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::domain::portfolio::{decode_update, PortfolioUpdate};
use crate::error::WsError;
use crate::ws::{ConnectionState, ConnectionStats, FeedEndpoint, FeedEvent, WsConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

// ─── Commands from public API to background task ─────────────────────────────

enum Command {
    Close,
}

// ─── Shared counters ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    messages: AtomicU64,
    decode_failures: AtomicU64,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    id: Uuid,
    url: String,
    config: WsConfig,
    event_tx: mpsc::Sender<FeedEvent>,
    /// Queue slot held back for the terminal event.
    terminal_slot: Option<OwnedPermit<FeedEvent>>,
    cmd_rx: mpsc::Receiver<Command>,
    state: Arc<AtomicU8>,
    counters: Arc<Counters>,
}

enum Delivery {
    Sent,
    CloseRequested,
    ReceiverGone,
}

impl TaskState {
    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Queue an event, waiting for room. A close request wins over a full queue.
    async fn deliver(&mut self, event: FeedEvent) -> Delivery {
        tokio::select! {
            biased;
            _ = self.cmd_rx.recv() => Delivery::CloseRequested,
            sent = self.event_tx.send(event) => match sent {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::ReceiverGone,
            },
        }
    }

    /// Publish the single terminal event and mark the connection closed.
    ///
    /// Never waits: the event goes into the reserved slot even when the
    /// queue is full.
    fn finish(&mut self, terminal: FeedEvent) {
        self.set_state(ConnectionState::Closed);
        match self.terminal_slot.take() {
            Some(slot) => {
                slot.send(terminal);
            }
            None => tracing::warn!(
                connection_id = %self.id,
                "terminal feed event already sent, dropping {:?}",
                terminal
            ),
        }
    }

    fn decode(&self, text: &str) -> Option<PortfolioUpdate> {
        self.counters.messages.fetch_add(1, Ordering::Relaxed);
        match decode_update(text) {
            Ok(update) => Some(update),
            Err(e) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    connection_id = %self.id,
                    "dropping undecodable feed message: {} (raw={})",
                    e,
                    text
                );
                None
            }
        }
    }
}

// ─── Public FeedConnection ───────────────────────────────────────────────────

pin_project! {
    /// One push connection to a portfolio feed.
    ///
    /// Created by [`FeedConnection::open`], which returns immediately while the
    /// handshake runs on a background task. Events arrive through the `Stream`
    /// impl (or [`next_event`](Self::next_event)) in the order the socket
    /// received them; the stream ends after the first terminal event.
    ///
    /// [`close`](Self::close) is idempotent. Dropping the handle without
    /// closing asks the task to send a close frame and exit on its own.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use portfolio_stream::ws::{FeedEndpoint, FeedEvent, WsConfig};
    /// use portfolio_stream::ws::native::FeedConnection;
    /// use futures_util::StreamExt;
    ///
    /// let mut conn = FeedConnection::open(&FeedEndpoint::default(), WsConfig::default())?;
    /// while let Some(event) = conn.next().await {
    ///     if let FeedEvent::Update(update) = event {
    ///         println!("{} @ {}", update.sample.value(), update.sample.timestamp());
    ///     }
    /// }
    /// conn.close().await?;
    /// ```
    pub struct FeedConnection {
        id: Uuid,
        url: String,
        config: WsConfig,
        #[pin]
        event_rx: mpsc::Receiver<FeedEvent>,
        cmd_tx: Option<mpsc::Sender<Command>>,
        task_handle: Option<JoinHandle<()>>,
        state: Arc<AtomicU8>,
        counters: Arc<Counters>,
    }

    impl PinnedDrop for FeedConnection {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(cmd_tx) = this.cmd_tx.take() {
                let _ = cmd_tx.try_send(Command::Close);
                tracing::debug!(
                    connection_id = %this.id,
                    "feed connection dropped without close"
                );
            }
        }
    }
}

impl FeedConnection {
    /// Validate the endpoint and start connecting. Does not wait for the handshake.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(endpoint: &FeedEndpoint, config: WsConfig) -> Result<Self, WsError> {
        endpoint.validate()?;
        let url = endpoint.url();
        url.as_str()
            .into_client_request()
            .map_err(|e| WsError::InvalidUrl(e.to_string()))?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WsError::NoRuntime)?;

        let id = Uuid::new_v4();
        // One slot beyond the configured capacity stays reserved for the terminal event.
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1) + 1);
        let terminal_slot = event_tx
            .clone()
            .try_reserve_owned()
            .map_err(|_| WsError::ConnectionFailed("event queue unavailable".into()))?;
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let state = Arc::new(AtomicU8::new(ConnectionState::Connecting as u8));
        let counters = Arc::new(Counters::default());

        let task = TaskState {
            id,
            url: url.clone(),
            config: config.clone(),
            event_tx,
            terminal_slot: Some(terminal_slot),
            cmd_rx,
            state: Arc::clone(&state),
            counters: Arc::clone(&counters),
        };

        tracing::info!(connection_id = %id, url = %url, "opening feed connection");
        let handle = runtime.spawn(run_task(task));

        Ok(Self {
            id,
            url,
            config,
            event_rx,
            cmd_tx: Some(cmd_tx),
            task_handle: Some(handle),
            state,
            counters,
        })
    }

    /// Close the connection and wait for the transport task to finish.
    ///
    /// The first call emits the terminal event (if none was emitted yet);
    /// later calls return `Ok(())` and do nothing.
    pub async fn close(&mut self) -> Result<(), WsError> {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return Ok(());
        };
        let _ = cmd_tx.try_send(Command::Close);
        drop(cmd_tx);

        if let Some(handle) = self.task_handle.take() {
            let abort = handle.abort_handle();
            let timeout = Duration::from_millis(self.config.close_timeout_ms);
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    tracing::error!(connection_id = %self.id, "feed task panicked: {}", e);
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    tracing::warn!(
                        connection_id = %self.id,
                        "feed task did not stop within {:?}, aborting",
                        timeout
                    );
                    abort.abort();
                }
            }
        }

        self.state.store(ConnectionState::Closed as u8, Ordering::SeqCst);
        tracing::info!(connection_id = %self.id, "feed connection closed");
        Ok(())
    }

    /// Next event, or `None` once the connection has ended.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Whether `close()` has already been called.
    pub fn is_closed_by_owner(&self) -> bool {
        self.cmd_tx.is_none()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            connection_id: self.id,
            messages_received: self.counters.messages.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Stream for FeedConnection {
    type Item = FeedEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        this.event_rx.poll_recv(cx)
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    // ── 1. Handshake (a close request cancels it) ───────────────────────
    let timeout = Duration::from_millis(state.config.connect_timeout_ms);
    let connected = tokio::select! {
        biased;
        _ = state.cmd_rx.recv() => {
            tracing::info!(connection_id = %state.id, "closed before handshake completed");
            state.finish(FeedEvent::Closed {
                code: None,
                reason: "Closed before connect".into(),
            });
            return;
        }
        result = tokio::time::timeout(timeout, connect_async(state.url.as_str())) => result,
    };

    let ws_stream = match connected {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            tracing::error!(connection_id = %state.id, "feed connection failed: {}", e);
            state.finish(FeedEvent::Error(WsError::from(e)));
            return;
        }
        Err(_) => {
            tracing::error!(connection_id = %state.id, "feed connection timed out");
            state.finish(FeedEvent::Error(WsError::Timeout(state.config.connect_timeout_ms)));
            return;
        }
    };

    // ── 2. Open ─────────────────────────────────────────────────────────
    state.set_state(ConnectionState::Open);
    tracing::info!(connection_id = %state.id, "feed connected");
    let (mut sink, mut source) = ws_stream.split();

    match state.deliver(FeedEvent::Connected).await {
        Delivery::Sent => {}
        Delivery::CloseRequested => {
            let terminal = close_gracefully(&mut sink).await;
            state.finish(terminal);
            return;
        }
        Delivery::ReceiverGone => {
            let _ = sink.close().await;
            state.set_state(ConnectionState::Closed);
            return;
        }
    }

    // ── 3. Receive loop ─────────────────────────────────────────────────
    let terminal = loop {
        tokio::select! {
            _ = state.cmd_rx.recv() => {
                break close_gracefully(&mut sink).await;
            }

            msg = source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(update) = state.decode(text.as_str()) else {
                            continue;
                        };
                        match state.deliver(FeedEvent::Update(update)).await {
                            Delivery::Sent => {}
                            Delivery::CloseRequested => break close_gracefully(&mut sink).await,
                            Delivery::ReceiverGone => {
                                let _ = sink.close().await;
                                state.set_state(ConnectionState::Closed);
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::warn!(connection_id = %state.id, "failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!(
                            connection_id = %state.id,
                            "feed closed by server: code={} reason={}",
                            code,
                            reason
                        );
                        break classify_close(code, reason);
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame
                    Some(Err(e)) => {
                        tracing::error!(connection_id = %state.id, "feed transport error: {}", e);
                        break FeedEvent::Error(WsError::from(e));
                    }
                    None => {
                        tracing::warn!(
                            connection_id = %state.id,
                            "feed stream ended without close frame"
                        );
                        break FeedEvent::Error(WsError::Closed {
                            code: None,
                            reason: "Stream ended".into(),
                        });
                    }
                }
            }
        }
    };

    state.finish(terminal);
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Send a normal close frame; the returned event reports an owner-initiated close.
async fn close_gracefully(sink: &mut WsSink) -> FeedEvent {
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "Client disconnect".into(),
        })))
        .await;
    let _ = sink.close().await;
    FeedEvent::Closed {
        code: Some(1000),
        reason: "Client disconnect".into(),
    }
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.as_str().to_owned()),
        None => (1005, "No close frame".into()),
    }
}

/// Normal (1000), going-away (1001) and status-less (1005) closes are clean.
/// Anything else is a failure.
fn classify_close(code: u16, reason: String) -> FeedEvent {
    match code {
        1000 | 1001 | 1005 => FeedEvent::Closed {
            code: Some(code),
            reason,
        },
        _ => FeedEvent::Error(WsError::Closed {
            code: Some(code),
            reason,
        }),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_close_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = extract_close(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_extract_close_no_frame() {
        let (code, reason) = extract_close(None);
        assert_eq!(code, 1005);
        assert_eq!(reason, "No close frame");
    }

    #[test]
    fn test_classify_close() {
        assert!(matches!(
            classify_close(1000, "bye".into()),
            FeedEvent::Closed { code: Some(1000), .. }
        ));
        assert!(matches!(
            classify_close(1001, "restart".into()),
            FeedEvent::Closed { code: Some(1001), .. }
        ));
        assert_eq!(
            classify_close(1011, "boom".into()),
            FeedEvent::Error(WsError::Closed {
                code: Some(1011),
                reason: "boom".into()
            })
        );
    }

    #[test]
    fn test_open_without_runtime() {
        let result = FeedConnection::open(&FeedEndpoint::default(), WsConfig::default());
        assert!(matches!(result, Err(WsError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_open_rejects_non_ws_scheme() {
        let endpoint = FeedEndpoint::new("http://localhost:8080");
        let result = FeedConnection::open(&endpoint, WsConfig::default());
        assert!(matches!(result, Err(WsError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_feed_reports_error_then_ends() {
        let endpoint = FeedEndpoint::from_host_port("127.0.0.1", 9);
        let config = WsConfig {
            connect_timeout_ms: 2_000,
            ..Default::default()
        };
        let mut conn = FeedConnection::open(&endpoint, config).unwrap();
        assert!(!conn.is_open());

        let first = conn.next_event().await.expect("terminal event");
        assert!(first.is_terminal(), "got {first:?}");
        assert!(matches!(first, FeedEvent::Error(_)));
        assert!(conn.next_event().await.is_none());
        assert_eq!(conn.state(), ConnectionState::Closed);

        conn.close().await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_before_connect_is_idempotent() {
        let endpoint = FeedEndpoint::from_host_port("127.0.0.1", 9);
        let mut conn = FeedConnection::open(&endpoint, WsConfig::default()).unwrap();
        conn.close().await.unwrap();
        assert!(conn.is_closed_by_owner());
        conn.close().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);

        let mut terminals = 0;
        while let Some(event) = conn.next_event().await {
            if event.is_terminal() {
                terminals += 1;
            }
        }
        assert_eq!(terminals, 1);
    }
}
