//! Render adapters: where window snapshots go after every update.
//!
//! The window does not know how it is displayed. Anything implementing
//! [`RenderAdapter`] receives a fresh [`SeriesSnapshot`] after each accepted
//! sample; closures work directly.

use crate::domain::portfolio::SeriesSnapshot;

/// Receives the full current series after every change.
///
/// Called in sample order, at most once per accepted sample, before the next
/// sample is applied.
pub trait RenderAdapter {
    fn render(&mut self, snapshot: &SeriesSnapshot);
}

impl<F> RenderAdapter for F
where
    F: FnMut(&SeriesSnapshot),
{
    fn render(&mut self, snapshot: &SeriesSnapshot) {
        self(snapshot)
    }
}

/// Adapter that draws nothing; for running the feed headless.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl RenderAdapter for Headless {
    fn render(&mut self, _snapshot: &SeriesSnapshot) {}
}

#[cfg(feature = "ws-native")]
pub use publisher::{snapshot_stream, SnapshotPublisher};

#[cfg(feature = "ws-native")]
mod publisher {
    use futures_util::stream::Stream;
    use tokio::sync::watch;

    use super::RenderAdapter;
    use crate::domain::portfolio::SeriesSnapshot;

    /// Adapter that publishes each snapshot on a `watch` channel.
    ///
    /// Lets a UI living on another task read the latest series without
    /// sharing the view. Slow readers only ever see the newest snapshot.
    #[derive(Debug)]
    pub struct SnapshotPublisher {
        tx: watch::Sender<SeriesSnapshot>,
    }

    impl Default for SnapshotPublisher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SnapshotPublisher {
        pub fn new() -> Self {
            let (tx, _rx) = watch::channel(SeriesSnapshot::default());
            Self { tx }
        }

        pub fn subscribe(&self) -> watch::Receiver<SeriesSnapshot> {
            self.tx.subscribe()
        }

        pub fn latest(&self) -> SeriesSnapshot {
            self.tx.borrow().clone()
        }

        /// Stream of snapshots published after this call.
        pub fn stream(&self) -> impl Stream<Item = SeriesSnapshot> {
            snapshot_stream(self.tx.subscribe())
        }
    }

    impl RenderAdapter for SnapshotPublisher {
        fn render(&mut self, snapshot: &SeriesSnapshot) {
            self.tx.send_replace(snapshot.clone());
        }
    }

    /// Turn a snapshot receiver into a `Stream` of changes.
    ///
    /// Ends when the publishing side is dropped.
    pub fn snapshot_stream(
        mut rx: watch::Receiver<SeriesSnapshot>,
    ) -> impl Stream<Item = SeriesSnapshot> {
        async_stream::stream! {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                yield snapshot;
            }
        }
    }
}
