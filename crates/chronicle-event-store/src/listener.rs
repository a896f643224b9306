//! Channel-backed notification of newly persisted events.

use chronicle_core::store::NewEventsListener;
use tokio::sync::broadcast;

/// One successful save as seen by subscribers.
#[derive(Debug, Clone)]
pub struct NewEvents<E> {
    /// Stream key of the aggregate the events belong to.
    pub aggregate_id: String,
    /// The persisted events with their assigned versions.
    pub events: Vec<E>,
}

/// Forwards saves to a `tokio` broadcast channel.
///
/// Sending never blocks; a save with no live receivers is dropped, and a
/// receiver that falls more than `capacity` saves behind loses the oldest.
#[derive(Debug, Clone)]
pub struct BroadcastListener<E> {
    sender: broadcast::Sender<NewEvents<E>>,
}

impl<E: Clone + Send + Sync + 'static> BroadcastListener<E> {
    /// Creates a listener buffering up to `capacity` saves per receiver.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Opens a receiver that sees every save from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NewEvents<E>> {
        self.sender.subscribe()
    }
}

impl<E: Clone + Send + Sync + 'static> NewEventsListener<E> for BroadcastListener<E> {
    fn on_new_events(&self, aggregate_id: &str, events: &[E]) {
        let message = NewEvents {
            aggregate_id: aggregate_id.to_owned(),
            events: events.to_vec(),
        };
        if self.sender.send(message).is_err() {
            tracing::trace!(aggregate_id, "no receivers for new events");
        }
    }
}
