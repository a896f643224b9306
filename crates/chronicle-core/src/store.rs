//! Event store contract.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, UNSPECIFIED_VERSION};

/// Append-only, per-aggregate event log with optimistic concurrency control.
#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Loads all events of one aggregate, ordered by ascending version.
    ///
    /// Returns an empty vector when the aggregate has no events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if a record cannot be resolved
    /// or decoded, `DomainError::Storage` if the medium fails.
    async fn get_events_by_id(&self, aggregate_id: &str) -> Result<Vec<E>, DomainError>;

    /// Appends `events` to the stream of `aggregate_id`.
    ///
    /// Each event is assigned the next version after `expected_version`; the
    /// assignment is visible on `events` afterwards. Returns the last assigned
    /// version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` when the expected version
    /// fails the store's [`ConcurrencyPolicy`]; nothing is written in that
    /// case.
    /// Returns `DomainError::InvalidArgument` if `expected_version` is below
    /// [`UNSPECIFIED_VERSION`] or leaves no room for the batch.
    async fn save_events(
        &self,
        aggregate_id: &str,
        events: &mut [E],
        expected_version: i64,
    ) -> Result<i64, DomainError>;

    /// Finds one event by its identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if the event exists but cannot
    /// be resolved.
    async fn get_event(&self, event_id: Uuid) -> Result<Option<E>, DomainError>;

    /// Identifiers of every stored event in chronological order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the medium fails.
    async fn get_all_events(&self) -> Result<Vec<Uuid>, DomainError>;

    /// Registers a listener for newly persisted events.
    fn subscribe(&self, listener: Arc<dyn NewEventsListener<E>>);
}

/// Rule deciding whether an expected version conflicts with the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyPolicy {
    /// Conflict when records exist and `expected <= max stored version`.
    ///
    /// A caller holding the current version of a persisted aggregate is
    /// rejected under this rule, so repeated saves through a repository only
    /// succeed with [`ConcurrencyPolicy::ExactMatch`].
    #[default]
    StrictlyGreater,
    /// Conflict when `expected` differs from the max stored version
    /// (`-1` for an empty stream).
    ExactMatch,
}

impl ConcurrencyPolicy {
    /// Returns `true` if saving with `expected` must be rejected given the
    /// highest stored version (`None` for an empty stream).
    #[must_use]
    pub fn conflicts(self, expected: i64, current_max: Option<i64>) -> bool {
        match self {
            Self::StrictlyGreater => current_max.is_some_and(|max| expected <= max),
            Self::ExactMatch => expected != current_max.unwrap_or(UNSPECIFIED_VERSION),
        }
    }
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrictlyGreater => f.write_str("strictly-greater"),
            Self::ExactMatch => f.write_str("exact-match"),
        }
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strictly-greater" => Ok(Self::StrictlyGreater),
            "exact-match" => Ok(Self::ExactMatch),
            other => Err(DomainError::Configuration(format!(
                "unknown concurrency policy {other:?} (expected strictly-greater or exact-match)"
            ))),
        }
    }
}

/// Observer of events persisted by an event store.
///
/// Called synchronously after a successful save. Delivery is at most once;
/// a listener registered after a save never sees that save.
pub trait NewEventsListener<E>: Send + Sync {
    /// Receives the events just persisted for `aggregate_id`.
    fn on_new_events(&self, aggregate_id: &str, events: &[E]);
}

impl<E, F> NewEventsListener<E> for F
where
    F: Fn(&str, &[E]) + Send + Sync,
{
    fn on_new_events(&self, aggregate_id: &str, events: &[E]) {
        self(aggregate_id, events);
    }
}

/// Set of registered listeners, shared by event store implementations.
pub struct Listeners<E> {
    inner: RwLock<Vec<Arc<dyn NewEventsListener<E>>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Vec::new()),
        }
    }
}

impl<E> Listeners<E> {
    /// Creates an empty listener set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn add(&self, listener: Arc<dyn NewEventsListener<E>>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `events` to every listener in registration order.
    pub fn notify(&self, aggregate_id: &str, events: &[E]) {
        // Clone the list so listeners may subscribe further listeners.
        let listeners = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_new_events(aggregate_id, events);
        }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}
