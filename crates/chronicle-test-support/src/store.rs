//! Mock `EventStore` implementations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::event::DomainEvent;
use chronicle_core::store::{EventStore, Listeners, NewEventsListener};
use uuid::Uuid;

/// One recorded `save_events` call.
#[derive(Debug, Clone)]
pub struct SaveCall<E> {
    /// Stream key passed to the store.
    pub aggregate_id: String,
    /// Expected version passed to the store.
    pub expected_version: i64,
    /// Events after version assignment.
    pub events: Vec<E>,
}

/// An event store that serves a fixed history for every identity and records
/// all `save_events` calls. Saved events are appended to the served history,
/// versions are assigned after `expected_version` and listeners are notified,
/// but no concurrency check is made.
pub struct RecordingEventStore<E> {
    history: Mutex<Vec<E>>,
    saves: Mutex<Vec<SaveCall<E>>>,
    listeners: Listeners<E>,
}

impl<E: DomainEvent> RecordingEventStore<E> {
    /// Create a store that returns `history` from `get_events_by_id`.
    #[must_use]
    pub fn new(history: Vec<E>) -> Self {
        Self {
            history: Mutex::new(history),
            saves: Mutex::new(Vec::new()),
            listeners: Listeners::new(),
        }
    }

    /// Returns a snapshot of all recorded saves.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saves(&self) -> Vec<SaveCall<E>> {
        self.saves.lock().unwrap().clone()
    }

    /// Returns the history as it stands, including saved events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn history(&self) -> Vec<E> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for RecordingEventStore<E> {
    async fn get_events_by_id(&self, _aggregate_id: &str) -> Result<Vec<E>, DomainError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn save_events(
        &self,
        aggregate_id: &str,
        events: &mut [E],
        expected_version: i64,
    ) -> Result<i64, DomainError> {
        let mut current = expected_version;
        for event in events.iter_mut() {
            current += 1;
            event.set_version(current);
        }
        self.history.lock().unwrap().extend(events.iter().cloned());
        self.saves.lock().unwrap().push(SaveCall {
            aggregate_id: aggregate_id.to_owned(),
            expected_version,
            events: events.to_vec(),
        });
        self.listeners.notify(aggregate_id, events);
        Ok(current)
    }

    async fn get_event(&self, _event_id: Uuid) -> Result<Option<E>, DomainError> {
        Ok(None)
    }

    async fn get_all_events(&self) -> Result<Vec<Uuid>, DomainError> {
        Ok(Vec::new())
    }

    fn subscribe(&self, listener: Arc<dyn NewEventsListener<E>>) {
        self.listeners.add(listener);
    }
}

/// An event store that holds nothing and silently accepts saves. Useful for
/// "aggregate not found" scenarios.
#[derive(Debug, Default)]
pub struct EmptyEventStore;

#[async_trait]
impl<E: DomainEvent> EventStore<E> for EmptyEventStore {
    async fn get_events_by_id(&self, _aggregate_id: &str) -> Result<Vec<E>, DomainError> {
        Ok(vec![])
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn save_events(
        &self,
        _aggregate_id: &str,
        events: &mut [E],
        expected_version: i64,
    ) -> Result<i64, DomainError> {
        Ok(expected_version + events.len() as i64)
    }

    async fn get_event(&self, _event_id: Uuid) -> Result<Option<E>, DomainError> {
        Ok(None)
    }

    async fn get_all_events(&self) -> Result<Vec<Uuid>, DomainError> {
        Ok(vec![])
    }

    fn subscribe(&self, _listener: Arc<dyn NewEventsListener<E>>) {}
}

/// An event store that always returns a storage error. Useful for testing
/// error-handling paths.
#[derive(Debug, Default)]
pub struct FailingEventStore;

fn refused() -> DomainError {
    DomainError::Storage("connection refused".into())
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for FailingEventStore {
    async fn get_events_by_id(&self, _aggregate_id: &str) -> Result<Vec<E>, DomainError> {
        Err(refused())
    }

    async fn save_events(
        &self,
        _aggregate_id: &str,
        _events: &mut [E],
        _expected_version: i64,
    ) -> Result<i64, DomainError> {
        Err(refused())
    }

    async fn get_event(&self, _event_id: Uuid) -> Result<Option<E>, DomainError> {
        Err(refused())
    }

    async fn get_all_events(&self) -> Result<Vec<Uuid>, DomainError> {
        Err(refused())
    }

    fn subscribe(&self, _listener: Arc<dyn NewEventsListener<E>>) {}
}
