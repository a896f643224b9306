//! Repository coupling aggregate replay with an event store.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::AggregateId;
use crate::store::EventStore;

/// Loads aggregates by replaying their history and saves their uncommitted
/// changes under the version they were loaded at.
pub struct Repository<A: AggregateRoot> {
    store: Arc<dyn EventStore<A::Event>>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: AggregateRoot> Repository<A> {
    /// Creates a repository backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore<A::Event>>) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }

    /// Starts a builder that validates its collaborators on `build`.
    #[must_use]
    pub fn builder() -> RepositoryBuilder<A> {
        RepositoryBuilder::default()
    }

    /// The underlying event store.
    #[must_use]
    pub fn event_store(&self) -> &Arc<dyn EventStore<A::Event>> {
        &self.store
    }

    /// Reconstitutes the aggregate `id` from its full history.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no events exist for `id`, and
    /// propagates any event store error.
    #[tracing::instrument(skip_all, fields(aggregate_id = %id))]
    pub async fn get_by_id(&self, id: A::Id) -> Result<A, DomainError> {
        let history = self.store.get_events_by_id(&id.stream_key()).await?;
        if history.is_empty() {
            return Err(DomainError::NotFound(id.to_string()));
        }

        let mut aggregate = A::new(id);
        aggregate.load_from_history(history);
        tracing::debug!(version = aggregate.version(), "aggregate reconstituted");
        Ok(aggregate)
    }

    /// Persists the aggregate's uncommitted changes.
    ///
    /// Does nothing when there are no changes. On success the changes are
    /// cleared and the aggregate takes the version returned by the store; on
    /// failure the aggregate is left exactly as it was, so the caller can
    /// reload, re-apply and retry.
    ///
    /// # Errors
    ///
    /// Propagates any event store error, including
    /// `DomainError::ConcurrencyConflict`.
    #[tracing::instrument(skip_all, fields(aggregate_id = %aggregate.aggregate_id()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<(), DomainError> {
        if aggregate.uncommitted_changes().is_empty() {
            return Ok(());
        }

        let key = aggregate.aggregate_id().stream_key();
        let mut changes = aggregate.uncommitted_changes().to_vec();
        let new_version = self
            .store
            .save_events(&key, &mut changes, aggregate.version())
            .await?;

        aggregate.clear_uncommitted_changes();
        aggregate.changes_mut().set_version(new_version);
        tracing::debug!(version = new_version, saved = changes.len(), "aggregate saved");
        Ok(())
    }
}

impl<A: AggregateRoot> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.store))
    }
}

impl<A: AggregateRoot> fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("aggregate", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Repository`].
pub struct RepositoryBuilder<A: AggregateRoot> {
    store: Option<Arc<dyn EventStore<A::Event>>>,
}

impl<A: AggregateRoot> Default for RepositoryBuilder<A> {
    fn default() -> Self {
        Self { store: None }
    }
}

impl<A: AggregateRoot> RepositoryBuilder<A> {
    /// Sets the event store.
    #[must_use]
    pub fn event_store(mut self, store: Arc<dyn EventStore<A::Event>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the repository.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if no event store was set.
    pub fn build(self) -> Result<Repository<A>, DomainError> {
        let store = self
            .store
            .ok_or_else(|| DomainError::InvalidArgument("event store is required".to_owned()))?;
        Ok(Repository::new(store))
    }
}
