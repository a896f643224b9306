//! File-backed implementation of the `EventStore` trait.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chronicle_core::clock::{Clock, SystemClock};
use chronicle_core::error::DomainError;
use chronicle_core::event::{DomainEvent, UNSPECIFIED_VERSION, validate_stream_key};
use chronicle_core::registry::EventTypeResolver;
use chronicle_core::serializer::EventSerializer;
use chronicle_core::store::{ConcurrencyPolicy, EventStore, Listeners, NewEventsListener};
use uuid::Uuid;

use crate::config::EventStoreConfig;
use crate::medium::{FileSystemMedium, StorageMedium};
use crate::record::{ALL_RECORDS_PATTERN, EventRecord, RecordName, stream_pattern};
use crate::serializer::JsonEventSerializer;

/// Event store writing one record per event into a directory of a
/// [`StorageMedium`].
///
/// Saves to the same stream are serialised by a per-stream async mutex held
/// from the version check until the last record is written. Reads take no
/// lock and see whatever records exist when they list the directory.
pub struct FileEventStore<E> {
    root_dir: PathBuf,
    medium: Arc<dyn StorageMedium>,
    serializer: Arc<dyn EventSerializer<E>>,
    resolver: Arc<dyn EventTypeResolver<E>>,
    clock: Arc<dyn Clock>,
    policy: ConcurrencyPolicy,
    stream_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    last_timestamp: Mutex<i64>,
    listeners: Listeners<E>,
}

impl<E: DomainEvent> FileEventStore<E> {
    /// Starts a builder. Root directory, medium, serializer and resolver are
    /// required.
    #[must_use]
    pub fn builder() -> FileEventStoreBuilder<E> {
        FileEventStoreBuilder::default()
    }

    /// Opens a file-system store with JSON payloads as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if the configured root
    /// directory is empty.
    pub fn from_config(
        config: &EventStoreConfig,
        resolver: Arc<dyn EventTypeResolver<E>>,
    ) -> Result<Self, DomainError> {
        Self::builder()
            .root_dir(config.root_dir.clone())
            .medium(Arc::new(FileSystemMedium::new()))
            .serializer(Arc::new(JsonEventSerializer::new()))
            .resolver(resolver)
            .policy(config.concurrency_policy)
            .build()
    }

    /// Directory holding the records.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// The active expected-version rule.
    #[must_use]
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Raw records of one stream in ascending version order. Event names are
    /// not resolved.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if a record cannot be read.
    pub async fn get_records_by_id(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<EventRecord>, DomainError> {
        validate_stream_key(aggregate_id)?;
        let mut records = Vec::new();
        for (_, path) in self.list_records(&stream_pattern(aggregate_id)).await? {
            records.push(self.load_record(&path).await?);
        }
        records.sort_by_key(|record| record.aggregate_version);
        Ok(records)
    }

    /// Every raw record in chronological order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if a record cannot be read.
    pub async fn get_all_records(&self) -> Result<Vec<EventRecord>, DomainError> {
        let mut records = Vec::new();
        for (_, path) in self.list_chronological().await? {
            records.push(self.load_record(&path).await?);
        }
        Ok(records)
    }

    /// The raw record with `event_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if a record cannot be read.
    pub async fn get_record(&self, event_id: Uuid) -> Result<Option<EventRecord>, DomainError> {
        for (_, path) in self.list_chronological().await? {
            let record = self.load_record(&path).await?;
            if record.event_id == event_id {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn list_records(
        &self,
        pattern: &str,
    ) -> Result<Vec<(RecordName, PathBuf)>, DomainError> {
        let paths = self.medium.list(&self.root_dir, pattern).await?;
        paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(RecordName::parse)
                    .ok_or_else(|| {
                        DomainError::Storage(format!("malformed record name {}", path.display()))
                    })?;
                Ok::<_, DomainError>((name, path))
            })
            .collect()
    }

    /// All records ordered by the timestamp in their name, ties broken by
    /// the full name.
    async fn list_chronological(&self) -> Result<Vec<(RecordName, PathBuf)>, DomainError> {
        let mut listed = self.list_records(ALL_RECORDS_PATTERN).await?;
        listed.sort();
        Ok(listed)
    }

    async fn load_record(&self, path: &Path) -> Result<EventRecord, DomainError> {
        let text = self.medium.open_for_reading(path).await?;
        EventRecord::from_json(&text).map_err(|e| {
            DomainError::Storage(format!("record {} is unreadable: {e}", path.display()))
        })
    }

    fn decode(&self, record: &EventRecord) -> Result<E, DomainError> {
        let shape = self
            .resolver
            .resolve(&record.event_name)
            .ok_or_else(|| DomainError::unregistered(&record.event_name))?;
        let mut event = self.serializer.deserialize(&record.payload, &shape)?;
        event.set_version(record.aggregate_version);
        Ok(event)
    }

    async fn current_max_version(&self, aggregate_id: &str) -> Result<Option<i64>, DomainError> {
        Ok(self
            .list_records(&stream_pattern(aggregate_id))
            .await?
            .into_iter()
            .map(|(name, _)| name.version)
            .max())
    }

    /// Next record timestamp; strictly greater than any issued before by
    /// this store, even if the clock stalls or steps back.
    fn next_timestamp(&self) -> Result<DateTime<Utc>, DomainError> {
        let now = self
            .clock
            .now()
            .timestamp_nanos_opt()
            .ok_or_else(|| {
                DomainError::Storage("clock is outside the nanosecond range".to_owned())
            })?;
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let nanos = if now > *last { now } else { *last + 1 };
        *last = nanos;
        Ok(DateTime::<Utc>::from_timestamp_nanos(nanos))
    }

    fn stream_lock(&self, aggregate_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .stream_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(aggregate_id.to_owned()).or_default())
    }

    /// Drops the stream's lock entry when nobody else holds or awaits it.
    fn release_stream_lock(&self, aggregate_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .stream_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(aggregate_id);
        }
    }

    async fn write_record(
        &self,
        aggregate_id: &str,
        event: &E,
        version: i64,
    ) -> Result<(), DomainError> {
        let timestamp = self.next_timestamp()?;
        let name = RecordName::new(timestamp, aggregate_id, version)?;
        let record = EventRecord {
            timestamp,
            event_id: Uuid::new_v4(),
            aggregate_id: aggregate_id.to_owned(),
            aggregate_version: version,
            event_name: event.event_type().to_owned(),
            payload: self.serializer.serialize(event)?,
        };
        self.medium
            .create_for_writing(&self.root_dir.join(name.file_name()), &record.to_json()?)
            .await
    }

    /// Check-then-write under the stream lock. Returns the last version.
    async fn append_locked(
        &self,
        aggregate_id: &str,
        events: &mut [E],
        expected_version: i64,
    ) -> Result<i64, DomainError> {
        let current_max = self.current_max_version(aggregate_id).await?;
        if self.policy.conflicts(expected_version, current_max) {
            let actual = current_max.unwrap_or(UNSPECIFIED_VERSION);
            tracing::warn!(
                expected_version,
                max_version = actual,
                policy = %self.policy,
                "concurrency conflict"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }

        let mut current = expected_version;
        for (written, event) in events.iter_mut().enumerate() {
            current += 1;
            event.set_version(current);
            if let Err(e) = self.write_record(aggregate_id, event, current).await {
                if written > 0 {
                    tracing::error!(
                        written,
                        failed_version = current,
                        error = %e,
                        "batch partially persisted"
                    );
                }
                return Err(e);
            }
        }
        Ok(current)
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for FileEventStore<E> {
    #[tracing::instrument(skip(self), fields(root = %self.root_dir.display()))]
    async fn get_events_by_id(&self, aggregate_id: &str) -> Result<Vec<E>, DomainError> {
        let records = self.get_records_by_id(aggregate_id).await?;
        tracing::debug!(count = records.len(), "loaded stream");
        records.iter().map(|record| self.decode(record)).collect()
    }

    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn save_events(
        &self,
        aggregate_id: &str,
        events: &mut [E],
        expected_version: i64,
    ) -> Result<i64, DomainError> {
        validate_stream_key(aggregate_id)?;
        check_version_range(expected_version, events.len())?;

        let lock = self.stream_lock(aggregate_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(aggregate_id, events, expected_version).await
        };
        self.release_stream_lock(aggregate_id, lock);

        let version = result?;
        if !events.is_empty() {
            tracing::info!(
                first_version = expected_version + 1,
                last_version = version,
                "events persisted"
            );
            self.listeners.notify(aggregate_id, events);
        }
        Ok(version)
    }

    #[tracing::instrument(skip(self))]
    async fn get_event(&self, event_id: Uuid) -> Result<Option<E>, DomainError> {
        self.get_record(event_id)
            .await?
            .map(|record| self.decode(&record))
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_events(&self) -> Result<Vec<Uuid>, DomainError> {
        let records = self.get_all_records().await?;
        tracing::debug!(count = records.len(), "listed all events");
        Ok(records.into_iter().map(|record| record.event_id).collect())
    }

    fn subscribe(&self, listener: Arc<dyn NewEventsListener<E>>) {
        self.listeners.add(listener);
    }
}

impl<E> fmt::Debug for FileEventStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEventStore")
            .field("root_dir", &self.root_dir)
            .field("policy", &self.policy)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FileEventStore`].
pub struct FileEventStoreBuilder<E> {
    root_dir: Option<PathBuf>,
    medium: Option<Arc<dyn StorageMedium>>,
    serializer: Option<Arc<dyn EventSerializer<E>>>,
    resolver: Option<Arc<dyn EventTypeResolver<E>>>,
    clock: Option<Arc<dyn Clock>>,
    policy: ConcurrencyPolicy,
}

impl<E> Default for FileEventStoreBuilder<E> {
    fn default() -> Self {
        Self {
            root_dir: None,
            medium: None,
            serializer: None,
            resolver: None,
            clock: None,
            policy: ConcurrencyPolicy::default(),
        }
    }
}

impl<E: DomainEvent> FileEventStoreBuilder<E> {
    /// Directory the records live in.
    #[must_use]
    pub fn root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    /// Medium the records are written to.
    #[must_use]
    pub fn medium(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.medium = Some(medium);
        self
    }

    /// Payload serializer.
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn EventSerializer<E>>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Event-name resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn EventTypeResolver<E>>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Timestamp source. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Expected-version rule. Defaults to
    /// [`ConcurrencyPolicy::StrictlyGreater`].
    #[must_use]
    pub fn policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if a required collaborator is
    /// missing or the root directory is empty.
    pub fn build(self) -> Result<FileEventStore<E>, DomainError> {
        let root_dir = self
            .root_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| missing("root directory"))?;
        let medium = self.medium.ok_or_else(|| missing("storage medium"))?;
        let serializer = self.serializer.ok_or_else(|| missing("event serializer"))?;
        let resolver = self.resolver.ok_or_else(|| missing("event type resolver"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        tracing::info!(
            root = %root_dir.display(),
            policy = %self.policy,
            "event store opened"
        );

        Ok(FileEventStore {
            root_dir,
            medium,
            serializer,
            resolver,
            clock,
            policy: self.policy,
            stream_locks: Mutex::new(HashMap::new()),
            last_timestamp: Mutex::new(i64::MIN),
            listeners: Listeners::new(),
        })
    }
}

/// Rejects an expected version below [`UNSPECIFIED_VERSION`] or one that
/// leaves no room for `count` more versions.
fn check_version_range(expected_version: i64, count: usize) -> Result<(), DomainError> {
    if expected_version < UNSPECIFIED_VERSION {
        return Err(DomainError::InvalidArgument(format!(
            "expected version {expected_version} is below {UNSPECIFIED_VERSION}"
        )));
    }
    i64::try_from(count)
        .ok()
        .and_then(|count| expected_version.checked_add(count))
        .map(|_| ())
        .ok_or_else(|| {
            DomainError::InvalidArgument(format!(
                "expected version {expected_version} leaves no room for {count} events"
            ))
        })
}

fn missing(what: &str) -> DomainError {
    DomainError::InvalidArgument(format!("{what} is required"))
}
