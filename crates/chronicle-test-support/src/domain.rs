//! Sample aggregate used across the workspace's tests.

use chronicle_core::aggregate::{AggregateChanges, AggregateRoot};
use chronicle_core::event::{DomainEvent, UNSPECIFIED_VERSION};
use chronicle_core::registry::EventTypeRegistry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name of [`TestDomainCreated`].
pub const CREATED: &str = "TestDomainCreated";
/// Event name of [`TestDomainDataChanged`].
pub const DATA_CHANGED: &str = "TestDomainDataChanged";
/// Event name of [`TestDomainAnnotated`].
pub const ANNOTATED: &str = "TestDomainAnnotated";

/// Emitted when a test domain object is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDomainCreated {
    /// The created object's identifier.
    pub id: Uuid,
}

/// Emitted when the object's data changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDomainDataChanged {
    /// The new data.
    pub data: String,
}

/// A remark with no effect on state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDomainAnnotated {
    /// Free text.
    pub note: String,
}

/// Event payload variants of the test domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestDomainEventKind {
    /// The object was created.
    Created(TestDomainCreated),
    /// The object's data changed.
    DataChanged(TestDomainDataChanged),
    /// A note was attached.
    Annotated(TestDomainAnnotated),
}

/// Test domain event: a stream position plus a payload variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDomainEvent {
    /// Position within the aggregate's stream.
    pub version: i64,
    /// Event-specific payload.
    pub kind: TestDomainEventKind,
}

impl TestDomainEvent {
    /// Wraps `kind` in an event whose version is not yet assigned.
    #[must_use]
    pub fn new(kind: TestDomainEventKind) -> Self {
        Self {
            version: UNSPECIFIED_VERSION,
            kind,
        }
    }

    /// Same as [`new`](Self::new) with an explicit version.
    #[must_use]
    pub fn at(version: i64, kind: TestDomainEventKind) -> Self {
        Self { version, kind }
    }

    /// A `TestDomainCreated` event for `id`.
    #[must_use]
    pub fn created(id: Uuid) -> Self {
        Self::new(TestDomainEventKind::Created(TestDomainCreated { id }))
    }

    /// A `TestDomainDataChanged` event carrying `data`.
    #[must_use]
    pub fn data_changed(data: &str) -> Self {
        Self::new(TestDomainEventKind::DataChanged(TestDomainDataChanged {
            data: data.to_owned(),
        }))
    }

    /// A `TestDomainAnnotated` event carrying `note`.
    #[must_use]
    pub fn annotated(note: &str) -> Self {
        Self::new(TestDomainEventKind::Annotated(TestDomainAnnotated {
            note: note.to_owned(),
        }))
    }
}

impl From<TestDomainCreated> for TestDomainEvent {
    fn from(body: TestDomainCreated) -> Self {
        Self::new(TestDomainEventKind::Created(body))
    }
}

impl From<TestDomainDataChanged> for TestDomainEvent {
    fn from(body: TestDomainDataChanged) -> Self {
        Self::new(TestDomainEventKind::DataChanged(body))
    }
}

impl From<TestDomainAnnotated> for TestDomainEvent {
    fn from(body: TestDomainAnnotated) -> Self {
        Self::new(TestDomainEventKind::Annotated(body))
    }
}

impl DomainEvent for TestDomainEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            TestDomainEventKind::Created(_) => CREATED,
            TestDomainEventKind::DataChanged(_) => DATA_CHANGED,
            TestDomainEventKind::Annotated(_) => ANNOTATED,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match &self.kind {
            TestDomainEventKind::Created(body) => serde_json::to_value(body),
            TestDomainEventKind::DataChanged(body) => serde_json::to_value(body),
            TestDomainEventKind::Annotated(body) => serde_json::to_value(body),
        }
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Registry with every test domain event shape.
#[must_use]
pub fn test_domain_registry() -> EventTypeRegistry<TestDomainEvent> {
    EventTypeRegistry::new()
        .with::<TestDomainCreated>(CREATED)
        .with::<TestDomainDataChanged>(DATA_CHANGED)
        .with::<TestDomainAnnotated>(ANNOTATED)
}

/// A minimal aggregate: created once, then accumulates data changes.
#[derive(Debug)]
pub struct TestDomain {
    id: Uuid,
    created: bool,
    data: Vec<String>,
    changes: AggregateChanges<TestDomainEvent>,
}

impl TestDomain {
    /// Creates the object, producing a `TestDomainCreated` event.
    #[must_use]
    pub fn create(id: Uuid) -> Self {
        let mut domain = <Self as AggregateRoot>::new(id);
        domain.apply_new_event(TestDomainEvent::created(id));
        domain
    }

    /// Changes the data, producing a `TestDomainDataChanged` event.
    pub fn change_data(&mut self, data: &str) {
        self.apply_new_event(TestDomainEvent::data_changed(data));
    }

    /// Produces one arbitrary data change.
    pub fn do_some_changes(&mut self) {
        self.change_data("some changes");
    }

    /// Attaches a note, producing a `TestDomainAnnotated` event.
    pub fn annotate(&mut self, note: &str) {
        self.apply_new_event(TestDomainEvent::annotated(note));
    }

    /// Whether a creation event has been applied.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Every data value applied so far, oldest first.
    #[must_use]
    pub fn data(&self) -> &[String] {
        &self.data
    }
}

impl AggregateRoot for TestDomain {
    type Id = Uuid;
    type Event = TestDomainEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            created: false,
            data: Vec::new(),
            changes: AggregateChanges::new(),
        }
    }

    fn aggregate_id(&self) -> &Uuid {
        &self.id
    }

    fn apply(&mut self, event: &TestDomainEvent) {
        match &event.kind {
            TestDomainEventKind::Created(_) => self.created = true,
            TestDomainEventKind::DataChanged(body) => self.data.push(body.data.clone()),
            TestDomainEventKind::Annotated(_) => {}
        }
    }

    fn changes(&self) -> &AggregateChanges<TestDomainEvent> {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut AggregateChanges<TestDomainEvent> {
        &mut self.changes
    }
}
