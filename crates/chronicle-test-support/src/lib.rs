//! Shared test doubles and a sample aggregate for the Chronicle workspace.

mod clock;
mod domain;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use domain::{
    ANNOTATED, CREATED, DATA_CHANGED, TestDomain, TestDomainAnnotated, TestDomainCreated,
    TestDomainDataChanged, TestDomainEvent, TestDomainEventKind, test_domain_registry,
};
pub use store::{EmptyEventStore, FailingEventStore, RecordingEventStore, SaveCall};
