//! File-backed event store for the Chronicle event-sourcing core.
//!
//! Every event is one record file named
//! `{timestamp:016X}#{stream_key}#{version}.event` under a root directory.
//! The name alone locates an aggregate's stream and orders all events
//! globally; the file holds the JSON [`EventRecord`](record::EventRecord).

pub mod config;
pub mod file_event_store;
pub mod listener;
pub mod medium;
pub mod record;
pub mod serializer;

pub use config::EventStoreConfig;
pub use file_event_store::{FileEventStore, FileEventStoreBuilder};
pub use listener::{BroadcastListener, NewEvents};
pub use medium::{FileSystemMedium, InMemoryMedium, StorageMedium};
pub use record::{EventRecord, RecordName};
pub use serializer::JsonEventSerializer;
