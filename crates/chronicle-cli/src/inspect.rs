//! Read-only inspection of a store directory.
//!
//! The inspector works on record envelopes and never decodes payloads, so it
//! opens the store with an event type that has no values and an empty
//! registry.

use std::path::Path;
use std::sync::Arc;

use chronicle_core::event::DomainEvent;
use chronicle_core::registry::EventTypeRegistry;
use chronicle_core::store::EventStore;
use chronicle_event_store::{EventStoreConfig, FileEventStore};
use serde_json::{Value, json};

use crate::cli::Command;
use crate::error::AppError;

/// Event type of a store opened only for record inspection.
#[derive(Debug, Clone)]
pub enum Opaque {}

impl DomainEvent for Opaque {
    fn event_type(&self) -> &'static str {
        match *self {}
    }

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        match *self {}
    }

    fn version(&self) -> i64 {
        match *self {}
    }

    fn set_version(&mut self, _version: i64) {
        match *self {}
    }
}

/// Opens the store rooted at `dir` on the local file system.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` if `dir` is empty.
pub fn open(dir: &Path) -> Result<FileEventStore<Opaque>, AppError> {
    let config = EventStoreConfig::new(dir);
    Ok(FileEventStore::from_config(
        &config,
        Arc::new(EventTypeRegistry::new()),
    )?)
}

/// Runs one inspection command and returns its JSON rendering.
///
/// # Errors
///
/// Propagates store failures, and returns `AppError::RecordNotFound` when a
/// requested record does not exist.
pub async fn run(store: &FileEventStore<Opaque>, command: &Command) -> Result<Value, AppError> {
    match command {
        Command::Events => {
            let ids = store.get_all_events().await?;
            tracing::debug!(count = ids.len(), "listed events");
            Ok(json!(ids))
        }
        Command::Record { event_id } => {
            let record = store
                .get_record(*event_id)
                .await?
                .ok_or(AppError::RecordNotFound(*event_id))?;
            Ok(serde_json::to_value(record)?)
        }
        Command::Stream { aggregate_key } => {
            let records = store.get_records_by_id(aggregate_key).await?;
            tracing::debug!(count = records.len(), aggregate_key = %aggregate_key, "loaded stream");
            Ok(serde_json::to_value(records)?)
        }
    }
}
