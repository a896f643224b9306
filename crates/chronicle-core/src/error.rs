//! Domain error types.

use thiserror::Error;

/// Top-level error type shared by the event store, aggregates and repository.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required collaborator or argument is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No events exist for the requested aggregate.
    #[error("aggregate not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, max stored version {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: String,
        /// The version the caller expected.
        expected: i64,
        /// The highest version found in the store (`-1` when the stream is empty).
        actual: i64,
    },

    /// A persisted event name could not be resolved to a known event shape,
    /// or its payload does not decode into that shape.
    #[error("unknown event type {event_name:?}: {reason}")]
    UnknownEventType {
        /// The persisted event name.
        event_name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The storage medium failed or holds an unreadable record.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be read or is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DomainError {
    /// Builds an `UnknownEventType` error for an unregistered event name.
    #[must_use]
    pub fn unregistered(event_name: &str) -> Self {
        Self::UnknownEventType {
            event_name: event_name.to_owned(),
            reason: "no event shape registered under this name".to_owned(),
        }
    }

    /// Returns `true` if this is an optimistic concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type DomainResult<T> = Result<T, DomainError>;
