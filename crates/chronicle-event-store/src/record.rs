//! Persisted record envelope and record naming.

use std::fmt;

use chrono::{DateTime, Utc};
use chronicle_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extension of every record file.
pub const RECORD_EXTENSION: &str = ".event";

/// Listing pattern matching every record in a store directory.
pub const ALL_RECORDS_PATTERN: &str = "*#*#*.event";

/// Listing pattern matching the records of one stream.
#[must_use]
pub fn stream_pattern(stream_key: &str) -> String {
    format!("*#{stream_key}#*{RECORD_EXTENSION}")
}

/// One persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// When the record was written; also encoded in the record name.
    pub timestamp: DateTime<Utc>,
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// Stream key of the owning aggregate.
    pub aggregate_id: String,
    /// Position within the aggregate's stream.
    pub aggregate_version: i64,
    /// Event type name used to resolve the payload's shape.
    pub event_name: String,
    /// Serialized event body.
    pub payload: String,
}

impl EventRecord {
    /// Parses a record from its stored text.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the text is not a valid record.
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text)
            .map_err(|e| DomainError::Storage(format!("unreadable event record: {e}")))
    }

    /// Renders the record as stored text.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if rendering fails.
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::Storage(format!("cannot render event record: {e}")))
    }
}

/// Parsed form of a record file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordName {
    /// Nanoseconds since the Unix epoch.
    pub timestamp: u64,
    /// Stream key of the owning aggregate.
    pub stream_key: String,
    /// Position within the aggregate's stream.
    pub version: i64,
}

impl RecordName {
    /// Name for a record written at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` for instants before the Unix epoch or
    /// beyond the nanosecond range.
    pub fn new(
        timestamp: DateTime<Utc>,
        stream_key: &str,
        version: i64,
    ) -> Result<Self, DomainError> {
        let nanos = timestamp
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                DomainError::Storage(format!("timestamp {timestamp} cannot name a record"))
            })?;
        Ok(Self {
            timestamp: nanos,
            stream_key: stream_key.to_owned(),
            version,
        })
    }

    /// Parses a file name such as `0000000000000064#abc#0.event`.
    #[must_use]
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(RECORD_EXTENSION)?;
        let mut parts = stem.split('#');
        let timestamp = u64::from_str_radix(parts.next()?, 16).ok()?;
        let stream_key = parts.next()?.to_owned();
        let version = parts.next()?.parse().ok()?;
        if parts.next().is_some() || stream_key.is_empty() {
            return None;
        }
        Some(Self {
            timestamp,
            stream_key,
            version,
        })
    }

    /// The file name for this record.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:016X}#{}#{}{RECORD_EXTENSION}",
            self.timestamp, self.stream_key, self.version
        )
    }
}
