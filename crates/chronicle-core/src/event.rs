//! Domain event and aggregate identity abstractions.

use std::fmt;

use uuid::Uuid;

use crate::error::DomainError;

/// Version of an aggregate that has not applied any event yet.
pub const UNSPECIFIED_VERSION: i64 = -1;

/// Characters that may not appear in a stream key because the store uses them
/// in record names and listing patterns.
const RESERVED_KEY_CHARS: &[char] = &['#', '*', '?', '/', '\\'];

/// Trait that all domain events implement.
///
/// A domain usually implements this on a closed enum whose variants are the
/// event shapes it knows about. The variant's tag is persisted as the event
/// name, its body as the payload.
pub trait DomainEvent: Clone + Send + Sync + fmt::Debug + 'static {
    /// Returns the event type name (the shape tag used for resolution).
    fn event_type(&self) -> &'static str;

    /// Serializes the variant body, without the version, to JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the body cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Position of this event within its aggregate's stream.
    fn version(&self) -> i64;

    /// Assigns the stream position. Only the event store calls this.
    fn set_version(&mut self, version: i64);
}

/// Identity of an aggregate.
///
/// The stream key is the compact textual form written into record names and
/// used to locate an aggregate's stream.
pub trait AggregateId: Clone + Send + Sync + fmt::Display + 'static {
    /// Returns the compact stream key for this identity.
    fn stream_key(&self) -> String;
}

impl AggregateId for Uuid {
    fn stream_key(&self) -> String {
        self.simple().to_string()
    }
}

impl AggregateId for String {
    fn stream_key(&self) -> String {
        self.clone()
    }
}

impl AggregateId for u64 {
    fn stream_key(&self) -> String {
        self.to_string()
    }
}

impl AggregateId for i64 {
    fn stream_key(&self) -> String {
        self.to_string()
    }
}

/// Checks that `key` can be embedded in a record name.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` if the key is empty or contains a
/// reserved character.
pub fn validate_stream_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() {
        return Err(DomainError::InvalidArgument(
            "aggregate stream key must not be empty".to_owned(),
        ));
    }
    if let Some(c) = key.chars().find(|c| RESERVED_KEY_CHARS.contains(c)) {
        return Err(DomainError::InvalidArgument(format!(
            "aggregate stream key {key:?} contains reserved character {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_stream_key_is_compact_hex() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();

        assert_eq!(id.stream_key(), "67e5504410b1426f9247bb680e5fe0c8");
    }

    #[test]
    fn test_numeric_and_string_keys_use_display_form() {
        assert_eq!(42_u64.stream_key(), "42");
        assert_eq!((-7_i64).stream_key(), "-7");
        assert_eq!("order-1".to_owned().stream_key(), "order-1");
    }

    #[test]
    fn test_validate_stream_key_rejects_reserved_characters() {
        for key in ["a#b", "a*", "?", "a/b", "a\\b"] {
            let result = validate_stream_key(key);
            assert!(
                matches!(result, Err(DomainError::InvalidArgument(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_stream_key_rejects_empty_key() {
        assert!(matches!(
            validate_stream_key(""),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_stream_key_accepts_plain_keys() {
        assert!(validate_stream_key("67e5504410b1426f9247bb680e5fe0c8").is_ok());
        assert!(validate_stream_key("order-1").is_ok());
    }
}
