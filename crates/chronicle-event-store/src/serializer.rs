//! JSON payload serializer.

use chronicle_core::error::DomainError;
use chronicle_core::event::DomainEvent;
use chronicle_core::registry::EventShape;
use chronicle_core::serializer::EventSerializer;

/// Stores event bodies as compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl JsonEventSerializer {
    /// Creates a JSON serializer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<E: DomainEvent> EventSerializer<E> for JsonEventSerializer {
    fn serialize(&self, event: &E) -> Result<String, DomainError> {
        let body = event.to_payload().map_err(|e| {
            DomainError::Storage(format!("cannot serialize {} payload: {e}", event.event_type()))
        })?;
        serde_json::to_string(&body).map_err(|e| {
            DomainError::Storage(format!("cannot serialize {} payload: {e}", event.event_type()))
        })
    }

    fn deserialize(&self, payload: &str, shape: &EventShape<E>) -> Result<E, DomainError> {
        serde_json::from_str(payload)
            .and_then(|body| shape.decode(body))
            .map_err(|e| DomainError::UnknownEventType {
                event_name: shape.name().to_owned(),
                reason: format!("payload does not decode into the registered shape: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use chronicle_core::event::UNSPECIFIED_VERSION;
    use chronicle_core::registry::EventTypeResolver;
    use chronicle_test_support::{CREATED, DATA_CHANGED, TestDomainEvent, test_domain_registry};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_round_trip_preserves_payload() {
        // Arrange
        let serializer = JsonEventSerializer::new();
        let registry = test_domain_registry();
        let original = TestDomainEvent::data_changed("hello");

        // Act
        let text = serializer.serialize(&original).unwrap();
        let shape = registry.resolve(DATA_CHANGED).unwrap();
        let decoded = serializer.deserialize(&text, &shape).unwrap();

        // Assert
        assert_eq!(decoded, original);
        assert_eq!(decoded.version, UNSPECIFIED_VERSION);
    }

    #[test]
    fn test_payload_excludes_version() {
        let serializer = JsonEventSerializer::new();
        let id = Uuid::new_v4();
        let mut event = TestDomainEvent::created(id);
        event.version = 9;

        let text = serializer.serialize(&event).unwrap();

        assert_eq!(text, format!("{{\"id\":\"{id}\"}}"));
    }

    #[test]
    fn test_payload_of_wrong_shape_is_unknown_event_type() {
        let serializer = JsonEventSerializer::new();
        let shape = test_domain_registry().resolve(CREATED).unwrap();

        let result = serializer.deserialize("{\"data\":\"x\"}", &shape);

        match result {
            Err(DomainError::UnknownEventType { event_name, .. }) => {
                assert_eq!(event_name, CREATED);
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_is_unknown_event_type() {
        let serializer = JsonEventSerializer::new();
        let shape = test_domain_registry().resolve(DATA_CHANGED).unwrap();

        let result = serializer.deserialize("{not json", &shape);

        assert!(matches!(result, Err(DomainError::UnknownEventType { .. })));
    }
}
