//! Event payload serialization contract.

use crate::error::DomainError;
use crate::registry::EventShape;

/// Converts events to and from their textual payload.
///
/// The payload holds only the event body; the event name and version travel
/// in the record envelope.
pub trait EventSerializer<E>: Send + Sync {
    /// Renders the body of `event` as text.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the body cannot be rendered.
    fn serialize(&self, event: &E) -> Result<String, DomainError>;

    /// Parses `payload` as an instance of `shape`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if the payload does not decode
    /// into the shape.
    fn deserialize(&self, payload: &str, shape: &EventShape<E>) -> Result<E, DomainError>;
}
