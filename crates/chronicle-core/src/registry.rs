//! Event-name resolution.
//!
//! Persisted records carry the event name as text. Before a payload can be
//! decoded the name has to be mapped back to a concrete shape. Every module
//! registers its own shapes in an [`EventTypeRegistry`] at startup; nothing is
//! discovered implicitly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

type Decoder<E> = dyn Fn(serde_json::Value) -> Result<E, serde_json::Error> + Send + Sync;

/// A concrete event shape: a name plus a decoder from a JSON body into the
/// domain's event type.
pub struct EventShape<E> {
    name: String,
    decode: Arc<Decoder<E>>,
}

impl<E> EventShape<E> {
    /// Shape whose body deserializes as `T` and converts into `E`.
    pub fn of<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Into<E> + 'static,
        E: 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(|value| serde_json::from_value::<T>(value).map(Into::into)),
        }
    }

    /// The event name this shape is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decodes a JSON body into an event.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body does not match the shape.
    pub fn decode(&self, value: serde_json::Value) -> Result<E, serde_json::Error> {
        (self.decode)(value)
    }
}

impl<E> Clone for EventShape<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<E> fmt::Debug for EventShape<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventShape").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Maps a persisted event name to a concrete event shape.
pub trait EventTypeResolver<E>: Send + Sync {
    /// Returns the shape registered for `event_name`, if any.
    fn resolve(&self, event_name: &str) -> Option<EventShape<E>>;
}

/// Explicit per-process registry of event shapes.
pub struct EventTypeRegistry<E> {
    shapes: HashMap<String, EventShape<E>>,
}

impl<E> Default for EventTypeRegistry<E> {
    fn default() -> Self {
        Self {
            shapes: HashMap::new(),
        }
    }
}

impl<E> EventTypeRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`, replacing any earlier registration.
    pub fn register<T>(&mut self, name: &str) -> &mut Self
    where
        T: DeserializeOwned + Into<E> + 'static,
        E: 'static,
    {
        if self
            .shapes
            .insert(name.to_owned(), EventShape::of::<T>(name))
            .is_some()
        {
            tracing::warn!(event_name = name, "event shape registered twice; keeping the last one");
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with<T>(mut self, name: &str) -> Self
    where
        T: DeserializeOwned + Into<E> + 'static,
        E: 'static,
    {
        self.register::<T>(name);
        self
    }

    /// Returns `true` if a shape is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Number of registered shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl<E> fmt::Debug for EventTypeRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.shapes.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EventTypeRegistry").field("shapes", &names).finish()
    }
}

impl<E> EventTypeResolver<E> for EventTypeRegistry<E> {
    fn resolve(&self, event_name: &str) -> Option<EventShape<E>> {
        self.shapes.get(event_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Signal {
        Raised(u32),
        Lowered,
    }

    #[derive(Deserialize)]
    struct Raised {
        level: u32,
    }

    impl From<Raised> for Signal {
        fn from(body: Raised) -> Self {
            Signal::Raised(body.level)
        }
    }

    #[derive(Deserialize)]
    struct Lowered {}

    impl From<Lowered> for Signal {
        fn from(_: Lowered) -> Self {
            Signal::Lowered
        }
    }

    fn registry() -> EventTypeRegistry<Signal> {
        EventTypeRegistry::new()
            .with::<Raised>("Raised")
            .with::<Lowered>("Lowered")
    }

    #[test]
    fn test_resolve_registered_name_decodes_body() {
        let shape = registry().resolve("Raised").unwrap();

        let event = shape.decode(serde_json::json!({ "level": 3 })).unwrap();

        assert_eq!(shape.name(), "Raised");
        assert_eq!(event, Signal::Raised(3));
    }

    #[test]
    fn test_resolve_unknown_name_returns_none() {
        assert!(registry().resolve("Bogus").is_none());
    }

    #[test]
    fn test_decode_mismatched_body_fails() {
        let shape = registry().resolve("Raised").unwrap();

        assert!(shape.decode(serde_json::json!({ "level": "high" })).is_err());
    }

    #[test]
    fn test_register_replaces_existing_shape() {
        let mut registry = registry();

        registry.register::<Lowered>("Raised");

        assert_eq!(registry.len(), 2);
        let event = registry
            .resolve("Raised")
            .unwrap()
            .decode(serde_json::json!({}))
            .unwrap();
        assert_eq!(event, Signal::Lowered);
    }

    #[test]
    fn test_debug_lists_names_sorted() {
        let rendered = format!("{:?}", registry());

        assert!(rendered.contains("[\"Lowered\", \"Raised\"]"));
    }
}
