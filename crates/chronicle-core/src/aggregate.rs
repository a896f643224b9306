//! Aggregate root abstraction.

use crate::event::{AggregateId, DomainEvent, UNSPECIFIED_VERSION};

/// Stream position and pending changes that every aggregate root embeds.
#[derive(Debug, Clone)]
pub struct AggregateChanges<E> {
    version: i64,
    uncommitted: Vec<E>,
}

impl<E> Default for AggregateChanges<E> {
    fn default() -> Self {
        Self {
            version: UNSPECIFIED_VERSION,
            uncommitted: Vec::new(),
        }
    }
}

impl<E> AggregateChanges<E> {
    /// Creates bookkeeping for an aggregate that has applied no events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest version applied to the owning aggregate.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Overwrites the recorded version.
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Events produced by live behavior that are not yet persisted.
    #[must_use]
    pub fn uncommitted(&self) -> &[E] {
        &self.uncommitted
    }

    fn push(&mut self, event: E) {
        self.uncommitted.push(event);
    }

    fn clear(&mut self) {
        self.uncommitted.clear();
    }
}

/// Trait for aggregate roots that reconstitute from event history.
///
/// Implementors provide state mutation in [`apply`](AggregateRoot::apply),
/// usually a `match` over their event enum where variants without a state
/// effect fall through. Replay and live mutation both go through `apply`, so
/// state and the event log cannot diverge.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The identity type of this aggregate.
    type Id: AggregateId;

    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Creates an empty instance with version [`UNSPECIFIED_VERSION`].
    fn new(id: Self::Id) -> Self;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &Self::Id;

    /// Mutates internal state for one event.
    fn apply(&mut self, event: &Self::Event);

    /// Returns the embedded version/change bookkeeping.
    fn changes(&self) -> &AggregateChanges<Self::Event>;

    /// Mutable access to the embedded bookkeeping.
    fn changes_mut(&mut self) -> &mut AggregateChanges<Self::Event>;

    /// Returns the current version (`-1` before any event was applied).
    fn version(&self) -> i64 {
        self.changes().version()
    }

    /// Replays persisted history in ascending version order.
    ///
    /// The sort is stable; events sharing a version are applied in the order
    /// given. Replayed events are not added to the uncommitted changes.
    fn load_from_history<I>(&mut self, history: I)
    where
        I: IntoIterator<Item = Self::Event>,
    {
        let mut ordered: Vec<Self::Event> = history.into_iter().collect();
        ordered.sort_by_key(|e| e.version());
        for event in &ordered {
            self.apply(event);
            self.changes_mut().set_version(event.version());
        }
    }

    /// Records a newly produced event and applies it.
    fn apply_new_event(&mut self, event: Self::Event) {
        self.changes_mut().push(event.clone());
        self.apply(&event);
    }

    /// Returns uncommitted events produced by domain behavior.
    fn uncommitted_changes(&self) -> &[Self::Event] {
        self.changes().uncommitted()
    }

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_changes(&mut self) {
        self.changes_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TallyEvent {
        Added { version: i64, amount: i64 },
        Reset { version: i64 },
        Remarked { version: i64 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Added { .. } => "Added",
                Self::Reset { .. } => "Reset",
                Self::Remarked { .. } => "Remarked",
            }
        }

        fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
            Ok(serde_json::Value::Null)
        }

        fn version(&self) -> i64 {
            match self {
                Self::Added { version, .. }
                | Self::Reset { version }
                | Self::Remarked { version } => *version,
            }
        }

        fn set_version(&mut self, v: i64) {
            match self {
                Self::Added { version, .. }
                | Self::Reset { version }
                | Self::Remarked { version } => *version = v,
            }
        }
    }

    #[derive(Debug)]
    struct Tally {
        id: u64,
        total: i64,
        changes: AggregateChanges<TallyEvent>,
    }

    impl Tally {
        fn add(&mut self, amount: i64) {
            self.apply_new_event(TallyEvent::Added { version: 0, amount });
        }
    }

    impl AggregateRoot for Tally {
        type Id = u64;
        type Event = TallyEvent;

        fn new(id: u64) -> Self {
            Self {
                id,
                total: 0,
                changes: AggregateChanges::new(),
            }
        }

        fn aggregate_id(&self) -> &u64 {
            &self.id
        }

        fn apply(&mut self, event: &TallyEvent) {
            match event {
                TallyEvent::Added { amount, .. } => self.total += amount,
                TallyEvent::Reset { .. } => self.total = 0,
                TallyEvent::Remarked { .. } => {}
            }
        }

        fn changes(&self) -> &AggregateChanges<TallyEvent> {
            &self.changes
        }

        fn changes_mut(&mut self) -> &mut AggregateChanges<TallyEvent> {
            &mut self.changes
        }
    }

    fn history() -> Vec<TallyEvent> {
        vec![
            TallyEvent::Added { version: 0, amount: 5 },
            TallyEvent::Reset { version: 1 },
            TallyEvent::Added { version: 2, amount: 3 },
            TallyEvent::Remarked { version: 3 },
            TallyEvent::Added { version: 4, amount: 4 },
        ]
    }

    #[test]
    fn test_new_aggregate_has_unspecified_version() {
        let tally = Tally::new(1);

        assert_eq!(tally.version(), UNSPECIFIED_VERSION);
        assert!(tally.uncommitted_changes().is_empty());
    }

    #[test]
    fn test_load_from_history_applies_in_version_order() {
        // Arrange
        let mut shuffled = history();
        shuffled.reverse();
        let mut tally = Tally::new(1);

        // Act
        tally.load_from_history(shuffled);

        // Assert
        assert_eq!(tally.total, 7);
        assert_eq!(tally.version(), 4);
    }

    #[test]
    fn test_load_from_history_is_independent_of_input_order() {
        let ordered = history();
        let permutations = [
            vec![2, 0, 4, 1, 3],
            vec![4, 3, 2, 1, 0],
            vec![1, 0, 3, 2, 4],
        ];

        for order in permutations {
            let permuted: Vec<TallyEvent> = order.iter().map(|&i| ordered[i].clone()).collect();
            let mut tally = Tally::new(1);

            tally.load_from_history(permuted);

            assert_eq!(tally.total, 7, "order {order:?}");
            assert_eq!(tally.version(), 4, "order {order:?}");
        }
    }

    #[test]
    fn test_load_from_history_skips_unhandled_shape_but_advances_version() {
        let mut tally = Tally::new(1);

        tally.load_from_history(vec![
            TallyEvent::Added { version: 0, amount: 2 },
            TallyEvent::Remarked { version: 1 },
        ]);

        assert_eq!(tally.total, 2);
        assert_eq!(tally.version(), 1);
    }

    #[test]
    fn test_load_from_history_does_not_record_uncommitted_changes() {
        let mut tally = Tally::new(1);

        tally.load_from_history(history());

        assert!(tally.uncommitted_changes().is_empty());
    }

    #[test]
    fn test_apply_new_event_records_and_applies() {
        // Arrange
        let mut tally = Tally::new(1);
        tally.load_from_history(vec![TallyEvent::Added { version: 0, amount: 1 }]);

        // Act
        tally.add(10);
        tally.add(5);

        // Assert
        assert_eq!(tally.total, 16);
        assert_eq!(tally.uncommitted_changes().len(), 2);
        assert_eq!(tally.version(), 0);
    }

    #[test]
    fn test_clear_uncommitted_changes_keeps_state() {
        let mut tally = Tally::new(1);
        tally.add(3);

        tally.clear_uncommitted_changes();

        assert!(tally.uncommitted_changes().is_empty());
        assert_eq!(tally.total, 3);
    }
}
