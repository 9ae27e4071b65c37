//! Aggregate root abstraction.

use crate::event::DomainEvent;

/// Trait for aggregate roots that record the events their commands produce.
pub trait AggregateRoot: Send + Sync {
    /// The identifier type of the aggregate.
    type Id;

    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &Self::Id;

    /// Returns the current version (number of events recorded so far).
    fn version(&self) -> i64;

    /// Returns events produced since the last drain.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Removes and returns the events produced since the last drain.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
