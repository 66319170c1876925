//! Subscription tracking.

use std::fmt;
use std::sync::Arc;

use super::event::{ModelEvent, ObjectRef};
use super::listeners::ModelListener;

/// Identifier of a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription#{}", self.0)
    }
}

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// Events sourced from one object.
    Object(ObjectRef),
    /// Every event, including compound-edit signals.
    Schema,
}

impl SubscriptionScope {
    /// Check if an event is in scope.
    pub fn matches(&self, event: &ModelEvent) -> bool {
        match self {
            SubscriptionScope::Schema => true,
            SubscriptionScope::Object(object) => event.source() == Some(*object),
        }
    }
}

/// A registered listener.
#[derive(Clone)]
pub struct SubscriptionEntry {
    /// Unique subscription ID.
    pub id: SubscriptionId,
    /// What the listener observes.
    pub scope: SubscriptionScope,
    /// The listener.
    pub listener: Arc<dyn ModelListener>,
    /// Number of events delivered to this subscription.
    pub events_delivered: u64,
}

impl SubscriptionEntry {
    /// Create a new subscription entry.
    pub fn new(
        id: SubscriptionId,
        scope: SubscriptionScope,
        listener: Arc<dyn ModelListener>,
    ) -> Self {
        Self {
            id,
            scope,
            listener,
            events_delivered: 0,
        }
    }

    /// Deliver an event and count it.
    pub(crate) fn deliver(&mut self, event: &ModelEvent) {
        self.listener.handle(event);
        self.events_delivered += 1;
    }
}

impl fmt::Debug for SubscriptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionEntry")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("events_delivered", &self.events_delivered)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::model::TableId;

    #[test]
    fn test_scope_matching() {
        let table = ObjectRef::Table(TableId::new(1));
        let event = ModelEvent::StructureChanged { source: table };
        let signal = ModelEvent::CompoundEditEnded;

        assert!(SubscriptionScope::Object(table).matches(&event));
        assert!(!SubscriptionScope::Object(ObjectRef::Schema).matches(&event));
        assert!(!SubscriptionScope::Object(table).matches(&signal));
        assert!(SubscriptionScope::Schema.matches(&signal));
    }

    #[test]
    fn test_entry_counts_deliveries() {
        let log = Arc::new(EventLog::new());
        let mut entry = SubscriptionEntry::new(
            SubscriptionId(1),
            SubscriptionScope::Schema,
            log.clone(),
        );

        entry.deliver(&ModelEvent::CompoundEditEnded);
        entry.deliver(&ModelEvent::CompoundEditEnded);

        assert_eq!(entry.events_delivered, 2);
        assert_eq!(log.len(), 2);
    }
}
