//! In-process event bus.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::event::{ModelEvent, ObjectRef};
use super::listeners::ModelListener;
use super::subscription::{SubscriptionEntry, SubscriptionId, SubscriptionScope};

/// Routes model events to registered listeners.
///
/// Listeners of the event's source object and schema-wide listeners both
/// receive it, in ascending subscription order. Compound-edit signals have
/// no source and only reach schema-wide listeners. Delivery is synchronous.
#[derive(Debug, Default)]
pub struct EventBus {
    /// Active subscriptions keyed by subscription ID.
    subscriptions: BTreeMap<SubscriptionId, SubscriptionEntry>,
    /// Index of object-scoped subscriptions by source.
    source_index: HashMap<ObjectRef, Vec<SubscriptionId>>,
    /// Next subscription ID.
    next_subscription_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(
        &mut self,
        scope: SubscriptionScope,
        listener: Arc<dyn ModelListener>,
    ) -> SubscriptionId {
        self.next_subscription_id += 1;
        let id = SubscriptionId(self.next_subscription_id);

        self.subscriptions
            .insert(id, SubscriptionEntry::new(id, scope, listener));
        if let SubscriptionScope::Object(object) = scope {
            self.source_index.entry(object).or_default().push(id);
        }

        tracing::debug!(subscription_id = id.get(), ?scope, "listener subscribed");
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(entry) = self.subscriptions.remove(&id) else {
            return false;
        };

        if let SubscriptionScope::Object(object) = entry.scope {
            if let Some(ids) = self.source_index.get_mut(&object) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.source_index.remove(&object);
                }
            }
        }

        tracing::debug!(
            subscription_id = id.get(),
            events_delivered = entry.events_delivered,
            "listener unsubscribed"
        );
        true
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscriptions scoped to one object.
    pub fn subscriptions_for(&self, object: ObjectRef) -> Vec<SubscriptionId> {
        self.source_index.get(&object).cloned().unwrap_or_default()
    }

    /// Get a subscription by ID.
    pub fn subscription(&self, id: SubscriptionId) -> Option<&SubscriptionEntry> {
        self.subscriptions.get(&id)
    }

    /// Deliver an event to every matching subscription.
    pub fn publish(&mut self, event: &ModelEvent) {
        if self.subscriptions.is_empty() {
            return;
        }

        let mut targets: Vec<SubscriptionId> = self
            .subscriptions
            .values()
            .filter(|entry| entry.scope == SubscriptionScope::Schema)
            .map(|entry| entry.id)
            .collect();
        if let Some(ids) = event.source().and_then(|s| self.source_index.get(&s)) {
            targets.extend(ids.iter().copied());
            targets.sort_unstable();
        }

        for id in targets {
            if let Some(entry) = self.subscriptions.get_mut(&id) {
                if entry.scope.matches(event) {
                    entry.deliver(event);
                }
            }
        }

        tracing::trace!(kind = event.kind(), source = ?event.source(), "published model event");
    }
}
