//! Listener trait and stock listeners.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::event::{Child, ModelEvent, ObjectRef, Property, PropertyValue};

/// Observer of model changes.
///
/// Implement the callbacks of interest; the rest default to no-ops. The
/// compound-edit callbacks are only invoked on schema-wide subscriptions.
pub trait ModelListener: Send + Sync {
    fn child_inserted(&self, _source: ObjectRef, _child: &Child, _index: usize) {}

    fn child_removed(&self, _source: ObjectRef, _child: &Child, _index: usize) {}

    fn property_changed(
        &self,
        _source: ObjectRef,
        _property: Property,
        _old: &PropertyValue,
        _new: &PropertyValue,
    ) {
    }

    fn structure_changed(&self, _source: ObjectRef) {}

    fn compound_edit_started(&self, _description: &str) {}

    fn compound_edit_ended(&self) {}

    /// Route an event to the matching callback.
    fn handle(&self, event: &ModelEvent) {
        match event {
            ModelEvent::ChildInserted {
                source,
                child,
                index,
            } => self.child_inserted(*source, child, *index),
            ModelEvent::ChildRemoved {
                source,
                child,
                index,
            } => self.child_removed(*source, child, *index),
            ModelEvent::PropertyChanged {
                source,
                property,
                old,
                new,
            } => self.property_changed(*source, *property, old, new),
            ModelEvent::StructureChanged { source } => self.structure_changed(*source),
            ModelEvent::CompoundEditStarted { description } => {
                self.compound_edit_started(description)
            }
            ModelEvent::CompoundEditEnded => self.compound_edit_ended(),
        }
    }
}

/// Counts events per category.
#[derive(Debug, Default)]
pub struct CountingListener {
    inserted: AtomicU64,
    removed: AtomicU64,
    changed: AtomicU64,
    structure_changed: AtomicU64,
    compound_started: AtomicU64,
    compound_ended: AtomicU64,
}

impl CountingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inserted_count(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn removed_count(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    pub fn changed_count(&self) -> u64 {
        self.changed.load(Ordering::Relaxed)
    }

    pub fn structure_changed_count(&self) -> u64 {
        self.structure_changed.load(Ordering::Relaxed)
    }

    pub fn compound_started_count(&self) -> u64 {
        self.compound_started.load(Ordering::Relaxed)
    }

    pub fn compound_ended_count(&self) -> u64 {
        self.compound_ended.load(Ordering::Relaxed)
    }

    /// Sum of the four object-event categories.
    pub fn total(&self) -> u64 {
        self.inserted_count()
            + self.removed_count()
            + self.changed_count()
            + self.structure_changed_count()
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        for counter in [
            &self.inserted,
            &self.removed,
            &self.changed,
            &self.structure_changed,
            &self.compound_started,
            &self.compound_ended,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl ModelListener for CountingListener {
    fn child_inserted(&self, _source: ObjectRef, _child: &Child, _index: usize) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    fn child_removed(&self, _source: ObjectRef, _child: &Child, _index: usize) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    fn property_changed(
        &self,
        _source: ObjectRef,
        _property: Property,
        _old: &PropertyValue,
        _new: &PropertyValue,
    ) {
        self.changed.fetch_add(1, Ordering::Relaxed);
    }

    fn structure_changed(&self, _source: ObjectRef) {
        self.structure_changed.fetch_add(1, Ordering::Relaxed);
    }

    fn compound_edit_started(&self, _description: &str) {
        self.compound_started.fetch_add(1, Ordering::Relaxed);
    }

    fn compound_edit_ended(&self) {
        self.compound_ended.fetch_add(1, Ordering::Relaxed);
    }
}

/// Records every event it receives, in delivery order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ModelEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded events.
    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.lock().clone()
    }

    /// Take the recorded events, leaving the log empty.
    pub fn drain(&self) -> Vec<ModelEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ModelListener for EventLog {
    fn handle(&self, event: &ModelEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Tracks compound-edit nesting the way an undo manager groups edits.
#[derive(Debug, Default)]
pub struct CompoundEditTracker {
    depth: AtomicUsize,
    completed: AtomicU64,
    last_description: Mutex<Option<String>>,
}

impl CompoundEditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth; zero outside any compound edit.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Number of outermost compound edits that have ended.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Description of the most recently started compound edit.
    pub fn last_description(&self) -> Option<String> {
        self.last_description.lock().clone()
    }
}

impl ModelListener for CompoundEditTracker {
    fn compound_edit_started(&self, description: &str) {
        self.depth.fetch_add(1, Ordering::Relaxed);
        *self.last_description.lock() = Some(description.to_string());
    }

    fn compound_edit_ended(&self) {
        let previous = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
        if previous == Ok(1) {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
