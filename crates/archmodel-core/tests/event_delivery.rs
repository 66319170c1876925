//! Integration tests for event delivery around cascading edits.

mod common;

use std::sync::Arc;

use archmodel_core::{
    Child, ColumnMapping, CompoundEditTracker, CountingListener, EventLog, ModelEvent, ObjectRef,
    Property, PropertyValue, SubscriptionScope,
};
use common::{int, Fixture};

#[test]
fn test_removing_key_column_event_order() {
    let mut f = Fixture::new();
    let pkcol_1 = f.col(f.parent, "pkcol_1");
    let pkcol_2 = f.col(f.parent, "pkcol_2");
    let fk_1 = f.col(f.child_1, "child_pkcol_1");
    let fk_2 = f.col(f.child_1, "child_pkcol_2");
    let log = Arc::new(EventLog::new());
    f.schema.subscribe(SubscriptionScope::Schema, log.clone());

    f.schema.remove_column(pkcol_1).unwrap();

    assert_eq!(
        log.events(),
        vec![
            ModelEvent::CompoundEditStarted {
                description: "remove column pkcol_1".to_string(),
            },
            ModelEvent::ChildRemoved {
                source: ObjectRef::Table(f.parent),
                child: Child::Column(pkcol_1),
                index: 0,
            },
            ModelEvent::ChildRemoved {
                source: ObjectRef::Relationship(f.rel1),
                child: Child::Mapping(ColumnMapping::new(pkcol_1, fk_1)),
                index: 0,
            },
            ModelEvent::ChildRemoved {
                source: ObjectRef::Table(f.child_1),
                child: Child::Column(fk_1),
                index: 0,
            },
            ModelEvent::PropertyChanged {
                source: ObjectRef::Column(fk_2),
                property: Property::PrimaryKeySeq,
                old: PropertyValue::Int(1),
                new: PropertyValue::Int(0),
            },
            ModelEvent::PropertyChanged {
                source: ObjectRef::Column(pkcol_2),
                property: Property::PrimaryKeySeq,
                old: PropertyValue::Int(1),
                new: PropertyValue::Int(0),
            },
            ModelEvent::CompoundEditEnded,
        ]
    );
}

#[test]
fn test_table_listener_sees_only_its_table() {
    let mut f = Fixture::new();
    let parent_counter = Arc::new(CountingListener::new());
    let child_counter = Arc::new(CountingListener::new());
    f.schema.subscribe(
        SubscriptionScope::Object(ObjectRef::Table(f.parent)),
        parent_counter.clone(),
    );
    f.schema.subscribe(
        SubscriptionScope::Object(ObjectRef::Table(f.child_2)),
        child_counter.clone(),
    );

    f.schema.add_column(f.parent, int("attribute_2")).unwrap();

    assert_eq!(parent_counter.inserted_count(), 1);
    assert_eq!(parent_counter.total(), 1);
    assert_eq!(child_counter.total(), 0);
}

#[test]
fn test_compound_signals_reach_schema_listeners_only() {
    let mut f = Fixture::new();
    let schema_counter = Arc::new(CountingListener::new());
    let table_counter = Arc::new(CountingListener::new());
    f.schema
        .subscribe(SubscriptionScope::Schema, schema_counter.clone());
    f.schema.subscribe(
        SubscriptionScope::Object(ObjectRef::Table(f.child_2)),
        table_counter.clone(),
    );

    let pkcol = f.schema.add_column(f.parent, int("pkcol_3")).unwrap();
    f.schema.set_primary_key_seq(pkcol, Some(2)).unwrap();

    assert_eq!(schema_counter.compound_started_count(), 1);
    assert_eq!(schema_counter.compound_ended_count(), 1);
    assert_eq!(table_counter.compound_started_count(), 0);
    // The synthesized foreign-key column landed in child_2.
    assert_eq!(table_counter.inserted_count(), 1);
}

#[test]
fn test_compound_brackets_balance_on_failure() {
    let mut f = Fixture::new();
    let tracker = Arc::new(CompoundEditTracker::new());
    f.schema.subscribe(SubscriptionScope::Schema, tracker.clone());

    let result = f.schema.compound_edit("failing edit", |s| {
        s.add_column(s.table_by_name("parent").unwrap(), int("extra"))?;
        s.remove_relationship(archmodel_core::RelationshipId::new(999))
    });

    assert!(result.is_err());
    assert_eq!(tracker.depth(), 0);
    assert_eq!(tracker.completed(), 1);
    assert_eq!(tracker.last_description().as_deref(), Some("failing edit"));
}

#[test]
fn test_deferred_events_delivered_in_order() {
    let mut f = Fixture::new();
    let log = Arc::new(EventLog::new());
    f.schema.subscribe(
        SubscriptionScope::Object(ObjectRef::Table(f.child_2)),
        log.clone(),
    );

    let (a, b) = f
        .schema
        .with_secondary_change(f.child_2, |s| {
            let a = s.add_column(f.child_2, int("a"))?;
            let b = s.add_column(f.child_2, int("b"))?;
            s.set_table_remarks(f.child_2, Some("batch".into()))?;
            Ok((a, b))
        })
        .unwrap();

    let events = log.drain();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        ModelEvent::ChildInserted {
            source: ObjectRef::Table(f.child_2),
            child: Child::Column(a),
            index: 3,
        }
    );
    assert_eq!(
        events[1],
        ModelEvent::ChildInserted {
            source: ObjectRef::Table(f.child_2),
            child: Child::Column(b),
            index: 4,
        }
    );
    assert!(matches!(
        events[2],
        ModelEvent::PropertyChanged {
            property: Property::Remarks,
            ..
        }
    ));
}

#[test]
fn test_rank_setter_silent_when_unchanged() {
    let mut f = Fixture::new();
    let pkcol = f.col(f.parent, "pkcol_1");
    let counter = Arc::new(CountingListener::new());
    f.schema.subscribe(SubscriptionScope::Schema, counter.clone());

    f.schema.set_primary_key_seq(pkcol, Some(0)).unwrap();

    // Only the compound bracket: the table has live dependents.
    assert_eq!(counter.changed_count(), 0);
    assert_eq!(counter.inserted_count(), 0);
    assert_eq!(counter.removed_count(), 0);
}

#[test]
fn test_unsubscribed_listener_stops_receiving() {
    let mut f = Fixture::new();
    let counter = Arc::new(CountingListener::new());
    let id = f
        .schema
        .subscribe(SubscriptionScope::Schema, counter.clone());

    f.schema.set_table_name(f.parent, "parent_table").unwrap();
    assert!(f.schema.unsubscribe(id));
    f.schema.set_table_name(f.parent, "parent").unwrap();

    assert_eq!(counter.changed_count(), 1);
    assert!(!f.schema.unsubscribe(id));
}
