//! The schema arena and its consistency engine.
//!
//! [`Schema`] owns every table, column and relationship and addresses them
//! by identifier. All mutation goes through it so that the derived state of
//! foreign-key columns (existence, name, type, key membership) is kept in
//! step with the primary keys they reference, and so that every change is
//! reported on the event bus in a deterministic order.
//!
//! The operations are split by concern:
//! - `columns`: column insertion, removal, attributes and key ranks
//! - `relationships`: relationship registration, mappings and attributes
//! - `cascade`: promotion, demotion, orphan removal and detachment
//! - `batch`: secondary-change and magic-disabled scopes

mod batch;
mod cascade;
mod columns;
mod relationships;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::events::{
    Child, EventBus, ModelEvent, ModelListener, ObjectRef, Property, PropertyValue,
    SubscriptionId, SubscriptionScope,
};
use crate::model::{Column, ColumnId, Relationship, RelationshipId, Table, TableId};

pub use batch::{MagicDisabled, SecondaryChange};

/// In-memory relational schema.
#[derive(Debug)]
pub struct Schema {
    config: ModelConfig,
    tables: IndexMap<TableId, Table>,
    columns: HashMap<ColumnId, Column>,
    relationships: IndexMap<RelationshipId, Relationship>,
    next_table_id: u64,
    next_column_id: u64,
    next_relationship_id: u64,
    bus: EventBus,
    /// Events held back while their table is in secondary-change mode.
    deferred: IndexMap<TableId, Vec<ModelEvent>>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Create an empty schema with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// Create an empty schema.
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            tables: IndexMap::new(),
            columns: HashMap::new(),
            relationships: IndexMap::new(),
            next_table_id: 0,
            next_column_id: 0,
            next_relationship_id: 0,
            bus: EventBus::new(),
            deferred: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------

    /// Register a listener for one object or the whole schema.
    pub fn subscribe(
        &mut self,
        scope: SubscriptionScope,
        listener: Arc<dyn ModelListener>,
    ) -> SubscriptionId {
        self.bus.subscribe(scope, listener)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Run `f` as one compound edit.
    ///
    /// Schema-wide listeners receive a start signal carrying `description`
    /// before `f` runs and an end signal after it returns, whether or not it
    /// succeeded.
    pub fn compound_edit<T>(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut Schema) -> Result<T>,
    ) -> Result<T> {
        let description = description.into();
        tracing::debug!(%description, "compound edit started");
        self.bus.publish(&ModelEvent::CompoundEditStarted { description });
        let result = f(self);
        self.bus.publish(&ModelEvent::CompoundEditEnded);
        result
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    /// Tables in insertion order.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &Table)> + '_ {
        self.tables.iter().map(|(id, table)| (*id, table))
    }

    /// Relationships in creation order, detached ones included.
    pub fn relationships(&self) -> impl Iterator<Item = (RelationshipId, &Relationship)> + '_ {
        self.relationships.iter().map(|(id, rel)| (*id, rel))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// First table with the given logical name.
    pub fn table_by_name(&self, name: &str) -> Option<TableId> {
        self.tables
            .iter()
            .find(|(_, table)| table.name() == name)
            .map(|(id, _)| *id)
    }

    /// Check if a relationship is registered on both of its tables.
    pub fn is_live(&self, rel: RelationshipId) -> bool {
        let Some(r) = self.relationships.get(&rel) else {
            return false;
        };
        let exported = r
            .pk_table()
            .and_then(|t| self.tables.get(&t))
            .is_some_and(|t| t.exported_keys().contains(&rel));
        let imported = r
            .fk_table()
            .and_then(|t| self.tables.get(&t))
            .is_some_and(|t| t.imported_keys().contains(&rel));
        exported && imported
    }

    /// Check if a relationship is registered on either of its tables.
    pub fn is_registered(&self, rel: RelationshipId) -> bool {
        self.tables
            .values()
            .any(|t| t.exported_keys().contains(&rel) || t.imported_keys().contains(&rel))
    }

    // ---------------------------------------------------------------
    // Tables
    // ---------------------------------------------------------------

    /// Add a table to the schema.
    ///
    /// The table joins empty: column ids and key registrations carried by a
    /// copy of another table are dropped, since those belong to the table
    /// they were copied from.
    pub fn add_table(&mut self, mut table: Table) -> TableId {
        self.next_table_id += 1;
        let id = TableId::new(self.next_table_id);

        if table.clear_membership() {
            tracing::debug!(table = %id, "dropped columns and keys of a copied table");
        }

        table.set_magic_enabled(self.config.magic_enabled_by_default);
        table.set_secondary_change_mode(false);
        let index = self.tables.len();
        self.tables.insert(id, table);

        tracing::debug!(table = %id, index, "table added");
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Schema,
            child: Child::Table(id),
            index,
        });
        id
    }

    /// Remove a table and everything that depends on it.
    ///
    /// Every relationship that refers to the table is removed first; live
    /// ones go through the detachment cascade, so foreign-key columns the
    /// table's exported keys created in other tables are removed too. The
    /// detached table is returned with its columns.
    pub fn remove_table(&mut self, id: TableId) -> Result<(Table, Vec<Column>)> {
        self.table_ref(id)?;

        let description = format!("remove table {}", self.table_ref(id)?.name());
        self.compound_edit(description, |schema| schema.remove_table_cascade(id))
    }

    fn remove_table_cascade(&mut self, id: TableId) -> Result<(Table, Vec<Column>)> {
        let referencing: Vec<RelationshipId> = self
            .relationships
            .iter()
            .filter(|(_, r)| r.pk_table() == Some(id) || r.fk_table() == Some(id))
            .map(|(rel, _)| *rel)
            .collect();

        for rel in referencing {
            if !self.relationships.contains_key(&rel) {
                continue;
            }
            if self.is_live(rel) {
                self.detach_cascade(rel)?;
            } else {
                self.discard_relationship(rel)?;
            }
        }

        if self.table_ref(id)?.is_secondary_change_mode() {
            self.table_mut(id)?.set_secondary_change_mode(false);
        }
        self.flush_deferred(id);

        let index = self
            .tables
            .get_index_of(&id)
            .ok_or(ModelError::UnknownTable(id))?;
        let mut table = self
            .tables
            .shift_remove(&id)
            .ok_or(ModelError::UnknownTable(id))?;

        let columns = table
            .take_columns()
            .into_iter()
            .filter_map(|c| self.columns.remove(&c))
            .map(|mut column| {
                column.detach();
                column
            })
            .collect();

        tracing::debug!(table = %id, "table removed");
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Schema,
            child: Child::Table(id),
            index,
        });
        Ok((table, columns))
    }

    /// Rename a table.
    pub fn set_table_name(&mut self, id: TableId, name: impl Into<String>) -> Result<()> {
        let old = self.table_mut(id)?.replace_name(name.into());
        let new = self.table_ref(id)?.name().to_string();
        self.property_changed(ObjectRef::Table(id), Property::Name, old, new);
        Ok(())
    }

    /// Set or clear a table's physical name. Fires on every call.
    pub fn set_table_physical_name(&mut self, id: TableId, name: Option<String>) -> Result<()> {
        let old = self.table_mut(id)?.replace_physical_name(name.clone());
        self.property_changed(ObjectRef::Table(id), Property::PhysicalName, old, name);
        Ok(())
    }

    /// Set or clear a table's remarks.
    pub fn set_table_remarks(&mut self, id: TableId, remarks: Option<String>) -> Result<()> {
        let old = self.table_mut(id)?.replace_remarks(remarks.clone());
        self.property_changed(ObjectRef::Table(id), Property::Remarks, old, remarks);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    pub(crate) fn table_ref(&self, id: TableId) -> Result<&Table> {
        self.tables.get(&id).ok_or(ModelError::UnknownTable(id))
    }

    pub(crate) fn table_mut(&mut self, id: TableId) -> Result<&mut Table> {
        self.tables.get_mut(&id).ok_or(ModelError::UnknownTable(id))
    }

    pub(crate) fn column_ref(&self, id: ColumnId) -> Result<&Column> {
        self.columns.get(&id).ok_or(ModelError::UnknownColumn(id))
    }

    pub(crate) fn column_mut(&mut self, id: ColumnId) -> Result<&mut Column> {
        self.columns.get_mut(&id).ok_or(ModelError::UnknownColumn(id))
    }

    pub(crate) fn rel_ref(&self, id: RelationshipId) -> Result<&Relationship> {
        self.relationships
            .get(&id)
            .ok_or(ModelError::UnknownRelationship(id))
    }

    pub(crate) fn rel_mut(&mut self, id: RelationshipId) -> Result<&mut Relationship> {
        self.relationships
            .get_mut(&id)
            .ok_or(ModelError::UnknownRelationship(id))
    }

    /// Owning table of a column, failing for detached or unknown columns.
    pub(crate) fn owner_of(&self, column: ColumnId) -> Result<TableId> {
        self.column_ref(column)?
            .table()
            .ok_or(ModelError::UnknownColumn(column))
    }

    pub(crate) fn property_changed(
        &mut self,
        source: ObjectRef,
        property: Property,
        old: impl Into<PropertyValue>,
        new: impl Into<PropertyValue>,
    ) {
        self.emit(ModelEvent::PropertyChanged {
            source,
            property,
            old: old.into(),
            new: new.into(),
        });
    }

    /// Publish an event, or queue it if its table is in secondary-change mode.
    pub(crate) fn emit(&mut self, event: ModelEvent) {
        if let Some(table) = self.deferring_table(&event) {
            tracing::trace!(%table, kind = event.kind(), "event deferred");
            self.deferred.entry(table).or_default().push(event);
            return;
        }
        self.bus.publish(&event);
    }

    /// The table in secondary-change mode an event belongs to, if any.
    fn deferring_table(&self, event: &ModelEvent) -> Option<TableId> {
        let table = match event.source()? {
            ObjectRef::Schema => return None,
            ObjectRef::Table(t) => Some(t),
            ObjectRef::Column(c) => self.columns.get(&c).and_then(|c| c.table()),
            ObjectRef::Relationship(r) => self.relationships.get(&r).and_then(|r| r.fk_table()),
        }?;
        self.tables
            .get(&table)
            .filter(|t| t.is_secondary_change_mode())
            .map(|_| table)
    }

    /// Deliver the events queued for a table, in the order they were emitted.
    pub(crate) fn flush_deferred(&mut self, table: TableId) {
        let Some(events) = self.deferred.shift_remove(&table) else {
            return;
        };
        tracing::trace!(%table, count = events.len(), "flushing deferred events");
        for event in &events {
            self.bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CountingListener, EventLog};
    use crate::model::SqlType;

    #[test]
    fn test_add_and_lookup_table() {
        let mut schema = Schema::new();
        let log = Arc::new(EventLog::new());
        schema.subscribe(SubscriptionScope::Schema, log.clone());

        let orders = schema.add_table(Table::new("orders"));
        let lines = schema.add_table(Table::new("order_lines"));

        assert_eq!(schema.table_count(), 2);
        assert_eq!(schema.table_by_name("order_lines"), Some(lines));
        assert!(schema.table_by_name("missing").is_none());
        assert_eq!(
            schema.tables().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![orders, lines]
        );
        assert_eq!(
            log.events()[1],
            ModelEvent::ChildInserted {
                source: ObjectRef::Schema,
                child: Child::Table(lines),
                index: 1,
            }
        );
    }

    #[test]
    fn test_copied_table_joins_empty() {
        let mut schema = Schema::new();
        let parent = schema.add_table(Table::new("parent"));
        let child = schema.add_table(Table::new("child"));
        let col = schema
            .add_column(
                parent,
                Column::new("a", SqlType::Integer, 10, 0).with_primary_key_seq(0),
            )
            .unwrap();
        let rel = schema
            .create_relationship(
                Relationship::new()
                    .with_pk_table(parent)
                    .with_fk_table(child),
            )
            .unwrap();
        schema.add_exported_key(parent, rel).unwrap();
        schema.add_imported_key(child, rel).unwrap();

        let cloned = schema.table(parent).unwrap().clone();
        let copy = schema.add_table(cloned);

        let t = schema.table(copy).unwrap();
        assert_eq!(t.name(), "parent");
        assert!(t.columns().is_empty());
        assert!(t.exported_keys().is_empty());
        assert!(t.imported_keys().is_empty());
        assert!(schema.column_by_name(copy, "a").is_none());
        assert_eq!(schema.column(col).unwrap().table(), Some(parent));

        schema.remove_column(col).unwrap();
        assert!(schema.table(copy).unwrap().columns().is_empty());
        assert!(schema.table(parent).unwrap().columns().is_empty());
    }

    #[test]
    fn test_remove_table_returns_columns() {
        let mut schema = Schema::new();
        let table = schema.add_table(Table::new("t"));
        let col = schema
            .add_column(table, Column::new("a", SqlType::Integer, 10, 0))
            .unwrap();

        let (removed, columns) = schema.remove_table(table).unwrap();

        assert_eq!(removed.name(), "t");
        assert_eq!(removed.column_count(), 0);
        assert_eq!(columns.len(), 1);
        assert!(columns[0].table().is_none());
        assert!(schema.column(col).is_none());
        assert!(schema.table(table).is_none());
        assert_eq!(
            schema.remove_table(table).unwrap_err(),
            ModelError::UnknownTable(table)
        );
    }

    #[test]
    fn test_table_physical_name_fires_every_call() {
        let mut schema = Schema::new();
        let table = schema.add_table(Table::new("t"));
        let counter = Arc::new(CountingListener::new());
        schema.subscribe(
            SubscriptionScope::Object(ObjectRef::Table(table)),
            counter.clone(),
        );

        schema
            .set_table_physical_name(table, Some("T_1".into()))
            .unwrap();
        schema
            .set_table_physical_name(table, Some("T_1".into()))
            .unwrap();
        schema.set_table_physical_name(table, None).unwrap();

        assert_eq!(counter.changed_count(), 3);
        assert_eq!(schema.table(table).unwrap().physical_name(), "t");
    }

    #[test]
    fn test_compound_edit_brackets_errors() {
        let mut schema = Schema::new();
        let counter = Arc::new(CountingListener::new());
        schema.subscribe(SubscriptionScope::Schema, counter.clone());

        let result: Result<()> = schema.compound_edit("failing edit", |s| {
            s.table_ref(TableId::new(99)).map(|_| ())
        });

        assert!(result.is_err());
        assert_eq!(counter.compound_started_count(), 1);
        assert_eq!(counter.compound_ended_count(), 1);
    }
}
