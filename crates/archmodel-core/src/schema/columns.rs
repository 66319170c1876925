//! Column operations.

use crate::error::{ModelError, Result};
use crate::events::{Child, ModelEvent, ObjectRef, Property};
use crate::model::{Column, ColumnId, SqlType, TableId};

use super::Schema;

/// An attribute a foreign-key column copies from the key column it maps.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Derived {
    DataType(SqlType),
    Precision(u32),
    Scale(u32),
    Nullable(bool),
}

impl Schema {
    /// Append a column to a table.
    ///
    /// A column inserted with a primary key rank joins the key, which runs
    /// the same promotion cascade as [`Schema::set_primary_key_seq`].
    pub fn add_column(&mut self, table: TableId, column: Column) -> Result<ColumnId> {
        let index = self.table_ref(table)?.column_count();
        self.insert_column(table, index, column)
    }

    /// Insert a column at `index` of a table.
    pub fn insert_column(
        &mut self,
        table: TableId,
        index: usize,
        column: Column,
    ) -> Result<ColumnId> {
        let len = self.table_ref(table)?.column_count();
        if index > len {
            return Err(ModelError::IndexOutOfBounds { table, index, len });
        }

        if column.is_primary_key() && self.has_key_dependents(table) {
            let description = format!("add key column {}", column.name());
            self.compound_edit(description, |s| s.insert_column_at(table, index, column))
        } else {
            self.insert_column_at(table, index, column)
        }
    }

    pub(crate) fn insert_column_at(
        &mut self,
        table: TableId,
        index: usize,
        mut column: Column,
    ) -> Result<ColumnId> {
        self.next_column_id += 1;
        let id = ColumnId::new(self.next_column_id);
        let rank = column.primary_key_seq();

        column.attach(table);
        self.columns.insert(id, column);
        self.table_mut(table)?.insert_column(index, id);

        tracing::trace!(%table, column = %id, index, "column inserted");
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Table(table),
            child: Child::Column(id),
            index,
        });

        if rank.is_some() {
            self.after_rank_change(id, None, rank)?;
        }
        Ok(id)
    }

    /// Remove a column from its table.
    ///
    /// Fails with [`ModelError::LockedColumn`] if a live relationship the
    /// table imports maps the column; remove the relationship first. If the
    /// column was in the primary key, foreign-key columns mapped to it that
    /// no other live relationship maps are removed from the child tables.
    pub fn remove_column(&mut self, column: ColumnId) -> Result<Column> {
        let table = self.owner_of(column)?;
        for rel in self.table_ref(table)?.imported_keys().iter().copied() {
            if self.is_live(rel) && self.rel_ref(rel)?.contains_fk_column(column) {
                return Err(ModelError::LockedColumn {
                    column,
                    relationship: rel,
                });
            }
        }

        let mapped = self
            .table_ref(table)?
            .exported_keys()
            .iter()
            .any(|rel| {
                self.relationships
                    .get(rel)
                    .is_some_and(|r| r.contains_pk_column(column))
            });
        if mapped {
            let description = format!("remove column {}", self.column_ref(column)?.name());
            self.compound_edit(description, |s| s.remove_column_cascade(column))
        } else {
            self.remove_column_cascade(column)
        }
    }

    /// Move a column to a new position in its table.
    pub fn move_column(&mut self, column: ColumnId, new_index: usize) -> Result<()> {
        let table = self.owner_of(column)?;
        let len = self.table_ref(table)?.column_count();
        if new_index >= len {
            return Err(ModelError::IndexOutOfBounds {
                table,
                index: new_index,
                len,
            });
        }
        let old_index = self
            .table_ref(table)?
            .column_index(column)
            .ok_or(ModelError::ColumnNotInTable { column, table })?;

        self.table_mut(table)?.remove_column_at(old_index);
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Table(table),
            child: Child::Column(column),
            index: old_index,
        });
        self.table_mut(table)?.insert_column(new_index, column);
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Table(table),
            child: Child::Column(column),
            index: new_index,
        });

        if self.column_ref(column)?.is_primary_key() && self.table_ref(table)?.cascades_enabled() {
            self.normalize_key(table, None)?;
        }
        Ok(())
    }

    /// Find a column of a table by logical name.
    pub fn column_by_name(&self, table: TableId, name: &str) -> Option<ColumnId> {
        self.tables.get(&table)?.columns().iter().copied().find(|c| {
            self.columns
                .get(c)
                .is_some_and(|column| column.name() == name)
        })
    }

    /// Position of a column within its table.
    pub fn column_index(&self, column: ColumnId) -> Option<usize> {
        let table = self.columns.get(&column)?.table()?;
        self.tables.get(&table)?.column_index(column)
    }

    /// The primary key of a table, ordered by rank then column position.
    pub fn primary_key(&self, table: TableId) -> Result<Vec<ColumnId>> {
        let mut keyed: Vec<(u32, usize, ColumnId)> = self
            .table_ref(table)?
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(pos, c)| {
                let seq = self.columns.get(c)?.primary_key_seq()?;
                Some((seq, pos, *c))
            })
            .collect();
        keyed.sort_unstable();
        Ok(keyed.into_iter().map(|(_, _, c)| c).collect())
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    /// Rename a column.
    ///
    /// Foreign-key columns mapped to a key column follow the rename when
    /// their name equalled the old name.
    pub fn set_column_name(&mut self, column: ColumnId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.mapped_fk_columns(column)?.is_empty() {
            self.set_column_name_at(column, name)
        } else {
            let description = format!("rename column to {name}");
            self.compound_edit(description, |s| s.set_column_name_at(column, name))
        }
    }

    fn set_column_name_at(&mut self, column: ColumnId, name: String) -> Result<()> {
        let old = self.column_mut(column)?.replace_name(name.clone());
        self.property_changed(
            ObjectRef::Column(column),
            Property::Name,
            old.clone(),
            name.clone(),
        );
        if old == name {
            return Ok(());
        }

        for fk in self.mapped_fk_columns(column)? {
            if self.column_ref(fk)?.name() == old {
                tracing::debug!(column = %fk, %name, "renaming mapped column");
                self.set_column_name_at(fk, name.clone())?;
            }
        }
        Ok(())
    }

    /// Set or clear a column's physical name. Fires on every call.
    pub fn set_column_physical_name(
        &mut self,
        column: ColumnId,
        name: Option<String>,
    ) -> Result<()> {
        let old = self.column_mut(column)?.replace_physical_name(name.clone());
        self.property_changed(ObjectRef::Column(column), Property::PhysicalName, old, name);
        Ok(())
    }

    /// Change a column's data type; mapped foreign-key columns follow.
    pub fn set_data_type(&mut self, column: ColumnId, data_type: SqlType) -> Result<()> {
        self.set_derived_attribute(column, Derived::DataType(data_type))
    }

    /// Change a column's precision; mapped foreign-key columns follow.
    pub fn set_precision(&mut self, column: ColumnId, precision: u32) -> Result<()> {
        self.set_derived_attribute(column, Derived::Precision(precision))
    }

    /// Change a column's scale; mapped foreign-key columns follow.
    pub fn set_scale(&mut self, column: ColumnId, scale: u32) -> Result<()> {
        self.set_derived_attribute(column, Derived::Scale(scale))
    }

    /// Change a column's nullability; mapped foreign-key columns follow.
    pub fn set_nullable(&mut self, column: ColumnId, nullable: bool) -> Result<()> {
        self.set_derived_attribute(column, Derived::Nullable(nullable))
    }

    pub fn set_auto_increment(&mut self, column: ColumnId, auto_increment: bool) -> Result<()> {
        let old = self.column_mut(column)?.replace_auto_increment(auto_increment);
        self.property_changed(
            ObjectRef::Column(column),
            Property::AutoIncrement,
            old,
            auto_increment,
        );
        Ok(())
    }

    pub fn set_default_value(&mut self, column: ColumnId, value: Option<String>) -> Result<()> {
        let old = self.column_mut(column)?.replace_default_value(value.clone());
        self.property_changed(ObjectRef::Column(column), Property::DefaultValue, old, value);
        Ok(())
    }

    pub fn set_column_remarks(&mut self, column: ColumnId, remarks: Option<String>) -> Result<()> {
        let old = self.column_mut(column)?.replace_remarks(remarks.clone());
        self.property_changed(ObjectRef::Column(column), Property::Remarks, old, remarks);
        Ok(())
    }

    fn set_derived_attribute(&mut self, column: ColumnId, value: Derived) -> Result<()> {
        if self.mapped_fk_columns(column)?.is_empty() {
            self.set_derived_at(column, value)
        } else {
            self.compound_edit("change key column attribute", |s| {
                s.set_derived_at(column, value)
            })
        }
    }

    fn set_derived_at(&mut self, column: ColumnId, value: Derived) -> Result<()> {
        let source = ObjectRef::Column(column);
        let col = self.column_mut(column)?;
        let changed = match value {
            Derived::DataType(v) => {
                let old = col.replace_data_type(v);
                self.property_changed(source, Property::DataType, old, v);
                old != v
            }
            Derived::Precision(v) => {
                let old = col.replace_precision(v);
                self.property_changed(source, Property::Precision, old, v);
                old != v
            }
            Derived::Scale(v) => {
                let old = col.replace_scale(v);
                self.property_changed(source, Property::Scale, old, v);
                old != v
            }
            Derived::Nullable(v) => {
                let old = col.replace_nullable(v);
                self.property_changed(source, Property::Nullable, old, v);
                old != v
            }
        };
        if !changed {
            return Ok(());
        }

        for fk in self.mapped_fk_columns(column)? {
            self.set_derived_at(fk, value)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Primary key
    // ---------------------------------------------------------------

    /// Set or clear a column's primary key rank.
    ///
    /// Fires only when the rank actually changes. While the table's cascades
    /// are enabled, the key is renumbered (a column placed at a taken rank
    /// goes in front of the column holding it) and every live relationship
    /// the table exports is brought back in line with the new key.
    pub fn set_primary_key_seq(&mut self, column: ColumnId, seq: Option<u32>) -> Result<()> {
        let table = self.owner_of(column)?;
        if self.has_key_dependents(table) {
            let description = match seq {
                Some(_) => format!("add {} to primary key", self.column_ref(column)?.name()),
                None => format!("remove {} from primary key", self.column_ref(column)?.name()),
            };
            self.compound_edit(description, |s| s.set_primary_key_seq_at(column, seq))
        } else {
            self.set_primary_key_seq_at(column, seq)
        }
    }

    pub(crate) fn set_primary_key_seq_at(
        &mut self,
        column: ColumnId,
        seq: Option<u32>,
    ) -> Result<()> {
        let old = self.column_mut(column)?.replace_primary_key_seq(seq);
        if old == seq {
            return Ok(());
        }
        self.property_changed(ObjectRef::Column(column), Property::PrimaryKeySeq, old, seq);
        self.after_rank_change(column, old, seq)
    }

    /// Renumber a table's key ranks to `0..n` and reorder the mappings of
    /// its exported relationships to match.
    ///
    /// Runs regardless of the table's modes, for callers that disabled the
    /// automatic cascade to rearrange the key themselves.
    pub fn normalize_primary_key(&mut self, table: TableId) -> Result<()> {
        self.table_ref(table)?;
        self.normalize_key(table, None)
    }

    pub(crate) fn normalize_key(&mut self, table: TableId, placed: Option<ColumnId>) -> Result<()> {
        let mut keyed: Vec<(u32, bool, usize, ColumnId)> = self
            .table_ref(table)?
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(pos, c)| {
                let seq = self.columns.get(c)?.primary_key_seq()?;
                Some((seq, Some(*c) != placed, pos, *c))
            })
            .collect();
        keyed.sort_unstable();

        for (rank, (seq, _, _, column)) in keyed.into_iter().enumerate() {
            let rank = rank as u32;
            if seq != rank {
                self.column_mut(column)?
                    .replace_primary_key_seq(Some(rank));
                self.property_changed(
                    ObjectRef::Column(column),
                    Property::PrimaryKeySeq,
                    seq,
                    rank,
                );
            }
        }

        let exported: Vec<_> = self.table_ref(table)?.exported_keys().iter().copied().collect();
        for rel in exported {
            self.sync_mapping_order(rel)?;
        }
        Ok(())
    }

    /// Check if a key change on this table would cascade into other tables.
    pub(crate) fn has_key_dependents(&self, table: TableId) -> bool {
        self.tables.get(&table).is_some_and(|t| {
            t.cascades_enabled() && t.exported_keys().iter().any(|rel| self.is_live(*rel))
        })
    }

    /// Foreign-key columns that copy their derived attributes from `column`.
    ///
    /// Empty unless `column` is a key column of a table whose cascades are
    /// enabled.
    pub(crate) fn mapped_fk_columns(&self, column: ColumnId) -> Result<Vec<ColumnId>> {
        let col = self.column_ref(column)?;
        let Some(table) = col.table() else {
            return Ok(Vec::new());
        };
        if !col.is_primary_key() || !self.table_ref(table)?.cascades_enabled() {
            return Ok(Vec::new());
        }

        let mut fks = Vec::new();
        for rel in self.table_ref(table)?.exported_keys() {
            if !self.is_live(*rel) {
                continue;
            }
            if let Some(m) = self.rel_ref(*rel)?.mapping_by_pk_column(column) {
                if m.fk_column != column && !fks.contains(&m.fk_column) {
                    fks.push(m.fk_column);
                }
            }
        }
        Ok(fks)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::{CountingListener, SubscriptionScope};
    use crate::model::Table;

    fn int(name: &str) -> Column {
        Column::new(name, SqlType::Integer, 10, 0)
    }

    #[test]
    fn test_column_by_name_until_removed() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let a = schema.add_column(t, int("a")).unwrap();
        let b = schema.add_column(t, int("b")).unwrap();

        assert_eq!(schema.column_by_name(t, "a"), Some(a));
        assert_eq!(schema.column_index(b), Some(1));

        let removed = schema.remove_column(a).unwrap();
        assert_eq!(removed.name(), "a");
        assert!(removed.table().is_none());
        assert!(schema.column_by_name(t, "a").is_none());
        assert_eq!(schema.column_index(b), Some(0));
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));

        let err = schema.insert_column(t, 1, int("a")).unwrap_err();
        assert_eq!(
            err,
            ModelError::IndexOutOfBounds {
                table: t,
                index: 1,
                len: 0
            }
        );
        assert_eq!(schema.table(t).unwrap().column_count(), 0);
    }

    #[test]
    fn test_physical_name_fires_once_per_call() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let c = schema.add_column(t, int("customer_id")).unwrap();
        let counter = Arc::new(CountingListener::new());
        schema.subscribe(SubscriptionScope::Object(ObjectRef::Column(c)), counter.clone());

        schema.set_column_physical_name(c, Some("CUST_ID".into())).unwrap();
        schema.set_column_physical_name(c, Some("CUST_ID".into())).unwrap();
        assert_eq!(counter.changed_count(), 2);

        schema.set_column_physical_name(c, None).unwrap();
        assert_eq!(counter.changed_count(), 3);
        assert_eq!(schema.column(c).unwrap().physical_name(), "customer_id");
        assert_eq!(counter.inserted_count(), 0);
        assert_eq!(counter.removed_count(), 0);
    }

    #[test]
    fn test_rank_event_only_on_change() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let c = schema.add_column(t, int("id")).unwrap();
        let counter = Arc::new(CountingListener::new());
        schema.subscribe(SubscriptionScope::Object(ObjectRef::Column(c)), counter.clone());

        schema.set_primary_key_seq(c, Some(0)).unwrap();
        schema.set_primary_key_seq(c, Some(0)).unwrap();
        assert_eq!(counter.changed_count(), 1);

        schema.set_primary_key_seq(c, None).unwrap();
        assert_eq!(counter.changed_count(), 2);
    }

    #[test]
    fn test_placed_column_goes_in_front_of_rank_holder() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let a = schema.add_column(t, int("a").with_primary_key_seq(0)).unwrap();
        let b = schema.add_column(t, int("b").with_primary_key_seq(1)).unwrap();
        let c = schema.add_column(t, int("c")).unwrap();

        schema.set_primary_key_seq(c, Some(0)).unwrap();

        assert_eq!(schema.primary_key(t).unwrap(), vec![c, a, b]);
        assert_eq!(schema.column(a).unwrap().primary_key_seq(), Some(1));
        assert_eq!(schema.column(b).unwrap().primary_key_seq(), Some(2));
    }

    #[test]
    fn test_removing_key_column_closes_gap() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let a = schema.add_column(t, int("a").with_primary_key_seq(0)).unwrap();
        let b = schema.add_column(t, int("b").with_primary_key_seq(1)).unwrap();

        schema.remove_column(a).unwrap();

        assert_eq!(schema.column(b).unwrap().primary_key_seq(), Some(0));
    }

    #[test]
    fn test_magic_disabled_leaves_ranks_alone() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let a = schema.add_column(t, int("a").with_primary_key_seq(0)).unwrap();
        let b = schema.add_column(t, int("b")).unwrap();

        schema.set_magic_enabled(t, false).unwrap();
        schema.set_primary_key_seq(b, Some(5)).unwrap();
        assert_eq!(schema.column(b).unwrap().primary_key_seq(), Some(5));

        schema.set_magic_enabled(t, true).unwrap();
        assert_eq!(schema.column(b).unwrap().primary_key_seq(), Some(5));

        schema.normalize_primary_key(t).unwrap();
        assert_eq!(schema.column(a).unwrap().primary_key_seq(), Some(0));
        assert_eq!(schema.column(b).unwrap().primary_key_seq(), Some(1));
    }

    #[test]
    fn test_move_column_fires_remove_then_insert() {
        let mut schema = Schema::new();
        let t = schema.add_table(Table::new("t"));
        let a = schema.add_column(t, int("a")).unwrap();
        let b = schema.add_column(t, int("b")).unwrap();
        let counter = Arc::new(CountingListener::new());
        schema.subscribe(SubscriptionScope::Object(ObjectRef::Table(t)), counter.clone());

        schema.move_column(a, 1).unwrap();

        assert_eq!(schema.table(t).unwrap().columns(), &[b, a]);
        assert_eq!(counter.removed_count(), 1);
        assert_eq!(counter.inserted_count(), 1);
        assert!(schema.move_column(a, 2).is_err());
    }
}
