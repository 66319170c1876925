//! Cascade rules keeping foreign-key columns consistent with the keys they
//! reference.
//!
//! Every rule here runs inside a public operation of [`Schema`] and finishes,
//! events included, before that operation returns. Recursion follows chains
//! of identifying relationships, which registration keeps acyclic, or removes
//! a column per step, so every cascade terminates.

use std::collections::HashSet;

use crate::error::{ModelError, Result};
use crate::events::{Child, ModelEvent, ObjectRef};
use crate::model::{Column, ColumnId, ColumnMapping, Relationship, RelationshipId, TableId};

use super::Schema;

impl Schema {
    /// React to a key rank change on `column`.
    pub(crate) fn after_rank_change(
        &mut self,
        column: ColumnId,
        old: Option<u32>,
        new: Option<u32>,
    ) -> Result<()> {
        let table = self.owner_of(column)?;
        if !self.table_ref(table)?.cascades_enabled() {
            return Ok(());
        }

        self.normalize_key(table, new.map(|_| column))?;

        let exported: Vec<RelationshipId> = self
            .table_ref(table)?
            .exported_keys()
            .iter()
            .copied()
            .filter(|rel| self.is_live(*rel))
            .collect();

        match (old, new) {
            (None, Some(_)) => {
                for rel in exported {
                    if self.rel_ref(rel)?.mapping_by_pk_column(column).is_none() {
                        self.hijack_or_synthesize(rel, column)?;
                    }
                }
            }
            (Some(_), None) => {
                for rel in exported {
                    let Some(index) = self
                        .rel_ref(rel)?
                        .mappings()
                        .iter()
                        .position(|m| m.pk_column == column)
                    else {
                        continue;
                    };
                    tracing::debug!(relationship = %rel, %column, "key column demoted");
                    let mapping = self.remove_mapping_at(rel, index)?;
                    self.remove_if_orphaned(mapping.fk_column)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Map a parent key column in a live relationship, adopting a
    /// same-named unmapped child column if one exists and creating one
    /// otherwise.
    ///
    /// The adopted column's type is not compared with the key column's.
    pub(crate) fn hijack_or_synthesize(
        &mut self,
        rel: RelationshipId,
        pk_column: ColumnId,
    ) -> Result<ColumnId> {
        let r = self.rel_ref(rel)?;
        let fk_table = r.fk_table().ok_or(ModelError::RelationshipIncomplete(rel))?;
        let identifying = r.is_identifying();
        let pk = self.column_ref(pk_column)?;

        let candidate = self
            .table_ref(fk_table)?
            .columns()
            .iter()
            .copied()
            .find(|c| {
                *c != pk_column
                    && !r.contains_fk_column(*c)
                    && !r.contains_pk_column(*c)
                    && self
                        .columns
                        .get(c)
                        .is_some_and(|col| col.name() == pk.name())
            });

        let fk_column = match candidate {
            Some(existing) => {
                tracing::debug!(relationship = %rel, column = %existing, "hijacking column");
                existing
            }
            None => {
                let derived = Column::derived_from(pk);
                let index = if identifying {
                    self.key_insert_position(fk_table)?
                } else {
                    self.table_ref(fk_table)?.column_count()
                };
                tracing::debug!(relationship = %rel, name = derived.name(), "synthesizing column");
                self.insert_column_at(fk_table, index, derived)?
            }
        };

        let mapping = ColumnMapping::new(pk_column, fk_column);
        let r = self.rel_mut(rel)?;
        r.mappings_mut().push(mapping);
        let index = r.mappings().len() - 1;
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Relationship(rel),
            child: Child::Mapping(mapping),
            index,
        });

        if identifying {
            self.promote_into_key(fk_column)?;
        }
        self.sync_mapping_order(rel)?;
        Ok(fk_column)
    }

    /// Put a child column at the end of its table's key if it is not in it.
    pub(crate) fn promote_into_key(&mut self, column: ColumnId) -> Result<()> {
        if self.column_ref(column)?.is_primary_key() {
            return Ok(());
        }
        let table = self.owner_of(column)?;
        let next = self
            .table_ref(table)?
            .columns()
            .iter()
            .filter_map(|c| self.columns.get(c)?.primary_key_seq())
            .max()
            .map_or(0, |max| max + 1);
        self.set_primary_key_seq_at(column, Some(next))
    }

    /// Index just after the last key column of a table.
    fn key_insert_position(&self, table: TableId) -> Result<usize> {
        let t = self.table_ref(table)?;
        Ok(t.columns()
            .iter()
            .rposition(|c| self.columns.get(c).is_some_and(|col| col.is_primary_key()))
            .map_or(0, |pos| pos + 1))
    }

    /// Remove a column and everything that depended on it.
    ///
    /// Order: the column leaves its table, then every mapping that refers to
    /// it is dropped, then foreign-key columns left without a live mapping
    /// are removed the same way, then the table's key is renumbered.
    pub(crate) fn remove_column_cascade(&mut self, column: ColumnId) -> Result<Column> {
        let table = self.owner_of(column)?;
        let index = self
            .table_ref(table)?
            .column_index(column)
            .ok_or(ModelError::ColumnNotInTable { column, table })?;

        self.table_mut(table)?.remove_column_at(index);
        let mut removed = self
            .columns
            .remove(&column)
            .ok_or(ModelError::UnknownColumn(column))?;
        removed.detach();
        tracing::trace!(%table, %column, index, "column removed");
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Table(table),
            child: Child::Column(column),
            index,
        });

        let affected: Vec<RelationshipId> = self
            .relationships
            .iter()
            .filter(|(_, r)| r.contains_pk_column(column) || r.contains_fk_column(column))
            .map(|(id, _)| *id)
            .collect();

        let mut orphans = Vec::new();
        for rel in affected {
            let live = self.is_live(rel);
            while let Some(index) = self
                .rel_ref(rel)?
                .mappings()
                .iter()
                .position(|m| m.pk_column == column || m.fk_column == column)
            {
                let mapping = self.remove_mapping_at(rel, index)?;
                if live && mapping.pk_column == column && !orphans.contains(&mapping.fk_column) {
                    orphans.push(mapping.fk_column);
                }
            }
        }

        for fk in orphans {
            self.remove_if_orphaned(fk)?;
        }

        if removed.is_primary_key() && self.table_ref(table)?.cascades_enabled() {
            self.normalize_key(table, None)?;
        }
        Ok(removed)
    }

    /// Remove a foreign-key column unless a live relationship still maps it.
    pub(crate) fn remove_if_orphaned(&mut self, column: ColumnId) -> Result<()> {
        if !self.columns.contains_key(&column) || self.is_retained(column) {
            return Ok(());
        }
        tracing::debug!(%column, "removing orphaned column");
        self.remove_column_cascade(column).map(|_| ())
    }

    /// Check if any live relationship maps `column` on its child side.
    pub(crate) fn is_retained(&self, column: ColumnId) -> bool {
        self.relationships
            .iter()
            .any(|(id, r)| r.contains_fk_column(column) && self.is_live(*id))
    }

    pub(crate) fn remove_mapping_at(
        &mut self,
        rel: RelationshipId,
        index: usize,
    ) -> Result<ColumnMapping> {
        let mapping = self.rel_mut(rel)?.mappings_mut().remove(index);
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Relationship(rel),
            child: Child::Mapping(mapping),
            index,
        });
        Ok(mapping)
    }

    /// Reorder a relationship's mappings to follow the parent key.
    ///
    /// Mappings whose parent column has left the key keep their relative
    /// order at the end. Fires one structure change if the order moved.
    pub(crate) fn sync_mapping_order(&mut self, rel: RelationshipId) -> Result<()> {
        let mut keyed: Vec<(u32, usize, ColumnMapping)> = self
            .rel_ref(rel)?
            .mappings()
            .iter()
            .enumerate()
            .map(|(pos, m)| {
                let seq = self
                    .columns
                    .get(&m.pk_column)
                    .and_then(Column::primary_key_seq)
                    .unwrap_or(u32::MAX);
                (seq, pos, *m)
            })
            .collect();
        if keyed.windows(2).all(|w| (w[0].0, w[0].1) <= (w[1].0, w[1].1)) {
            return Ok(());
        }

        keyed.sort_unstable_by_key(|(seq, pos, _)| (*seq, *pos));
        *self.rel_mut(rel)?.mappings_mut() = keyed.into_iter().map(|(_, _, m)| m).collect();
        self.emit(ModelEvent::StructureChanged {
            source: ObjectRef::Relationship(rel),
        });
        Ok(())
    }

    /// Unregister a live relationship from both tables, drop its mappings
    /// and remove the child columns only it mapped.
    pub(crate) fn detach_cascade(&mut self, rel: RelationshipId) -> Result<Relationship> {
        if !self.is_live(rel) {
            return Err(ModelError::RelationshipNotLive(rel));
        }
        tracing::debug!(relationship = %rel, "detaching relationship");

        self.deregister_exported(rel)?;
        self.deregister_imported(rel)?;

        let mut fk_columns = Vec::new();
        while let Some(last) = self.rel_ref(rel)?.mappings().len().checked_sub(1) {
            let mapping = self.remove_mapping_at(rel, last)?;
            if !fk_columns.contains(&mapping.fk_column) {
                fk_columns.push(mapping.fk_column);
            }
        }
        fk_columns.reverse();

        for fk in fk_columns {
            self.remove_if_orphaned(fk)?;
        }

        self.relationships
            .shift_remove(&rel)
            .ok_or(ModelError::UnknownRelationship(rel))
    }

    /// Drop a relationship that is not live: unregister whichever side it is
    /// registered on and drop its mappings without touching any column.
    pub(crate) fn discard_relationship(&mut self, rel: RelationshipId) -> Result<Relationship> {
        self.deregister_exported(rel)?;
        self.deregister_imported(rel)?;
        while let Some(last) = self.rel_ref(rel)?.mappings().len().checked_sub(1) {
            self.remove_mapping_at(rel, last)?;
        }
        tracing::debug!(relationship = %rel, "relationship discarded");
        self.relationships
            .shift_remove(&rel)
            .ok_or(ModelError::UnknownRelationship(rel))
    }

    /// Remove a relationship from its parent's exported keys, if present.
    pub(crate) fn deregister_exported(&mut self, rel: RelationshipId) -> Result<bool> {
        let Some(table) = self.rel_ref(rel)?.pk_table() else {
            return Ok(false);
        };
        let Some(t) = self.tables.get_mut(&table) else {
            return Ok(false);
        };
        let Some(index) = t.exported_keys().get_index_of(&rel) else {
            return Ok(false);
        };
        t.exported_keys_mut().shift_remove_index(index);
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Table(table),
            child: Child::ExportedKey(rel),
            index,
        });
        Ok(true)
    }

    /// Remove a relationship from its child's imported keys, if present.
    pub(crate) fn deregister_imported(&mut self, rel: RelationshipId) -> Result<bool> {
        let Some(table) = self.rel_ref(rel)?.fk_table() else {
            return Ok(false);
        };
        let Some(t) = self.tables.get_mut(&table) else {
            return Ok(false);
        };
        let Some(index) = t.imported_keys().get_index_of(&rel) else {
            return Ok(false);
        };
        t.imported_keys_mut().shift_remove_index(index);
        self.emit(ModelEvent::ChildRemoved {
            source: ObjectRef::Table(table),
            child: Child::ImportedKey(rel),
            index,
        });
        Ok(true)
    }

    /// Check if an identifying link from `pk_table` to `fk_table` would close
    /// a cycle of identifying relationships.
    ///
    /// `ignore` is the relationship being checked, so its own current state
    /// does not count.
    pub(crate) fn would_form_identifying_cycle(
        &self,
        ignore: RelationshipId,
        pk_table: TableId,
        fk_table: TableId,
    ) -> bool {
        if pk_table == fk_table {
            return true;
        }

        let mut visited = HashSet::new();
        let mut stack = vec![fk_table];
        while let Some(table) = stack.pop() {
            if table == pk_table {
                return true;
            }
            if !visited.insert(table) {
                continue;
            }
            let Some(t) = self.tables.get(&table) else {
                continue;
            };
            for rel in t.exported_keys() {
                if *rel == ignore || !self.is_live(*rel) {
                    continue;
                }
                if let Some(r) = self.relationships.get(rel) {
                    if r.is_identifying() {
                        stack.extend(r.fk_table());
                    }
                }
            }
        }
        false
    }

    /// Bring every live relationship a table exports back in line with its
    /// key: drop mappings of columns that left the key and map key columns
    /// that are missing.
    pub(crate) fn reconcile_exported(&mut self, table: TableId) -> Result<()> {
        self.normalize_key(table, None)?;

        let key = self.primary_key(table)?;
        let exported: Vec<RelationshipId> = self
            .table_ref(table)?
            .exported_keys()
            .iter()
            .copied()
            .filter(|rel| self.is_live(*rel))
            .collect();

        for rel in exported {
            while let Some(index) = self
                .rel_ref(rel)?
                .mappings()
                .iter()
                .position(|m| !key.contains(&m.pk_column))
            {
                let mapping = self.remove_mapping_at(rel, index)?;
                self.remove_if_orphaned(mapping.fk_column)?;
            }
            for pk in &key {
                if self.rel_ref(rel)?.mapping_by_pk_column(*pk).is_none() {
                    self.hijack_or_synthesize(rel, *pk)?;
                }
            }
            self.sync_mapping_order(rel)?;
        }
        Ok(())
    }

    /// Check if reconciling a table's exported relationships would change
    /// anything.
    pub(crate) fn needs_reconcile(&self, table: TableId) -> Result<bool> {
        let key = self.primary_key(table)?;
        for (seq, column) in key.iter().enumerate() {
            if self.column_ref(*column)?.primary_key_seq() != Some(seq as u32) {
                return Ok(true);
            }
        }
        for rel in self.table_ref(table)?.exported_keys() {
            if !self.is_live(*rel) {
                continue;
            }
            let mapped: Vec<ColumnId> = self
                .rel_ref(*rel)?
                .mappings()
                .iter()
                .map(|m| m.pk_column)
                .collect();
            if mapped != key {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SqlType, Table};

    fn int(name: &str) -> Column {
        Column::new(name, SqlType::Integer, 10, 0)
    }

    fn live(schema: &mut Schema, parent: TableId, child: TableId, identifying: bool) -> RelationshipId {
        let rel = schema
            .create_relationship(
                Relationship::new()
                    .with_identifying(identifying)
                    .with_pk_table(parent)
                    .with_fk_table(child),
            )
            .unwrap();
        schema.add_exported_key(parent, rel).unwrap();
        schema.add_imported_key(child, rel).unwrap();
        rel
    }

    #[test]
    fn test_synthesized_identifying_column_goes_after_key() {
        let mut schema = Schema::new();
        let parent = schema.add_table(Table::new("parent"));
        let child = schema.add_table(Table::new("child"));
        let own_key = schema
            .add_column(child, int("line_no").with_primary_key_seq(0))
            .unwrap();
        let note = schema.add_column(child, int("note")).unwrap();
        let rel = live(&mut schema, parent, child, true);

        let pk = schema
            .add_column(parent, int("order_id").with_primary_key_seq(0))
            .unwrap();

        let fk = schema.rel_ref(rel).unwrap().mappings()[0].fk_column;
        assert_eq!(schema.column(fk).unwrap().name(), "order_id");
        assert_eq!(schema.table(child).unwrap().columns(), &[own_key, fk, note]);
        assert_eq!(schema.column(fk).unwrap().primary_key_seq(), Some(1));
        assert_eq!(schema.rel_ref(rel).unwrap().mappings()[0].pk_column, pk);
    }

    #[test]
    fn test_hijack_ignores_type_mismatch() {
        let mut schema = Schema::new();
        let parent = schema.add_table(Table::new("parent"));
        let child = schema.add_table(Table::new("child"));
        let existing = schema
            .add_column(child, Column::new("code", SqlType::Varchar, 20, 0))
            .unwrap();
        let rel = live(&mut schema, parent, child, false);

        schema
            .add_column(parent, int("code").with_primary_key_seq(0))
            .unwrap();

        assert!(schema.rel_ref(rel).unwrap().contains_fk_column(existing));
        assert_eq!(schema.table(child).unwrap().column_count(), 1);
        assert_eq!(schema.column(existing).unwrap().data_type(), SqlType::Varchar);
        assert!(!schema.column(existing).unwrap().is_primary_key());
    }

    #[test]
    fn test_demotion_removes_unshared_fk_column() {
        let mut schema = Schema::new();
        let parent = schema.add_table(Table::new("parent"));
        let child = schema.add_table(Table::new("child"));
        let rel = live(&mut schema, parent, child, false);
        let pk = schema
            .add_column(parent, int("id").with_primary_key_seq(0))
            .unwrap();
        assert_eq!(schema.table(child).unwrap().column_count(), 1);

        schema.set_primary_key_seq(pk, None).unwrap();

        assert!(schema.rel_ref(rel).unwrap().mappings().is_empty());
        assert_eq!(schema.table(child).unwrap().column_count(), 0);
        assert!(schema.column(pk).is_some());
    }

    #[test]
    fn test_shared_fk_column_survives_one_removal() {
        let mut schema = Schema::new();
        let a = schema.add_table(Table::new("a"));
        let b = schema.add_table(Table::new("b"));
        let child = schema.add_table(Table::new("child"));
        let rel_a = live(&mut schema, a, child, false);
        let rel_b = live(&mut schema, b, child, false);

        let pk_a = schema
            .add_column(a, int("tenant_id").with_primary_key_seq(0))
            .unwrap();
        let fk = schema.column_by_name(child, "tenant_id").unwrap();
        let pk_b = schema.add_column(b, int("tenant_id")).unwrap();
        schema.set_primary_key_seq(pk_b, Some(0)).unwrap();

        // rel_b found no unmapped "tenant_id" in its own mapping and adopted
        // the same child column rel_a uses.
        assert!(schema.rel_ref(rel_a).unwrap().contains_fk_column(fk));
        assert!(schema.rel_ref(rel_b).unwrap().contains_fk_column(fk));
        assert_eq!(schema.table(child).unwrap().column_count(), 1);

        schema.remove_column(pk_a).unwrap();
        assert!(schema.column(fk).is_some());

        schema.remove_column(pk_b).unwrap();
        assert!(schema.column(fk).is_none());
    }

    #[test]
    fn test_identifying_chain_propagates_to_grandchild() {
        let mut schema = Schema::new();
        let a = schema.add_table(Table::new("a"));
        let b = schema.add_table(Table::new("b"));
        let c = schema.add_table(Table::new("c"));
        live(&mut schema, a, b, true);
        live(&mut schema, b, c, true);

        let pk = schema
            .add_column(a, int("root_id").with_primary_key_seq(0))
            .unwrap();

        let in_b = schema.column_by_name(b, "root_id").unwrap();
        let in_c = schema.column_by_name(c, "root_id").unwrap();
        assert!(schema.column(in_b).unwrap().is_primary_key());
        assert!(schema.column(in_c).unwrap().is_primary_key());

        schema.remove_column(pk).unwrap();
        assert!(schema.column(in_b).is_none());
        assert!(schema.column(in_c).is_none());
    }

    #[test]
    fn test_long_identifying_chain_cascades_fully() {
        let mut schema = Schema::new();
        let tables: Vec<TableId> = (0..150)
            .map(|i| schema.add_table(Table::new(format!("t{i}"))))
            .collect();
        let rels: Vec<RelationshipId> = tables
            .windows(2)
            .map(|pair| live(&mut schema, pair[0], pair[1], true))
            .collect();

        let pk = schema
            .add_column(tables[0], int("id").with_primary_key_seq(0))
            .unwrap();

        for table in &tables {
            let id = schema.column_by_name(*table, "id").unwrap();
            assert_eq!(schema.column(id).unwrap().primary_key_seq(), Some(0));
        }
        for rel in &rels {
            assert!(schema.mapping_matches_key(*rel).unwrap());
        }

        schema.remove_column(pk).unwrap();
        for table in &tables {
            assert_eq!(schema.table(*table).unwrap().column_count(), 0);
        }
    }

    #[test]
    fn test_cycle_detection() {
        let mut schema = Schema::new();
        let a = schema.add_table(Table::new("a"));
        let b = schema.add_table(Table::new("b"));
        let ab = live(&mut schema, a, b, true);

        assert!(schema.would_form_identifying_cycle(RelationshipId::new(99), b, a));
        assert!(!schema.would_form_identifying_cycle(ab, a, b));
        assert!(schema.would_form_identifying_cycle(ab, a, a));
    }
}
