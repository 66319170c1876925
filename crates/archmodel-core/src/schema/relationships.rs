//! Relationship operations.

use crate::error::{ModelError, Result};
use crate::events::{Child, ModelEvent, ObjectRef, Property};
use crate::model::{
    Cardinality, ColumnId, ColumnMapping, Deferrability, ReferentialAction, Relationship,
    RelationshipId, TableId,
};

use super::Schema;

impl Schema {
    /// A detached relationship carrying this schema's configured defaults.
    pub fn new_relationship(&self) -> Relationship {
        Relationship::with_defaults(&self.config)
    }

    /// Add a detached relationship to the schema.
    ///
    /// Table references set on the value must name tables of this schema.
    /// The relationship takes part in no cascade until it is registered on
    /// both tables.
    pub fn create_relationship(&mut self, mut rel: Relationship) -> Result<RelationshipId> {
        for table in [rel.pk_table(), rel.fk_table()].into_iter().flatten() {
            self.table_ref(table)?;
        }
        rel.mappings_mut().clear();

        self.next_relationship_id += 1;
        let id = RelationshipId::new(self.next_relationship_id);
        if let (true, Some(pk), Some(fk)) = (rel.is_identifying(), rel.pk_table(), rel.fk_table()) {
            if self.would_form_identifying_cycle(id, pk, fk) {
                return Err(ModelError::IdentifyingCycle(id));
            }
        }
        self.relationships.insert(id, rel);
        tracing::debug!(relationship = %id, "relationship created");
        Ok(id)
    }

    /// Set the parent table of a relationship that is not registered anywhere
    /// and has no mappings.
    pub fn set_pk_table(&mut self, rel: RelationshipId, table: Option<TableId>) -> Result<()> {
        self.check_ends_mutable(rel, table)?;
        let r = self.rel_ref(rel)?;
        if let (true, Some(pk), Some(fk)) = (r.is_identifying(), table, r.fk_table()) {
            if self.would_form_identifying_cycle(rel, pk, fk) {
                return Err(ModelError::IdentifyingCycle(rel));
            }
        }
        let old = self.rel_mut(rel)?.replace_pk_table(table);
        self.property_changed(ObjectRef::Relationship(rel), Property::PkTable, old, table);
        Ok(())
    }

    /// Set the child table of a relationship that is not registered anywhere
    /// and has no mappings.
    pub fn set_fk_table(&mut self, rel: RelationshipId, table: Option<TableId>) -> Result<()> {
        self.check_ends_mutable(rel, table)?;
        let r = self.rel_ref(rel)?;
        if let (true, Some(pk), Some(fk)) = (r.is_identifying(), r.pk_table(), table) {
            if self.would_form_identifying_cycle(rel, pk, fk) {
                return Err(ModelError::IdentifyingCycle(rel));
            }
        }
        let old = self.rel_mut(rel)?.replace_fk_table(table);
        self.property_changed(ObjectRef::Relationship(rel), Property::FkTable, old, table);
        Ok(())
    }

    fn check_ends_mutable(&self, rel: RelationshipId, table: Option<TableId>) -> Result<()> {
        if !self.rel_ref(rel)?.mappings().is_empty() || self.is_registered(rel) {
            return Err(ModelError::RelationshipRegistered(rel));
        }
        if let Some(table) = table {
            self.table_ref(table)?;
        }
        Ok(())
    }

    /// Register a relationship as exported by its parent table.
    ///
    /// Fails without mutation if `table` is not the relationship's declared
    /// parent. Registering twice is a no-op.
    pub fn add_exported_key(&mut self, table: TableId, rel: RelationshipId) -> Result<()> {
        self.table_ref(table)?;
        let r = self.rel_ref(rel)?;
        if r.pk_table() != Some(table) {
            return Err(ModelError::MismatchedPkTable {
                relationship: rel,
                expected: r.pk_table(),
                actual: table,
            });
        }
        if self.table_ref(table)?.exported_keys().contains(&rel) {
            return Ok(());
        }
        self.check_registration_cycle(rel)?;

        let t = self.table_mut(table)?;
        t.exported_keys_mut().insert(rel);
        let index = t.exported_keys().len() - 1;
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Table(table),
            child: Child::ExportedKey(rel),
            index,
        });
        Ok(())
    }

    /// Register a relationship as imported by its child table.
    ///
    /// Fails without mutation if `table` is not the relationship's declared
    /// child. Registering twice is a no-op.
    pub fn add_imported_key(&mut self, table: TableId, rel: RelationshipId) -> Result<()> {
        self.table_ref(table)?;
        let r = self.rel_ref(rel)?;
        if r.fk_table() != Some(table) {
            return Err(ModelError::MismatchedFkTable {
                relationship: rel,
                expected: r.fk_table(),
                actual: table,
            });
        }
        if self.table_ref(table)?.imported_keys().contains(&rel) {
            return Ok(());
        }
        self.check_registration_cycle(rel)?;

        let t = self.table_mut(table)?;
        t.imported_keys_mut().insert(rel);
        let index = t.imported_keys().len() - 1;
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Table(table),
            child: Child::ImportedKey(rel),
            index,
        });
        Ok(())
    }

    fn check_registration_cycle(&self, rel: RelationshipId) -> Result<()> {
        let r = self.rel_ref(rel)?;
        if let (true, Some(pk), Some(fk)) = (r.is_identifying(), r.pk_table(), r.fk_table()) {
            if self.would_form_identifying_cycle(rel, pk, fk) {
                return Err(ModelError::IdentifyingCycle(rel));
            }
        }
        Ok(())
    }

    /// Unregister a relationship from its parent table.
    ///
    /// On a live relationship this runs the detachment cascade, the same as
    /// [`Schema::remove_imported_key`], and returns the removed
    /// relationship. On a half-registered one only this side is dropped.
    pub fn remove_exported_key(
        &mut self,
        table: TableId,
        rel: RelationshipId,
    ) -> Result<Option<Relationship>> {
        if !self.table_ref(table)?.exported_keys().contains(&rel) {
            return Err(ModelError::NotRegistered {
                relationship: rel,
                table,
            });
        }
        if self.is_live(rel) {
            self.detach(rel).map(Some)
        } else {
            self.deregister_exported(rel)?;
            Ok(None)
        }
    }

    /// Unregister a relationship from its child table.
    ///
    /// See [`Schema::remove_exported_key`].
    pub fn remove_imported_key(
        &mut self,
        table: TableId,
        rel: RelationshipId,
    ) -> Result<Option<Relationship>> {
        if !self.table_ref(table)?.imported_keys().contains(&rel) {
            return Err(ModelError::NotRegistered {
                relationship: rel,
                table,
            });
        }
        if self.is_live(rel) {
            self.detach(rel).map(Some)
        } else {
            self.deregister_imported(rel)?;
            Ok(None)
        }
    }

    /// Remove a relationship from the schema.
    ///
    /// A live relationship goes through the detachment cascade, so child
    /// columns only it mapped are removed. Otherwise its registrations and
    /// mappings are dropped and no column is touched.
    pub fn remove_relationship(&mut self, rel: RelationshipId) -> Result<Relationship> {
        self.rel_ref(rel)?;
        if self.is_live(rel) {
            self.detach(rel)
        } else {
            self.discard_relationship(rel)
        }
    }

    fn detach(&mut self, rel: RelationshipId) -> Result<Relationship> {
        let description = format!("remove relationship {}", self.rel_ref(rel)?.name());
        self.compound_edit(description, |s| s.detach_cascade(rel))
    }

    /// Append a mapping.
    ///
    /// `pk_column` must be a key column of the parent table and `fk_column`
    /// a column of the child table. On an identifying relationship the child
    /// column joins the child's key. On a live relationship whose parent has
    /// cascades enabled the mappings are then put back in key order.
    pub fn add_mapping(
        &mut self,
        rel: RelationshipId,
        pk_column: ColumnId,
        fk_column: ColumnId,
    ) -> Result<()> {
        let r = self.rel_ref(rel)?;
        let (Some(pk_table), Some(fk_table)) = (r.pk_table(), r.fk_table()) else {
            return Err(ModelError::RelationshipIncomplete(rel));
        };
        let pk = self.column_ref(pk_column)?;
        if pk.table() != Some(pk_table) {
            return Err(ModelError::ColumnNotInTable {
                column: pk_column,
                table: pk_table,
            });
        }
        if !pk.is_primary_key() {
            return Err(ModelError::NotPrimaryKey(pk_column));
        }
        if self.column_ref(fk_column)?.table() != Some(fk_table) {
            return Err(ModelError::ColumnNotInTable {
                column: fk_column,
                table: fk_table,
            });
        }
        if r.contains_pk_column(pk_column) {
            return Err(ModelError::DuplicateMapping {
                relationship: rel,
                column: pk_column,
            });
        }

        let promote = r.is_identifying() && !self.column_ref(fk_column)?.is_primary_key();
        if promote && self.has_key_dependents(fk_table) {
            self.compound_edit("add mapping", |s| {
                s.push_mapping(rel, pk_column, fk_column, promote)
            })
        } else {
            self.push_mapping(rel, pk_column, fk_column, promote)
        }
    }

    fn push_mapping(
        &mut self,
        rel: RelationshipId,
        pk_column: ColumnId,
        fk_column: ColumnId,
        promote: bool,
    ) -> Result<()> {
        let mapping = ColumnMapping::new(pk_column, fk_column);
        let r = self.rel_mut(rel)?;
        r.mappings_mut().push(mapping);
        let index = r.mappings().len() - 1;
        self.emit(ModelEvent::ChildInserted {
            source: ObjectRef::Relationship(rel),
            child: Child::Mapping(mapping),
            index,
        });
        if promote {
            self.promote_into_key(fk_column)?;
        }

        let pk_table = self.owner_of(pk_column)?;
        if self.is_live(rel) && self.table_ref(pk_table)?.cascades_enabled() {
            self.sync_mapping_order(rel)?;
        }
        Ok(())
    }

    /// Remove the mapping of a parent column. The child column is kept.
    pub fn remove_mapping(
        &mut self,
        rel: RelationshipId,
        pk_column: ColumnId,
    ) -> Result<Option<ColumnMapping>> {
        let Some(index) = self
            .rel_ref(rel)?
            .mappings()
            .iter()
            .position(|m| m.pk_column == pk_column)
        else {
            return Ok(None);
        };
        self.remove_mapping_at(rel, index).map(Some)
    }

    /// Map one parent key column on a live relationship, adopting a
    /// same-named child column or creating one. Returns the child column.
    pub fn map_primary_key_column(
        &mut self,
        rel: RelationshipId,
        pk_column: ColumnId,
    ) -> Result<ColumnId> {
        if !self.is_live(rel) {
            self.rel_ref(rel)?;
            return Err(ModelError::RelationshipNotLive(rel));
        }
        let r = self.rel_ref(rel)?;
        let pk_table = r.pk_table().ok_or(ModelError::RelationshipIncomplete(rel))?;
        let pk = self.column_ref(pk_column)?;
        if pk.table() != Some(pk_table) {
            return Err(ModelError::ColumnNotInTable {
                column: pk_column,
                table: pk_table,
            });
        }
        if !pk.is_primary_key() {
            return Err(ModelError::NotPrimaryKey(pk_column));
        }
        if r.contains_pk_column(pk_column) {
            return Err(ModelError::DuplicateMapping {
                relationship: rel,
                column: pk_column,
            });
        }

        let description = format!("map key column {}", pk.name());
        self.compound_edit(description, |s| s.hijack_or_synthesize(rel, pk_column))
    }

    /// Connect a detached relationship to its tables in one step.
    ///
    /// Sets both ends, registers the relationship on both tables and, when
    /// `auto_generate_mapping` is set, maps every parent key column in key
    /// order by adopting or creating child columns. The child table is held
    /// in secondary-change mode for the duration, and the whole operation is
    /// one compound edit.
    pub fn attach_relationship(
        &mut self,
        rel: RelationshipId,
        pk_table: TableId,
        fk_table: TableId,
        auto_generate_mapping: bool,
    ) -> Result<()> {
        let r = self.rel_ref(rel)?;
        self.table_ref(pk_table)?;
        self.table_ref(fk_table)?;
        if !r.mappings().is_empty() || self.is_registered(rel) {
            return Err(ModelError::RelationshipRegistered(rel));
        }
        if r.is_identifying() && self.would_form_identifying_cycle(rel, pk_table, fk_table) {
            return Err(ModelError::IdentifyingCycle(rel));
        }

        let description = format!("attach relationship {}", r.name());
        self.compound_edit(description, |s| {
            let entered = s.enter_secondary_change(fk_table)?;
            let result = s.attach_steps(rel, pk_table, fk_table, auto_generate_mapping);
            let exited = if entered {
                s.exit_secondary_change(fk_table)
            } else {
                Ok(())
            };
            result.and(exited)
        })
    }

    fn attach_steps(
        &mut self,
        rel: RelationshipId,
        pk_table: TableId,
        fk_table: TableId,
        auto_generate_mapping: bool,
    ) -> Result<()> {
        if self.rel_ref(rel)?.pk_table() != Some(pk_table) {
            let old = self.rel_mut(rel)?.replace_pk_table(Some(pk_table));
            self.property_changed(ObjectRef::Relationship(rel), Property::PkTable, old, pk_table);
        }
        if self.rel_ref(rel)?.fk_table() != Some(fk_table) {
            let old = self.rel_mut(rel)?.replace_fk_table(Some(fk_table));
            self.property_changed(ObjectRef::Relationship(rel), Property::FkTable, old, fk_table);
        }
        self.add_exported_key(pk_table, rel)?;
        self.add_imported_key(fk_table, rel)?;

        if auto_generate_mapping {
            for pk in self.primary_key(pk_table)? {
                if self.rel_ref(rel)?.mapping_by_pk_column(pk).is_none() {
                    self.hijack_or_synthesize(rel, pk)?;
                }
            }
        }
        Ok(())
    }

    /// Check if a relationship's mappings follow its parent's key exactly.
    pub fn mapping_matches_key(&self, rel: RelationshipId) -> Result<bool> {
        let r = self.rel_ref(rel)?;
        let pk_table = r.pk_table().ok_or(ModelError::RelationshipIncomplete(rel))?;
        let key = self.primary_key(pk_table)?;
        Ok(r.mappings().iter().map(|m| m.pk_column).eq(key))
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    /// Mark a relationship identifying or not.
    ///
    /// Turning it on is rejected when it would close a cycle of identifying
    /// relationships, a relationship from a table to itself included. On a
    /// live relationship the mapped child columns join the child's key when
    /// turned on and leave it when turned off, unless another live
    /// identifying relationship still maps them.
    pub fn set_identifying(&mut self, rel: RelationshipId, identifying: bool) -> Result<()> {
        let r = self.rel_ref(rel)?;
        if identifying && !r.is_identifying() {
            if let (Some(pk), Some(fk)) = (r.pk_table(), r.fk_table()) {
                if self.would_form_identifying_cycle(rel, pk, fk) {
                    return Err(ModelError::IdentifyingCycle(rel));
                }
            }
        }

        let changed = r.is_identifying() != identifying;
        if changed && self.is_live(rel) && !r.mappings().is_empty() {
            let description = if identifying {
                "make relationship identifying"
            } else {
                "make relationship non-identifying"
            };
            self.compound_edit(description, |s| s.set_identifying_at(rel, identifying))
        } else {
            self.set_identifying_at(rel, identifying)
        }
    }

    fn set_identifying_at(&mut self, rel: RelationshipId, identifying: bool) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_identifying(identifying);
        self.property_changed(
            ObjectRef::Relationship(rel),
            Property::Identifying,
            old,
            identifying,
        );
        if old == identifying || !self.is_live(rel) {
            return Ok(());
        }

        let fk_columns: Vec<ColumnId> = self
            .rel_ref(rel)?
            .mappings()
            .iter()
            .map(|m| m.fk_column)
            .collect();
        for fk in fk_columns {
            if !self.columns.contains_key(&fk) {
                continue;
            }
            if identifying {
                self.promote_into_key(fk)?;
            } else if !self.is_held_by_identifying(fk, rel) {
                self.set_primary_key_seq_at(fk, None)?;
            }
        }
        Ok(())
    }

    /// Check if a live identifying relationship other than `except` maps
    /// `column` on its child side.
    fn is_held_by_identifying(&self, column: ColumnId, except: RelationshipId) -> bool {
        self.relationships.iter().any(|(id, r)| {
            *id != except && r.is_identifying() && r.contains_fk_column(column) && self.is_live(*id)
        })
    }

    pub fn set_relationship_name(
        &mut self,
        rel: RelationshipId,
        name: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let old = self.rel_mut(rel)?.replace_name(name.clone());
        self.property_changed(ObjectRef::Relationship(rel), Property::Name, old, name);
        Ok(())
    }

    /// Set or clear a relationship's physical name. Fires on every call.
    pub fn set_relationship_physical_name(
        &mut self,
        rel: RelationshipId,
        name: Option<String>,
    ) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_physical_name(name.clone());
        self.property_changed(ObjectRef::Relationship(rel), Property::PhysicalName, old, name);
        Ok(())
    }

    pub fn set_pk_cardinality(&mut self, rel: RelationshipId, value: Cardinality) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_pk_cardinality(value);
        self.property_changed(ObjectRef::Relationship(rel), Property::PkCardinality, old, value);
        Ok(())
    }

    pub fn set_fk_cardinality(&mut self, rel: RelationshipId, value: Cardinality) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_fk_cardinality(value);
        self.property_changed(ObjectRef::Relationship(rel), Property::FkCardinality, old, value);
        Ok(())
    }

    pub fn set_update_rule(&mut self, rel: RelationshipId, rule: ReferentialAction) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_update_rule(rule);
        self.property_changed(ObjectRef::Relationship(rel), Property::UpdateRule, old, rule);
        Ok(())
    }

    pub fn set_delete_rule(&mut self, rel: RelationshipId, rule: ReferentialAction) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_delete_rule(rule);
        self.property_changed(ObjectRef::Relationship(rel), Property::DeleteRule, old, rule);
        Ok(())
    }

    pub fn set_deferrability(&mut self, rel: RelationshipId, value: Deferrability) -> Result<()> {
        let old = self.rel_mut(rel)?.replace_deferrability(value);
        self.property_changed(ObjectRef::Relationship(rel), Property::Deferrability, old, value);
        Ok(())
    }
}
