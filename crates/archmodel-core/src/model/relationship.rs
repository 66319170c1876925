//! Relationship definitions between tables.

use super::ids::{ColumnId, TableId};
use super::types::{Cardinality, Deferrability, ReferentialAction};
use crate::config::ModelConfig;

/// An ordered pair linking a parent primary key column to a child column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnMapping {
    /// Column of the parent table's primary key.
    pub pk_column: ColumnId,
    /// Column of the child table.
    pub fk_column: ColumnId,
}

impl ColumnMapping {
    /// Create a new mapping.
    pub fn new(pk_column: ColumnId, fk_column: ColumnId) -> Self {
        Self {
            pk_column,
            fk_column,
        }
    }
}

/// A directed link from one parent (primary key) table to one child
/// (foreign key) table.
///
/// A relationship is live only while it is registered as an exported key of
/// its parent and an imported key of its child.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    name: String,
    physical_name: Option<String>,
    pk_table: Option<TableId>,
    fk_table: Option<TableId>,
    mappings: Vec<ColumnMapping>,
    identifying: bool,
    pk_cardinality: Cardinality,
    fk_cardinality: Cardinality,
    update_rule: ReferentialAction,
    delete_rule: ReferentialAction,
    deferrability: Deferrability,
}

impl Relationship {
    /// Create an unnamed, detached, non-identifying relationship with the
    /// default cardinalities and rules.
    pub fn new() -> Self {
        Self::with_defaults(&ModelConfig::default())
    }

    /// Create a detached relationship using the defaults of a configuration.
    pub fn with_defaults(config: &ModelConfig) -> Self {
        Self {
            name: String::new(),
            physical_name: None,
            pk_table: None,
            fk_table: None,
            mappings: Vec::new(),
            identifying: false,
            pk_cardinality: config.default_pk_cardinality,
            fk_cardinality: config.default_fk_cardinality,
            update_rule: config.default_update_rule,
            delete_rule: config.default_delete_rule,
            deferrability: config.default_deferrability,
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the identifying flag.
    pub fn with_identifying(mut self, identifying: bool) -> Self {
        self.identifying = identifying;
        self
    }

    /// Set the parent table.
    pub fn with_pk_table(mut self, table: TableId) -> Self {
        self.pk_table = Some(table);
        self
    }

    /// Set the child table.
    pub fn with_fk_table(mut self, table: TableId) -> Self {
        self.fk_table = Some(table);
        self
    }

    /// Set both cardinalities.
    pub fn with_cardinality(mut self, pk: Cardinality, fk: Cardinality) -> Self {
        self.pk_cardinality = pk;
        self.fk_cardinality = fk;
        self
    }

    /// Set the update and delete rules.
    pub fn with_rules(mut self, update: ReferentialAction, delete: ReferentialAction) -> Self {
        self.update_rule = update;
        self.delete_rule = delete;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical name, falling back to the logical name.
    pub fn physical_name(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.name)
    }

    pub fn physical_name_override(&self) -> Option<&str> {
        self.physical_name.as_deref()
    }

    /// The parent (primary key) table.
    pub fn pk_table(&self) -> Option<TableId> {
        self.pk_table
    }

    /// The child (foreign key) table.
    pub fn fk_table(&self) -> Option<TableId> {
        self.fk_table
    }

    /// Column mappings in parent key order.
    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub fn is_identifying(&self) -> bool {
        self.identifying
    }

    pub fn pk_cardinality(&self) -> Cardinality {
        self.pk_cardinality
    }

    pub fn fk_cardinality(&self) -> Cardinality {
        self.fk_cardinality
    }

    pub fn update_rule(&self) -> ReferentialAction {
        self.update_rule
    }

    pub fn delete_rule(&self) -> ReferentialAction {
        self.delete_rule
    }

    pub fn deferrability(&self) -> Deferrability {
        self.deferrability
    }

    /// The mapping whose parent side is `column`.
    ///
    /// `None` is a normal outcome: the column simply is not mapped here.
    pub fn mapping_by_pk_column(&self, column: ColumnId) -> Option<&ColumnMapping> {
        self.mappings.iter().find(|m| m.pk_column == column)
    }

    /// Check if any mapping's child side is `column`.
    pub fn contains_fk_column(&self, column: ColumnId) -> bool {
        self.mappings.iter().any(|m| m.fk_column == column)
    }

    /// Check if any mapping's parent side is `column`.
    pub fn contains_pk_column(&self, column: ColumnId) -> bool {
        self.mappings.iter().any(|m| m.pk_column == column)
    }

    pub(crate) fn mappings_mut(&mut self) -> &mut Vec<ColumnMapping> {
        &mut self.mappings
    }

    pub(crate) fn replace_pk_table(&mut self, table: Option<TableId>) -> Option<TableId> {
        std::mem::replace(&mut self.pk_table, table)
    }

    pub(crate) fn replace_fk_table(&mut self, table: Option<TableId>) -> Option<TableId> {
        std::mem::replace(&mut self.fk_table, table)
    }

    pub(crate) fn replace_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    pub(crate) fn replace_physical_name(&mut self, name: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.physical_name, name)
    }

    pub(crate) fn replace_identifying(&mut self, identifying: bool) -> bool {
        std::mem::replace(&mut self.identifying, identifying)
    }

    pub(crate) fn replace_pk_cardinality(&mut self, value: Cardinality) -> Cardinality {
        std::mem::replace(&mut self.pk_cardinality, value)
    }

    pub(crate) fn replace_fk_cardinality(&mut self, value: Cardinality) -> Cardinality {
        std::mem::replace(&mut self.fk_cardinality, value)
    }

    pub(crate) fn replace_update_rule(&mut self, rule: ReferentialAction) -> ReferentialAction {
        std::mem::replace(&mut self.update_rule, rule)
    }

    pub(crate) fn replace_delete_rule(&mut self, rule: ReferentialAction) -> ReferentialAction {
        std::mem::replace(&mut self.delete_rule, rule)
    }

    pub(crate) fn replace_deferrability(&mut self, value: Deferrability) -> Deferrability {
        std::mem::replace(&mut self.deferrability, value)
    }
}

impl Default for Relationship {
    fn default() -> Self {
        Self::new()
    }
}
