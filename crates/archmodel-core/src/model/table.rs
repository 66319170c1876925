//! Table definitions.

use indexmap::IndexSet;

use super::ids::{ColumnId, RelationshipId};

/// An ordered collection of columns plus the relationships it takes part in.
///
/// Column order is significant: it is the display order and breaks ties
/// between equal primary key ranks. Exported keys are relationships where
/// this table is the parent; imported keys are those where it is the child.
/// Both sets are back-references for traversal, not ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    physical_name: Option<String>,
    remarks: Option<String>,
    columns: Vec<ColumnId>,
    exported_keys: IndexSet<RelationshipId>,
    imported_keys: IndexSet<RelationshipId>,
    secondary_change_mode: bool,
    magic_enabled: bool,
}

impl Table {
    /// Create a new empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            physical_name: None,
            remarks: None,
            columns: Vec::new(),
            exported_keys: IndexSet::new(),
            imported_keys: IndexSet::new(),
            secondary_change_mode: false,
            magic_enabled: true,
        }
    }

    /// Set the physical name override.
    pub fn with_physical_name(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = Some(physical_name.into());
        self
    }

    /// Set the remarks.
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
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

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// Columns in table order.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column in this table.
    pub fn column_index(&self, column: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Relationships for which this table is the parent.
    pub fn exported_keys(&self) -> &IndexSet<RelationshipId> {
        &self.exported_keys
    }

    /// Relationships for which this table is the child.
    pub fn imported_keys(&self) -> &IndexSet<RelationshipId> {
        &self.imported_keys
    }

    /// Check if the table is inside a secondary change batch.
    pub fn is_secondary_change_mode(&self) -> bool {
        self.secondary_change_mode
    }

    /// Check if automatic primary key cascades are enabled.
    pub fn is_magic_enabled(&self) -> bool {
        self.magic_enabled
    }

    pub(crate) fn cascades_enabled(&self) -> bool {
        self.magic_enabled && !self.secondary_change_mode
    }

    pub(crate) fn insert_column(&mut self, index: usize, column: ColumnId) {
        self.columns.insert(index, column);
    }

    pub(crate) fn remove_column_at(&mut self, index: usize) -> ColumnId {
        self.columns.remove(index)
    }

    pub(crate) fn take_columns(&mut self) -> Vec<ColumnId> {
        std::mem::take(&mut self.columns)
    }

    /// Drop the column list and key registrations. Returns `true` if any
    /// were present.
    pub(crate) fn clear_membership(&mut self) -> bool {
        let present = !self.columns.is_empty()
            || !self.exported_keys.is_empty()
            || !self.imported_keys.is_empty();
        self.columns.clear();
        self.exported_keys.clear();
        self.imported_keys.clear();
        present
    }

    pub(crate) fn exported_keys_mut(&mut self) -> &mut IndexSet<RelationshipId> {
        &mut self.exported_keys
    }

    pub(crate) fn imported_keys_mut(&mut self) -> &mut IndexSet<RelationshipId> {
        &mut self.imported_keys
    }

    pub(crate) fn replace_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    pub(crate) fn replace_physical_name(&mut self, name: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.physical_name, name)
    }

    pub(crate) fn replace_remarks(&mut self, remarks: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.remarks, remarks)
    }

    pub(crate) fn set_secondary_change_mode(&mut self, on: bool) {
        self.secondary_change_mode = on;
    }

    pub(crate) fn set_magic_enabled(&mut self, on: bool) {
        self.magic_enabled = on;
    }
}
