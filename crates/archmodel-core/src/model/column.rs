//! Column definitions for tables.

use super::ids::TableId;
use super::types::SqlType;

/// A named, typed attribute of a table.
///
/// A column built with [`Column::new`] is detached. It becomes part of the
/// model when handed to [`crate::Schema::add_column`], which assigns its
/// identifier; from then on it is mutated only through the schema so that
/// cascades and notifications stay in step.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    physical_name: Option<String>,
    data_type: SqlType,
    precision: u32,
    scale: u32,
    nullable: bool,
    auto_increment: bool,
    default_value: Option<String>,
    remarks: Option<String>,
    primary_key_seq: Option<u32>,
    table: Option<TableId>,
}

impl Column {
    /// Create a new nullable column outside the primary key.
    pub fn new(name: impl Into<String>, data_type: SqlType, precision: u32, scale: u32) -> Self {
        Self {
            name: name.into(),
            physical_name: None,
            data_type,
            precision,
            scale,
            nullable: true,
            auto_increment: false,
            default_value: None,
            remarks: None,
            primary_key_seq: None,
            table: None,
        }
    }

    /// Create a column that copies the derived attributes of a referenced
    /// primary key column: name, type, precision and scale.
    pub fn derived_from(pk_column: &Column) -> Self {
        Self::new(
            pk_column.name.clone(),
            pk_column.data_type,
            pk_column.precision,
            pk_column.scale,
        )
        .with_nullable(pk_column.nullable)
    }

    /// Set the primary key rank the column is inserted with.
    pub fn with_primary_key_seq(mut self, seq: u32) -> Self {
        self.primary_key_seq = Some(seq);
        self
    }

    /// Set the physical name override.
    pub fn with_physical_name(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = Some(physical_name.into());
        self
    }

    /// Set nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set the default value expression.
    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Set the remarks.
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Mark as auto-increment.
    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical name, falling back to the logical name when no override is set.
    pub fn physical_name(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.name)
    }

    /// The physical name override, if any.
    pub fn physical_name_override(&self) -> Option<&str> {
        self.physical_name.as_deref()
    }

    pub fn data_type(&self) -> SqlType {
        self.data_type
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// 0-based position within the owning table's primary key, or `None`
    /// when the column is not part of it.
    pub fn primary_key_seq(&self) -> Option<u32> {
        self.primary_key_seq
    }

    /// Check if the column is part of its table's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_seq.is_some()
    }

    /// The owning table, `None` while detached.
    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    pub(crate) fn attach(&mut self, table: TableId) {
        self.table = Some(table);
    }

    pub(crate) fn detach(&mut self) {
        self.table = None;
    }

    pub(crate) fn replace_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    pub(crate) fn replace_physical_name(&mut self, name: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.physical_name, name)
    }

    pub(crate) fn replace_data_type(&mut self, data_type: SqlType) -> SqlType {
        std::mem::replace(&mut self.data_type, data_type)
    }

    pub(crate) fn replace_precision(&mut self, precision: u32) -> u32 {
        std::mem::replace(&mut self.precision, precision)
    }

    pub(crate) fn replace_scale(&mut self, scale: u32) -> u32 {
        std::mem::replace(&mut self.scale, scale)
    }

    pub(crate) fn replace_nullable(&mut self, nullable: bool) -> bool {
        std::mem::replace(&mut self.nullable, nullable)
    }

    pub(crate) fn replace_auto_increment(&mut self, auto_increment: bool) -> bool {
        std::mem::replace(&mut self.auto_increment, auto_increment)
    }

    pub(crate) fn replace_default_value(&mut self, value: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.default_value, value)
    }

    pub(crate) fn replace_remarks(&mut self, remarks: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.remarks, remarks)
    }

    pub(crate) fn replace_primary_key_seq(&mut self, seq: Option<u32>) -> Option<u32> {
        std::mem::replace(&mut self.primary_key_seq, seq)
    }
}
