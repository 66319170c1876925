//! Read-only value copy of a schema.
//!
//! A snapshot is what collaborators that only read the model (reports, diff
//! tools, the CLI) consume. It is not a persistence format.

use serde::Serialize;

use crate::model::{Cardinality, ColumnId, Deferrability, ReferentialAction, SqlType, TableId};
use crate::schema::Schema;

/// Snapshot of a whole schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSnapshot>,
    pub relationships: Vec<RelationshipSnapshot>,
}

/// Snapshot of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub id: u64,
    pub name: String,
    pub physical_name: String,
    /// Columns in table order.
    pub columns: Vec<ColumnSnapshot>,
    /// Ids of relationships this table exports.
    pub exported_keys: Vec<u64>,
    /// Ids of relationships this table imports.
    pub imported_keys: Vec<u64>,
    pub secondary_change_mode: bool,
    pub magic_enabled: bool,
}

/// Snapshot of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSnapshot {
    pub name: String,
    pub physical_name: String,
    pub data_type: SqlType,
    pub precision: u32,
    pub scale: u32,
    pub nullable: bool,
    pub primary_key_seq: Option<u32>,
}

/// Snapshot of one relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipSnapshot {
    pub id: u64,
    pub name: String,
    pub physical_name: String,
    /// Parent table name.
    pub pk_table: Option<String>,
    /// Child table name.
    pub fk_table: Option<String>,
    pub identifying: bool,
    pub live: bool,
    pub pk_cardinality: Cardinality,
    pub fk_cardinality: Cardinality,
    pub update_rule: ReferentialAction,
    pub delete_rule: ReferentialAction,
    pub deferrability: Deferrability,
    /// (parent column, child column) name pairs in mapping order.
    pub mappings: Vec<(String, String)>,
}

impl SchemaSnapshot {
    /// Copy the current state of a schema.
    pub fn capture(schema: &Schema) -> Self {
        let column_name = |id: ColumnId| {
            schema
                .column(id)
                .map(|c| c.name().to_string())
                .unwrap_or_default()
        };
        let table_name = |id: TableId| schema.table(id).map(|t| t.name().to_string());

        let tables = schema
            .tables()
            .map(|(id, table)| TableSnapshot {
                id: id.get(),
                name: table.name().to_string(),
                physical_name: table.physical_name().to_string(),
                columns: table
                    .columns()
                    .iter()
                    .filter_map(|c| schema.column(*c))
                    .map(|c| ColumnSnapshot {
                        name: c.name().to_string(),
                        physical_name: c.physical_name().to_string(),
                        data_type: c.data_type(),
                        precision: c.precision(),
                        scale: c.scale(),
                        nullable: c.is_nullable(),
                        primary_key_seq: c.primary_key_seq(),
                    })
                    .collect(),
                exported_keys: table.exported_keys().iter().map(|r| r.get()).collect(),
                imported_keys: table.imported_keys().iter().map(|r| r.get()).collect(),
                secondary_change_mode: table.is_secondary_change_mode(),
                magic_enabled: table.is_magic_enabled(),
            })
            .collect();

        let relationships = schema
            .relationships()
            .map(|(id, rel)| RelationshipSnapshot {
                id: id.get(),
                name: rel.name().to_string(),
                physical_name: rel.physical_name().to_string(),
                pk_table: rel.pk_table().and_then(table_name),
                fk_table: rel.fk_table().and_then(table_name),
                identifying: rel.is_identifying(),
                live: schema.is_live(id),
                pk_cardinality: rel.pk_cardinality(),
                fk_cardinality: rel.fk_cardinality(),
                update_rule: rel.update_rule(),
                delete_rule: rel.delete_rule(),
                deferrability: rel.deferrability(),
                mappings: rel
                    .mappings()
                    .iter()
                    .map(|m| (column_name(m.pk_column), column_name(m.fk_column)))
                    .collect(),
            })
            .collect();

        Self {
            tables,
            relationships,
        }
    }

    /// Find a table snapshot by name.
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl TableSnapshot {
    /// Names of the key columns in key order.
    pub fn primary_key(&self) -> Vec<&str> {
        let mut key: Vec<(u32, &str)> = self
            .columns
            .iter()
            .filter_map(|c| Some((c.primary_key_seq?, c.name.as_str())))
            .collect();
        key.sort_by_key(|(seq, _)| *seq);
        key.into_iter().map(|(_, name)| name).collect()
    }
}
