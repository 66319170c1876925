//! Shared fixture for the integration suites.

#![allow(dead_code)]

use archmodel_core::{Column, ColumnId, Relationship, RelationshipId, Schema, SqlType, Table, TableId};

pub fn int(name: &str) -> Column {
    Column::new(name, SqlType::Integer, 10, 0)
}

/// A parent with a two-column key, an identifying relationship to `child_1`
/// mapped onto existing columns, and a non-identifying relationship to
/// `child_2` registered without mappings.
pub struct Fixture {
    pub schema: Schema,
    pub parent: TableId,
    pub child_1: TableId,
    pub child_2: TableId,
    pub rel1: RelationshipId,
    pub rel2: RelationshipId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut schema = Schema::new();

        let parent = schema.add_table(Table::new("parent"));
        schema
            .add_column(parent, int("pkcol_1").with_primary_key_seq(0))
            .unwrap();
        schema
            .add_column(parent, int("pkcol_2").with_primary_key_seq(1))
            .unwrap();
        schema.add_column(parent, int("attribute_1")).unwrap();

        let child_1 = schema.add_table(Table::new("child_1"));
        schema.add_column(child_1, int("child_pkcol_1")).unwrap();
        schema.add_column(child_1, int("child_pkcol_2")).unwrap();
        schema.add_column(child_1, int("child_attribute")).unwrap();

        let child_2 = schema.add_table(Table::new("child_2"));
        schema.add_column(child_2, int("child2_pkcol_1")).unwrap();
        schema.add_column(child_2, int("child2_pkcol_2")).unwrap();
        schema.add_column(child_2, int("child2_attribute")).unwrap();

        let rel1 = schema
            .create_relationship(
                Relationship::new()
                    .with_name("parentTable_childTable1_pk")
                    .with_identifying(true)
                    .with_pk_table(parent)
                    .with_fk_table(child_1),
            )
            .unwrap();
        schema
            .with_secondary_change(child_1, |s| {
                s.add_exported_key(parent, rel1)?;
                s.add_imported_key(child_1, rel1)?;
                let pk_1 = s.table(parent).unwrap().columns()[0];
                let pk_2 = s.table(parent).unwrap().columns()[1];
                let fk_1 = s.table(child_1).unwrap().columns()[0];
                let fk_2 = s.table(child_1).unwrap().columns()[1];
                s.add_mapping(rel1, pk_1, fk_1)?;
                s.add_mapping(rel1, pk_2, fk_2)
            })
            .unwrap();

        let rel2 = schema
            .create_relationship(Relationship::new().with_pk_table(parent).with_fk_table(child_2))
            .unwrap();
        schema.add_exported_key(parent, rel2).unwrap();
        schema.add_imported_key(child_2, rel2).unwrap();

        Self {
            schema,
            parent,
            child_1,
            child_2,
            rel1,
            rel2,
        }
    }

    pub fn col(&self, table: TableId, name: &str) -> ColumnId {
        self.schema
            .column_by_name(table, name)
            .unwrap_or_else(|| panic!("no column {name} in {table}"))
    }

    pub fn column_count(&self, table: TableId) -> usize {
        self.schema.table(table).unwrap().column_count()
    }
}
