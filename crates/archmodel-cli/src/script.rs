//! Edit scripts and their replay.
//!
//! A script is a JSON object with an optional `config` and a list of `steps`.
//! Steps name tables, columns and relationships; the ids the model hands out
//! never appear in a script.
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "create_table", "name": "customer",
//!       "columns": [{ "name": "id", "type": "big_int", "primary_key_seq": 0 }] },
//!     { "op": "create_table", "name": "order" },
//!     { "op": "create_relationship", "parent": "customer", "child": "order" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use archmodel_core::{
    Column, ColumnId, EventLog, ModelConfig, ModelError, RelationshipId, Schema, SqlType,
    SubscriptionScope, TableId,
};
use serde::Deserialize;

use crate::error::{CliError, Result};

/// A parsed edit script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub config: Option<ModelConfig>,
    pub steps: Vec<Step>,
}

/// Column definition used by `create_table` and `add_column`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub data_type: SqlType,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub scale: u32,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key_seq: Option<u32>,
}

fn default_type() -> SqlType {
    SqlType::Integer
}

fn default_true() -> bool {
    true
}

impl ColumnSpec {
    fn to_column(&self) -> Column {
        let column = Column::new(self.name.clone(), self.data_type, self.precision, self.scale)
            .with_nullable(self.nullable);
        match self.primary_key_seq {
            Some(seq) => column.with_primary_key_seq(seq),
            None => column,
        }
    }
}

/// One edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreateTable {
        name: String,
        #[serde(default)]
        columns: Vec<ColumnSpec>,
    },
    AddColumn {
        table: String,
        column: ColumnSpec,
    },
    /// Set or clear (`seq` omitted) a column's primary key rank.
    SetPrimaryKey {
        table: String,
        column: String,
        #[serde(default)]
        seq: Option<u32>,
    },
    RemoveColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        column: String,
        name: String,
    },
    /// Create a relationship and register it on both tables.
    ///
    /// With explicit `mappings` (parent column, child column) no automatic
    /// mapping is generated.
    CreateRelationship {
        #[serde(default)]
        name: Option<String>,
        parent: String,
        child: String,
        #[serde(default)]
        identifying: bool,
        #[serde(default = "default_true")]
        auto_map: bool,
        #[serde(default)]
        mappings: Vec<(String, String)>,
    },
    RemoveRelationship {
        name: String,
    },
    RemoveTable {
        name: String,
    },
}

impl Step {
    /// The `op` tag of the step.
    pub fn op(&self) -> &'static str {
        match self {
            Step::CreateTable { .. } => "create_table",
            Step::AddColumn { .. } => "add_column",
            Step::SetPrimaryKey { .. } => "set_primary_key",
            Step::RemoveColumn { .. } => "remove_column",
            Step::RenameColumn { .. } => "rename_column",
            Step::CreateRelationship { .. } => "create_relationship",
            Step::RemoveRelationship { .. } => "remove_relationship",
            Step::RemoveTable { .. } => "remove_table",
        }
    }
}

impl Script {
    /// Parse a script from JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a script file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

/// Outcome of a replay: the edited schema and every event it emitted.
pub struct Replay {
    pub schema: Schema,
    pub events: Arc<EventLog>,
}

/// Apply every step of `script` to a fresh schema built with `config`.
///
/// Stops at the first failing step.
pub fn replay(script: &Script, config: ModelConfig) -> Result<Replay> {
    let mut schema = Schema::with_config(config);
    let events = Arc::new(EventLog::new());
    schema.subscribe(SubscriptionScope::Schema, events.clone());

    for (index, step) in script.steps.iter().enumerate() {
        let number = index + 1;
        tracing::debug!(step = number, op = step.op(), "replaying step");
        apply(&mut schema, number, step)?;
    }

    tracing::info!(
        steps = script.steps.len(),
        tables = schema.table_count(),
        events = events.len(),
        "replay finished"
    );
    Ok(Replay { schema, events })
}

fn apply(schema: &mut Schema, step: usize, s: &Step) -> Result<()> {
    let model = |source: ModelError| CliError::Model {
        step,
        op: s.op(),
        source,
    };

    match s {
        Step::CreateTable { name, columns } => {
            let table = schema.add_table(archmodel_core::Table::new(name.clone()));
            for spec in columns {
                schema.add_column(table, spec.to_column()).map_err(model)?;
            }
        }
        Step::AddColumn { table, column } => {
            let t = find_table(schema, step, table)?;
            schema.add_column(t, column.to_column()).map_err(model)?;
        }
        Step::SetPrimaryKey { table, column, seq } => {
            let c = find_column(schema, step, table, column)?;
            schema.set_primary_key_seq(c, *seq).map_err(model)?;
        }
        Step::RemoveColumn { table, column } => {
            let c = find_column(schema, step, table, column)?;
            schema.remove_column(c).map_err(model)?;
        }
        Step::RenameColumn {
            table,
            column,
            name,
        } => {
            let c = find_column(schema, step, table, column)?;
            schema.set_column_name(c, name.clone()).map_err(model)?;
        }
        Step::CreateRelationship {
            name,
            parent,
            child,
            identifying,
            auto_map,
            mappings,
        } => {
            let pk_table = find_table(schema, step, parent)?;
            let fk_table = find_table(schema, step, child)?;
            let pairs = mappings
                .iter()
                .map(|(pk, fk)| {
                    Ok((
                        find_column(schema, step, parent, pk)?,
                        find_column(schema, step, child, fk)?,
                    ))
                })
                .collect::<Result<Vec<(ColumnId, ColumnId)>>>()?;

            let name = name
                .clone()
                .unwrap_or_else(|| format!("{parent}_{child}"));
            let rel = schema
                .create_relationship(
                    schema
                        .new_relationship()
                        .with_name(name)
                        .with_identifying(*identifying),
                )
                .map_err(model)?;
            schema
                .attach_relationship(rel, pk_table, fk_table, *auto_map && pairs.is_empty())
                .map_err(model)?;
            for (pk, fk) in pairs {
                schema.add_mapping(rel, pk, fk).map_err(model)?;
            }
        }
        Step::RemoveRelationship { name } => {
            let rel = find_relationship(schema, step, name)?;
            schema.remove_relationship(rel).map_err(model)?;
        }
        Step::RemoveTable { name } => {
            let t = find_table(schema, step, name)?;
            schema.remove_table(t).map_err(model)?;
        }
    }
    Ok(())
}

fn find_table(schema: &Schema, step: usize, name: &str) -> Result<TableId> {
    schema
        .table_by_name(name)
        .ok_or_else(|| CliError::UnknownTable {
            step,
            name: name.to_string(),
        })
}

fn find_column(schema: &Schema, step: usize, table: &str, column: &str) -> Result<ColumnId> {
    let t = find_table(schema, step, table)?;
    schema
        .column_by_name(t, column)
        .ok_or_else(|| CliError::UnknownColumn {
            step,
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn find_relationship(schema: &Schema, step: usize, name: &str) -> Result<RelationshipId> {
    schema
        .relationships()
        .find(|(_, r)| r.name() == name)
        .map(|(id, _)| id)
        .ok_or_else(|| CliError::UnknownRelationship {
            step,
            name: name.to_string(),
        })
}
