//! Output formatters for replay results.

use archmodel_core::{ModelEvent, SchemaSnapshot};
use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the tables and relationships of a schema.
    fn format_snapshot(&self, snapshot: &SchemaSnapshot) -> String;

    /// Format an event stream in emission order.
    fn format_events(&self, events: &[ModelEvent]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_snapshot(&self, snapshot: &SchemaSnapshot) -> String {
        let mut sections = Vec::new();

        for t in &snapshot.tables {
            let mut table = Table::new();
            table.set_header(vec!["#", "Column", "Type", "Precision", "Scale", "Null", "PK"]);
            for (i, c) in t.columns.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i),
                    Cell::new(&c.name),
                    Cell::new(c.data_type),
                    Cell::new(c.precision),
                    Cell::new(c.scale),
                    Cell::new(if c.nullable { "yes" } else { "no" }),
                    Cell::new(c.primary_key_seq.map(|s| s.to_string()).unwrap_or_default()),
                ]);
            }
            sections.push(format!("{}\n{}", t.name, table));
        }

        if !snapshot.relationships.is_empty() {
            let mut table = Table::new();
            table.set_header(vec![
                "Relationship",
                "Parent",
                "Child",
                "Identifying",
                "Live",
                "Mappings",
            ]);
            for r in &snapshot.relationships {
                let mappings = r
                    .mappings
                    .iter()
                    .map(|(pk, fk)| format!("{pk} -> {fk}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![
                    Cell::new(&r.name),
                    Cell::new(r.pk_table.as_deref().unwrap_or("-")),
                    Cell::new(r.fk_table.as_deref().unwrap_or("-")),
                    Cell::new(r.identifying),
                    Cell::new(r.live),
                    Cell::new(mappings),
                ]);
            }
            sections.push(table.to_string());
        }

        if sections.is_empty() {
            "No tables".to_string()
        } else {
            sections.join("\n\n")
        }
    }

    fn format_events(&self, events: &[ModelEvent]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["#", "Event", "Source", "Detail"]);
        for (i, event) in events.iter().enumerate() {
            let source = event.source().map(|s| s.to_string()).unwrap_or_default();
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(event.kind()),
                Cell::new(source),
                Cell::new(event_detail(event)),
            ]);
        }
        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_snapshot(&self, snapshot: &SchemaSnapshot) -> String {
        serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_events(&self, events: &[ModelEvent]) -> String {
        let rows: Vec<serde_json::Value> = events
            .iter()
            .map(|event| {
                serde_json::json!({
                    "kind": event.kind(),
                    "source": event.source().map(|s| s.to_string()),
                    "detail": event_detail(event),
                })
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}

fn event_detail(event: &ModelEvent) -> String {
    match event {
        ModelEvent::ChildInserted { child, index, .. } => format!("{child} at {index}"),
        ModelEvent::ChildRemoved { child, index, .. } => format!("{child} from {index}"),
        ModelEvent::PropertyChanged {
            property, old, new, ..
        } => format!("{property}: {old} -> {new}"),
        ModelEvent::StructureChanged { .. } | ModelEvent::CompoundEditEnded => String::new(),
        ModelEvent::CompoundEditStarted { description } => description.clone(),
    }
}
