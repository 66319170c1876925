//! Change events emitted by the model.

use std::fmt;

use crate::model::{
    Cardinality, ColumnId, ColumnMapping, Deferrability, ReferentialAction, RelationshipId,
    SqlType, TableId,
};

/// The object an event is sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// The schema itself (tables are its children).
    Schema,
    /// A table.
    Table(TableId),
    /// A column.
    Column(ColumnId),
    /// A relationship.
    Relationship(RelationshipId),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Schema => write!(f, "schema"),
            ObjectRef::Table(id) => write!(f, "{id}"),
            ObjectRef::Column(id) => write!(f, "{id}"),
            ObjectRef::Relationship(id) => write!(f, "{id}"),
        }
    }
}

/// A child inserted into or removed from its parent object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Child {
    /// A table of the schema.
    Table(TableId),
    /// A column of a table.
    Column(ColumnId),
    /// A relationship in a table's exported keys.
    ExportedKey(RelationshipId),
    /// A relationship in a table's imported keys.
    ImportedKey(RelationshipId),
    /// A column mapping of a relationship.
    Mapping(ColumnMapping),
}

/// A property whose value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Name,
    PhysicalName,
    Remarks,
    DataType,
    Precision,
    Scale,
    Nullable,
    AutoIncrement,
    DefaultValue,
    PrimaryKeySeq,
    PkTable,
    FkTable,
    Identifying,
    PkCardinality,
    FkCardinality,
    UpdateRule,
    DeleteRule,
    Deferrability,
}

impl Property {
    /// The property name as reported to listeners.
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::PhysicalName => "physicalName",
            Property::Remarks => "remarks",
            Property::DataType => "type",
            Property::Precision => "precision",
            Property::Scale => "scale",
            Property::Nullable => "nullable",
            Property::AutoIncrement => "autoIncrement",
            Property::DefaultValue => "defaultValue",
            Property::PrimaryKeySeq => "primaryKeySeq",
            Property::PkTable => "pkTable",
            Property::FkTable => "fkTable",
            Property::Identifying => "identifying",
            Property::PkCardinality => "pkCardinality",
            Property::FkCardinality => "fkCardinality",
            Property::UpdateRule => "updateRule",
            Property::DeleteRule => "deleteRule",
            Property::Deferrability => "deferrability",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old or new value carried by a property change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// No value.
    Null,
    Text(String),
    Bool(bool),
    Int(u32),
    Type(SqlType),
    Table(TableId),
    Cardinality(Cardinality),
    Rule(ReferentialAction),
    Deferrability(Deferrability),
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<SqlType> for PropertyValue {
    fn from(value: SqlType) -> Self {
        PropertyValue::Type(value)
    }
}

impl From<TableId> for PropertyValue {
    fn from(value: TableId) -> Self {
        PropertyValue::Table(value)
    }
}

impl From<Cardinality> for PropertyValue {
    fn from(value: Cardinality) -> Self {
        PropertyValue::Cardinality(value)
    }
}

impl From<ReferentialAction> for PropertyValue {
    fn from(value: ReferentialAction) -> Self {
        PropertyValue::Rule(value)
    }
}

impl From<Deferrability> for PropertyValue {
    fn from(value: Deferrability) -> Self {
        PropertyValue::Deferrability(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Text(s) => write!(f, "{s:?}"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(n) => write!(f, "{n}"),
            PropertyValue::Type(t) => write!(f, "{t}"),
            PropertyValue::Table(id) => write!(f, "{id}"),
            PropertyValue::Cardinality(c) => write!(f, "{c}"),
            PropertyValue::Rule(rule) => write!(f, "{rule:?}"),
            PropertyValue::Deferrability(d) => write!(f, "{d:?}"),
        }
    }
}

impl fmt::Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Table(id) => write!(f, "{id}"),
            Child::Column(id) => write!(f, "{id}"),
            Child::ExportedKey(id) => write!(f, "exported {id}"),
            Child::ImportedKey(id) => write!(f, "imported {id}"),
            Child::Mapping(m) => write!(f, "{} -> {}", m.pk_column, m.fk_column),
        }
    }
}

/// A structured change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// A child was inserted at `index` of `source`.
    ChildInserted {
        source: ObjectRef,
        child: Child,
        index: usize,
    },
    /// A child was removed from `index` of `source`.
    ChildRemoved {
        source: ObjectRef,
        child: Child,
        index: usize,
    },
    /// A property of `source` changed.
    PropertyChanged {
        source: ObjectRef,
        property: Property,
        old: PropertyValue,
        new: PropertyValue,
    },
    /// `source` changed in a way not described by the other events.
    StructureChanged { source: ObjectRef },
    /// A multi-step edit begins.
    CompoundEditStarted { description: String },
    /// The innermost multi-step edit ends.
    CompoundEditEnded,
}

impl ModelEvent {
    /// The object the event is sourced from; `None` for compound-edit signals.
    pub fn source(&self) -> Option<ObjectRef> {
        match self {
            ModelEvent::ChildInserted { source, .. }
            | ModelEvent::ChildRemoved { source, .. }
            | ModelEvent::PropertyChanged { source, .. }
            | ModelEvent::StructureChanged { source } => Some(*source),
            ModelEvent::CompoundEditStarted { .. } | ModelEvent::CompoundEditEnded => None,
        }
    }

    /// Check if this is a compound-edit boundary signal.
    pub fn is_compound_signal(&self) -> bool {
        self.source().is_none()
    }

    /// Short name of the event category.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelEvent::ChildInserted { .. } => "child_inserted",
            ModelEvent::ChildRemoved { .. } => "child_removed",
            ModelEvent::PropertyChanged { .. } => "property_changed",
            ModelEvent::StructureChanged { .. } => "structure_changed",
            ModelEvent::CompoundEditStarted { .. } => "compound_edit_started",
            ModelEvent::CompoundEditEnded => "compound_edit_ended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_source() {
        let event = ModelEvent::PropertyChanged {
            source: ObjectRef::Column(ColumnId::new(3)),
            property: Property::PhysicalName,
            old: PropertyValue::Null,
            new: "PK_1".to_string().into(),
        };
        assert_eq!(event.source(), Some(ObjectRef::Column(ColumnId::new(3))));
        assert!(!event.is_compound_signal());
        assert_eq!(event.kind(), "property_changed");

        let event = ModelEvent::CompoundEditStarted {
            description: "attach".into(),
        };
        assert!(event.source().is_none());
        assert!(event.is_compound_signal());
    }

    #[test]
    fn test_optional_values() {
        assert_eq!(PropertyValue::from(None::<u32>), PropertyValue::Null);
        assert_eq!(PropertyValue::from(Some(2u32)), PropertyValue::Int(2));
        assert_eq!(Property::PrimaryKeySeq.to_string(), "primaryKeySeq");
    }

    #[test]
    fn test_display() {
        let mapping = ColumnMapping::new(ColumnId::new(1), ColumnId::new(4));
        assert_eq!(Child::Mapping(mapping).to_string(), "column#1 -> column#4");
        assert_eq!(
            Child::ImportedKey(RelationshipId::new(2)).to_string(),
            "imported relationship#2"
        );
        assert_eq!(PropertyValue::Text("id".into()).to_string(), "\"id\"");
        assert_eq!(PropertyValue::Null.to_string(), "null");
        assert_eq!(PropertyValue::Type(SqlType::BigInt).to_string(), "BIGINT");
    }
}
