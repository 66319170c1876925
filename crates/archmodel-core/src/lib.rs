//! Archmodel Core - relational schema object model.
//!
//! This crate holds the in-memory model a schema designer edits: tables,
//! columns and relationships, the rules that keep foreign-key columns in step
//! with the primary keys they reference, and the change-notification stream
//! that undo managers and views observe.

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod schema;
pub mod snapshot;

pub use config::ModelConfig;
pub use error::{ModelError, Result};
pub use events::{
    Child, CompoundEditTracker, CountingListener, EventBus, EventLog, ModelEvent, ModelListener,
    ObjectRef, Property, PropertyValue, SubscriptionId, SubscriptionScope,
};
pub use model::{
    Cardinality, Column, ColumnId, ColumnMapping, Deferrability, ReferentialAction, Relationship,
    RelationshipId, SqlType, Table, TableId,
};
pub use schema::{MagicDisabled, Schema, SecondaryChange};
pub use snapshot::{ColumnSnapshot, RelationshipSnapshot, SchemaSnapshot, TableSnapshot};
