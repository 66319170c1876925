//! Schema object model.
//!
//! Tables own their columns; relationships reference columns of the tables
//! they connect. All three live in a [`crate::Schema`] arena and refer to each
//! other through the identifiers defined here.

mod column;
mod ids;
mod relationship;
mod table;
mod types;

pub use column::Column;
pub use ids::{ColumnId, RelationshipId, TableId};
pub use relationship::{ColumnMapping, Relationship};
pub use table::Table;
pub use types::{Cardinality, Deferrability, ReferentialAction, SqlType};
