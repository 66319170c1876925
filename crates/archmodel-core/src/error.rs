//! Model error types.

use thiserror::Error;

use crate::model::{ColumnId, RelationshipId, TableId};

/// Result alias used throughout the model.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by model operations.
///
/// Every variant is reported before the operation mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The table is not part of this schema.
    #[error("unknown table {0}")]
    UnknownTable(TableId),

    /// The column is not attached to any table in this schema.
    #[error("unknown column {0}")]
    UnknownColumn(ColumnId),

    /// The relationship is not part of this schema.
    #[error("unknown relationship {0}")]
    UnknownRelationship(RelationshipId),

    /// Column index outside the table's column list.
    #[error("index {index} out of bounds for table {table} with {len} columns")]
    IndexOutOfBounds {
        /// Table being edited.
        table: TableId,
        /// Requested index.
        index: usize,
        /// Current column count.
        len: usize,
    },

    /// A relationship was exported from a table that is not its parent.
    #[error("relationship {relationship} has parent {expected:?}, cannot be exported by {actual}")]
    MismatchedPkTable {
        /// The relationship being registered.
        relationship: RelationshipId,
        /// The parent table the relationship declares.
        expected: Option<TableId>,
        /// The table it was offered to.
        actual: TableId,
    },

    /// A relationship was imported into a table that is not its child.
    #[error("relationship {relationship} has child {expected:?}, cannot be imported by {actual}")]
    MismatchedFkTable {
        /// The relationship being registered.
        relationship: RelationshipId,
        /// The child table the relationship declares.
        expected: Option<TableId>,
        /// The table it was offered to.
        actual: TableId,
    },

    /// A column does not belong to the table the operation requires.
    #[error("column {column} does not belong to table {table}")]
    ColumnNotInTable {
        /// The offending column.
        column: ColumnId,
        /// The table it was expected in.
        table: TableId,
    },

    /// A mapping's parent column is not part of the parent table's primary key.
    #[error("column {0} is not a primary key column")]
    NotPrimaryKey(ColumnId),

    /// The relationship already maps this parent column.
    #[error("relationship {relationship} already maps primary key column {column}")]
    DuplicateMapping {
        /// The relationship.
        relationship: RelationshipId,
        /// The parent column already mapped.
        column: ColumnId,
    },

    /// The relationship's ends cannot change while it is registered or mapped.
    #[error("relationship {0} is registered or mapped; its tables cannot change")]
    RelationshipRegistered(RelationshipId),

    /// The relationship is not registered on the given table.
    #[error("relationship {relationship} is not registered on table {table}")]
    NotRegistered {
        /// The relationship.
        relationship: RelationshipId,
        /// The table it was looked up on.
        table: TableId,
    },

    /// The column is a foreign key column of a live imported relationship.
    #[error("column {column} is locked by imported relationship {relationship}")]
    LockedColumn {
        /// The column that cannot be removed.
        column: ColumnId,
        /// The relationship that maps it.
        relationship: RelationshipId,
    },

    /// Making this relationship identifying would close a cycle of identifying relationships.
    #[error("identifying relationship {0} would form a cycle")]
    IdentifyingCycle(RelationshipId),

    /// The operation needs a relationship registered on both of its tables.
    #[error("relationship {0} is not registered on both its tables")]
    RelationshipNotLive(RelationshipId),

    /// The operation needs both parent and child tables to be set.
    #[error("relationship {0} has no parent or child table")]
    RelationshipIncomplete(RelationshipId),
}

impl ModelError {
    /// Check if this is a caller contract violation.
    pub fn is_invalid_argument(&self) -> bool {
        !self.is_illegal_state()
    }

    /// Check if this error reports an object in the wrong lifecycle state.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            ModelError::RelationshipNotLive(_) | ModelError::RelationshipIncomplete(_)
        )
    }
}
