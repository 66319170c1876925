//! Stable identifiers for objects held in a schema arena.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw identifier value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a table within a schema.
    TableId,
    "table"
);
define_id!(
    /// Identifies a column within a schema. Dead once the column is removed.
    ColumnId,
    "column"
);
define_id!(
    /// Identifies a relationship within a schema.
    RelationshipId,
    "relationship"
);
