//! Core type definitions for the model.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// SQL data types a column can carry.
///
/// Precision and scale live on the column, not on the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// Boolean value.
    Boolean,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Exact decimal.
    Decimal,
    /// Exact numeric.
    Numeric,
    /// Single precision floating point.
    Real,
    /// Double precision floating point.
    Double,
    /// Fixed-width character string.
    Char,
    /// Variable-width character string.
    Varchar,
    /// Unbounded text.
    Text,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Binary data.
    Blob,
    /// Vendor-specific type identified by its driver code.
    Other(i32),
}

impl SqlType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Decimal
                | SqlType::Numeric
                | SqlType::Real
                | SqlType::Double
        )
    }

    /// Check if this type is a string-like type.
    pub fn is_string_like(&self) -> bool {
        matches!(self, SqlType::Char | SqlType::Varchar | SqlType::Text)
    }

    /// Check if this type is a date or time type.
    pub fn is_temporal(&self) -> bool {
        matches!(self, SqlType::Date | SqlType::Time | SqlType::Timestamp)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Decimal => write!(f, "DECIMAL"),
            SqlType::Numeric => write!(f, "NUMERIC"),
            SqlType::Real => write!(f, "REAL"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Char => write!(f, "CHAR"),
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::Text => write!(f, "TEXT"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::Time => write!(f, "TIME"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::Blob => write!(f, "BLOB"),
            SqlType::Other(code) => write!(f, "OTHER({code})"),
        }
    }
}

bitflags! {
    /// How many rows on one side of a relationship may relate to one row on the other.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Cardinality: u8 {
        /// No related row.
        const ZERO = 0b001;
        /// Exactly one related row.
        const ONE = 0b010;
        /// More than one related row.
        const MANY = 0b100;
    }
}

impl Cardinality {
    /// Conventional parent-side cardinality.
    pub const PARENT_DEFAULT: Cardinality = Cardinality::ONE;

    /// Conventional child-side cardinality.
    pub const CHILD_DEFAULT: Cardinality = Cardinality::ZERO
        .union(Cardinality::ONE)
        .union(Cardinality::MANY);
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::ONE
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{name}")?;
            first = false;
        }
        if first {
            write!(f, "NONE")?;
        }
        Ok(())
    }
}

/// Action taken on the child rows when a referenced parent key changes or is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Apply the same change to child rows.
    Cascade,
    /// Reject the change while child rows exist.
    Restrict,
    /// Reject the change at the end of the statement.
    #[default]
    NoAction,
    /// Set the foreign key columns to null.
    SetNull,
    /// Set the foreign key columns to their default values.
    SetDefault,
}

/// When the foreign key constraint is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deferrability {
    /// Deferrable, checked at commit by default.
    InitiallyDeferred,
    /// Deferrable, checked per statement by default.
    InitiallyImmediate,
    /// Always checked per statement.
    #[default]
    NotDeferrable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_checks() {
        assert!(SqlType::Integer.is_numeric());
        assert!(SqlType::Decimal.is_numeric());
        assert!(!SqlType::Varchar.is_numeric());
        assert!(SqlType::Varchar.is_string_like());
        assert!(!SqlType::Blob.is_string_like());
        assert!(SqlType::Timestamp.is_temporal());
        assert_eq!(SqlType::Other(1111).to_string(), "OTHER(1111)");
    }

    #[test]
    fn test_cardinality_defaults() {
        assert_eq!(Cardinality::PARENT_DEFAULT, Cardinality::ONE);
        assert!(Cardinality::CHILD_DEFAULT.contains(Cardinality::ZERO));
        assert!(Cardinality::CHILD_DEFAULT.contains(Cardinality::MANY));
        assert_eq!(Cardinality::CHILD_DEFAULT.bits(), 0b111);
    }

    #[test]
    fn test_cardinality_display() {
        assert_eq!(Cardinality::ONE.to_string(), "ONE");
        assert_eq!(Cardinality::CHILD_DEFAULT.to_string(), "ZERO|ONE|MANY");
        assert_eq!(Cardinality::empty().to_string(), "NONE");
    }
}
