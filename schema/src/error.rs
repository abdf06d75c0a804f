//! Field table validation errors.

use std::fmt;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields share a name.
    DuplicateFieldName { name: String },

    /// A field has an empty name.
    EmptyFieldName { index: usize },

    /// Integer width outside `1..=32`.
    InvalidBitWidth { name: String, bits: u8 },

    /// Angle width outside `1..=16`.
    InvalidAngleBits { name: String, bits: u8 },

    /// The change mask length is sent as a byte.
    TooManyFields { count: usize, max: usize },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFieldName { name } => write!(f, "duplicate field name '{name}'"),
            Self::EmptyFieldName { index } => write!(f, "field {index} has an empty name"),
            Self::InvalidBitWidth { name, bits } => {
                write!(f, "field '{name}': integer width {bits} not in 1..=32")
            }
            Self::InvalidAngleBits { name, bits } => {
                write!(f, "field '{name}': angle width {bits} not in 1..=16")
            }
            Self::TooManyFields { count, max } => {
                write!(f, "field table has {count} fields, maximum is {max}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
