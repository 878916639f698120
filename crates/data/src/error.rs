//! Error types for the data layer

use thiserror::Error;

/// Result type for data-layer operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the type system and the block codec
#[derive(Debug, Error)]
pub enum DataError {
    /// Type descriptor cannot be parsed
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Value shape does not fit the column type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Numeric value out of the column type's range, or a structural
    /// invariant of a block violated
    #[error("domain error: {0}")]
    DomainError(String),

    /// Enum name or discriminant outside the declared set
    #[error("enum domain error: {0}")]
    EnumDomain(String),

    /// Error from the underlying wire codec
    #[error(transparent)]
    Wire(#[from] clickhouse_native_wire::WireError),
}

impl DataError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        DataError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
