//! Error types for table conversion.

use thiserror::Error;

/// Boxed error returned by user-supplied conversion functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The value's shape cannot be flattened (scalar at top level, nested sequence, ...).
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    /// A leaf value's type is outside the supported element types.
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// A value was appended to a column declared with a different type.
    #[error("Type mismatch for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// The same column name appeared twice.
    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    /// No column can be built for the reported type.
    #[error("Column {column} not supported: type {type_name} has no representable element type")]
    ColumnNotSupported { column: String, type_name: String },

    /// A converter function failed on a row value.
    #[error("Row {row} conversion failed for column {column}: {source}")]
    RowConversion {
        row: usize,
        column: String,
        #[source]
        source: BoxError,
    },

    /// A raw value could not be scanned into the column's scan slot.
    #[error("Scan failed for column {column}: {message}")]
    Scan { column: String, message: String },

    /// A per-field flatten converter failed.
    #[error("Conversion failed for field {field}: {message}")]
    FieldConversion { field: String, message: String },

    /// A converter for the same source type was registered twice under the reject policy.
    #[error("Converter already registered for source type {0}")]
    DuplicateConverter(String),

    /// The row cursor failed to produce the next row.
    #[error("Row cursor error: {0}")]
    Cursor(#[source] BoxError),

    /// Error raised while serializing a value into a record.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Configuration error (invalid YAML, out-of-range values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Create a TypeMismatch error.
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        ConvertError::TypeMismatch {
            column: column.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a RowConversion error wrapping a converter failure.
    pub fn row_conversion(row: usize, column: impl Into<String>, source: BoxError) -> Self {
        ConvertError::RowConversion {
            row,
            column: column.into(),
            source,
        }
    }

    /// Create a Scan error.
    pub fn scan(column: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::Scan {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a FieldConversion error.
    pub fn field_conversion(field: impl Into<String>, message: impl ToString) -> Self {
        ConvertError::FieldConversion {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl serde::ser::Error for ConvertError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ConvertError::Serialize(msg.to_string())
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detailed_includes_source_chain() {
        let inner: BoxError = "invalid float literal".into();
        let err = ConvertError::row_conversion(3, "price", inner);

        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Row 3 conversion failed for column price"));
        assert!(detailed.contains("Caused by:\n  1: invalid float literal"));
    }
}
