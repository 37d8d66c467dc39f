//! Type registry: element types to empty column constructors.
//!
//! Columns are only ever created through this module, so the mapping from a
//! type to its storage lives in one place. [`new_column`] is total over
//! [`ElementType`]; [`column_for`] accepts any type description that may or
//! may not be representable and rejects the ones that are not.

use crate::error::{ConvertError, Result};

use super::column::Column;
use super::value::{ElementType, FieldType};

/// A type description that may map onto an [`ElementType`].
pub trait Representable {
    /// Element type this maps onto, if any.
    fn element_type(&self) -> Option<ElementType>;

    /// Name used in diagnostics when the type is not representable.
    fn type_name(&self) -> String;
}

impl Representable for ElementType {
    fn element_type(&self) -> Option<ElementType> {
        Some(*self)
    }

    fn type_name(&self) -> String {
        self.as_str().to_string()
    }
}

/// Create an empty column, optionally pre-sized for `len_hint` rows.
pub fn new_column(name: impl Into<String>, field_type: FieldType, len_hint: Option<usize>) -> Column {
    Column::with_capacity(name, field_type, len_hint.unwrap_or(0))
}

/// Create an empty column for a type that may not be representable.
///
/// Returns [`ConvertError::ColumnNotSupported`] when `source` has no element type.
pub fn column_for<T: Representable + ?Sized>(
    name: &str,
    source: &T,
    nullable: bool,
    len_hint: Option<usize>,
) -> Result<Column> {
    let element = source
        .element_type()
        .ok_or_else(|| ConvertError::ColumnNotSupported {
            column: name.to_string(),
            type_name: source.type_name(),
        })?;
    Ok(new_column(
        name,
        FieldType { element, nullable },
        len_hint,
    ))
}
