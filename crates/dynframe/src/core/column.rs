//! Typed column storage.
//!
//! A [`Column`] stores its values in one [`ColumnData`] variant per element
//! type. Every slot is an `Option`, so a column that started out
//! non-nullable can still receive nulls later without changing its storage.

use chrono::{DateTime, Utc};

use crate::error::{ConvertError, Result};

use super::value::{ElementType, FieldType, Value};

/// Typed value storage, one variant per [`ElementType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    UInt8(Vec<Option<u8>>),
    UInt16(Vec<Option<u16>>),
    UInt32(Vec<Option<u32>>),
    UInt64(Vec<Option<u64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
    Timestamp(Vec<Option<DateTime<Utc>>>),
}

/// Apply the same expression to the inner vector of any variant.
macro_rules! with_slots {
    ($data:expr, $slots:ident => $body:expr) => {
        match $data {
            ColumnData::Int8($slots) => $body,
            ColumnData::Int16($slots) => $body,
            ColumnData::Int32($slots) => $body,
            ColumnData::Int64($slots) => $body,
            ColumnData::UInt8($slots) => $body,
            ColumnData::UInt16($slots) => $body,
            ColumnData::UInt32($slots) => $body,
            ColumnData::UInt64($slots) => $body,
            ColumnData::Float32($slots) => $body,
            ColumnData::Float64($slots) => $body,
            ColumnData::String($slots) => $body,
            ColumnData::Bool($slots) => $body,
            ColumnData::Timestamp($slots) => $body,
        }
    };
}

impl ColumnData {
    /// Create empty storage for an element type.
    ///
    /// Total over [`ElementType`]; adding an element type without storage
    /// does not compile.
    pub fn with_capacity(element: ElementType, capacity: usize) -> Self {
        match element {
            ElementType::Int8 => ColumnData::Int8(Vec::with_capacity(capacity)),
            ElementType::Int16 => ColumnData::Int16(Vec::with_capacity(capacity)),
            ElementType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            ElementType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
            ElementType::UInt8 => ColumnData::UInt8(Vec::with_capacity(capacity)),
            ElementType::UInt16 => ColumnData::UInt16(Vec::with_capacity(capacity)),
            ElementType::UInt32 => ColumnData::UInt32(Vec::with_capacity(capacity)),
            ElementType::UInt64 => ColumnData::UInt64(Vec::with_capacity(capacity)),
            ElementType::Float32 => ColumnData::Float32(Vec::with_capacity(capacity)),
            ElementType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            ElementType::String => ColumnData::String(Vec::with_capacity(capacity)),
            ElementType::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            ElementType::Timestamp => ColumnData::Timestamp(Vec::with_capacity(capacity)),
        }
    }

    /// Element type stored in this column.
    pub fn element_type(&self) -> ElementType {
        match self {
            ColumnData::Int8(_) => ElementType::Int8,
            ColumnData::Int16(_) => ElementType::Int16,
            ColumnData::Int32(_) => ElementType::Int32,
            ColumnData::Int64(_) => ElementType::Int64,
            ColumnData::UInt8(_) => ElementType::UInt8,
            ColumnData::UInt16(_) => ElementType::UInt16,
            ColumnData::UInt32(_) => ElementType::UInt32,
            ColumnData::UInt64(_) => ElementType::UInt64,
            ColumnData::Float32(_) => ElementType::Float32,
            ColumnData::Float64(_) => ElementType::Float64,
            ColumnData::String(_) => ElementType::String,
            ColumnData::Bool(_) => ElementType::Bool,
            ColumnData::Timestamp(_) => ElementType::Timestamp,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        with_slots!(self, slots => slots.len())
    }

    /// Check if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of null slots.
    pub fn null_count(&self) -> usize {
        with_slots!(self, slots => slots.iter().filter(|s| s.is_none()).count())
    }

    fn push_null(&mut self) {
        with_slots!(self, slots => slots.push(None))
    }

    /// Push a value whose type has already been checked.
    ///
    /// Returns the value back if its variant does not match the storage.
    fn push(&mut self, value: Value) -> std::result::Result<(), Value> {
        match (self, value) {
            (data, Value::Null(t)) if t == data.element_type() => data.push_null(),
            (ColumnData::Int8(s), Value::Int8(v)) => s.push(Some(v)),
            (ColumnData::Int16(s), Value::Int16(v)) => s.push(Some(v)),
            (ColumnData::Int32(s), Value::Int32(v)) => s.push(Some(v)),
            (ColumnData::Int64(s), Value::Int64(v)) => s.push(Some(v)),
            (ColumnData::UInt8(s), Value::UInt8(v)) => s.push(Some(v)),
            (ColumnData::UInt16(s), Value::UInt16(v)) => s.push(Some(v)),
            (ColumnData::UInt32(s), Value::UInt32(v)) => s.push(Some(v)),
            (ColumnData::UInt64(s), Value::UInt64(v)) => s.push(Some(v)),
            (ColumnData::Float32(s), Value::Float32(v)) => s.push(Some(v)),
            (ColumnData::Float64(s), Value::Float64(v)) => s.push(Some(v)),
            (ColumnData::String(s), Value::String(v)) => s.push(Some(v)),
            (ColumnData::Bool(s), Value::Bool(v)) => s.push(Some(v)),
            (ColumnData::Timestamp(s), Value::Timestamp(v)) => s.push(Some(v)),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Read the slot at `idx` as a [`Value`]. Nulls come back as typed nulls.
    pub fn get(&self, idx: usize) -> Option<Value> {
        let null = Value::Null(self.element_type());
        let value = match self {
            ColumnData::Int8(s) => s.get(idx)?.map(Value::Int8),
            ColumnData::Int16(s) => s.get(idx)?.map(Value::Int16),
            ColumnData::Int32(s) => s.get(idx)?.map(Value::Int32),
            ColumnData::Int64(s) => s.get(idx)?.map(Value::Int64),
            ColumnData::UInt8(s) => s.get(idx)?.map(Value::UInt8),
            ColumnData::UInt16(s) => s.get(idx)?.map(Value::UInt16),
            ColumnData::UInt32(s) => s.get(idx)?.map(Value::UInt32),
            ColumnData::UInt64(s) => s.get(idx)?.map(Value::UInt64),
            ColumnData::Float32(s) => s.get(idx)?.map(Value::Float32),
            ColumnData::Float64(s) => s.get(idx)?.map(Value::Float64),
            ColumnData::String(s) => s.get(idx)?.clone().map(Value::String),
            ColumnData::Bool(s) => s.get(idx)?.map(Value::Bool),
            ColumnData::Timestamp(s) => s.get(idx)?.map(Value::Timestamp),
        };
        Some(value.unwrap_or(null))
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    nullable: bool,
    data: ColumnData,
}

impl Column {
    /// Create an empty column.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::with_capacity(name, field_type, 0)
    }

    /// Create an empty column with room for `capacity` values.
    pub fn with_capacity(name: impl Into<String>, field_type: FieldType, capacity: usize) -> Self {
        Self {
            name: name.into(),
            nullable: field_type.nullable,
            data: ColumnData::with_capacity(field_type.element, capacity),
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type fixed at creation.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Whether the column may hold nulls.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Declared type of the column.
    pub fn field_type(&self) -> FieldType {
        FieldType {
            element: self.element_type(),
            nullable: self.nullable,
        }
    }

    /// Typed storage.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of values (rows).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the column has no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Verify that `value` may be appended to this column.
    pub fn check(&self, value: &Value) -> Result<()> {
        if value.element_type() == self.element_type() {
            Ok(())
        } else {
            Err(ConvertError::type_mismatch(
                &self.name,
                self.element_type(),
                value.element_type(),
            ))
        }
    }

    /// Append a value at the next row index.
    ///
    /// A null appended to a non-nullable column marks the column nullable.
    pub fn append(&mut self, value: Value) -> Result<()> {
        self.check(&value)?;
        if value.is_null() {
            self.nullable = true;
        }
        let expected = self.element_type();
        self.data
            .push(value)
            .map_err(|v| ConvertError::type_mismatch(&self.name, expected, v.element_type()))
    }

    /// Append a null at the next row index.
    pub fn append_null(&mut self) {
        self.nullable = true;
        self.data.push_null();
    }

    /// Append nulls until the column holds `len` values.
    pub fn pad_to(&mut self, len: usize) {
        while self.data.len() < len {
            self.append_null();
        }
    }

    /// Value at row `idx`.
    pub fn get(&self, idx: usize) -> Option<Value> {
        self.data.get(idx)
    }

    /// All values in row order.
    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_back() {
        let mut col = Column::new("n", FieldType::required(ElementType::Int64));
        col.append(Value::Int64(1)).unwrap();
        col.append(Value::Int64(2)).unwrap();

        assert_eq!(col.len(), 2);
        assert_eq!(col.values(), vec![Value::Int64(1), Value::Int64(2)]);
        assert!(!col.is_nullable());
    }

    #[test]
    fn test_append_wrong_type_is_mismatch() {
        let mut col = Column::new("n", FieldType::required(ElementType::Int64));
        col.append(Value::Int64(1)).unwrap();

        let err = col.append(Value::String("two".into())).unwrap_err();
        match err {
            ConvertError::TypeMismatch {
                column,
                expected,
                actual,
            } => {
                assert_eq!(column, "n");
                assert_eq!(expected, "int64");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn test_null_of_other_type_is_mismatch() {
        let mut col = Column::new("flag", FieldType::required(ElementType::Bool));
        assert!(col.append(Value::Null(ElementType::Int8)).is_err());
        assert!(col.is_empty());
    }

    #[test]
    fn test_null_marks_column_nullable() {
        let mut col = Column::new("s", FieldType::required(ElementType::String));
        col.append(Value::from("a")).unwrap();
        col.append(Value::Null(ElementType::String)).unwrap();

        assert!(col.is_nullable());
        assert_eq!(col.data().null_count(), 1);
        assert_eq!(col.get(1), Some(Value::Null(ElementType::String)));
    }

    #[test]
    fn test_pad_to_fills_nulls() {
        let mut col = Column::new("f", FieldType::required(ElementType::Float32));
        col.append(Value::Float32(1.0)).unwrap();
        col.pad_to(3);

        assert_eq!(col.len(), 3);
        assert!(col.is_nullable());
        assert_eq!(col.get(2), Some(Value::Null(ElementType::Float32)));
        assert_eq!(col.get(3), None);
    }
}
