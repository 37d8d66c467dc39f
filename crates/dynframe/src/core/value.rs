//! Leaf value types for columnar tables.
//!
//! [`ElementType`] is the closed set of element types a column can hold.
//! [`Value`] is a single leaf value of one of those types, with a typed
//! `Null` variant so that nulls still carry the column type they belong to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Element type of a column.
///
/// Every column holds values of exactly one element type. Nullability is
/// tracked separately (see [`FieldType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    // ===== Signed Integers =====
    Int8,
    Int16,
    Int32,
    Int64,

    // ===== Unsigned Integers =====
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // ===== Floating Point =====
    Float32,
    Float64,

    // ===== Other Scalars =====
    String,
    Bool,
    /// Instant in time, stored as UTC.
    Timestamp,
}

impl ElementType {
    /// All element types, in declaration order.
    pub const ALL: [ElementType; 13] = [
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::String,
        ElementType::Bool,
        ElementType::Timestamp,
    ];

    /// Lowercase name used in error messages and configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::String => "string",
            ElementType::Bool => "bool",
            ElementType::Timestamp => "timestamp",
        }
    }

    /// Whether this is one of the integer types.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Int8
                | ElementType::Int16
                | ElementType::Int32
                | ElementType::Int64
                | ElementType::UInt8
                | ElementType::UInt16
                | ElementType::UInt32
                | ElementType::UInt64
        )
    }

    /// Whether this is one of the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConvertError::UnsupportedElementType(s.to_string()))
    }
}

/// Element type plus nullability: the declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub element: ElementType,
    pub nullable: bool,
}

impl FieldType {
    /// A non-nullable field type.
    pub fn required(element: ElementType) -> Self {
        Self {
            element,
            nullable: false,
        }
    }

    /// A nullable field type.
    pub fn nullable(element: ElementType) -> Self {
        Self {
            element,
            nullable: true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "nullable {}", self.element)
        } else {
            write!(f, "{}", self.element)
        }
    }
}

/// A single leaf value.
///
/// `Null` carries the element type of the missing value, the same way a
/// typed null in a database column does.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ElementType),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Element type of this value (for `Null`, the carried type).
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Null(t) => *t,
            Value::Int8(_) => ElementType::Int8,
            Value::Int16(_) => ElementType::Int16,
            Value::Int32(_) => ElementType::Int32,
            Value::Int64(_) => ElementType::Int64,
            Value::UInt8(_) => ElementType::UInt8,
            Value::UInt16(_) => ElementType::UInt16,
            Value::UInt32(_) => ElementType::UInt32,
            Value::UInt64(_) => ElementType::UInt64,
            Value::Float32(_) => ElementType::Float32,
            Value::Float64(_) => ElementType::Float64,
            Value::String(_) => ElementType::String,
            Value::Bool(_) => ElementType::Bool,
            Value::Timestamp(_) => ElementType::Timestamp,
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Widen any numeric value to `f64`. Returns `None` for non-numeric values and nulls.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int8(v) => Some(*v as f64),
            Value::Int16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt8(v) => Some(*v as f64),
            Value::UInt16(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("null"),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// Rust types that map onto exactly one [`ElementType`].
///
/// Used to build typed nulls from `Option<T>`.
pub trait Element: Into<Value> {
    const ELEMENT_TYPE: ElementType;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl Element for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    bool => Bool,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Element> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null(T::ELEMENT_TYPE),
        }
    }
}
