//! Raw values read from a SQL cursor and the slot types they are scanned into.
//!
//! A driver reports each result column with a type name and a natural
//! [`ScanType`]. Every row arrives as a list of [`ScanValue`]s, which are
//! scanned into the input type of the column's converter before conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::registry::Representable;
use crate::core::value::{ElementType, Value};

/// A raw value as produced by a row cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScanValue {
    /// SQL NULL.
    #[default]
    Null,

    Bool(bool),

    // ===== Integers =====
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),

    // ===== Floating Point =====
    F32(f32),
    F64(f64),

    // ===== Text and Binary =====
    Text(String),
    Bytes(Vec<u8>),

    // ===== Driver Types Without a Column Representation =====
    Decimal(Decimal),
    Uuid(Uuid),
    Json(serde_json::Value),

    // ===== Date/Time =====
    /// Instant with a known offset, normalized to UTC.
    Timestamp(DateTime<Utc>),
    /// Timestamp without time zone.
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// Type of a scan slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    Bytes,
    Decimal,
    Uuid,
    Json,
    Timestamp,
    DateTime,
    Date,
    Time,
}

impl ScanType {
    /// Short lowercase name, used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Bool => "bool",
            ScanType::I8 => "i8",
            ScanType::I16 => "i16",
            ScanType::I32 => "i32",
            ScanType::I64 => "i64",
            ScanType::U8 => "u8",
            ScanType::U16 => "u16",
            ScanType::U32 => "u32",
            ScanType::U64 => "u64",
            ScanType::F32 => "f32",
            ScanType::F64 => "f64",
            ScanType::Text => "text",
            ScanType::Bytes => "bytes",
            ScanType::Decimal => "decimal",
            ScanType::Uuid => "uuid",
            ScanType::Json => "json",
            ScanType::Timestamp => "timestamp",
            ScanType::DateTime => "datetime",
            ScanType::Date => "date",
            ScanType::Time => "time",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Representable for ScanType {
    fn element_type(&self) -> Option<ElementType> {
        match self {
            ScanType::Bool => Some(ElementType::Bool),
            ScanType::I8 => Some(ElementType::Int8),
            ScanType::I16 => Some(ElementType::Int16),
            ScanType::I32 => Some(ElementType::Int32),
            ScanType::I64 => Some(ElementType::Int64),
            ScanType::U8 => Some(ElementType::UInt8),
            ScanType::U16 => Some(ElementType::UInt16),
            ScanType::U32 => Some(ElementType::UInt32),
            ScanType::U64 => Some(ElementType::UInt64),
            ScanType::F32 => Some(ElementType::Float32),
            ScanType::F64 => Some(ElementType::Float64),
            ScanType::Text => Some(ElementType::String),
            ScanType::Timestamp => Some(ElementType::Timestamp),
            ScanType::Bytes
            | ScanType::Decimal
            | ScanType::Uuid
            | ScanType::Json
            | ScanType::DateTime
            | ScanType::Date
            | ScanType::Time => None,
        }
    }

    fn type_name(&self) -> String {
        self.as_str().to_string()
    }
}

/// Metadata for one result column, as reported by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,

    /// Driver-reported type name (e.g. "NUMERIC", "int4").
    pub database_type_name: String,

    /// Reported nullability. `None` when the driver does not know.
    pub nullable: Option<bool>,

    /// Natural scan type for the reported type.
    pub scan_type: ScanType,
}

impl ColumnMeta {
    /// Create metadata with unknown nullability.
    pub fn new(
        name: impl Into<String>,
        database_type_name: impl Into<String>,
        scan_type: ScanType,
    ) -> Self {
        Self {
            name: name.into(),
            database_type_name: database_type_name.into(),
            nullable: None,
            scan_type,
        }
    }

    /// Set reported nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Unreported nullability counts as nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }
}

impl ScanValue {
    /// Scan type of this value. `None` for NULL.
    pub fn scan_type(&self) -> Option<ScanType> {
        Some(match self {
            ScanValue::Null => return None,
            ScanValue::Bool(_) => ScanType::Bool,
            ScanValue::I8(_) => ScanType::I8,
            ScanValue::I16(_) => ScanType::I16,
            ScanValue::I32(_) => ScanType::I32,
            ScanValue::I64(_) => ScanType::I64,
            ScanValue::U8(_) => ScanType::U8,
            ScanValue::U16(_) => ScanType::U16,
            ScanValue::U32(_) => ScanType::U32,
            ScanValue::U64(_) => ScanType::U64,
            ScanValue::F32(_) => ScanType::F32,
            ScanValue::F64(_) => ScanType::F64,
            ScanValue::Text(_) => ScanType::Text,
            ScanValue::Bytes(_) => ScanType::Bytes,
            ScanValue::Decimal(_) => ScanType::Decimal,
            ScanValue::Uuid(_) => ScanType::Uuid,
            ScanValue::Json(_) => ScanType::Json,
            ScanValue::Timestamp(_) => ScanType::Timestamp,
            ScanValue::DateTime(_) => ScanType::DateTime,
            ScanValue::Date(_) => ScanType::Date,
            ScanValue::Time(_) => ScanType::Time,
        })
    }

    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, ScanValue::Null)
    }

    /// Convert into a column value. `None` for NULL and for types with no
    /// element type.
    pub fn into_value(self) -> Option<Value> {
        Some(match self {
            ScanValue::Bool(v) => Value::Bool(v),
            ScanValue::I8(v) => Value::Int8(v),
            ScanValue::I16(v) => Value::Int16(v),
            ScanValue::I32(v) => Value::Int32(v),
            ScanValue::I64(v) => Value::Int64(v),
            ScanValue::U8(v) => Value::UInt8(v),
            ScanValue::U16(v) => Value::UInt16(v),
            ScanValue::U32(v) => Value::UInt32(v),
            ScanValue::U64(v) => Value::UInt64(v),
            ScanValue::F32(v) => Value::Float32(v),
            ScanValue::F64(v) => Value::Float64(v),
            ScanValue::Text(v) => Value::String(v),
            ScanValue::Timestamp(v) => Value::Timestamp(v),
            _ => return None,
        })
    }

    /// Scan this value into a slot of type `target`.
    ///
    /// NULL scans into any slot. Other values are coerced where the
    /// conversion is lossless or conventional (integer widening and
    /// narrowing within range, integer to float, text parsing, anything to
    /// text); everything else is an error message.
    pub fn scan_as(self, target: ScanType) -> Result<ScanValue, String> {
        let source = match self.scan_type() {
            None => return Ok(ScanValue::Null),
            Some(t) if t == target => return Ok(self),
            Some(t) => t,
        };

        let mismatch = || format!("cannot scan {} into {}", source, target);

        match self {
            ScanValue::Text(s) => parse_text(&s, target),
            ScanValue::Bytes(b) if target == ScanType::Text => String::from_utf8(b)
                .map(ScanValue::Text)
                .map_err(|e| format!("bytes are not valid UTF-8: {}", e)),
            v if target == ScanType::Text => Ok(ScanValue::Text(v.to_string())),
            v => {
                if let Some(i) = v.as_i128() {
                    return from_i128(i, target).ok_or_else(|| {
                        format!("{} {} out of range for {}", source, i, target)
                    });
                }
                match (v, target) {
                    (ScanValue::F32(f), ScanType::F64) => Ok(ScanValue::F64(f as f64)),
                    (ScanValue::F64(f), ScanType::F32) => Ok(ScanValue::F32(f as f32)),
                    (ScanValue::Decimal(d), ScanType::F64) => d
                        .to_f64()
                        .map(ScanValue::F64)
                        .ok_or_else(|| format!("decimal {} out of range for f64", d)),
                    (ScanValue::DateTime(dt), ScanType::Timestamp) => {
                        Ok(ScanValue::Timestamp(Utc.from_utc_datetime(&dt)))
                    }
                    (ScanValue::Date(d), ScanType::DateTime) => {
                        Ok(ScanValue::DateTime(d.and_time(NaiveTime::MIN)))
                    }
                    (ScanValue::Date(d), ScanType::Timestamp) => Ok(ScanValue::Timestamp(
                        Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)),
                    )),
                    _ => Err(mismatch()),
                }
            }
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            ScanValue::I8(v) => Some(*v as i128),
            ScanValue::I16(v) => Some(*v as i128),
            ScanValue::I32(v) => Some(*v as i128),
            ScanValue::I64(v) => Some(*v as i128),
            ScanValue::U8(v) => Some(*v as i128),
            ScanValue::U16(v) => Some(*v as i128),
            ScanValue::U32(v) => Some(*v as i128),
            ScanValue::U64(v) => Some(*v as i128),
            _ => None,
        }
    }
}

/// Integer into an integer or float slot. `None` when out of range or when
/// `target` is not numeric.
fn from_i128(i: i128, target: ScanType) -> Option<ScanValue> {
    Some(match target {
        ScanType::I8 => ScanValue::I8(i.try_into().ok()?),
        ScanType::I16 => ScanValue::I16(i.try_into().ok()?),
        ScanType::I32 => ScanValue::I32(i.try_into().ok()?),
        ScanType::I64 => ScanValue::I64(i.try_into().ok()?),
        ScanType::U8 => ScanValue::U8(i.try_into().ok()?),
        ScanType::U16 => ScanValue::U16(i.try_into().ok()?),
        ScanType::U32 => ScanValue::U32(i.try_into().ok()?),
        ScanType::U64 => ScanValue::U64(i.try_into().ok()?),
        ScanType::F32 => ScanValue::F32(i as f32),
        ScanType::F64 => ScanValue::F64(i as f64),
        ScanType::Decimal => ScanValue::Decimal(Decimal::from_i128_with_scale(i, 0)),
        _ => return None,
    })
}

fn parse<T>(s: &str, target: ScanType) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| format!("cannot parse '{}' as {}: {}", s, target, e))
}

/// Parse text into a slot of type `target`.
pub(crate) fn parse_text(s: &str, target: ScanType) -> Result<ScanValue, String> {
    Ok(match target {
        ScanType::Text => ScanValue::Text(s.to_string()),
        ScanType::Bytes => ScanValue::Bytes(s.as_bytes().to_vec()),
        ScanType::Bool => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => ScanValue::Bool(true),
            "false" | "f" | "0" => ScanValue::Bool(false),
            _ => return Err(format!("cannot parse '{}' as bool", s)),
        },
        ScanType::I8 => ScanValue::I8(parse(s, target)?),
        ScanType::I16 => ScanValue::I16(parse(s, target)?),
        ScanType::I32 => ScanValue::I32(parse(s, target)?),
        ScanType::I64 => ScanValue::I64(parse(s, target)?),
        ScanType::U8 => ScanValue::U8(parse(s, target)?),
        ScanType::U16 => ScanValue::U16(parse(s, target)?),
        ScanType::U32 => ScanValue::U32(parse(s, target)?),
        ScanType::U64 => ScanValue::U64(parse(s, target)?),
        ScanType::F32 => ScanValue::F32(parse(s, target)?),
        ScanType::F64 => ScanValue::F64(parse(s, target)?),
        ScanType::Decimal => ScanValue::Decimal(parse(s, target)?),
        ScanType::Uuid => ScanValue::Uuid(parse(s, target)?),
        ScanType::Json => ScanValue::Json(
            serde_json::from_str(s).map_err(|e| format!("cannot parse '{}' as json: {}", s, e))?,
        ),
        ScanType::Timestamp => ScanValue::Timestamp(
            DateTime::parse_from_rfc3339(s.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| format!("cannot parse '{}' as timestamp: {}", s, e))?,
        ),
        ScanType::DateTime => {
            let trimmed = s.trim();
            let dt = trimmed
                .parse::<NaiveDateTime>()
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|e| format!("cannot parse '{}' as datetime: {}", s, e))?;
            ScanValue::DateTime(dt)
        }
        ScanType::Date => ScanValue::Date(parse(s, target)?),
        ScanType::Time => ScanValue::Time(parse(s, target)?),
    })
}

impl fmt::Display for ScanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanValue::Null => f.write_str("NULL"),
            ScanValue::Bool(v) => write!(f, "{}", v),
            ScanValue::I8(v) => write!(f, "{}", v),
            ScanValue::I16(v) => write!(f, "{}", v),
            ScanValue::I32(v) => write!(f, "{}", v),
            ScanValue::I64(v) => write!(f, "{}", v),
            ScanValue::U8(v) => write!(f, "{}", v),
            ScanValue::U16(v) => write!(f, "{}", v),
            ScanValue::U32(v) => write!(f, "{}", v),
            ScanValue::U64(v) => write!(f, "{}", v),
            ScanValue::F32(v) => write!(f, "{}", v),
            ScanValue::F64(v) => write!(f, "{}", v),
            ScanValue::Text(v) => f.write_str(v),
            ScanValue::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            ScanValue::Decimal(v) => write!(f, "{}", v),
            ScanValue::Uuid(v) => write!(f, "{}", v),
            ScanValue::Json(v) => write!(f, "{}", v),
            ScanValue::Timestamp(v) => f.write_str(&v.to_rfc3339()),
            ScanValue::DateTime(v) => write!(f, "{}", v),
            ScanValue::Date(v) => write!(f, "{}", v),
            ScanValue::Time(v) => write!(f, "{}", v),
        }
    }
}
