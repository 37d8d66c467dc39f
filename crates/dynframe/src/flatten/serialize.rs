//! Serde bridge: any `Serialize` value into a [`Record`].
//!
//! Structs become objects (fields in declaration order), maps become maps,
//! sequences and tuples become sequences. A serde field name is read as a
//! layout annotation, so `#[serde(rename = "id,,col0")]` names the field
//! `id` and makes it the lead column.
//!
//! Timestamps serialize as strings by default. Mark `DateTime<Utc>` fields
//! with `#[serde(with = "dynframe::timestamp")]` (or
//! `dynframe::timestamp::option` for `Option<DateTime<Utc>>`) to keep them as
//! temporal leaves. Other serializers see a plain RFC 3339 string.

use chrono::{DateTime, Utc};
use serde::ser::{self, Impossible, Serialize};

use crate::core::value::Value;
use crate::error::{ConvertError, Result};

use super::record::{Field, Record};

/// Newtype name that marks an RFC 3339 string as a timestamp.
pub(crate) const TIMESTAMP_TOKEN: &str = "$dynframe::private::Timestamp";

/// Serialize `value` into a [`Record`].
pub fn to_record<T: Serialize + ?Sized>(value: &T) -> Result<Record> {
    value.serialize(RecordSerializer)
}

fn unsupported(type_name: impl Into<String>) -> ConvertError {
    ConvertError::UnsupportedElementType(type_name.into())
}

/// Serializer producing [`Record`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSerializer;

impl ser::Serializer for RecordSerializer {
    type Ok = Record;
    type Error = ConvertError;

    type SerializeSeq = SerializeSequence;
    type SerializeTuple = SerializeSequence;
    type SerializeTupleStruct = SerializeSequence;
    type SerializeTupleVariant = Impossible<Record, ConvertError>;
    type SerializeMap = SerializeEntries;
    type SerializeStruct = SerializeFields;
    type SerializeStructVariant = Impossible<Record, ConvertError>;

    fn serialize_bool(self, v: bool) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_i128(self, _v: i128) -> Result<Record> {
        Err(unsupported("i128"))
    }

    fn serialize_u8(self, v: u8) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_u128(self, _v: u128) -> Result<Record> {
        Err(unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_char(self, v: char) -> Result<Record> {
        Ok(Record::value(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Record> {
        Ok(Record::value(v))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Record> {
        Err(unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<Record> {
        Ok(Record::null())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Record> {
        Ok(Record::some(value.serialize(self)?))
    }

    fn serialize_unit(self) -> Result<Record> {
        Err(unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Record> {
        Err(unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Record> {
        Ok(Record::value(variant))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Record> {
        if name != TIMESTAMP_TOKEN {
            return value.serialize(self);
        }
        match value.serialize(self)? {
            Record::Value(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| Record::value(ts.with_timezone(&Utc)))
                .map_err(|e| ConvertError::Serialize(format!("invalid timestamp '{}': {}", s, e))),
            other => Err(ConvertError::Serialize(format!(
                "timestamp must serialize as a string, got {}",
                other.kind()
            ))),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Record> {
        Err(unsupported(format!("{}::{}", name, variant)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeSequence> {
        Ok(SerializeSequence::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeSequence> {
        Ok(SerializeSequence::with_capacity(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeSequence> {
        Ok(SerializeSequence::with_capacity(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported(format!("{}::{}", name, variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeEntries> {
        Ok(SerializeEntries {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeFields> {
        Ok(SerializeFields {
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported(format!("{}::{}", name, variant)))
    }
}

/// Collects sequence and tuple elements.
#[derive(Debug)]
pub struct SerializeSequence {
    items: Vec<Record>,
}

impl SerializeSequence {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(RecordSerializer)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeSequence {
    type Ok = Record;
    type Error = ConvertError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Record> {
        Ok(Record::Sequence(self.items))
    }
}

impl ser::SerializeTuple for SerializeSequence {
    type Ok = Record;
    type Error = ConvertError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Record> {
        Ok(Record::Sequence(self.items))
    }
}

impl ser::SerializeTupleStruct for SerializeSequence {
    type Ok = Record;
    type Error = ConvertError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Record> {
        Ok(Record::Sequence(self.items))
    }
}

/// Collects map entries. Keys must serialize to non-null scalars.
#[derive(Debug)]
pub struct SerializeEntries {
    entries: Vec<(String, Record)>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeEntries {
    type Ok = Record;
    type Error = ConvertError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let key = match key.serialize(RecordSerializer)? {
            Record::Value(v) if !v.is_null() => v.to_string(),
            other => {
                return Err(ConvertError::UnsupportedShape(format!(
                    "map keys must be scalars, got {}",
                    other.kind()
                )))
            }
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ConvertError::Serialize("map value serialized before its key".into()))?;
        self.entries.push((key, value.serialize(RecordSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Record> {
        Ok(Record::Map(self.entries))
    }
}

/// Collects struct fields in declaration order.
#[derive(Debug)]
pub struct SerializeFields {
    fields: Vec<Field>,
}

impl ser::SerializeStruct for SerializeFields {
    type Ok = Record;
    type Error = ConvertError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.fields
            .push(Field::from_tag(key, value.serialize(RecordSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Record> {
        Ok(Record::Object(self.fields))
    }
}

/// Serde helpers that keep `DateTime<Utc>` fields temporal.
///
/// ```rust
/// use chrono::{DateTime, Utc};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Sample {
///     #[serde(with = "dynframe::timestamp")]
///     at: DateTime<Utc>,
///     value: f64,
/// }
/// ```
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_TOKEN;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(
            TIMESTAMP_TOKEN,
            &ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    /// Same as the parent module, for `Option<DateTime<Utc>>`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        struct Marked<'a>(&'a DateTime<Utc>);

        impl Serialize for Marked<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                super::serialize(self.0, serializer)
            }
        }

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_some(&Marked(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}
