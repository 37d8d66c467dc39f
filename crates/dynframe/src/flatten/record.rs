//! Dynamically shaped input records.

use crate::core::value::Value;

use super::layout::Layout;

/// A named field of an [`Record::Object`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Source field name.
    pub name: String,
    /// Layout annotation attached to the field.
    pub layout: Layout,
    /// Field value.
    pub value: Record,
}

impl Field {
    /// Create a field without a layout annotation.
    pub fn new(name: impl Into<String>, value: impl Into<Record>) -> Self {
        Self {
            name: name.into(),
            layout: Layout::default(),
            value: value.into(),
        }
    }

    /// Create a field with a layout annotation tag (`rename,modifier,lead`).
    pub fn tagged(name: impl Into<String>, tag: &str, value: impl Into<Record>) -> Self {
        Self {
            name: name.into(),
            layout: Layout::parse(tag),
            value: value.into(),
        }
    }

    /// Create a field whose name is the first segment of its tag.
    ///
    /// Used where the only name available is the tag itself, such as a
    /// serde field name written as `"name,omitparent"`.
    pub fn from_tag(tag: &str, value: Record) -> Self {
        let layout = Layout::parse(tag);
        let name = layout.rename.clone().unwrap_or_else(|| tag.to_string());
        Self {
            name,
            layout,
            value,
        }
    }

    /// Name emitted for this field, before any prefix is applied.
    pub fn effective_name(&self) -> &str {
        self.layout.resolve(&self.name)
    }
}

/// Input value classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Scalar or temporal leaf. Never recursed into.
    Value(Value),
    /// Named fields in declaration order.
    Object(Vec<Field>),
    /// String keyed entries. Entry order carries no meaning.
    Map(Vec<(String, Record)>),
    /// Objects or maps, one level deep.
    Sequence(Vec<Record>),
    /// A value that may be absent. `Some` marks the columns it creates nullable.
    Optional(Option<Box<Record>>),
}

impl Record {
    /// Leaf record.
    pub fn value(value: impl Into<Value>) -> Self {
        Record::Value(value.into())
    }

    /// Object record from fields in declaration order.
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Record::Object(fields.into_iter().collect())
    }

    /// Map record from key/value entries.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Record)>) -> Self {
        Record::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Sequence record.
    pub fn sequence(items: impl IntoIterator<Item = Record>) -> Self {
        Record::Sequence(items.into_iter().collect())
    }

    /// Absent value.
    pub fn null() -> Self {
        Record::Optional(None)
    }

    /// Present value of a nullable field.
    pub fn some(inner: impl Into<Record>) -> Self {
        Record::Optional(Some(Box::new(inner.into())))
    }

    /// Shape name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Value(_) => "scalar",
            Record::Object(_) => "object",
            Record::Map(_) => "map",
            Record::Sequence(_) => "sequence",
            Record::Optional(None) => "null",
            Record::Optional(Some(inner)) => inner.kind(),
        }
    }

    /// Whether this record fills exactly one column.
    pub fn is_leaf(&self) -> bool {
        match self {
            Record::Value(_) | Record::Optional(None) => true,
            Record::Optional(Some(inner)) => inner.is_leaf(),
            Record::Object(_) | Record::Map(_) | Record::Sequence(_) => false,
        }
    }
}

impl From<Value> for Record {
    fn from(v: Value) -> Self {
        Record::Value(v)
    }
}

impl From<Vec<Field>> for Record {
    fn from(fields: Vec<Field>) -> Self {
        Record::Object(fields)
    }
}

impl From<serde_json::Value> for Record {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match v {
            Json::Null => Record::null(),
            Json::Bool(b) => Record::value(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Record::value(i)
                } else if let Some(u) = n.as_u64() {
                    Record::value(u)
                } else {
                    Record::value(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Record::value(s),
            Json::Array(items) => Record::Sequence(items.into_iter().map(Record::from).collect()),
            Json::Object(entries) => {
                Record::Map(entries.into_iter().map(|(k, v)| (k, Record::from(v))).collect())
            }
        }
    }
}
