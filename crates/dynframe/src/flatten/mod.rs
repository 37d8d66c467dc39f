//! Flattening of nested records into columnar tables.
//!
//! The [`Flattener`] walks a [`Record`] and emits `(field name, leaf value)`
//! pairs into a [`ColumnAccumulator`]:
//!
//! - **Sequence** (top level only): one row per element; elements must be
//!   objects or maps
//! - **Object**: fields in declaration order, nested names joined with `.`
//! - **Map**: entries in any order; column order is made deterministic by
//!   sorting at emission
//! - **Leaf**: appended directly
//!
//! Object and map values at the top level produce a single row.
//!
//! # Example
//!
//! ```rust
//! use dynframe::{flatten, Field, Record};
//!
//! let record = Record::object([
//!     Field::new("host", Record::value("db-1")),
//!     Field::new("load", Record::object([Field::new("avg", Record::value(0.5f64))])),
//! ]);
//! let table = flatten("hosts", &record).unwrap();
//! assert_eq!(table.column_names(), vec!["host", "load.avg"]);
//! ```

pub mod accumulator;
pub mod layout;
pub mod record;
pub mod serialize;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::FlattenConfig;
use crate::core::table::Table;
use crate::core::value::Value;
use crate::error::{BoxError, ConvertError, Result};

pub use accumulator::ColumnAccumulator;
pub use layout::Layout;
pub use record::{Field, Record};
pub use serialize::{timestamp, to_record};

/// Transforms a leaf value of one field before it is appended.
pub type FieldConverter =
    Arc<dyn Fn(Value) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Options for a flatten call.
#[derive(Clone)]
pub struct FlattenOptions {
    separator: String,
    sort_when_map_seen: bool,
    converters: HashMap<String, FieldConverter>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            sort_when_map_seen: true,
            converters: HashMap::new(),
        }
    }
}

impl fmt::Debug for FlattenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenOptions")
            .field("separator", &self.separator)
            .field("sort_when_map_seen", &self.sort_when_map_seen)
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FlattenOptions {
    /// Default options: `.` separator, sort columns when a map was seen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the `flatten` configuration section.
    pub fn from_config(config: &FlattenConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            sort_when_map_seen: config.sort_when_map_seen,
            converters: HashMap::new(),
        }
    }

    /// Use a different separator for nested field names.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Register a converter for the field with the given full (joined) name.
    pub fn with_converter<F>(mut self, field: impl Into<String>, convert: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.converters.insert(field.into(), Arc::new(convert));
        self
    }

    fn join(&self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", prefix, self.separator, name)
        }
    }
}

/// Walks one record into a [`ColumnAccumulator`].
pub struct Flattener<'a> {
    options: &'a FlattenOptions,
    acc: ColumnAccumulator,
}

impl<'a> Flattener<'a> {
    /// Create a flattener with fresh per-call state.
    pub fn new(options: &'a FlattenOptions) -> Self {
        Self {
            options,
            acc: ColumnAccumulator::new(),
        }
    }

    /// Flatten a top-level record and return the finished table.
    pub fn run(mut self, name: &str, record: &Record) -> Result<Table> {
        self.visit_top(record)?;
        let rows = self.acc.row_count();
        let table = self.acc.finish(name, self.options.sort_when_map_seen)?;
        debug!(
            "Flattened '{}': {} columns, {} rows",
            name,
            table.num_columns(),
            rows
        );
        Ok(table)
    }

    fn visit_top(&mut self, record: &Record) -> Result<()> {
        match record {
            Record::Sequence(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.visit_element(idx, item)?;
                    self.acc.end_row();
                }
                Ok(())
            }
            Record::Object(fields) => {
                self.visit_object(fields, "", false)?;
                self.acc.end_row();
                Ok(())
            }
            Record::Map(entries) => {
                self.visit_map(entries, "", false)?;
                self.acc.end_row();
                Ok(())
            }
            Record::Optional(Some(inner)) => self.visit_top(inner),
            Record::Optional(None) => Err(ConvertError::UnsupportedShape(
                "top-level value is null".to_string(),
            )),
            Record::Value(v) => Err(ConvertError::UnsupportedShape(format!(
                "top-level value must be an object, map or sequence, got {} value",
                v.element_type()
            ))),
        }
    }

    fn visit_element(&mut self, idx: usize, item: &Record) -> Result<()> {
        match item {
            Record::Map(entries) => self.visit_map(entries, "", false),
            Record::Object(fields) => self.visit_object(fields, "", false),
            // A missing element becomes a row of nulls.
            Record::Optional(None) => Ok(()),
            Record::Optional(Some(inner)) => self.visit_element(idx, inner),
            Record::Sequence(_) => Err(ConvertError::UnsupportedShape(format!(
                "nested sequences unsupported (element {})",
                idx
            ))),
            Record::Value(_) => Err(ConvertError::UnsupportedShape(format!(
                "sequence element {} must be an object or map, got scalar",
                idx
            ))),
        }
    }

    fn visit_object(&mut self, fields: &[Field], prefix: &str, nullable: bool) -> Result<()> {
        for field in fields {
            let name = self.options.join(prefix, field.effective_name());
            if field.layout.lead {
                if field.value.is_leaf() {
                    self.acc.mark_lead(&name);
                } else {
                    warn!(
                        "Lead marker on field '{}' has no effect: {} fields do not map to one column",
                        name,
                        field.value.kind()
                    );
                }
            }
            let child_prefix = if field.layout.omit_parent {
                String::new()
            } else {
                name.clone()
            };
            self.visit_value(&name, &child_prefix, &field.value, nullable)?;
        }
        Ok(())
    }

    fn visit_map(&mut self, entries: &[(String, Record)], prefix: &str, nullable: bool) -> Result<()> {
        self.acc.mark_map_seen();
        for (key, value) in entries {
            let name = self.options.join(prefix, key);
            self.visit_value(&name, &name, value, nullable)?;
        }
        Ok(())
    }

    fn visit_value(
        &mut self,
        name: &str,
        child_prefix: &str,
        record: &Record,
        nullable: bool,
    ) -> Result<()> {
        match record {
            Record::Value(v) => self.append_leaf(name, v.clone(), nullable),
            Record::Object(fields) => self.visit_object(fields, child_prefix, nullable),
            Record::Map(entries) => self.visit_map(entries, child_prefix, nullable),
            Record::Sequence(_) => Err(ConvertError::UnsupportedShape(format!(
                "nested sequences unsupported (field {})",
                name
            ))),
            // Absent: the column is null-padded when the row closes.
            Record::Optional(None) => Ok(()),
            Record::Optional(Some(inner)) => self.visit_value(name, child_prefix, inner, true),
        }
    }

    fn append_leaf(&mut self, name: &str, value: Value, nullable: bool) -> Result<()> {
        let value = match self.options.converters.get(name) {
            Some(convert) => {
                convert(value).map_err(|e| ConvertError::field_conversion(name, e))?
            }
            None => value,
        };
        self.acc.upsert(name, value, nullable)
    }
}

/// Types that build their own table instead of being flattened.
pub trait ToTable {
    /// Build the table. The returned name is replaced by the caller's name.
    fn to_table(&self) -> Result<Table>;
}

impl ToTable for Record {
    fn to_table(&self) -> Result<Table> {
        flatten("", self)
    }
}

impl ToTable for Table {
    fn to_table(&self) -> Result<Table> {
        Ok(self.clone())
    }
}

/// Flatten a record into a table named `name` using default options.
pub fn flatten(name: &str, record: &Record) -> Result<Table> {
    flatten_with(name, record, &FlattenOptions::default())
}

/// Flatten a record into a table named `name`.
pub fn flatten_with(name: &str, record: &Record, options: &FlattenOptions) -> Result<Table> {
    Flattener::new(options).run(name, record)
}

/// Serialize `value` into a record and flatten it.
pub fn flatten_serialize<T: Serialize + ?Sized>(name: &str, value: &T) -> Result<Table> {
    flatten(name, &to_record(value)?)
}

/// Convert a value with its own table hook, naming the result `name`.
pub fn convert<T: ToTable + ?Sized>(name: &str, value: &T) -> Result<Table> {
    let mut table = value.to_table()?;
    table.set_name(name);
    Ok(table)
}
