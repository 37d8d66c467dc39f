//! # dynframe
//!
//! Conversion of dynamically-shaped values into typed, columnar tables.
//!
//! Two entry points produce a [`Table`]:
//!
//! - **[`flatten`]** decomposes a nested [`Record`] (objects, maps, a
//!   top-level sequence of rows) into one column per leaf field, with nested
//!   names joined by `.`
//! - **[`from_rows`]** reads a SQL result set through a [`RowCursor`],
//!   adapting driver-reported column types with a [`ConverterRegistry`]
//!
//! Any `serde::Serialize` value can be flattened through
//! [`flatten_serialize`], and `serde_json::Value` converts into a
//! [`Record`] directly.
//!
//! ## Example
//!
//! ```rust
//! use dynframe::{flatten, Field, Record, Value};
//!
//! let rows = Record::sequence([
//!     Record::object([
//!         Field::new("host", Record::value("db-1")),
//!         Field::tagged("cpu", ",omitparent", Record::object([
//!             Field::new("user", Record::value(0.25f64)),
//!         ])),
//!     ]),
//!     Record::object([
//!         Field::new("host", Record::value("db-2")),
//!         Field::tagged("cpu", ",omitparent", Record::object([
//!             Field::new("user", Record::value(0.5f64)),
//!         ])),
//!     ]),
//! ]);
//!
//! let table = flatten("hosts", &rows).unwrap();
//! assert_eq!(table.column_names(), vec!["host", "user"]);
//! assert_eq!(table.column("user").unwrap().get(1), Some(Value::Float64(0.5)));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod flatten;
pub mod sql;

// Re-exports for convenient access
pub use crate::config::{Config, ConverterPolicy, FlattenConfig, SqlConfig};
pub use crate::core::{Column, ColumnData, ElementType, FieldType, Notice, Severity, Table, Value};
pub use crate::error::{BoxError, ConvertError, Result};
pub use crate::flatten::{
    convert, flatten, flatten_serialize, flatten_with, timestamp, to_record, Field, FlattenOptions,
    Layout, Record, ToTable,
};
pub use crate::sql::{
    from_rows, from_rows_with, ColumnMeta, Converter, ConverterRegistry, FromRowsOptions, Matcher,
    RowCursor, ScanType, ScanValue,
};
